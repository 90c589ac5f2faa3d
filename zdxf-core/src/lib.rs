pub mod geometry {
    use glam::{DVec2, DVec3};
    use serde::{Deserialize, Serialize};

    /// 二维点，内部以 `glam::DVec2` 表示。顶点记录只携带 XY。
    #[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }
    }

    impl From<DVec2> for Point2 {
        fn from(value: DVec2) -> Self {
            Self(value)
        }
    }

    /// 三维点，缺省为原点。
    #[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point3(pub DVec3);

    impl Point3 {
        #[inline]
        pub fn new(x: f64, y: f64, z: f64) -> Self {
            Self(DVec3::new(x, y, z))
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn z(self) -> f64 {
            self.0.z
        }

        #[inline]
        pub fn as_vec3(self) -> DVec3 {
            self.0
        }
    }

    impl From<DVec3> for Point3 {
        fn from(value: DVec3) -> Self {
            Self(value)
        }
    }
}

pub mod document {
    use serde::{Deserialize, Serialize};

    use crate::geometry::{Point2, Point3};

    /// 图形实体。块定义与段落不属于实体，分别由 `Block` 与 `Section` 表示。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub enum Entity {
        Insert(Insert),
        Text(Text),
        Line(Line),
        Point(Point),
        Polyline(Polyline),
    }

    impl Entity {
        #[inline]
        pub fn layer_name(&self) -> &str {
            match self {
                Entity::Insert(insert) => &insert.layer,
                Entity::Text(text) => &text.layer,
                Entity::Line(line) => &line.layer,
                Entity::Point(point) => &point.layer,
                Entity::Polyline(polyline) => &polyline.layer,
            }
        }

        /// 返回实体在 DXF 中的记录关键字。
        #[inline]
        pub fn kind_name(&self) -> &'static str {
            match self {
                Entity::Insert(_) => "INSERT",
                Entity::Text(_) => "TEXT",
                Entity::Line(_) => "LINE",
                Entity::Point(_) => "POINT",
                Entity::Polyline(_) => "POLYLINE",
            }
        }
    }

    /// 块参照。
    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Insert {
        pub block_name: String,
        pub layer: String,
        pub insert: Point3,
    }

    /// 单行文字，`rotation` 以角度保存，与文件中的原始值一致。
    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Text {
        pub content: String,
        pub layer: String,
        pub position: Point3,
        pub height: f64,
        pub rotation: f64,
    }

    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Line {
        pub layer: String,
        pub start: Point3,
        pub end: Point3,
    }

    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Point {
        pub layer: String,
        pub position: Point3,
    }

    /// 旧式多段线。`flags` 保留组码 70 的原始位掩码，不做解码：
    /// 1 闭合，2 曲线拟合，4 样条拟合，8 三维多段线，16 三维网格，
    /// 32 N 向闭合网格，64 多面网格，128 线型连续生成。
    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Polyline {
        pub layer: String,
        pub flags: i32,
        pub vertices: Vec<Vertex>,
    }

    /// 多段线顶点，仅保存 XY。
    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Vertex {
        pub layer: String,
        pub position: Point2,
        pub flags: i32,
    }

    /// 块定义，`flags` 为组码 70 的原始位掩码。
    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Block {
        pub name: String,
        pub layer: String,
        pub flags: i32,
        pub base_point: Point3,
        #[serde(default)]
        pub entities: Vec<Entity>,
    }

    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Section {
        pub name: String,
        #[serde(default)]
        pub blocks: Vec<Block>,
        #[serde(default)]
        pub entities: Vec<Entity>,
    }

    impl Section {
        pub fn new(name: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                blocks: Vec::new(),
                entities: Vec::new(),
            }
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.blocks.is_empty() && self.entities.is_empty()
        }
    }

    /// 解析完成的文档。段落按文件顺序保存；在任何段落之外出现的块与实体
    /// 单独存放，不会被丢弃。
    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Document {
        sections: Vec<Section>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        unsectioned_blocks: Vec<Block>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        unsectioned_entities: Vec<Entity>,
    }

    impl Document {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_section(&mut self, section: Section) {
            self.sections.push(section);
        }

        pub fn push_unsectioned_block(&mut self, block: Block) {
            self.unsectioned_blocks.push(block);
        }

        pub fn push_unsectioned_entity(&mut self, entity: Entity) {
            self.unsectioned_entities.push(entity);
        }

        pub fn sections(&self) -> impl Iterator<Item = &Section> {
            self.sections.iter()
        }

        /// 按名称查找第一个匹配的段落。
        pub fn section(&self, name: &str) -> Option<&Section> {
            self.sections.iter().find(|section| section.name == name)
        }

        /// 所有块定义，先按段落顺序，再附加段落之外的块。
        pub fn blocks(&self) -> impl Iterator<Item = &Block> {
            self.sections
                .iter()
                .flat_map(|section| section.blocks.iter())
                .chain(self.unsectioned_blocks.iter())
        }

        pub fn block(&self, name: &str) -> Option<&Block> {
            self.blocks().find(|block| block.name == name)
        }

        /// 顶层实体（不含块定义内部的实体）。
        pub fn entities(&self) -> impl Iterator<Item = &Entity> {
            self.sections
                .iter()
                .flat_map(|section| section.entities.iter())
                .chain(self.unsectioned_entities.iter())
        }

        #[inline]
        pub fn entity_count(&self) -> usize {
            self.entities().count()
        }

        pub fn unsectioned_blocks(&self) -> &[Block] {
            &self.unsectioned_blocks
        }

        pub fn unsectioned_entities(&self) -> &[Entity] {
            &self.unsectioned_entities
        }

        pub fn is_empty(&self) -> bool {
            self.sections.is_empty()
                && self.unsectioned_blocks.is_empty()
                && self.unsectioned_entities.is_empty()
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::geometry::{Point2, Point3};

        fn sample_line(layer: &str) -> Entity {
            Entity::Line(Line {
                layer: layer.to_string(),
                start: Point3::new(0.0, 0.0, 0.0),
                end: Point3::new(1.0, 1.0, 0.0),
            })
        }

        #[test]
        fn document_queries_follow_section_order() {
            let mut blocks = Section::new("BLOCKS");
            blocks.blocks.push(Block {
                name: "DOOR".to_string(),
                entities: vec![sample_line("0")],
                ..Block::default()
            });
            let mut entities = Section::new("ENTITIES");
            entities.entities.push(sample_line("WALLS"));
            entities.entities.push(Entity::Insert(Insert {
                block_name: "DOOR".to_string(),
                layer: "DOORS".to_string(),
                insert: Point3::new(5.0, 0.0, 0.0),
            }));

            let mut doc = Document::new();
            doc.push_section(blocks);
            doc.push_section(entities);
            doc.push_unsectioned_entity(sample_line("LOOSE"));

            assert_eq!(doc.sections().count(), 2);
            assert!(doc.section("ENTITIES").is_some());
            assert!(doc.section("HEADER").is_none());
            assert_eq!(doc.block("DOOR").map(|b| b.entities.len()), Some(1));
            // 块内部的实体不计入顶层实体
            assert_eq!(doc.entity_count(), 3);
            let layers: Vec<&str> = doc.entities().map(Entity::layer_name).collect();
            assert_eq!(layers, vec!["WALLS", "DOORS", "LOOSE"]);
        }

        #[test]
        fn records_default_to_zero_values() {
            let text = Text::default();
            assert!(text.content.is_empty());
            assert_eq!(text.rotation, 0.0);
            assert_eq!(text.position, Point3::new(0.0, 0.0, 0.0));

            let vertex = Vertex::default();
            assert_eq!(vertex.position, Point2::new(0.0, 0.0));
            assert_eq!(vertex.flags, 0);
        }

        #[test]
        fn entity_kind_names_match_record_keywords() {
            let polyline = Entity::Polyline(Polyline::default());
            assert_eq!(polyline.kind_name(), "POLYLINE");
            assert_eq!(Entity::Point(Point::default()).kind_name(), "POINT");
            assert_eq!(sample_line("0").kind_name(), "LINE");
        }

        #[test]
        fn points_serialize_as_plain_arrays() {
            let value = serde_json::to_value(Point3::new(1.0, 2.0, 3.0)).expect("序列化失败");
            assert_eq!(value, serde_json::json!([1.0, 2.0, 3.0]));

            let line = serde_json::to_value(sample_line("0")).expect("序列化失败");
            assert!(line.get("Line").is_some());
        }

        #[test]
        fn empty_unsectioned_lists_are_not_serialized() {
            let mut doc = Document::new();
            doc.push_section(Section::new("HEADER"));
            let value = serde_json::to_value(&doc).expect("序列化失败");
            assert!(value.get("unsectioned_entities").is_none());
            assert_eq!(value["sections"][0]["name"], "HEADER");
        }
    }
}
