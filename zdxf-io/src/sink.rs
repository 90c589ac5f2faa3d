//! 文档事件接收端。
//!
//! 解析器把每条完成的记录按值移交给 [`DocumentSink`]。`DocumentBuilder`
//! 是默认实现：它在内部暂存所有事件，只有在 `finish` 时才交出 `Document`，
//! 因此解析中途失败不会泄露半成品文档。

use serde::Serialize;
use thiserror::Error;
use zdxf_core::document::{Block, Document, Entity, Polyline, Section, Vertex};

/// 结构异常。接收端返回该错误表示事件已按既定策略处理（忽略或隐式结束作用域），
/// 解析可以继续。
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum StructureError {
    #[error("ENDSEC 没有对应的 SECTION，已忽略")]
    OrphanEndSection,
    #[error("ENDBLK 没有对应的 BLOCK，已忽略")]
    OrphanEndBlock,
    #[error("SEQEND 没有对应的 POLYLINE，已忽略")]
    OrphanSequenceEnd,
    #[error("VERTEX 不在任何 POLYLINE 内，已丢弃")]
    OrphanVertex,
    #[error("段落 {open} 尚未结束即开始段落 {next}，已隐式结束前者")]
    NestedSection { open: String, next: String },
    #[error("块 {open} 尚未结束即开始块 {next}，已隐式结束前者")]
    NestedBlock { open: String, next: String },
    #[error("段落 {name} 缺少 ENDSEC，已隐式结束")]
    UnterminatedSection { name: String },
    #[error("块 {name} 缺少 ENDBLK，已隐式结束")]
    UnterminatedBlock { name: String },
    #[error("POLYLINE 缺少 SEQEND，已隐式结束")]
    UnterminatedPolyline,
    #[error("{record} 出现在任何段落之外")]
    OutsideSection { record: &'static str },
}

/// 接收端事件的结果。一个事件可能同时隐式结束多个作用域，因此返回全部异常，
/// 顺序为由内到外。
pub type SinkResult = Result<(), Vec<StructureError>>;

fn outcome(anomalies: Vec<StructureError>) -> SinkResult {
    if anomalies.is_empty() {
        Ok(())
    } else {
        Err(anomalies)
    }
}

/// 解析器调用的事件接口。
pub trait DocumentSink {
    fn begin_section(&mut self, name: String) -> SinkResult;
    fn end_section(&mut self) -> SinkResult;
    fn begin_block(&mut self, block: Block) -> SinkResult;
    fn end_block(&mut self) -> SinkResult;
    fn add_entity(&mut self, entity: Entity) -> SinkResult;
    fn begin_polyline(&mut self, polyline: Polyline) -> SinkResult;
    /// 追加到最近开始的多段线。
    fn append_vertex(&mut self, vertex: Vertex) -> SinkResult;
    /// 结束最近开始的多段线。
    fn end_sequence(&mut self) -> SinkResult;
}

/// 组装 `Document` 的默认接收端。三种分组（段落、块、多段线）各自最多打开一层。
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    document: Document,
    section: Option<Section>,
    block: Option<Block>,
    polyline: Option<Polyline>,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 结束所有仍然打开的作用域并交出文档，同时返回因此产生的结构异常。
    pub fn finish(mut self) -> (Document, Vec<StructureError>) {
        let mut anomalies = Vec::new();
        self.close_polyline_into(&mut anomalies);
        if let Some(name) = self.close_block() {
            anomalies.push(StructureError::UnterminatedBlock { name });
        }
        if let Some(name) = self.close_section() {
            anomalies.push(StructureError::UnterminatedSection { name });
        }
        (self.document, anomalies)
    }

    #[inline]
    fn outside_section(&self) -> bool {
        self.section.is_none() && self.block.is_none()
    }

    fn place_entity(&mut self, entity: Entity) {
        if let Some(block) = self.block.as_mut() {
            block.entities.push(entity);
        } else if let Some(section) = self.section.as_mut() {
            section.entities.push(entity);
        } else {
            self.document.push_unsectioned_entity(entity);
        }
    }

    fn close_polyline(&mut self) -> bool {
        match self.polyline.take() {
            Some(polyline) => {
                self.place_entity(Entity::Polyline(polyline));
                true
            }
            None => false,
        }
    }

    /// 结束打开的多段线，并记录对应异常。
    fn close_polyline_into(&mut self, anomalies: &mut Vec<StructureError>) {
        if self.close_polyline() {
            anomalies.push(StructureError::UnterminatedPolyline);
        }
    }

    fn close_block(&mut self) -> Option<String> {
        let block = self.block.take()?;
        let name = block.name.clone();
        match self.section.as_mut() {
            Some(section) => section.blocks.push(block),
            None => self.document.push_unsectioned_block(block),
        }
        Some(name)
    }

    fn close_section(&mut self) -> Option<String> {
        let section = self.section.take()?;
        let name = section.name.clone();
        self.document.push_section(section);
        Some(name)
    }
}

impl DocumentSink for DocumentBuilder {
    fn begin_section(&mut self, name: String) -> SinkResult {
        let mut anomalies = Vec::new();
        self.close_polyline_into(&mut anomalies);
        if let Some(open) = self.close_block() {
            anomalies.push(StructureError::UnterminatedBlock { name: open });
        }
        if let Some(open) = self.close_section() {
            anomalies.push(StructureError::NestedSection {
                open,
                next: name.clone(),
            });
        }
        self.section = Some(Section::new(name));
        outcome(anomalies)
    }

    fn end_section(&mut self) -> SinkResult {
        if self.section.is_none() {
            return Err(vec![StructureError::OrphanEndSection]);
        }
        let mut anomalies = Vec::new();
        self.close_polyline_into(&mut anomalies);
        if let Some(name) = self.close_block() {
            anomalies.push(StructureError::UnterminatedBlock { name });
        }
        self.close_section();
        outcome(anomalies)
    }

    fn begin_block(&mut self, block: Block) -> SinkResult {
        let mut anomalies = Vec::new();
        self.close_polyline_into(&mut anomalies);
        if let Some(open) = self.close_block() {
            anomalies.push(StructureError::NestedBlock {
                open,
                next: block.name.clone(),
            });
        }
        if self.section.is_none() {
            anomalies.push(StructureError::OutsideSection { record: "BLOCK" });
        }
        self.block = Some(block);
        outcome(anomalies)
    }

    fn end_block(&mut self) -> SinkResult {
        if self.block.is_none() {
            return Err(vec![StructureError::OrphanEndBlock]);
        }
        let mut anomalies = Vec::new();
        self.close_polyline_into(&mut anomalies);
        self.close_block();
        outcome(anomalies)
    }

    fn add_entity(&mut self, entity: Entity) -> SinkResult {
        let mut anomalies = Vec::new();
        self.close_polyline_into(&mut anomalies);
        if self.outside_section() {
            anomalies.push(StructureError::OutsideSection {
                record: entity.kind_name(),
            });
        }
        self.place_entity(entity);
        outcome(anomalies)
    }

    fn begin_polyline(&mut self, polyline: Polyline) -> SinkResult {
        let mut anomalies = Vec::new();
        self.close_polyline_into(&mut anomalies);
        if self.outside_section() {
            anomalies.push(StructureError::OutsideSection { record: "POLYLINE" });
        }
        self.polyline = Some(polyline);
        outcome(anomalies)
    }

    fn append_vertex(&mut self, vertex: Vertex) -> SinkResult {
        match self.polyline.as_mut() {
            Some(polyline) => {
                polyline.vertices.push(vertex);
                Ok(())
            }
            None => Err(vec![StructureError::OrphanVertex]),
        }
    }

    fn end_sequence(&mut self) -> SinkResult {
        if self.close_polyline() {
            Ok(())
        } else {
            Err(vec![StructureError::OrphanSequenceEnd])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zdxf_core::document::{Line, Point};
    use zdxf_core::geometry::{Point2, Point3};

    fn point(layer: &str) -> Entity {
        Entity::Point(Point {
            layer: layer.to_string(),
            position: Point3::new(1.0, 2.0, 3.0),
        })
    }

    fn vertex(x: f64, y: f64) -> Vertex {
        Vertex {
            layer: "0".to_string(),
            position: Point2::new(x, y),
            flags: 0,
        }
    }

    #[test]
    fn entities_land_in_innermost_scope() {
        let mut builder = DocumentBuilder::new();
        builder.begin_section("BLOCKS".to_string()).unwrap();
        builder
            .begin_block(Block {
                name: "MARK".to_string(),
                ..Block::default()
            })
            .unwrap();
        builder.add_entity(point("IN_BLOCK")).unwrap();
        builder.end_block().unwrap();
        builder.end_section().unwrap();
        builder.begin_section("ENTITIES".to_string()).unwrap();
        builder.add_entity(point("TOP")).unwrap();
        builder.end_section().unwrap();

        let (doc, anomalies) = builder.finish();
        assert!(anomalies.is_empty());
        let block = doc.block("MARK").expect("缺少块 MARK");
        assert_eq!(block.entities.len(), 1);
        assert_eq!(block.entities[0].layer_name(), "IN_BLOCK");
        let entities = doc.section("ENTITIES").expect("缺少 ENTITIES 段");
        assert_eq!(entities.entities.len(), 1);
        assert_eq!(doc.entity_count(), 1);
    }

    #[test]
    fn polyline_collects_vertices_until_sequence_end() {
        let mut builder = DocumentBuilder::new();
        builder.begin_section("ENTITIES".to_string()).unwrap();
        builder
            .begin_polyline(Polyline {
                layer: "P".to_string(),
                flags: 1,
                vertices: Vec::new(),
            })
            .unwrap();
        builder.append_vertex(vertex(0.0, 0.0)).unwrap();
        builder.append_vertex(vertex(5.0, 0.0)).unwrap();
        builder.end_sequence().unwrap();
        builder.end_section().unwrap();

        let (doc, _) = builder.finish();
        match doc.entities().next() {
            Some(Entity::Polyline(polyline)) => {
                assert_eq!(polyline.flags, 1);
                let xs: Vec<f64> = polyline.vertices.iter().map(|v| v.position.x()).collect();
                assert_eq!(xs, vec![0.0, 5.0]);
            }
            other => panic!("期望多段线，实际为 {other:?}"),
        }
    }

    #[test]
    fn orphan_close_events_are_ignored() {
        let mut builder = DocumentBuilder::new();
        assert_eq!(
            builder.end_section(),
            Err(vec![StructureError::OrphanEndSection])
        );
        assert_eq!(builder.end_block(), Err(vec![StructureError::OrphanEndBlock]));
        assert_eq!(
            builder.end_sequence(),
            Err(vec![StructureError::OrphanSequenceEnd])
        );
        assert_eq!(
            builder.append_vertex(vertex(1.0, 1.0)),
            Err(vec![StructureError::OrphanVertex])
        );
        let (doc, anomalies) = builder.finish();
        assert!(doc.is_empty());
        assert!(anomalies.is_empty());
    }

    #[test]
    fn nested_section_closes_previous_one() {
        let mut builder = DocumentBuilder::new();
        builder.begin_section("HEADER".to_string()).unwrap();
        let err = builder.begin_section("ENTITIES".to_string()).unwrap_err();
        assert_eq!(
            err,
            vec![StructureError::NestedSection {
                open: "HEADER".to_string(),
                next: "ENTITIES".to_string(),
            }]
        );
        builder.end_section().unwrap();
        let (doc, _) = builder.finish();
        let names: Vec<&str> = doc.sections().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["HEADER", "ENTITIES"]);
    }

    #[test]
    fn entity_after_open_polyline_closes_it_first() {
        let mut builder = DocumentBuilder::new();
        builder.begin_section("ENTITIES".to_string()).unwrap();
        builder.begin_polyline(Polyline::default()).unwrap();
        builder.append_vertex(vertex(1.0, 1.0)).unwrap();
        let err = builder
            .add_entity(Entity::Line(Line::default()))
            .unwrap_err();
        assert_eq!(err, vec![StructureError::UnterminatedPolyline]);
        // 之后的顶点不再属于已结束的多段线
        assert_eq!(
            builder.append_vertex(vertex(2.0, 2.0)),
            Err(vec![StructureError::OrphanVertex])
        );

        let (doc, _) = builder.finish();
        let kinds: Vec<&str> = doc.entities().map(Entity::kind_name).collect();
        assert_eq!(kinds, vec!["POLYLINE", "LINE"]);
    }

    #[test]
    fn records_outside_sections_are_kept_and_reported() {
        let mut builder = DocumentBuilder::new();
        assert_eq!(
            builder.add_entity(point("LOOSE")),
            Err(vec![StructureError::OutsideSection { record: "POINT" }])
        );
        let (doc, _) = builder.finish();
        assert_eq!(doc.unsectioned_entities().len(), 1);
    }

    #[test]
    fn new_section_reports_every_scope_it_closes() {
        let mut builder = DocumentBuilder::new();
        builder.begin_section("A".to_string()).unwrap();
        builder.begin_polyline(Polyline::default()).unwrap();
        builder.append_vertex(vertex(1.0, 1.0)).unwrap();

        let err = builder.begin_section("B".to_string()).unwrap_err();
        assert_eq!(
            err,
            vec![
                StructureError::UnterminatedPolyline,
                StructureError::NestedSection {
                    open: "A".to_string(),
                    next: "B".to_string(),
                },
            ]
        );
        builder.end_section().unwrap();
        let (doc, anomalies) = builder.finish();
        assert!(anomalies.is_empty());
        let a = doc.section("A").expect("缺少段落 A");
        assert_eq!(a.entities.len(), 1);
    }

    #[test]
    fn nested_block_outside_sections_reports_both_anomalies() {
        let mut builder = DocumentBuilder::new();
        let block = |name: &str| Block {
            name: name.to_string(),
            ..Block::default()
        };
        assert_eq!(
            builder.begin_block(block("A")),
            Err(vec![StructureError::OutsideSection { record: "BLOCK" }])
        );
        assert_eq!(
            builder.begin_block(block("B")),
            Err(vec![
                StructureError::NestedBlock {
                    open: "A".to_string(),
                    next: "B".to_string(),
                },
                StructureError::OutsideSection { record: "BLOCK" },
            ])
        );
        builder.end_block().unwrap();

        let (doc, anomalies) = builder.finish();
        assert!(anomalies.is_empty());
        let names: Vec<&str> = doc.unsectioned_blocks().iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn finish_reports_open_scopes() {
        let mut builder = DocumentBuilder::new();
        builder.begin_section("BLOCKS".to_string()).unwrap();
        builder
            .begin_block(Block {
                name: "B".to_string(),
                ..Block::default()
            })
            .unwrap();
        builder.begin_polyline(Polyline::default()).unwrap();

        let (doc, anomalies) = builder.finish();
        assert_eq!(
            anomalies,
            vec![
                StructureError::UnterminatedPolyline,
                StructureError::UnterminatedBlock {
                    name: "B".to_string()
                },
                StructureError::UnterminatedSection {
                    name: "BLOCKS".to_string()
                },
            ]
        );
        assert_eq!(doc.block("B").map(|b| b.entities.len()), Some(1));
    }
}
