//! 分组记录：SECTION、BLOCK、POLYLINE/VERTEX。
//!
//! 这里只负责读取起始记录的字段；作用域的打开与关闭由 `DocumentSink` 处理。

use tracing::trace;
use zdxf_core::document::{Block, Polyline, Vertex};

use crate::parser::{DxfParser, RecordKind};
use crate::tags::{TagError, TagSource};

impl<S: TagSource> DxfParser<S> {
    /// 返回段落名（组码 2，重复时以最后一次为准）。
    pub(crate) fn read_section(&mut self) -> Result<String, TagError> {
        let mut name = String::new();
        while let Some(tag) = self.source.advance_if_non_zero()? {
            if tag.code == 2 {
                name = tag.value;
            } else {
                trace!(code = tag.code, "SECTION 忽略字段");
            }
        }
        Ok(name)
    }

    pub(crate) fn read_block(&mut self) -> Result<Block, TagError> {
        let mut block = Block::default();
        while let Some(tag) = self.source.advance_if_non_zero()? {
            match tag.code {
                8 => block.layer = tag.value,
                2 => block.name = tag.value,
                // 1 匿名块，2 含属性定义，4 外部参照，8 参照覆盖，16 外部依赖
                70 => block.flags = tag.integer(),
                10 => block.base_point.0.x = tag.float(),
                20 => block.base_point.0.y = tag.float(),
                30 => block.base_point.0.z = tag.float(),
                _ => trace!(code = tag.code, "BLOCK 忽略字段"),
            }
        }
        Ok(block)
    }

    pub(crate) fn read_polyline(&mut self) -> Result<Polyline, TagError> {
        let mut polyline = Polyline::default();
        while let Some(tag) = self.source.advance_if_non_zero()? {
            match tag.code {
                // 顶点跟随标志，对 POLYLINE 恒为真
                66 => {}
                8 => polyline.layer = tag.value,
                70 => polyline.flags = tag.integer(),
                _ => self.unhandled(RecordKind::Polyline, tag),
            }
        }
        Ok(polyline)
    }

    /// 顶点只取 XY；其余组码（包括 Z）静默丢弃，不产生诊断。
    pub(crate) fn read_vertex(&mut self) -> Result<Vertex, TagError> {
        let mut vertex = Vertex::default();
        while let Some(tag) = self.source.advance_if_non_zero()? {
            match tag.code {
                8 => vertex.layer = tag.value,
                10 => vertex.position.0.x = tag.float(),
                20 => vertex.position.0.y = tag.float(),
                70 => vertex.flags = tag.integer(),
                _ => {}
            }
        }
        Ok(vertex)
    }
}
