//! INSERT、TEXT、LINE、POINT 的字段读取。
//!
//! 每个读取函数从零值记录开始，逐个消费非 0 组码，直到下一个记录边界。
//! 未识别的组码记录为诊断后继续，不会中断当前记录。

use zdxf_core::document::{Insert, Line, Point, Text};

use crate::diagnostics::DiagnosticKind;
use crate::parser::{DxfParser, RecordKind};
use crate::tags::{Tag, TagError, TagSource};

impl<S: TagSource> DxfParser<S> {
    pub(crate) fn read_insert(&mut self) -> Result<Insert, TagError> {
        let mut insert = Insert::default();
        while let Some(tag) = self.source.advance_if_non_zero()? {
            match tag.code {
                2 => insert.block_name = tag.value,
                8 => insert.layer = tag.value,
                10 => insert.insert.0.x = tag.float(),
                20 => insert.insert.0.y = tag.float(),
                30 => insert.insert.0.z = tag.float(),
                _ => self.unhandled(RecordKind::Insert, tag),
            }
        }
        Ok(insert)
    }

    pub(crate) fn read_text(&mut self) -> Result<Text, TagError> {
        let mut text = Text::default();
        while let Some(tag) = self.source.advance_if_non_zero()? {
            match tag.code {
                1 => text.content = tag.value,
                7 => {} // 文字样式名，不保留
                8 => text.layer = tag.value,
                10 => text.position.0.x = tag.float(),
                20 => text.position.0.y = tag.float(),
                30 => text.position.0.z = tag.float(),
                40 => text.height = tag.float(),
                50 => text.rotation = tag.float(),
                _ => self.unhandled(RecordKind::Text, tag),
            }
        }
        Ok(text)
    }

    pub(crate) fn read_line(&mut self) -> Result<Line, TagError> {
        let mut line = Line::default();
        while let Some(tag) = self.source.advance_if_non_zero()? {
            match tag.code {
                8 => line.layer = tag.value,
                10 => line.start.0.x = tag.float(),
                20 => line.start.0.y = tag.float(),
                30 => line.start.0.z = tag.float(),
                11 => line.end.0.x = tag.float(),
                21 => line.end.0.y = tag.float(),
                31 => line.end.0.z = tag.float(),
                _ => self.unhandled(RecordKind::Line, tag),
            }
        }
        Ok(line)
    }

    pub(crate) fn read_point(&mut self) -> Result<Point, TagError> {
        let mut point = Point::default();
        while let Some(tag) = self.source.advance_if_non_zero()? {
            match tag.code {
                8 => point.layer = tag.value,
                10 => point.position.0.x = tag.float(),
                20 => point.position.0.y = tag.float(),
                30 => point.position.0.z = tag.float(),
                // 厚度/宽度/角度：识别但不保存
                38 | 39 | 50 => {}
                _ => self.unhandled(RecordKind::Point, tag),
            }
        }
        Ok(point)
    }

    pub(crate) fn unhandled(&mut self, record: RecordKind, tag: Tag) {
        let value = tag.typed();
        self.diagnostics.push(
            self.source.line(),
            DiagnosticKind::UnhandledField {
                record,
                code: tag.code,
                value,
            },
        );
    }
}
