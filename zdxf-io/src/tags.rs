//! 组码/值对的来源。
//!
//! 解析器只通过 [`TagSource`] 读取数据：`advance_any` 用于寻找下一个记录边界，
//! `advance_if_non_zero` 用于读取记录内部字段，并在遇到组码 0 时停下而不消费，
//! 把边界留给分派循环。

use std::collections::VecDeque;
use std::fmt;
use std::io::BufRead;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

use crate::codes::{ValueKind, value_kind};

/// 一个组码/值对。`value` 已去除行尾空白。
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub code: i32,
    pub value: String,
}

impl Tag {
    pub fn new(code: i32, value: impl Into<String>) -> Self {
        Self {
            code,
            value: value.into(),
        }
    }

    #[inline]
    pub fn is_record_start(&self) -> bool {
        self.code == 0
    }

    /// 宽松解析浮点字段，非数值文本按 0.0 处理。
    pub fn float(&self) -> f64 {
        self.value.trim().parse::<f64>().unwrap_or_else(|_| {
            trace!(code = self.code, value = %self.value, "浮点字段无法解析，按 0.0 处理");
            0.0
        })
    }

    /// 宽松解析整数字段，非数值文本按 0 处理。
    pub fn integer(&self) -> i32 {
        self.value.trim().parse::<i32>().unwrap_or_else(|_| {
            trace!(code = self.code, value = %self.value, "整数字段无法解析，按 0 处理");
            0
        })
    }

    /// 按组码区间给出带类型的值；数值字段解析失败时保留原始文本。
    pub fn typed(&self) -> FieldValue {
        let trimmed = self.value.trim();
        match value_kind(self.code) {
            ValueKind::Integer => trimmed
                .parse::<i64>()
                .map(FieldValue::Integer)
                .unwrap_or_else(|_| FieldValue::Text(self.value.clone())),
            ValueKind::Float => trimmed
                .parse::<f64>()
                .map(FieldValue::Float)
                .unwrap_or_else(|_| FieldValue::Text(self.value.clone())),
            ValueKind::Text => FieldValue::Text(self.value.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(value) => write!(f, "{value}"),
            FieldValue::Float(value) => write!(f, "{value}"),
            FieldValue::Text(value) => write!(f, "\"{value}\""),
        }
    }
}

#[derive(Debug, Error)]
pub enum TagError {
    #[error("读取第 {line} 行失败: {source}")]
    Io {
        line: usize,
        #[source]
        source: std::io::Error,
    },
    #[error("第 {line} 行的组码 \"{text}\" 无法解析为整数")]
    InvalidCode { line: usize, text: String },
    #[error("文件在第 {line} 行结束，组码 {code} 缺少对应的值行")]
    MissingValue { line: usize, code: i32 },
}

/// 解析器消费的组码流。
pub trait TagSource {
    /// 消费并返回下一对，流结束时返回 `None`。
    fn advance_any(&mut self) -> Result<Option<Tag>, TagError>;

    /// 仅当下一对的组码不为 0 时消费并返回；遇到记录边界或流结束时返回 `None`，
    /// 且不消费任何数据。
    fn advance_if_non_zero(&mut self) -> Result<Option<Tag>, TagError>;

    /// 最近一次消费的组码/值对所在位置，用于诊断信息。
    fn line(&self) -> usize;

    /// 丢弃当前记录剩余的字段，返回丢弃的对数。
    fn skip_to_next_record(&mut self) -> Result<usize, TagError> {
        let mut skipped = 0;
        while self.advance_if_non_zero()?.is_some() {
            skipped += 1;
        }
        Ok(skipped)
    }
}

impl<T: TagSource + ?Sized> TagSource for &mut T {
    fn advance_any(&mut self) -> Result<Option<Tag>, TagError> {
        (**self).advance_any()
    }

    fn advance_if_non_zero(&mut self) -> Result<Option<Tag>, TagError> {
        (**self).advance_if_non_zero()
    }

    fn line(&self) -> usize {
        (**self).line()
    }
}

/// 基于文本行的组码流：组码行与值行交替出现。
pub struct LineTagSource<R> {
    reader: R,
    buffer: Vec<u8>,
    line_number: usize,
    current: usize,
    peeked: Option<(Tag, usize)>,
}

impl<R: BufRead> LineTagSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::new(),
            line_number: 0,
            current: 0,
            peeked: None,
        }
    }

    fn read_line(&mut self) -> Result<Option<String>, TagError> {
        self.buffer.clear();
        let read = self
            .reader
            .read_until(b'\n', &mut self.buffer)
            .map_err(|source| TagError::Io {
                line: self.line_number + 1,
                source,
            })?;
        if read == 0 {
            return Ok(None);
        }
        self.line_number += 1;
        let text = String::from_utf8_lossy(&self.buffer);
        Ok(Some(text.trim_end_matches(['\n', '\r']).to_string()))
    }

    /// 消费其后的空白行，若直到输入结束都只有空白行则返回真。
    fn only_blank_lines_remain(&mut self) -> Result<bool, TagError> {
        while let Some(line) = self.read_line()? {
            if !line.trim().is_empty() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// 读取下一对及其组码行号。
    fn read_pair(&mut self) -> Result<Option<(Tag, usize)>, TagError> {
        let code_line = match self.read_line()? {
            Some(line) => line,
            None => return Ok(None),
        };
        let code_line_number = self.line_number;
        let code_text = code_line.trim();
        if code_text.is_empty() && self.only_blank_lines_remain()? {
            // 文件末尾的空行
            return Ok(None);
        }
        let code = code_text
            .parse::<i32>()
            .map_err(|_| TagError::InvalidCode {
                line: code_line_number,
                text: code_text.to_string(),
            })?;

        let value_line = self.read_line()?.ok_or(TagError::MissingValue {
            line: code_line_number,
            code,
        })?;
        let value = value_line.trim_end().to_string();
        Ok(Some((Tag { code, value }, code_line_number)))
    }

    fn peek(&mut self) -> Result<Option<&Tag>, TagError> {
        if self.peeked.is_none() {
            self.peeked = self.read_pair()?;
        }
        Ok(self.peeked.as_ref().map(|(tag, _)| tag))
    }
}

impl<R: BufRead> TagSource for LineTagSource<R> {
    fn advance_any(&mut self) -> Result<Option<Tag>, TagError> {
        let next = match self.peeked.take() {
            Some(pair) => Some(pair),
            None => self.read_pair()?,
        };
        Ok(next.map(|(tag, line)| {
            self.current = line;
            tag
        }))
    }

    fn advance_if_non_zero(&mut self) -> Result<Option<Tag>, TagError> {
        let has_field = self.peek()?.is_some_and(|tag| !tag.is_record_start());
        if has_field {
            self.advance_any()
        } else {
            Ok(None)
        }
    }

    fn line(&self) -> usize {
        self.current
    }
}

/// 内存中的组码流，位置为已消费对的序号（从 1 开始）。
#[derive(Debug, Default, Clone)]
pub struct TagBuffer {
    tags: VecDeque<Tag>,
    consumed: usize,
}

impl TagBuffer {
    pub fn new(tags: impl IntoIterator<Item = Tag>) -> Self {
        Self {
            tags: tags.into_iter().collect(),
            consumed: 0,
        }
    }

    /// 尚未消费的对数。
    pub fn remaining(&self) -> usize {
        self.tags.len()
    }
}

impl<S: Into<String>> FromIterator<(i32, S)> for TagBuffer {
    fn from_iter<I: IntoIterator<Item = (i32, S)>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|(code, value)| Tag::new(code, value)))
    }
}

impl<S: Into<String>> From<Vec<(i32, S)>> for TagBuffer {
    fn from(pairs: Vec<(i32, S)>) -> Self {
        pairs.into_iter().collect()
    }
}

impl TagSource for TagBuffer {
    fn advance_any(&mut self) -> Result<Option<Tag>, TagError> {
        let tag = self.tags.pop_front();
        if tag.is_some() {
            self.consumed += 1;
        }
        Ok(tag)
    }

    fn advance_if_non_zero(&mut self) -> Result<Option<Tag>, TagError> {
        if self.tags.front().is_some_and(|tag| !tag.is_record_start()) {
            self.advance_any()
        } else {
            Ok(None)
        }
    }

    fn line(&self) -> usize {
        self.consumed
    }
}
