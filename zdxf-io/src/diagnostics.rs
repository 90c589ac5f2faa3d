//! 解析过程中的非致命问题。
//!
//! 未知记录、未处理字段、结构异常等情况不会中断解析，而是以 [`Diagnostic`]
//! 收集起来，同时通过 `tracing` 输出。调用方可以在解析结束后检查、统计或忽略它们。

use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use crate::parser::RecordKind;
use crate::sink::StructureError;
use crate::tags::FieldValue;

pub const DEFAULT_DIAGNOSTIC_LIMIT: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    /// 文件中常见的不支持内容，不影响已支持记录。
    Notice,
    /// 文件结构存在问题，解析结果可能与作者意图不符。
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCategory {
    UnknownRecord,
    UnhandledField,
    UnexpectedCode,
    MissingEof,
    Structure,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DiagnosticKind {
    UnknownRecord {
        keyword: String,
    },
    UnhandledField {
        record: RecordKind,
        code: i32,
        value: FieldValue,
    },
    UnexpectedCode {
        code: i32,
        value: String,
    },
    MissingEof,
    Structure(StructureError),
}

impl DiagnosticKind {
    pub fn category(&self) -> DiagnosticCategory {
        match self {
            DiagnosticKind::UnknownRecord { .. } => DiagnosticCategory::UnknownRecord,
            DiagnosticKind::UnhandledField { .. } => DiagnosticCategory::UnhandledField,
            DiagnosticKind::UnexpectedCode { .. } => DiagnosticCategory::UnexpectedCode,
            DiagnosticKind::MissingEof => DiagnosticCategory::MissingEof,
            DiagnosticKind::Structure(_) => DiagnosticCategory::Structure,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            DiagnosticKind::UnknownRecord { .. } | DiagnosticKind::UnhandledField { .. } => {
                Severity::Notice
            }
            DiagnosticKind::UnexpectedCode { .. }
            | DiagnosticKind::MissingEof
            | DiagnosticKind::Structure(_) => Severity::Warning,
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::UnknownRecord { keyword } => {
                write!(f, "未知记录类型 {keyword}，已跳过")
            }
            DiagnosticKind::UnhandledField {
                record,
                code,
                value,
            } => write!(f, "{record} 记录中未处理的组码 {code}，值 {value}"),
            DiagnosticKind::UnexpectedCode { code, value } => write!(
                f,
                "记录边界处出现组码 {code}（值 \"{value}\"），期望组码 0"
            ),
            DiagnosticKind::MissingEof => write!(f, "输入结束前未遇到 EOF 标记"),
            DiagnosticKind::Structure(err) => write!(f, "{err}"),
        }
    }
}

/// 单条诊断，`line` 为触发诊断的组码/值对位置。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub line: usize,
    pub kind: DiagnosticKind,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "第 {} 行: {}", self.line, self.kind)
    }
}

/// 诊断集合。超过上限的诊断只计数，不再保存。
#[derive(Debug, Clone)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
    limit: usize,
    suppressed: usize,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::with_limit(DEFAULT_DIAGNOSTIC_LIMIT)
    }
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            items: Vec::new(),
            limit,
            suppressed: 0,
        }
    }

    pub fn push(&mut self, line: usize, kind: DiagnosticKind) {
        match kind.severity() {
            Severity::Warning => warn!(line, "{kind}"),
            Severity::Notice => debug!(line, "{kind}"),
        }
        if self.items.len() < self.limit {
            self.items.push(Diagnostic { line, kind });
        } else {
            self.suppressed += 1;
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }

    /// 已保存的诊断数量，不含被上限截断的部分。
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 产生过的诊断总数，包括超出上限未保存的部分。
    pub fn total(&self) -> usize {
        self.items.len() + self.suppressed
    }

    /// 因超出上限而未保存的诊断数量。
    pub fn suppressed(&self) -> usize {
        self.suppressed
    }

    pub fn of_category(&self, category: DiagnosticCategory) -> Vec<&Diagnostic> {
        self.items
            .iter()
            .filter(|d| d.kind.category() == category)
            .collect()
    }

    pub fn has_category(&self, category: DiagnosticCategory) -> bool {
        self.items.iter().any(|d| d.kind.category() == category)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items
            .iter()
            .filter(|d| d.kind.severity() == Severity::Warning)
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unknown(keyword: &str) -> DiagnosticKind {
        DiagnosticKind::UnknownRecord {
            keyword: keyword.to_string(),
        }
    }

    #[test]
    fn collects_and_filters_by_category() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(3, unknown("CIRCLE"));
        diagnostics.push(9, DiagnosticKind::MissingEof);
        diagnostics.push(
            12,
            DiagnosticKind::Structure(StructureError::OrphanSequenceEnd),
        );

        assert_eq!(diagnostics.len(), 3);
        assert!(diagnostics.has_category(DiagnosticCategory::MissingEof));
        assert!(!diagnostics.has_category(DiagnosticCategory::UnhandledField));
        let unknown = diagnostics.of_category(DiagnosticCategory::UnknownRecord);
        assert_eq!(unknown.len(), 1);
        assert_eq!(unknown[0].line, 3);
        assert_eq!(diagnostics.warnings().count(), 2);
    }

    #[test]
    fn limit_counts_suppressed_entries() {
        let mut diagnostics = Diagnostics::with_limit(2);
        for keyword in ["ARC", "CIRCLE", "HATCH", "SPLINE"] {
            diagnostics.push(1, unknown(keyword));
        }
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics.suppressed(), 2);
        assert_eq!(diagnostics.total(), 4);
        assert!(!diagnostics.is_empty());
    }

    #[test]
    fn zero_limit_keeps_len_and_is_empty_in_step() {
        let mut diagnostics = Diagnostics::with_limit(0);
        diagnostics.push(7, unknown("ARC"));
        assert_eq!(diagnostics.len(), 0);
        assert!(diagnostics.is_empty());
        assert_eq!(diagnostics.suppressed(), 1);
        assert_eq!(diagnostics.total(), 1);
    }

    #[test]
    fn display_includes_line_and_field_details() {
        let diagnostic = Diagnostic {
            line: 42,
            kind: DiagnosticKind::UnhandledField {
                record: RecordKind::Line,
                code: 62,
                value: FieldValue::Integer(1),
            },
        };
        let text = diagnostic.to_string();
        assert!(text.contains("42"));
        assert!(text.contains("LINE"));
        assert!(text.contains("62"));
    }
}
