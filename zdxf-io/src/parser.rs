//! 记录分派循环。

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, trace};
use zdxf_core::document::{Document, Entity};

use crate::codes::COMMENT;
use crate::diagnostics::{DEFAULT_DIAGNOSTIC_LIMIT, DiagnosticKind, Diagnostics};
use crate::sink::{DocumentBuilder, DocumentSink};
use crate::tags::{TagError, TagSource};

/// 文件的显式结束标记。
pub const TERMINAL_KEYWORD: &str = "EOF";

/// 已支持的记录类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RecordKind {
    #[serde(rename = "SECTION")]
    Section,
    #[serde(rename = "ENDSEC")]
    EndSection,
    #[serde(rename = "BLOCK")]
    Block,
    #[serde(rename = "ENDBLK")]
    EndBlock,
    #[serde(rename = "INSERT")]
    Insert,
    #[serde(rename = "TEXT")]
    Text,
    #[serde(rename = "LINE")]
    Line,
    #[serde(rename = "POINT")]
    Point,
    #[serde(rename = "POLYLINE")]
    Polyline,
    #[serde(rename = "VERTEX")]
    Vertex,
    #[serde(rename = "SEQEND")]
    SequenceEnd,
}

impl RecordKind {
    /// 由记录关键字得到类型，大小写敏感。
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        let kind = match keyword {
            "SECTION" => RecordKind::Section,
            "ENDSEC" => RecordKind::EndSection,
            "BLOCK" => RecordKind::Block,
            "ENDBLK" => RecordKind::EndBlock,
            "INSERT" => RecordKind::Insert,
            "TEXT" => RecordKind::Text,
            "LINE" => RecordKind::Line,
            "POINT" => RecordKind::Point,
            "POLYLINE" => RecordKind::Polyline,
            "VERTEX" => RecordKind::Vertex,
            "SEQEND" => RecordKind::SequenceEnd,
            _ => return None,
        };
        Some(kind)
    }

    pub fn keyword(self) -> &'static str {
        match self {
            RecordKind::Section => "SECTION",
            RecordKind::EndSection => "ENDSEC",
            RecordKind::Block => "BLOCK",
            RecordKind::EndBlock => "ENDBLK",
            RecordKind::Insert => "INSERT",
            RecordKind::Text => "TEXT",
            RecordKind::Line => "LINE",
            RecordKind::Point => "POINT",
            RecordKind::Polyline => "POLYLINE",
            RecordKind::Vertex => "VERTEX",
            RecordKind::SequenceEnd => "SEQEND",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// 协作式取消标记，可跨线程克隆共享。
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// 解析选项。超时与取消只在记录边界检查。
#[derive(Debug, Clone)]
pub struct ParseOptions {
    pub timeout: Option<Duration>,
    pub cancel: Option<CancelToken>,
    pub max_diagnostics: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            cancel: None,
            max_diagnostics: DEFAULT_DIAGNOSTIC_LIMIT,
        }
    }
}

impl ParseOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_max_diagnostics(mut self, limit: usize) -> Self {
        self.max_diagnostics = limit;
        self
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error(transparent)]
    Tag(#[from] TagError),
    #[error("解析已取消（已处理 {records} 条记录）")]
    Cancelled { records: usize },
    #[error("解析超过时限 {limit:?}（已处理 {records} 条记录）")]
    TimedOut { limit: Duration, records: usize },
}

/// 解析结束的方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Termination {
    /// 读到了 `EOF` 记录。
    EndOfFile,
    /// 输入耗尽但没有 `EOF` 记录。
    EndOfInput,
}

#[derive(Debug)]
pub struct ParseReport {
    pub document: Document,
    pub diagnostics: Diagnostics,
    pub termination: Termination,
    /// 已识别并读取的记录数，不含被跳过的未知记录。
    pub records: usize,
}

/// DXF 记录分派器。各类记录的字段读取见 `records` 与 `grouping` 模块。
pub struct DxfParser<S> {
    pub(crate) source: S,
    pub(crate) diagnostics: Diagnostics,
    options: ParseOptions,
    records: usize,
}

impl<S: TagSource> DxfParser<S> {
    pub fn new(source: S) -> Self {
        Self::with_options(source, ParseOptions::default())
    }

    pub fn with_options(source: S, options: ParseOptions) -> Self {
        Self {
            source,
            diagnostics: Diagnostics::with_limit(options.max_diagnostics),
            options,
            records: 0,
        }
    }

    /// 解析完整输入并组装文档。只有分派循环正常结束时才会交出文档。
    pub fn parse(mut self) -> Result<ParseReport, ParseError> {
        let mut builder = DocumentBuilder::new();
        let termination = self.run(&mut builder)?;
        let (document, anomalies) = builder.finish();
        let line = self.source.line();
        for anomaly in anomalies {
            self.diagnostics
                .push(line, DiagnosticKind::Structure(anomaly));
        }
        info!(
            records = self.records,
            sections = document.sections().count(),
            diagnostics = self.diagnostics.len(),
            ?termination,
            "DXF 解析完成"
        );
        Ok(ParseReport {
            document,
            diagnostics: self.diagnostics,
            termination,
            records: self.records,
        })
    }

    /// 驱动分派循环，把事件交给任意接收端。
    pub fn run<K: DocumentSink>(&mut self, sink: &mut K) -> Result<Termination, ParseError> {
        let started = Instant::now();
        loop {
            self.check_interrupted(started)?;

            let Some(tag) = self.source.advance_any()? else {
                self.diagnostics
                    .push(self.source.line(), DiagnosticKind::MissingEof);
                return Ok(Termination::EndOfInput);
            };

            if !tag.is_record_start() {
                if tag.code == COMMENT {
                    trace!(line = self.source.line(), comment = %tag.value, "跳过注释");
                } else {
                    // 只报告第一对，其后直到下一个边界的组码一并丢弃
                    self.diagnostics.push(
                        self.source.line(),
                        DiagnosticKind::UnexpectedCode {
                            code: tag.code,
                            value: tag.value,
                        },
                    );
                    let skipped = self.source.skip_to_next_record()?;
                    if skipped > 0 {
                        debug!(skipped, "丢弃记录边界前的多余组码");
                    }
                }
                continue;
            }

            if tag.value == TERMINAL_KEYWORD {
                debug!(line = self.source.line(), "遇到 EOF 标记");
                return Ok(Termination::EndOfFile);
            }

            match RecordKind::from_keyword(&tag.value) {
                Some(kind) => {
                    self.records += 1;
                    self.read_record(kind, sink)?;
                }
                None => {
                    self.diagnostics.push(
                        self.source.line(),
                        DiagnosticKind::UnknownRecord { keyword: tag.value },
                    );
                    self.source.skip_to_next_record()?;
                }
            }
        }
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }

    fn check_interrupted(&self, started: Instant) -> Result<(), ParseError> {
        if self
            .options
            .cancel
            .as_ref()
            .is_some_and(CancelToken::is_cancelled)
        {
            return Err(ParseError::Cancelled {
                records: self.records,
            });
        }
        if let Some(limit) = self.options.timeout {
            if started.elapsed() >= limit {
                return Err(ParseError::TimedOut {
                    limit,
                    records: self.records,
                });
            }
        }
        Ok(())
    }

    fn read_record<K: DocumentSink>(
        &mut self,
        kind: RecordKind,
        sink: &mut K,
    ) -> Result<(), TagError> {
        let line = self.source.line();
        let outcome = match kind {
            RecordKind::Section => {
                let name = self.read_section()?;
                sink.begin_section(name)
            }
            RecordKind::EndSection => {
                self.source.skip_to_next_record()?;
                sink.end_section()
            }
            RecordKind::Block => {
                let block = self.read_block()?;
                sink.begin_block(block)
            }
            RecordKind::EndBlock => {
                self.source.skip_to_next_record()?;
                sink.end_block()
            }
            RecordKind::Insert => sink.add_entity(Entity::Insert(self.read_insert()?)),
            RecordKind::Text => sink.add_entity(Entity::Text(self.read_text()?)),
            RecordKind::Line => sink.add_entity(Entity::Line(self.read_line()?)),
            RecordKind::Point => sink.add_entity(Entity::Point(self.read_point()?)),
            RecordKind::Polyline => {
                let polyline = self.read_polyline()?;
                sink.begin_polyline(polyline)
            }
            RecordKind::Vertex => {
                let vertex = self.read_vertex()?;
                sink.append_vertex(vertex)
            }
            RecordKind::SequenceEnd => {
                self.source.skip_to_next_record()?;
                sink.end_sequence()
            }
        };
        if let Err(anomalies) = outcome {
            for anomaly in anomalies {
                self.diagnostics
                    .push(line, DiagnosticKind::Structure(anomaly));
            }
        }
        Ok(())
    }
}
