pub mod codes;
pub mod diagnostics;
mod grouping;
pub mod parser;
mod records;
pub mod sink;
pub mod tags;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;
use zdxf_core::document::Document;

pub use diagnostics::{Diagnostic, DiagnosticCategory, DiagnosticKind, Diagnostics, Severity};
pub use parser::{
    CancelToken, DxfParser, ParseError, ParseOptions, ParseReport, RecordKind, Termination,
};
pub use sink::{DocumentBuilder, DocumentSink, SinkResult, StructureError};
pub use tags::{FieldValue, LineTagSource, Tag, TagBuffer, TagError, TagSource};

#[derive(Debug, Error)]
pub enum IoError {
    #[error("无法打开文件 {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

pub trait DocumentLoader {
    fn load(&self, path: &Path) -> Result<Document, IoError>;
}

/// 从文件加载 ASCII DXF 文档。
#[derive(Debug, Clone, Default)]
pub struct DxfFacade {
    options: ParseOptions,
}

impl DxfFacade {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ParseOptions) -> Self {
        Self { options }
    }

    /// 与 `load` 相同，但同时返回诊断与结束方式。
    pub fn load_report(&self, path: &Path) -> Result<ParseReport, IoError> {
        let file = File::open(path).map_err(|source| IoError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "开始解析 DXF");
        parse_reader(BufReader::new(file), &self.options).map_err(|source| IoError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl DocumentLoader for DxfFacade {
    fn load(&self, path: &Path) -> Result<Document, IoError> {
        self.load_report(path).map(|report| report.document)
    }
}

/// 解析任意按行读取的输入。
pub fn parse_reader<R: BufRead>(reader: R, options: &ParseOptions) -> Result<ParseReport, ParseError> {
    DxfParser::with_options(LineTagSource::new(reader), options.clone()).parse()
}

pub fn parse_str(text: &str, options: &ParseOptions) -> Result<ParseReport, ParseError> {
    parse_reader(text.as_bytes(), options)
}
