use std::fs;
use std::path::Path;

use eqdraw_core::document::Document;
use thiserror::Error;
use tracing::debug;

mod reader;
mod writer;

use reader::{DxfError, DxfParser};
pub use writer::{DEFAULT_PRECISION, DxfWriter, SerializationError};

#[derive(Debug, Error)]
pub enum IoError {
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),
    #[error("failed to read file {path:?}: {source}")]
    ReadError {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write file {path:?}: {source}")]
    WriteError {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid document structure: {0}")]
    InvalidDocument(String),
    #[error("failed to serialize document: {0}")]
    Serialization(#[from] SerializationError),
}

impl From<DxfError> for IoError {
    fn from(err: DxfError) -> Self {
        match err {
            DxfError::Unsupported { feature } => IoError::UnsupportedFeature(feature),
            DxfError::Invalid { message } => IoError::InvalidDocument(message),
        }
    }
}

pub trait DocumentLoader {
    fn load(&self, path: &Path) -> Result<Document, IoError>;
}

pub trait DocumentSaver {
    fn save(&self, document: &Document, path: &Path) -> Result<(), IoError>;
}

/// DXF 读写入口：写出器负责序列化，解析器用于回读校验与检视。
#[derive(Debug, Clone, Copy, Default)]
pub struct DxfFacade {
    writer: DxfWriter,
}

impl DxfFacade {
    pub fn new() -> Self {
        Self {
            writer: DxfWriter::new(),
        }
    }

    pub fn with_precision(precision: usize) -> Self {
        Self {
            writer: DxfWriter::with_precision(precision),
        }
    }

    /// 将文档序列化为 DXF 文本。
    pub fn to_dxf_string(&self, document: &Document) -> Result<String, SerializationError> {
        self.writer.write_to_string(document)
    }

    /// 从内存中的 DXF 文本解析文档。
    pub fn parse_str(&self, data: &str) -> Result<Document, IoError> {
        Ok(DxfParser::new(data).parse()?)
    }
}

impl DocumentLoader for DxfFacade {
    fn load(&self, path: &Path) -> Result<Document, IoError> {
        let data = fs::read_to_string(path).map_err(|source| IoError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let document = self.parse_str(&data)?;
        debug!(path = %path.display(), entities = document.entity_count(), "DXF 已读取");
        Ok(document)
    }
}

impl DocumentSaver for DxfFacade {
    fn save(&self, document: &Document, path: &Path) -> Result<(), IoError> {
        // 先完整序列化，失败时不会留下残缺文件
        let data = self.to_dxf_string(document)?;
        fs::write(path, &data).map_err(|source| IoError::WriteError {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), bytes = data.len(), "DXF 已写入");
        Ok(())
    }
}
