// catalog-core/src/error.rs
//! 错误类型

use std::path::PathBuf;

use thiserror::Error;

use crate::engine::EngineError;
use crate::schema::DocId;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("配置文件格式错误: {0}")]
    Parse(#[from] toml::de::Error),
}

/// 图书目录操作错误，`Display` 即对外展示的错误信息
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("book {0} not found")]
    NotFound(DocId),

    #[error("unsupported file: {}", .0.display())]
    Unsupported(PathBuf),

    #[error("file operation on {} failed: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("index rejected {operation} of book {id}")]
    IndexMutation { operation: &'static str, id: DocId },

    #[error("requested path {requested} does not match book {id}")]
    PathMismatch { id: DocId, requested: String },

    /// 分类、作者、书名或类型不能作为单个路径分量
    #[error("invalid {field}: {value:?}")]
    InvalidField { field: &'static str, value: String },

    #[error("No books found in '{0}'")]
    CategoryNotFound(String),

    #[error("No books found")]
    NoResults,

    #[error("No similar books found")]
    NoSimilarBooks,

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl CatalogError {
    pub(crate) fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }
}
