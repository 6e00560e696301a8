// catalog-core/src/lib.rs
//! 图书目录核心库
//!
//! 提供基于 Tantivy 的图书目录：
//! - 多格式文本提取（txt/epub/pdf/docx/rtf/html）
//! - 按目录约定推导图书元数据
//! - 加权多字段查询、分数归一化与滚动分页
//! - 文件与索引同步的增删改

pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod gateway;
pub mod loader;
pub mod query;
pub mod schema;
pub mod service;
pub mod stats;

// 重导出核心类型
pub use config::{CatalogConfig, IndexConfig, LibraryConfig, QueryConfig};
pub use engine::{EngineConfig, EngineError, IndexBackend, Storage, TantivyEngine};
pub use error::{CatalogError, ConfigError};
pub use extract::{Extraction, Format, TextExtractor, extract};
pub use gateway::{Acknowledged, GatewaySettings, IndexGateway, InsertReport, SearchResult, SimilarQuery};
pub use loader::{LimitPolicy, LoadedBatch, Loader};
pub use query::{BoolQuery, QuerySpec, SortField, SortOrder};
pub use schema::{DocId, Document, DocumentPatch, IndexField};
pub use service::{Book, BookFile, BookUpdate, CatalogService, EncodingChange, LoadSummary};
pub use stats::{ExtractStat, FormatTally, LoadReport};
