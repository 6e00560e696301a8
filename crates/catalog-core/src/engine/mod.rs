// catalog-core/src/engine/mod.rs
//! 索引引擎接口
//!
//! [`IndexBackend`] 描述网关依赖的全部引擎能力：带结果窗口上限的查询、
//! 滚动游标、批量写入、部分更新、删除、计数和词项聚合。
//! [`TantivyEngine`] 是基于 tantivy 的实现。

mod embedded;
mod scroll;

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::query::{QuerySpec, SortField};
use crate::schema::{DocId, Document, DocumentPatch, IndexField};

pub use embedded::{EngineConfig, Storage, TantivyEngine};
pub use scroll::ScrollRegistry;

/// 滚动游标 ID
pub type ScrollId = Uuid;

/// 引擎错误
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("index does not exist")]
    IndexMissing,

    #[error("result window is too large: requested {requested}, max_result_window is {window}")]
    ResultWindowTooLarge { requested: usize, window: usize },

    #[error("scroll context {0} expired or does not exist")]
    ScrollExpired(ScrollId),

    #[error("timed out after {0:?} waiting for the index writer")]
    Timeout(Duration),

    #[error("field {0:?} cannot be used here")]
    UnsupportedField(IndexField),

    #[error("aggregation failed: {0}")]
    Aggregation(String),

    #[error(transparent)]
    Tantivy(#[from] tantivy::TantivyError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// 查询请求
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: QuerySpec,
    /// 为空时按相关度降序
    pub sort: Vec<SortField>,
    /// 本页条数，不能超过结果窗口
    pub size: usize,
    /// 需要滚动游标时给出存活时间
    pub scroll: Option<Duration>,
}

/// 单条命中
#[derive(Debug, Clone)]
pub struct Hit {
    pub id: DocId,
    pub score: f32,
    pub source: Document,
}

/// 查询响应
#[derive(Debug, Clone, Default)]
pub struct SearchResponse {
    pub hits: Vec<Hit>,
    /// 匹配总数
    pub total: u64,
    /// 本页最高分，无命中时为 None
    pub max_score: Option<f32>,
    pub scroll_id: Option<ScrollId>,
}

/// 批量写入中单条的结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkStatus {
    Created,
    Updated,
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkItem {
    pub id: DocId,
    pub status: BulkStatus,
}

/// 批量写入响应
#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkResponse {
    pub took: Duration,
    pub items: Vec<BulkItem>,
}

impl BulkResponse {
    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|item| matches!(item.status, BulkStatus::Failed(_)))
    }
}

/// 部分更新结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    /// 补丁没有改变任何字段
    Noop,
    NotFound,
}

/// 删除结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// 词项聚合桶
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermBucket {
    pub key: String,
    pub doc_count: u64,
}

/// 索引引擎
pub trait IndexBackend: Send + Sync {
    fn index_exists(&self) -> bool;

    /// 创建索引，已存在时返回 false
    fn create_index(&self) -> Result<bool, EngineError>;

    /// 删除索引，不存在时返回 false
    fn delete_index(&self) -> Result<bool, EngineError>;

    fn search(&self, request: &SearchRequest) -> Result<SearchResponse, EngineError>;

    /// 取下一页，同时把游标存活时间续到 `ttl`
    fn scroll(&self, scroll_id: ScrollId, ttl: Duration) -> Result<SearchResponse, EngineError>;

    fn clear_scroll(&self, scroll_id: ScrollId) -> bool;

    /// 按 ID 写入（存在则覆盖），一批一次提交
    fn bulk(&self, documents: &[(DocId, Document)], timeout: Duration) -> Result<BulkResponse, EngineError>;

    fn update(&self, id: DocId, patch: &DocumentPatch) -> Result<UpdateOutcome, EngineError>;

    fn delete(&self, id: DocId) -> Result<DeleteOutcome, EngineError>;

    fn count(&self) -> Result<u64, EngineError>;

    /// 按文档数降序返回字段的不同取值
    fn terms(&self, field: IndexField, size: usize) -> Result<Vec<TermBucket>, EngineError>;
}
