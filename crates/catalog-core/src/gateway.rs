// catalog-core/src/gateway.rs
//! 索引网关
//!
//! 拥有索引引擎，负责构建加权查询、分数归一化、滚动分页以及写操作。
//! 查询出错时记录日志并返回空列表；写操作返回 `Result`。

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

use crate::config::{IndexConfig, QueryConfig};
use crate::engine::{
    BulkStatus, DeleteOutcome, EngineError, Hit, IndexBackend, ScrollId, SearchRequest, TantivyEngine, UpdateOutcome,
};
use crate::query::{BoolQuery, QuerySpec, SortField};
use crate::schema::{DocId, Document, DocumentPatch, IndexField};

/// 分类聚合最多返回的分类数
const CATEGORY_AGGREGATION_SIZE: usize = 100;

/// 网关参数
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub max_result_window: usize,
    pub scroll_ttl: Duration,
    pub bulk_batch_size: usize,
    pub bulk_timeout: Duration,
    pub default_max_results: usize,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self::from_config(&IndexConfig::default(), &QueryConfig::default())
    }
}

impl GatewaySettings {
    pub fn from_config(index: &IndexConfig, query: &QueryConfig) -> Self {
        Self {
            max_result_window: index.max_result_window,
            scroll_ttl: index.scroll_ttl(),
            bulk_batch_size: index.bulk_batch_size.max(1),
            bulk_timeout: index.bulk_timeout(),
            default_max_results: query.default_max_results,
        }
    }
}

/// 一条归一化后的查询结果
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub id: DocId,
    pub document: Document,
    /// 0 到 100，最高分为 100
    pub score: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Acknowledged {
    pub acknowledged: bool,
    pub created: bool,
}

/// 批量写入报告
#[derive(Debug, Clone, Default, Serialize)]
pub struct InsertReport {
    /// 提交过的全部 ID，包括写入失败的
    pub submitted: Vec<DocId>,
    /// 引擎逐条拒绝的文档
    pub failed: Vec<(DocId, String)>,
    pub batches: usize,
}

/// 相似文档查询条件
#[derive(Debug, Clone, Default)]
pub struct SimilarQuery {
    pub title: String,
    pub author: String,
    pub file_type: String,
    pub file_size: u64,
    pub summary: String,
    pub exclude_id: Option<DocId>,
}

/// 书名权重：词数越多权重越高
pub fn title_boost(title: &str) -> f32 {
    1.2 + (title.split(' ').count() as f32).log2()
}

/// 把原始分数映射到 0..=100
///
/// 没有命中或最高分不为正时返回空列表
pub fn normalize_hits(hits: Vec<Hit>, max_score: Option<f32>) -> Vec<SearchResult> {
    let Some(max_score) = max_score.filter(|score| *score > 0.0) else {
        return Vec::new();
    };
    hits.into_iter()
        .map(|hit| SearchResult {
            id: hit.id,
            document: hit.source,
            score: hit.score * 100.0 / max_score,
        })
        .collect()
}

/// 文件大小 ±10% 的闭区间
fn size_window(file_size: u64) -> (u64, u64) {
    let size = file_size as f64;
    ((size * 0.9).ceil() as u64, (size * 1.1).floor() as u64)
}

/// 索引网关
pub struct IndexGateway<B: IndexBackend = TantivyEngine> {
    backend: B,
    settings: GatewaySettings,
}

impl<B: IndexBackend> IndexGateway<B> {
    pub fn new(backend: B, settings: GatewaySettings) -> Self {
        Self { backend, settings }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    /// 索引不存在时按固定结构创建
    pub fn ensure_schema(&self) -> Result<Acknowledged, EngineError> {
        let created = self.backend.create_index()?;
        if created {
            tracing::info!("索引结构已创建");
        }
        Ok(Acknowledged {
            acknowledged: true,
            created,
        })
    }

    pub fn delete_index(&self) -> Result<bool, EngineError> {
        self.backend.delete_index()
    }

    /// 执行查询并归一化分数，结果超过窗口时使用滚动游标
    pub fn search(&self, query: QuerySpec, sort: Vec<SortField>, max_results: Option<usize>) -> Vec<SearchResult> {
        let max_results = max_results.unwrap_or(self.settings.default_max_results);
        match self.collect(query, sort, max_results) {
            Ok(results) => results,
            Err(e) => {
                tracing::error!("查询失败: {}", e);
                Vec::new()
            }
        }
    }

    fn collect(&self, query: QuerySpec, sort: Vec<SortField>, max_results: usize) -> Result<Vec<SearchResult>, EngineError> {
        if max_results == 0 {
            return Ok(Vec::new());
        }
        let window = self.settings.max_result_window;
        let request = SearchRequest {
            query,
            sort,
            size: max_results.min(window),
            scroll: (max_results > window).then_some(self.settings.scroll_ttl),
        };
        tracing::debug!("查询请求: {:?}", request);

        let first = self.backend.search(&request)?;
        let total = first.total;
        let max_score = first.max_score;
        let mut scroll_id = first.scroll_id;
        let mut hits = first.hits;

        let outcome = self.drain_scroll(&mut hits, &mut scroll_id, max_results, total);
        if let Some(id) = scroll_id {
            self.backend.clear_scroll(id);
        }
        outcome?;

        hits.truncate(max_results);
        Ok(normalize_hits(hits, max_score))
    }

    fn drain_scroll(
        &self,
        hits: &mut Vec<Hit>,
        scroll_id: &mut Option<ScrollId>,
        max_results: usize,
        total: u64,
    ) -> Result<(), EngineError> {
        while hits.len() < max_results && (hits.len() as u64) < total {
            let Some(id) = *scroll_id else { break };
            let page = self.backend.scroll(id, self.settings.scroll_ttl)?;
            if page.hits.is_empty() {
                break;
            }
            hits.extend(page.hits);
            *scroll_id = page.scroll_id;
        }
        Ok(())
    }

    pub fn search_by_title(
        &self,
        title: &str,
        file_type: &str,
        file_size: u64,
        max_results: Option<usize>,
    ) -> Vec<SearchResult> {
        let query = BoolQuery::default()
            .should(QuerySpec::matches(IndexField::Title, title).boost(title_boost(title)))
            .should(QuerySpec::matches(IndexField::FileType, file_type))
            .should(QuerySpec::matches(IndexField::FileSize, file_size.to_string()));
        self.search(query.into(), Vec::new(), max_results)
    }

    pub fn search_by_summary(&self, text: &str, max_results: Option<usize>) -> Vec<SearchResult> {
        self.search(QuerySpec::matches(IndexField::Summary, text), Vec::new(), max_results)
    }

    /// 按分类精确匹配，作者、书名升序
    pub fn search_by_category(&self, category: &str, max_results: Option<usize>) -> Vec<SearchResult> {
        self.search(
            QuerySpec::term(IndexField::Category, category),
            vec![SortField::asc(IndexField::AuthorKeyword), SortField::asc(IndexField::TitleKeyword)],
            max_results,
        )
    }

    pub fn search_by_keyword(&self, keyword: &str, max_results: Option<usize>) -> Vec<SearchResult> {
        let query = BoolQuery::default()
            .should(QuerySpec::matches(IndexField::Title, keyword).boost(10.0))
            .should(QuerySpec::matches(IndexField::Author, keyword).boost(5.0))
            .should(QuerySpec::matches(IndexField::Summary, keyword))
            .minimum_should_match(1);
        self.search(query.into(), Vec::new(), max_results)
    }

    pub fn search_similar(&self, similar: &SimilarQuery, max_results: Option<usize>) -> Vec<SearchResult> {
        let (low, high) = size_window(similar.file_size);
        let mut query = BoolQuery::default()
            .should(QuerySpec::matches(IndexField::Summary, similar.summary.as_str()).boost(10.0))
            .should(QuerySpec::matches(IndexField::Title, similar.title.as_str()).boost(5.0))
            .should(QuerySpec::matches(IndexField::Author, similar.author.as_str()).boost(3.0))
            .should(QuerySpec::range(IndexField::FileSize, Some(low), Some(high)).boost(2.0))
            .minimum_should_match(1);
        // 类型未知时不按类型过滤
        if !similar.file_type.is_empty() {
            query = query.filter(QuerySpec::matches(IndexField::FileType, similar.file_type.as_str()));
        }
        if let Some(id) = similar.exclude_id {
            query = query.must_not(QuerySpec::Ids(vec![id]));
        }
        self.search(query.into(), Vec::new(), max_results)
    }

    /// 按 ID 取文档，不存在或查询出错时返回 None
    pub fn get_by_id(&self, id: DocId) -> Option<Document> {
        let request = SearchRequest {
            query: QuerySpec::Ids(vec![id]),
            sort: Vec::new(),
            size: 1,
            scroll: None,
        };
        match self.backend.search(&request) {
            Ok(response) => response.hits.into_iter().next().map(|hit| hit.source),
            Err(e) => {
                tracing::error!("按 ID 查询 {} 失败: {}", id, e);
                None
            }
        }
    }

    /// 文档数最多的前 100 个分类
    pub fn aggregate_categories(&self) -> Vec<String> {
        match self.backend.terms(IndexField::Category, CATEGORY_AGGREGATION_SIZE) {
            Ok(buckets) => buckets.into_iter().map(|bucket| bucket.key).collect(),
            Err(e) => {
                tracing::error!("分类聚合失败: {}", e);
                Vec::new()
            }
        }
    }

    pub fn count(&self) -> Result<u64, EngineError> {
        self.backend.count()
    }

    /// 分批写入，最多写入 `limit` 条
    ///
    /// 某一批失败时返回错误，之前的批次已经提交
    pub fn insert(
        &self,
        documents: &BTreeMap<DocId, Document>,
        limit: Option<usize>,
    ) -> Result<InsertReport, EngineError> {
        let limit = limit.unwrap_or(usize::MAX);
        let pending: Vec<(DocId, Document)> = documents
            .iter()
            .take(limit)
            .map(|(id, doc)| (*id, doc.clone()))
            .collect();

        let mut report = InsertReport::default();
        for batch in pending.chunks(self.settings.bulk_batch_size) {
            let response = self.backend.bulk(batch, self.settings.bulk_timeout)?;
            report.batches += 1;
            report.submitted.extend(batch.iter().map(|(id, _)| *id));
            for item in response.items {
                if let BulkStatus::Failed(reason) = item.status {
                    tracing::warn!("文档 {} 写入失败: {}", item.id, reason);
                    report.failed.push((item.id, reason));
                }
            }
            tracing::info!("已写入 {} 条文档 (耗时 {:?})", report.submitted.len(), response.took);
        }
        Ok(report)
    }

    /// 部分更新，文档不存在时返回 `Ok(false)`
    pub fn update(&self, id: DocId, patch: &DocumentPatch) -> Result<bool, EngineError> {
        let outcome = self.backend.update(id, patch)?;
        tracing::debug!("更新文档 {}: {:?}", id, outcome);
        Ok(outcome != UpdateOutcome::NotFound)
    }

    /// 删除文档，只有引擎确认删除时返回 true
    pub fn delete(&self, id: DocId) -> Result<bool, EngineError> {
        Ok(self.backend.delete(id)? == DeleteOutcome::Deleted)
    }
}
