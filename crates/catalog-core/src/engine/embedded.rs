// catalog-core/src/engine/embedded.rs
//! 基于 tantivy 的索引引擎
//!
//! 写操作通过同一个 `IndexWriter` 串行执行，每次提交后立即刷新 reader，
//! 写入对后续查询立即可见。`IndexWriter` 在第一次写操作时才创建，
//! 只读的进程不占用索引目录锁。

use std::collections::HashSet;
use std::fs;
use std::ops::Bound;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, TryLockError};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use tantivy::aggregation::AggregationCollector;
use tantivy::aggregation::agg_req::Aggregations;
use tantivy::aggregation::agg_result::AggregationResults;
use tantivy::collector::{Count, TopDocs};
use tantivy::query::{
    AllQuery, BooleanQuery, BoostQuery, ConstScoreQuery, EmptyQuery, Occur, Query, RangeQuery, TermQuery,
    TermSetQuery,
};
use tantivy::schema::IndexRecordOption;
use tantivy::tokenizer::TokenStream;
use tantivy::{DocAddress, Index, IndexReader, IndexWriter, ReloadPolicy, Score, Searcher, TantivyDocument, Term};

use super::scroll::ScrollRegistry;
use super::{
    BulkItem, BulkResponse, BulkStatus, DeleteOutcome, EngineError, Hit, IndexBackend, ScrollId, SearchRequest,
    SearchResponse, TermBucket, UpdateOutcome,
};
use crate::config::IndexConfig;
use crate::query::{BoolQuery, QuerySpec, SortField, SortOrder};
use crate::schema::{
    DocId, Document, DocumentPatch, FieldKind, IndexField, SchemaFields, build_schema, register_analyzer,
};

/// tantivy 索引元数据文件，存在即表示目录中已有索引
const META_FILE: &str = "meta.json";

/// 索引存储位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Storage {
    Directory(PathBuf),
    Memory,
}

/// 引擎配置
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub storage: Storage,
    pub writer_memory: usize,
    pub max_result_window: usize,
    /// 更新和删除等待写锁的上限
    pub write_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            storage: Storage::Memory,
            writer_memory: 50_000_000,
            max_result_window: 10_000,
            write_timeout: Duration::from_secs(60),
        }
    }
}

impl EngineConfig {
    /// 内存索引，多用于测试
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// `storage_path` 为空时使用内存索引
    pub fn from_index_config(config: &IndexConfig) -> Self {
        let storage = if config.storage_path.is_empty() {
            Storage::Memory
        } else {
            Storage::Directory(PathBuf::from(&config.storage_path))
        };
        Self {
            storage,
            writer_memory: config.writer_memory,
            max_result_window: config.max_result_window,
            write_timeout: config.bulk_timeout(),
        }
    }

    pub fn with_max_result_window(mut self, window: usize) -> Self {
        self.max_result_window = window;
        self
    }
}

/// 已打开的索引
struct IndexHandle {
    index: Index,
    reader: IndexReader,
    writer: Mutex<Option<IndexWriter>>,
    writer_memory: usize,
    fields: SchemaFields,
}

/// 排序键
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum SortValue {
    Text(String),
    Unsigned(u64),
    Signed(i64),
}

impl IndexHandle {
    fn open(index: Index, config: &EngineConfig) -> Result<Self, EngineError> {
        register_analyzer(&index);
        let fields = SchemaFields::from_schema(&index.schema())?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        Ok(Self {
            index,
            reader,
            writer: Mutex::new(None),
            writer_memory: config.writer_memory,
            fields,
        })
    }

    /// 在 `timeout` 内取得写入器并执行 `f`
    ///
    /// `f` 返回错误时回滚本次暂存的全部修改
    fn with_writer<T>(
        &self,
        timeout: Duration,
        f: impl FnOnce(&mut IndexWriter) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let mut guard = lock_writer(&self.writer, timeout)?;
        let writer = match guard.take() {
            Some(writer) => writer,
            None => {
                tracing::debug!("创建索引写入器");
                self.index.writer_with_num_threads(1, self.writer_memory)?
            }
        };
        let writer = guard.insert(writer);

        let result = f(writer);
        if result.is_err() {
            if let Err(rollback) = writer.rollback() {
                tracing::error!("回滚失败: {}", rollback);
            }
        }
        result
    }

    /// 提交并刷新 reader
    fn commit(&self, writer: &mut IndexWriter) -> Result<(), EngineError> {
        writer.commit()?;
        self.reader.reload()?;
        Ok(())
    }

    fn id_term(&self, id: DocId) -> Term {
        Term::from_field_u64(self.fields.id, id)
    }

    fn exists(&self, searcher: &Searcher, id: DocId) -> Result<bool, EngineError> {
        let query = TermQuery::new(self.id_term(id), IndexRecordOption::Basic);
        Ok(searcher.search(&query, &Count)? > 0)
    }

    fn find(&self, searcher: &Searcher, id: DocId) -> Result<Option<Document>, EngineError> {
        let query = TermQuery::new(self.id_term(id), IndexRecordOption::Basic);
        let top = searcher.search(&query, &TopDocs::with_limit(1))?;
        let Some((_, address)) = top.into_iter().next() else {
            return Ok(None);
        };
        let doc: TantivyDocument = searcher.doc(address)?;
        Ok(Document::from_tantivy(&doc, &self.fields).map(|(_, document)| document))
    }

    fn load_hits(&self, searcher: &Searcher, ranked: &[(Score, DocAddress)]) -> Result<Vec<Hit>, EngineError> {
        let mut hits = Vec::with_capacity(ranked.len());
        for (score, address) in ranked {
            let doc: TantivyDocument = searcher.doc(*address)?;
            if let Some((id, source)) = Document::from_tantivy(&doc, &self.fields) {
                hits.push(Hit {
                    id,
                    score: *score,
                    source,
                });
            }
        }
        Ok(hits)
    }

    fn sort_hits(
        &self,
        searcher: &Searcher,
        ranked: Vec<(Score, DocAddress)>,
        sort: &[SortField],
    ) -> Result<Vec<(Score, DocAddress)>, EngineError> {
        let mut keyed = Vec::with_capacity(ranked.len());
        for (score, address) in ranked {
            let doc: TantivyDocument = searcher.doc(address)?;
            let Some((id, document)) = Document::from_tantivy(&doc, &self.fields) else {
                continue;
            };
            let keys = sort
                .iter()
                .map(|s| sort_value(id, &document, s.field))
                .collect::<Result<Vec<_>, _>>()?;
            keyed.push((keys, score, address));
        }

        keyed.sort_by(|a, b| {
            a.0.iter()
                .zip(&b.0)
                .zip(sort)
                .map(|((left, right), s)| match s.order {
                    SortOrder::Asc => left.cmp(right),
                    SortOrder::Desc => right.cmp(left),
                })
                .find(|ordering| ordering.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(keyed.into_iter().map(|(_, score, address)| (score, address)).collect())
    }

    fn compile(&self, spec: &QuerySpec) -> Result<Box<dyn Query>, EngineError> {
        let query: Box<dyn Query> = match spec {
            QuerySpec::MatchAll => Box::new(AllQuery),
            QuerySpec::Match { field, query, boost } => boosted(self.compile_match(*field, query)?, *boost),
            QuerySpec::Term { field, value } => match self.exact_term(*field, value)? {
                Some(term) => Box::new(TermQuery::new(term, IndexRecordOption::Basic)),
                None => Box::new(EmptyQuery),
            },
            QuerySpec::Ids(ids) => Box::new(TermSetQuery::new(ids.iter().map(|id| self.id_term(*id)))),
            QuerySpec::Range {
                field,
                gte,
                lte,
                boost,
            } => boosted(self.compile_range(*field, *gte, *lte)?, *boost),
            QuerySpec::Bool(query) => self.compile_bool(query)?,
        };
        Ok(query)
    }

    /// 分词字段按分析器切分后任意词项命中；其他字段等同精确匹配
    fn compile_match(&self, field: IndexField, text: &str) -> Result<Box<dyn Query>, EngineError> {
        if field.kind() != FieldKind::Analyzed {
            return Ok(match self.exact_term(field, text)? {
                Some(term) => Box::new(TermQuery::new(term, IndexRecordOption::Basic)),
                None => Box::new(EmptyQuery),
            });
        }

        let target = self.fields.resolve(field);
        let mut analyzer = self.index.tokenizer_for_field(target)?;
        let mut seen = HashSet::new();
        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        let mut stream = analyzer.token_stream(text);
        while let Some(token) = stream.next() {
            if seen.insert(token.text.clone()) {
                let term = Term::from_field_text(target, &token.text);
                clauses.push((Occur::Should, Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs))));
            }
        }

        if clauses.is_empty() {
            Ok(Box::new(EmptyQuery))
        } else {
            Ok(Box::new(BooleanQuery::new(clauses)))
        }
    }

    /// 无法转换为词项的值（例如非数字的文件大小）返回 None
    fn exact_term(&self, field: IndexField, value: &str) -> Result<Option<Term>, EngineError> {
        let target = self.fields.resolve(field);
        match field.kind() {
            FieldKind::Keyword | FieldKind::Analyzed => Ok(Some(Term::from_field_text(target, value))),
            FieldKind::Unsigned => Ok(value.trim().parse().ok().map(|v| Term::from_field_u64(target, v))),
            FieldKind::Date => Err(EngineError::UnsupportedField(field)),
        }
    }

    fn compile_range(
        &self,
        field: IndexField,
        gte: Option<u64>,
        lte: Option<u64>,
    ) -> Result<Box<dyn Query>, EngineError> {
        if field.kind() != FieldKind::Unsigned {
            return Err(EngineError::UnsupportedField(field));
        }
        let target = self.fields.resolve(field);
        let bound = |value: Option<u64>| match value {
            Some(v) => Bound::Included(Term::from_field_u64(target, v)),
            None => Bound::Unbounded,
        };
        Ok(Box::new(RangeQuery::new(bound(gte), bound(lte))))
    }

    fn compile_bool(&self, query: &BoolQuery) -> Result<Box<dyn Query>, EngineError> {
        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();

        for q in &query.must {
            clauses.push((Occur::Must, self.compile(q)?));
        }
        // filter 必须命中但不计分
        for q in &query.filter {
            clauses.push((Occur::Must, Box::new(ConstScoreQuery::new(self.compile(q)?, 0.0))));
        }
        for q in &query.must_not {
            clauses.push((Occur::MustNot, self.compile(q)?));
        }

        let shoulds = query
            .should
            .iter()
            .map(|q| self.compile(q))
            .collect::<Result<Vec<_>, _>>()?;
        match query.effective_minimum_should_match() {
            _ if shoulds.is_empty() => {}
            0 => clauses.extend(shoulds.into_iter().map(|q| (Occur::Should, q))),
            1 => {
                let group = BooleanQuery::new(shoulds.into_iter().map(|q| (Occur::Should, q)).collect());
                clauses.push((Occur::Must, Box::new(group)));
            }
            minimum => {
                let group = BooleanQuery::with_minimum_required_clauses(
                    shoulds.into_iter().map(|q| (Occur::Should, q)).collect(),
                    minimum,
                );
                clauses.push((Occur::Must, Box::new(group)));
            }
        }

        if clauses.is_empty() {
            return Ok(Box::new(AllQuery));
        }
        if clauses.iter().all(|(occur, _)| *occur == Occur::MustNot) {
            clauses.push((Occur::Must, Box::new(AllQuery)));
        }
        Ok(Box::new(BooleanQuery::new(clauses)))
    }
}

fn boosted(query: Box<dyn Query>, boost: f32) -> Box<dyn Query> {
    if (boost - 1.0).abs() < f32::EPSILON {
        query
    } else {
        Box::new(BoostQuery::new(query, boost))
    }
}

fn sort_value(id: DocId, doc: &Document, field: IndexField) -> Result<SortValue, EngineError> {
    let value = match field {
        IndexField::Id => SortValue::Unsigned(id),
        IndexField::Category => SortValue::Text(doc.category.clone()),
        IndexField::Title | IndexField::TitleKeyword => SortValue::Text(doc.title.clone()),
        IndexField::Author | IndexField::AuthorKeyword => SortValue::Text(doc.author.clone()),
        IndexField::FilePath => SortValue::Text(doc.file_path.clone()),
        IndexField::FileType => SortValue::Text(doc.file_type.clone()),
        IndexField::FileSize => SortValue::Unsigned(doc.file_size),
        IndexField::UpdatedTime => SortValue::Signed(doc.updated_time.timestamp_micros()),
        IndexField::Summary => return Err(EngineError::UnsupportedField(field)),
    };
    Ok(value)
}

/// 在 `timeout` 内获取写锁
fn lock_writer(
    writer: &Mutex<Option<IndexWriter>>,
    timeout: Duration,
) -> Result<MutexGuard<'_, Option<IndexWriter>>, EngineError> {
    let deadline = Instant::now() + timeout;
    loop {
        match writer.try_lock() {
            Ok(guard) => return Ok(guard),
            Err(TryLockError::Poisoned(poisoned)) => return Ok(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) if Instant::now() >= deadline => {
                return Err(EngineError::Timeout(timeout));
            }
            Err(TryLockError::WouldBlock) => thread::sleep(Duration::from_millis(5)),
        }
    }
}

/// tantivy 索引引擎
pub struct TantivyEngine {
    config: EngineConfig,
    state: RwLock<Option<Arc<IndexHandle>>>,
    scrolls: ScrollRegistry,
}

impl TantivyEngine {
    /// 创建引擎；磁盘目录中已有索引时直接打开
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let mut state = None;
        if let Storage::Directory(path) = &config.storage {
            if path.join(META_FILE).exists() {
                let index = Index::open_in_dir(path)?;
                state = Some(Arc::new(IndexHandle::open(index, &config)?));
                tracing::info!("已打开索引: {:?}", path);
            }
        }
        Ok(Self {
            config,
            state: RwLock::new(state),
            scrolls: ScrollRegistry::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 当前存活的滚动游标数
    pub fn active_scrolls(&self) -> usize {
        self.scrolls.active_count()
    }

    fn handle(&self) -> Result<Arc<IndexHandle>, EngineError> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(EngineError::IndexMissing)
    }
}

impl IndexBackend for TantivyEngine {
    fn index_exists(&self) -> bool {
        self.state.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    fn create_index(&self) -> Result<bool, EngineError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.is_some() {
            return Ok(false);
        }
        let index = match &self.config.storage {
            Storage::Directory(path) => {
                fs::create_dir_all(path)?;
                Index::create_in_dir(path, build_schema())?
            }
            Storage::Memory => Index::create_in_ram(build_schema()),
        };
        *state = Some(Arc::new(IndexHandle::open(index, &self.config)?));
        tracing::info!("已创建索引 ({:?})", self.config.storage);
        Ok(true)
    }

    fn delete_index(&self) -> Result<bool, EngineError> {
        let Some(handle) = self.state.write().unwrap_or_else(PoisonError::into_inner).take() else {
            return Ok(false);
        };
        drop(handle);
        if let Storage::Directory(path) = &self.config.storage {
            if path.exists() {
                fs::remove_dir_all(path)?;
            }
        }
        tracing::info!("已删除索引");
        Ok(true)
    }

    fn search(&self, request: &SearchRequest) -> Result<SearchResponse, EngineError> {
        if request.size > self.config.max_result_window {
            return Err(EngineError::ResultWindowTooLarge {
                requested: request.size,
                window: self.config.max_result_window,
            });
        }
        let handle = self.handle()?;
        let searcher = handle.reader.searcher();
        let query = handle.compile(&request.query)?;
        tracing::debug!("执行查询: {:?}", query);

        let total = searcher.search(&*query, &Count)? as u64;
        if total == 0 || request.size == 0 {
            return Ok(SearchResponse {
                total,
                ..Default::default()
            });
        }

        // 排序和滚动都需要全部命中
        let collect_all = request.scroll.is_some() || !request.sort.is_empty();
        let limit = if collect_all { total as usize } else { request.size };
        let mut ranked = searcher.search(&*query, &TopDocs::with_limit(limit))?;
        if !request.sort.is_empty() {
            ranked = handle.sort_hits(&searcher, ranked, &request.sort)?;
        }

        let max_score = ranked.iter().map(|(score, _)| *score).reduce(f32::max);
        let rest = if ranked.len() > request.size {
            ranked.split_off(request.size)
        } else {
            Vec::new()
        };
        let hits = handle.load_hits(&searcher, &ranked)?;
        let scroll_id = request
            .scroll
            .map(|ttl| self.scrolls.open(searcher, rest, request.size, total, ttl));

        Ok(SearchResponse {
            hits,
            total,
            max_score,
            scroll_id,
        })
    }

    fn scroll(&self, scroll_id: ScrollId, ttl: Duration) -> Result<SearchResponse, EngineError> {
        let handle = self.handle()?;
        let page = self.scrolls.next_page(scroll_id, ttl)?;
        let hits = handle.load_hits(&page.searcher, &page.hits)?;
        Ok(SearchResponse {
            max_score: hits.iter().map(|hit| hit.score).reduce(f32::max),
            hits,
            total: page.total,
            scroll_id: Some(scroll_id),
        })
    }

    fn clear_scroll(&self, scroll_id: ScrollId) -> bool {
        self.scrolls.clear(scroll_id)
    }

    fn bulk(&self, documents: &[(DocId, Document)], timeout: Duration) -> Result<BulkResponse, EngineError> {
        let started = Instant::now();
        let handle = self.handle()?;
        handle.with_writer(timeout, |writer| {
            let searcher = handle.reader.searcher();
            let mut items = Vec::with_capacity(documents.len());
            for (id, document) in documents {
                let existed = handle.exists(&searcher, *id)?;
                writer.delete_term(handle.id_term(*id));
                let status = match writer.add_document(document.to_tantivy(*id, &handle.fields)) {
                    Ok(_) if existed => BulkStatus::Updated,
                    Ok(_) => BulkStatus::Created,
                    Err(e) => BulkStatus::Failed(e.to_string()),
                };
                items.push(BulkItem { id: *id, status });
            }
            handle.commit(writer)?;

            Ok(BulkResponse {
                took: started.elapsed(),
                items,
            })
        })
    }

    fn update(&self, id: DocId, patch: &DocumentPatch) -> Result<UpdateOutcome, EngineError> {
        let handle = self.handle()?;
        handle.with_writer(self.config.write_timeout, |writer| {
            let searcher = handle.reader.searcher();
            let Some(mut document) = handle.find(&searcher, id)? else {
                return Ok(UpdateOutcome::NotFound);
            };
            if !patch.apply(&mut document) {
                return Ok(UpdateOutcome::Noop);
            }
            document.updated_time = Utc::now();

            writer.delete_term(handle.id_term(id));
            writer.add_document(document.to_tantivy(id, &handle.fields))?;
            handle.commit(writer)?;
            Ok(UpdateOutcome::Updated)
        })
    }

    fn delete(&self, id: DocId) -> Result<DeleteOutcome, EngineError> {
        let handle = self.handle()?;
        handle.with_writer(self.config.write_timeout, |writer| {
            if !handle.exists(&handle.reader.searcher(), id)? {
                return Ok(DeleteOutcome::NotFound);
            }
            writer.delete_term(handle.id_term(id));
            handle.commit(writer)?;
            Ok(DeleteOutcome::Deleted)
        })
    }

    fn count(&self) -> Result<u64, EngineError> {
        Ok(self.handle()?.reader.searcher().num_docs())
    }

    fn terms(&self, field: IndexField, size: usize) -> Result<Vec<TermBucket>, EngineError> {
        if field.kind() != FieldKind::Keyword {
            return Err(EngineError::UnsupportedField(field));
        }
        let handle = self.handle()?;
        let searcher = handle.reader.searcher();

        let request = serde_json::json!({
            "values": { "terms": { "field": field.name(), "size": size } }
        });
        let aggs: Aggregations =
            serde_json::from_value(request).map_err(|e| EngineError::Aggregation(e.to_string()))?;
        let collector = AggregationCollector::from_aggs(aggs, Default::default());
        let results: AggregationResults = searcher.search(&AllQuery, &collector)?;
        let value = serde_json::to_value(&results).map_err(|e| EngineError::Aggregation(e.to_string()))?;

        let mut buckets: Vec<TermBucket> = value["values"]["buckets"]
            .as_array()
            .map(|buckets| {
                buckets
                    .iter()
                    .filter_map(|bucket| {
                        Some(TermBucket {
                            key: bucket["key"].as_str()?.to_string(),
                            doc_count: bucket["doc_count"].as_u64()?,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        buckets.sort_by(|a, b| b.doc_count.cmp(&a.doc_count).then_with(|| a.key.cmp(&b.key)));
        buckets.truncate(size);
        Ok(buckets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(window: usize) -> TantivyEngine {
        let engine = TantivyEngine::new(EngineConfig::in_memory().with_max_result_window(window)).unwrap();
        assert!(engine.create_index().unwrap());
        engine
    }

    fn doc(category: &str, title: &str, author: &str, file_type: &str, size: u64, summary: &str) -> Document {
        Document {
            category: category.into(),
            title: title.into(),
            author: author.into(),
            file_path: format!("{category}/{title}.{file_type}"),
            file_type: file_type.into(),
            file_size: size,
            summary: summary.into(),
            updated_time: Utc::now(),
        }
    }

    fn request(query: QuerySpec, size: usize) -> SearchRequest {
        SearchRequest {
            query,
            sort: Vec::new(),
            size,
            scroll: None,
        }
    }

    fn ids(response: &SearchResponse) -> Vec<DocId> {
        response.hits.iter().map(|hit| hit.id).collect()
    }

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn test_missing_index() {
        let engine = TantivyEngine::new(EngineConfig::in_memory()).unwrap();
        assert!(!engine.index_exists());
        assert!(matches!(engine.count(), Err(EngineError::IndexMissing)));
        assert!(!engine.delete_index().unwrap());
    }

    #[test]
    fn test_create_is_idempotent() {
        let engine = engine(100);
        assert!(!engine.create_index().unwrap());
        assert!(engine.index_exists());
        assert!(engine.delete_index().unwrap());
        assert!(!engine.index_exists());
    }

    #[test]
    fn test_directory_index_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig {
            storage: Storage::Directory(dir.path().join("index")),
            ..EngineConfig::default()
        };
        {
            let engine = TantivyEngine::new(config.clone()).unwrap();
            engine.create_index().unwrap();
            engine
                .bulk(&[(1, doc("A", "Persisted", "", "txt", 1, "kept"))], TIMEOUT)
                .unwrap();
        }
        let reopened = TantivyEngine::new(config).unwrap();
        assert!(reopened.index_exists());
        assert_eq!(reopened.count().unwrap(), 1);
        assert!(reopened.delete_index().unwrap());
        assert!(!dir.path().join("index").exists());
    }

    #[test]
    fn test_bulk_reports_created_then_updated() {
        let engine = engine(100);
        let first = engine
            .bulk(&[(1, doc("A", "One", "", "txt", 10, "x")), (2, doc("A", "Two", "", "txt", 10, "y"))], TIMEOUT)
            .unwrap();
        assert!(first.items.iter().all(|item| item.status == BulkStatus::Created));
        assert!(!first.has_errors());

        let second = engine.bulk(&[(1, doc("A", "One v2", "", "txt", 10, "x"))], TIMEOUT).unwrap();
        assert_eq!(second.items[0].status, BulkStatus::Updated);
        assert_eq!(engine.count().unwrap(), 2);
    }

    #[test]
    fn test_result_window_is_enforced() {
        let engine = engine(5);
        let err = engine.search(&request(QuerySpec::MatchAll, 6)).unwrap_err();
        assert!(matches!(err, EngineError::ResultWindowTooLarge { requested: 6, window: 5 }));
    }

    #[test]
    fn test_match_uses_analyzer() {
        let engine = engine(100);
        engine
            .bulk(
                &[
                    (1, doc("Tech", "Rust Programming", "", "pdf", 10, "")),
                    (2, doc("Tech", "Cooking Basics", "", "pdf", 10, "")),
                ],
                TIMEOUT,
            )
            .unwrap();
        let response = engine
            .search(&request(QuerySpec::matches(IndexField::Title, "RUST"), 10))
            .unwrap();
        assert_eq!(ids(&response), vec![1]);
        assert!(response.max_score.unwrap() > 0.0);
    }

    #[test]
    fn test_bool_filter_and_must_not() {
        let engine = engine(100);
        engine
            .bulk(
                &[
                    (1, doc("A", "Sea Stories", "", "txt", 100, "sea")),
                    (2, doc("A", "Sea Songs", "", "pdf", 100, "sea")),
                    (3, doc("A", "Sea Maps", "", "txt", 100, "sea")),
                ],
                TIMEOUT,
            )
            .unwrap();
        let query = BoolQuery::default()
            .should(QuerySpec::matches(IndexField::Summary, "sea"))
            .filter(QuerySpec::term(IndexField::FileType, "txt"))
            .must_not(QuerySpec::Ids(vec![3]))
            .minimum_should_match(1);
        let response = engine.search(&request(query.into(), 10)).unwrap();
        assert_eq!(ids(&response), vec![1]);
    }

    #[test]
    fn test_range_is_inclusive() {
        let engine = engine(100);
        engine
            .bulk(
                &[
                    (1, doc("A", "a", "", "txt", 90, "")),
                    (2, doc("A", "b", "", "txt", 110, "")),
                    (3, doc("A", "c", "", "txt", 111, "")),
                ],
                TIMEOUT,
            )
            .unwrap();
        let response = engine
            .search(&request(QuerySpec::range(IndexField::FileSize, Some(90), Some(110)), 10))
            .unwrap();
        let mut found = ids(&response);
        found.sort();
        assert_eq!(found, vec![1, 2]);
    }

    #[test]
    fn test_sort_by_author_then_title() {
        let engine = engine(100);
        engine
            .bulk(
                &[
                    (1, doc("A", "Zeta", "Bae", "txt", 1, "")),
                    (2, doc("A", "Alpha", "Bae", "txt", 1, "")),
                    (3, doc("A", "Omega", "Ahn", "txt", 1, "")),
                ],
                TIMEOUT,
            )
            .unwrap();
        let response = engine
            .search(&SearchRequest {
                query: QuerySpec::term(IndexField::Category, "A"),
                sort: vec![SortField::asc(IndexField::AuthorKeyword), SortField::asc(IndexField::TitleKeyword)],
                size: 10,
                scroll: None,
            })
            .unwrap();
        assert_eq!(ids(&response), vec![3, 2, 1]);
    }

    #[test]
    fn test_scroll_returns_remaining_pages() {
        let engine = engine(2);
        let docs: Vec<_> = (1..=5).map(|i| (i, doc("A", &format!("t{i}"), "", "txt", i, ""))).collect();
        engine.bulk(&docs, TIMEOUT).unwrap();

        let first = engine
            .search(&SearchRequest {
                query: QuerySpec::MatchAll,
                sort: Vec::new(),
                size: 2,
                scroll: Some(Duration::from_secs(60)),
            })
            .unwrap();
        assert_eq!(first.hits.len(), 2);
        assert_eq!(first.total, 5);
        let scroll_id = first.scroll_id.unwrap();

        let mut seen = ids(&first);
        loop {
            let page = engine.scroll(scroll_id, Duration::from_secs(60)).unwrap();
            if page.hits.is_empty() {
                break;
            }
            seen.extend(ids(&page));
        }
        seen.sort();
        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
        assert!(engine.clear_scroll(scroll_id));
        assert_eq!(engine.active_scrolls(), 0);
    }

    #[test]
    fn test_update_merges_and_reports() {
        let engine = engine(100);
        let original = doc("A", "Old", "Kim", "txt", 5, "body");
        engine.bulk(&[(7, original.clone())], TIMEOUT).unwrap();

        let patch = DocumentPatch {
            title: Some("New".into()),
            ..Default::default()
        };
        assert_eq!(engine.update(7, &patch).unwrap(), UpdateOutcome::Updated);
        assert_eq!(engine.update(7, &patch).unwrap(), UpdateOutcome::Noop);
        assert_eq!(engine.update(8, &patch).unwrap(), UpdateOutcome::NotFound);

        let response = engine.search(&request(QuerySpec::Ids(vec![7]), 1)).unwrap();
        let stored = &response.hits[0].source;
        assert_eq!(stored.title, "New");
        assert_eq!(stored.author, original.author);
        assert_eq!(stored.summary, original.summary);
        assert_eq!(engine.count().unwrap(), 1);
    }

    #[test]
    fn test_delete() {
        let engine = engine(100);
        engine.bulk(&[(1, doc("A", "x", "", "txt", 1, ""))], TIMEOUT).unwrap();
        assert_eq!(engine.delete(1).unwrap(), DeleteOutcome::Deleted);
        assert_eq!(engine.delete(1).unwrap(), DeleteOutcome::NotFound);
        assert_eq!(engine.count().unwrap(), 0);
    }

    #[test]
    fn test_terms_ordered_by_count_then_key() {
        let engine = engine(100);
        engine
            .bulk(
                &[
                    (1, doc("B", "1", "", "txt", 1, "")),
                    (2, doc("A", "2", "", "txt", 1, "")),
                    (3, doc("A", "3", "", "txt", 1, "")),
                    (4, doc("C", "4", "", "txt", 1, "")),
                ],
                TIMEOUT,
            )
            .unwrap();
        let buckets = engine.terms(IndexField::Category, 100).unwrap();
        let keys: Vec<_> = buckets.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(keys, vec!["A", "B", "C"]);
        assert_eq!(buckets[0].doc_count, 2);
        assert!(matches!(
            engine.terms(IndexField::Summary, 10),
            Err(EngineError::UnsupportedField(IndexField::Summary))
        ));
    }

    #[test]
    fn test_writer_lock_timeout() {
        let engine = engine(100);
        let handle = engine.handle().unwrap();
        let _guard = handle.writer.lock().unwrap();
        let err = engine
            .bulk(&[(1, doc("A", "x", "", "txt", 1, ""))], Duration::from_millis(20))
            .unwrap_err();
        assert!(matches!(err, EngineError::Timeout(_)));
    }

    #[test]
    fn test_second_engine_reads_while_first_holds_writer() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig {
            storage: Storage::Directory(dir.path().join("index")),
            ..EngineConfig::default()
        };
        let writer_side = TantivyEngine::new(config.clone()).unwrap();
        writer_side.create_index().unwrap();
        writer_side
            .bulk(&[(1, doc("A", "Shared Shelf", "", "txt", 1, "visible to readers"))], TIMEOUT)
            .unwrap();

        let reader_side = TantivyEngine::new(config).unwrap();
        assert_eq!(reader_side.count().unwrap(), 1);
        let response = reader_side
            .search(&request(QuerySpec::matches(IndexField::Title, "shelf"), 10))
            .unwrap();
        assert_eq!(ids(&response), vec![1]);

        // 写入器仍被第一个引擎持有
        let err = reader_side.delete(1).unwrap_err();
        assert!(matches!(err, EngineError::Tantivy(_)));
    }

    #[test]
    fn test_failed_batch_is_rolled_back() {
        let engine = engine(100);
        engine.bulk(&[(1, doc("A", "Original", "", "txt", 1, "kept"))], TIMEOUT).unwrap();
        let handle = engine.handle().unwrap();

        let staged: Result<(), EngineError> = handle.with_writer(TIMEOUT, |writer| {
            writer.delete_term(handle.id_term(1));
            writer.add_document(doc("A", "Half Written", "", "txt", 1, "staged").to_tantivy(2, &handle.fields))?;
            Err(EngineError::Aggregation("batch step failed".into()))
        });
        assert!(staged.is_err());

        // 后续成功的提交不能带上失败批次暂存的修改
        engine.bulk(&[(3, doc("B", "Later", "", "txt", 1, "next"))], TIMEOUT).unwrap();
        assert_eq!(engine.count().unwrap(), 2);
        let found = engine.search(&request(QuerySpec::Ids(vec![1, 2, 3]), 10)).unwrap();
        let mut found = ids(&found);
        found.sort();
        assert_eq!(found, vec![1, 3]);
    }
}
