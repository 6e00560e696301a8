// catalog-core/src/service.rs
//! 图书目录服务
//!
//! 组合 [`Loader`] 与 [`IndexGateway`]，提供以图书为单位的操作。
//! 涉及文件的修改先改文件系统，成功后再改索引。

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::CatalogConfig;
use crate::engine::{EngineConfig, IndexBackend, TantivyEngine};
use crate::error::CatalogError;
use crate::extract::{Format, media_type, normalize, text::transcode_to_utf8};
use crate::gateway::{GatewaySettings, IndexGateway, InsertReport, SearchResult, SimilarQuery};
use crate::loader::{LimitPolicy, Loader};
use crate::schema::{DocId, Document, DocumentPatch};
use crate::stats::LoadReport;

/// 对外返回的图书
#[derive(Debug, Clone, Serialize)]
pub struct Book {
    pub id: DocId,
    #[serde(flatten)]
    pub document: Document,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl From<SearchResult> for Book {
    fn from(result: SearchResult) -> Self {
        Self {
            id: result.id,
            document: result.document,
            score: Some(result.score),
        }
    }
}

/// 图书信息修改，未给出的字段沿用原值
#[derive(Debug, Clone, Default)]
pub struct BookUpdate {
    pub category: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub file_type: Option<String>,
    pub summary: Option<String>,
}

/// 用于下载的文件
#[derive(Debug, Clone, Serialize)]
pub struct BookFile {
    pub path: PathBuf,
    pub media_type: &'static str,
}

/// 转换编码的结果
#[derive(Debug, Clone, Serialize)]
pub struct EncodingChange {
    pub id: DocId,
    /// 文件原来的编码
    pub from: &'static str,
    /// 文件内容是否被改写
    pub rewritten: bool,
    pub file_size: u64,
}

/// 一次加载入库的结果
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadSummary {
    /// 索引中已有文档，未重新加载
    pub skipped: bool,
    pub report: LoadReport,
    pub insert: InsertReport,
}

/// 图书目录服务
pub struct CatalogService<B: IndexBackend = TantivyEngine> {
    loader: Loader,
    gateway: IndexGateway<B>,
    limit_policy: LimitPolicy,
    similar_summary_chars: usize,
}

impl CatalogService<TantivyEngine> {
    /// 按配置打开索引并创建服务
    pub fn open(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let engine = TantivyEngine::new(EngineConfig::from_index_config(&config.index))?;
        let gateway = IndexGateway::new(engine, GatewaySettings::from_config(&config.index, &config.query));
        Ok(Self::new(Loader::from_config(&config.library), gateway, config))
    }
}

impl<B: IndexBackend> CatalogService<B> {
    pub fn new(loader: Loader, gateway: IndexGateway<B>, config: &CatalogConfig) -> Self {
        Self {
            loader,
            gateway,
            limit_policy: config.library.limit_policy,
            similar_summary_chars: config.query.similar_summary_chars,
        }
    }

    pub fn gateway(&self) -> &IndexGateway<B> {
        &self.gateway
    }

    pub fn root(&self) -> &Path {
        self.loader.root()
    }

    /// 建立索引结构；索引为空时加载整个根目录
    pub fn initialize(&self, limit: Option<usize>) -> Result<LoadSummary, CatalogError> {
        self.initialize_with_progress(limit, |_, _| {})
    }

    pub fn initialize_with_progress<F>(&self, limit: Option<usize>, progress: F) -> Result<LoadSummary, CatalogError>
    where
        F: Fn(usize, usize),
    {
        self.gateway.ensure_schema()?;
        let existing = self.gateway.count()?;
        if existing > 0 {
            tracing::info!("索引中已有 {} 条文档，跳过加载", existing);
            return Ok(LoadSummary {
                skipped: true,
                ..LoadSummary::default()
            });
        }
        let root = self.loader.root().to_path_buf();
        self.reindex_with_progress(&root, limit, progress)
    }

    /// 加载目录并写入，不检查已有文档
    pub fn reindex(&self, dir: &Path, limit: Option<usize>) -> Result<LoadSummary, CatalogError> {
        self.reindex_with_progress(dir, limit, |_, _| {})
    }

    pub fn reindex_with_progress<F>(
        &self,
        dir: &Path,
        limit: Option<usize>,
        progress: F,
    ) -> Result<LoadSummary, CatalogError>
    where
        F: Fn(usize, usize),
    {
        self.gateway.ensure_schema()?;
        let batch = self
            .loader
            .read_files_with_progress(dir, limit, self.limit_policy, progress);
        let insert = self.gateway.insert(&batch.documents, limit)?;
        Ok(LoadSummary {
            skipped: false,
            report: batch.report,
            insert,
        })
    }

    /// 添加单个文件，返回文档 ID
    pub fn add_book(&self, path: &Path) -> Result<DocId, CatalogError> {
        let documents = self.loader.read_file(path);
        let Some(id) = documents.keys().next().copied() else {
            return Err(CatalogError::Unsupported(path.to_path_buf()));
        };
        self.gateway.ensure_schema()?;
        let report = self.gateway.insert(&documents, None)?;
        if !report.failed.is_empty() {
            return Err(CatalogError::IndexMutation { operation: "insert", id });
        }
        Ok(id)
    }

    pub fn get_book(&self, id: DocId) -> Result<Book, CatalogError> {
        self.document(id).map(|document| Book {
            id,
            document,
            score: None,
        })
    }

    pub fn categories(&self) -> Vec<String> {
        self.gateway.aggregate_categories()
    }

    /// 分类下的第 `page` 页（从 1 开始）
    ///
    /// 分类下没有图书时返回 [`CatalogError::CategoryNotFound`]，页码越界时返回 [`CatalogError::NoResults`]
    pub fn books_in_category(
        &self,
        category: &str,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<Book>, CatalogError> {
        let window = self.gateway.settings().max_result_window;
        let skip = page.saturating_sub(1).saturating_mul(page_size);
        let listing = self.gateway.search_by_category(category, Some(window));
        if listing.is_empty() {
            return Err(CatalogError::CategoryNotFound(category.to_string()));
        }
        let books: Vec<Book> = listing.into_iter().skip(skip).take(page_size).map(Book::from).collect();
        found(books, CatalogError::NoResults)
    }

    pub fn search_by_keyword(&self, keyword: &str, max_results: Option<usize>) -> Result<Vec<Book>, CatalogError> {
        found(into_books(self.gateway.search_by_keyword(keyword, max_results)), CatalogError::NoResults)
    }

    pub fn search_by_title(
        &self,
        title: &str,
        file_type: &str,
        file_size: u64,
        max_results: Option<usize>,
    ) -> Result<Vec<Book>, CatalogError> {
        found(
            into_books(self.gateway.search_by_title(title, file_type, file_size, max_results)),
            CatalogError::NoResults,
        )
    }

    pub fn search_by_summary(&self, text: &str, max_results: Option<usize>) -> Result<Vec<Book>, CatalogError> {
        found(into_books(self.gateway.search_by_summary(text, max_results)), CatalogError::NoResults)
    }

    /// 与指定图书相似的其他图书
    pub fn similar_books(&self, id: DocId, max_results: Option<usize>) -> Result<Vec<Book>, CatalogError> {
        let document = self.document(id)?;
        let query = SimilarQuery {
            summary: document.summary.chars().take(self.similar_summary_chars).collect(),
            title: document.title,
            author: document.author,
            file_type: document.file_type,
            file_size: document.file_size,
            exclude_id: Some(id),
        };
        found(into_books(self.gateway.search_similar(&query, max_results)), CatalogError::NoSimilarBooks)
    }

    /// 定位图书文件，`file_path` 必须与索引中的相对路径一致
    pub fn book_file(&self, id: DocId, file_path: &str) -> Result<BookFile, CatalogError> {
        let document = self.document(id)?;
        if document.file_path != file_path {
            return Err(CatalogError::PathMismatch {
                id,
                requested: file_path.to_string(),
            });
        }
        let path = self.absolute(&document.file_path);
        if !path.is_file() {
            return Err(CatalogError::filesystem(
                path,
                io::Error::new(io::ErrorKind::NotFound, "book file is missing"),
            ));
        }
        Ok(BookFile {
            path,
            media_type: media_type(&document.file_type),
        })
    }

    /// 修改图书信息并按新信息移动文件
    pub fn update_book(&self, id: DocId, update: BookUpdate) -> Result<(), CatalogError> {
        let previous = self.document(id)?;
        let category = update.category.unwrap_or_else(|| previous.category.clone());
        let title = update.title.unwrap_or_else(|| previous.title.clone());
        let author = update.author.unwrap_or_else(|| previous.author.clone());
        let file_type = update.file_type.unwrap_or_else(|| previous.file_type.clone());
        path_component("category", &category)?;
        path_component("title", &title)?;
        path_component("file_type", &file_type)?;
        if !author.is_empty() {
            path_component("author", &author)?;
        }

        let root = self.loader.root();
        let old_path = self.absolute(&previous.file_path);
        let relative = Path::new(&category).join(book_file_name(&author, &title, &file_type));
        let new_path = root.join(&relative);
        if !new_path.starts_with(root) || new_path.parent() != Some(root.join(&category).as_path()) {
            return Err(CatalogError::InvalidField {
                field: "file_path",
                value: relative.to_string_lossy().to_string(),
            });
        }

        if new_path != old_path {
            if new_path.exists() {
                return Err(CatalogError::filesystem(
                    new_path,
                    io::Error::new(io::ErrorKind::AlreadyExists, "target file already exists"),
                ));
            }
            fs::rename(&old_path, &new_path).map_err(|e| CatalogError::filesystem(&new_path, e))?;
            tracing::info!("已移动 {:?} -> {:?}", old_path, new_path);
        }

        let patch = DocumentPatch {
            category: Some(category),
            title: Some(title),
            author: Some(author),
            file_path: Some(relative.to_string_lossy().to_string()),
            file_type: Some(file_type),
            file_size: None,
            summary: update.summary,
        };
        let updated = match self.gateway.update(id, &patch) {
            Ok(updated) => updated,
            Err(e) => {
                self.restore(&new_path, &old_path);
                return Err(e.into());
            }
        };
        if !updated {
            self.restore(&new_path, &old_path);
            return Err(CatalogError::IndexMutation { operation: "update", id });
        }
        Ok(())
    }

    /// 把文本图书重新解码并以 UTF-8 写回，同时刷新索引中的大小和摘要
    pub fn change_encoding(&self, id: DocId) -> Result<EncodingChange, CatalogError> {
        let document = self.document(id)?;
        let path = self.absolute(&document.file_path);
        if Format::from_extension(&document.file_type) != Some(Format::Text) {
            return Err(CatalogError::Unsupported(path));
        }

        let original = fs::read(&path).map_err(|e| CatalogError::filesystem(&path, e))?;
        let (text, encoding) = transcode_to_utf8(&original);
        let converted = text.as_bytes();
        let rewritten = converted != original.as_slice();
        if rewritten {
            fs::write(&path, converted).map_err(|e| CatalogError::filesystem(&path, e))?;
            tracing::info!("{:?} 已从 {} 转为 UTF-8", path, encoding.name());
        } else {
            tracing::debug!("{:?} 已经是 UTF-8，无需转换", path);
        }

        let patch = DocumentPatch {
            file_size: Some(converted.len() as u64),
            summary: Some(normalize(&text, self.loader.summary_limit())),
            ..DocumentPatch::default()
        };
        if !self.gateway.update(id, &patch)? {
            return Err(CatalogError::IndexMutation { operation: "update", id });
        }
        Ok(EncodingChange {
            id,
            from: encoding.name(),
            rewritten,
            file_size: converted.len() as u64,
        })
    }

    /// 删除图书文件及其索引
    pub fn delete_book(&self, id: DocId) -> Result<(), CatalogError> {
        let document = self.document(id)?;
        let path = self.absolute(&document.file_path);
        fs::remove_file(&path).map_err(|e| CatalogError::filesystem(&path, e))?;
        if !self.gateway.delete(id)? {
            return Err(CatalogError::IndexMutation { operation: "delete", id });
        }
        Ok(())
    }

    fn document(&self, id: DocId) -> Result<Document, CatalogError> {
        self.gateway.get_by_id(id).ok_or(CatalogError::NotFound(id))
    }

    fn absolute(&self, file_path: &str) -> PathBuf {
        self.loader.root().join(file_path)
    }

    /// 索引更新失败后把文件移回原处
    fn restore(&self, moved: &Path, original: &Path) {
        if moved == original {
            return;
        }
        if let Err(e) = fs::rename(moved, original) {
            tracing::error!("无法把 {:?} 移回 {:?}: {}", moved, original, e);
        }
    }
}

fn into_books(results: Vec<SearchResult>) -> Vec<Book> {
    results.into_iter().map(Book::from).collect()
}

/// 结果为空时返回 `empty`
fn found(books: Vec<Book>, empty: CatalogError) -> Result<Vec<Book>, CatalogError> {
    if books.is_empty() { Err(empty) } else { Ok(books) }
}

/// 校验能否作为文件名或目录名的单个分量
fn path_component(field: &'static str, value: &str) -> Result<(), CatalogError> {
    let invalid = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\'])
        || value.contains('\0');
    if invalid {
        return Err(CatalogError::InvalidField {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// `[作者] 书名.扩展名`，作者为空时省略前缀
fn book_file_name(author: &str, title: &str, file_type: &str) -> String {
    if author.is_empty() {
        format!("{}.{}", title, file_type)
    } else {
        format!("[{}] {}.{}", author, title, file_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IndexConfig, LibraryConfig};
    use rstest::rstest;

    struct Fixture {
        _dir: tempfile::TempDir,
        root: PathBuf,
        service: CatalogService,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        for (category, name, body) in [
            ("Novels", "[Kim] Winter Garden.txt", "snow falls over the quiet winter garden"),
            ("Novels", "[Lee] Summer Rain.txt", "rain drums on the roof all summer long"),
            ("Essays", "Notes on Rust.txt", "ownership and borrowing make memory safe"),
        ] {
            fs::create_dir_all(root.join(category)).unwrap();
            fs::write(root.join(category).join(name), body).unwrap();
        }
        fs::write(root.join("Essays").join("cover.bin"), b"\x00\x01").unwrap();

        let config = CatalogConfig {
            library: LibraryConfig {
                root_dir: root.to_string_lossy().to_string(),
                ..LibraryConfig::default()
            },
            index: IndexConfig {
                storage_path: String::new(),
                ..IndexConfig::default()
            },
            ..CatalogConfig::default()
        };
        let service = CatalogService::open(&config).unwrap();
        Fixture { _dir: dir, root, service }
    }

    fn id_of(service: &CatalogService, title: &str) -> DocId {
        service
            .search_by_keyword(title, None)
            .unwrap()
            .into_iter()
            .find(|book| book.document.title == title)
            .map(|book| book.id)
            .unwrap()
    }

    #[test]
    fn test_initialize_loads_once() {
        let fx = fixture();
        let first = fx.service.initialize(None).unwrap();
        assert!(!first.skipped);
        assert_eq!(first.insert.submitted.len(), 3);
        assert_eq!(first.report.skipped(), 1);

        let second = fx.service.initialize(None).unwrap();
        assert!(second.skipped);
        assert_eq!(fx.service.gateway().count().unwrap(), 3);
    }

    #[test]
    fn test_get_missing_book() {
        let fx = fixture();
        fx.service.initialize(None).unwrap();
        assert!(matches!(fx.service.get_book(42), Err(CatalogError::NotFound(42))));
    }

    #[test]
    fn test_add_unsupported_file() {
        let fx = fixture();
        let path = fx.root.join("Essays").join("cover.bin");
        assert!(matches!(fx.service.add_book(&path), Err(CatalogError::Unsupported(_))));
    }

    #[test]
    fn test_add_book_is_searchable() {
        let fx = fixture();
        fx.service.initialize(None).unwrap();
        let path = fx.root.join("Essays").join("[Park] Tea Ceremony.txt");
        fs::write(&path, "green tea whisked in a bowl").unwrap();

        let id = fx.service.add_book(&path).unwrap();
        let book = fx.service.get_book(id).unwrap();
        assert_eq!(book.document.author, "Park");
        assert_eq!(book.document.category, "Essays");
    }

    #[rstest]
    #[case(1, 2, vec!["Winter Garden", "Summer Rain"])]
    #[case(1, 1, vec!["Winter Garden"])]
    #[case(2, 1, vec!["Summer Rain"])]
    fn test_books_in_category_pages(#[case] page: usize, #[case] size: usize, #[case] titles: Vec<&str>) {
        let fx = fixture();
        fx.service.initialize(None).unwrap();
        let books = fx.service.books_in_category("Novels", page, size).unwrap();
        let got: Vec<&str> = books.iter().map(|book| book.document.title.as_str()).collect();
        assert_eq!(got, titles);
    }

    #[test]
    fn test_books_in_category_empty_results() {
        let fx = fixture();
        fx.service.initialize(None).unwrap();
        assert!(matches!(
            fx.service.books_in_category("Novels", 3, 1),
            Err(CatalogError::NoResults)
        ));
        let missing = fx.service.books_in_category("Poetry", 1, 10).unwrap_err();
        assert!(matches!(missing, CatalogError::CategoryNotFound(ref name) if name == "Poetry"));
        assert_eq!(missing.to_string(), "No books found in 'Poetry'");
    }

    #[test]
    fn test_searches_without_matches_are_errors() {
        let fx = fixture();
        fx.service.initialize(None).unwrap();
        assert!(matches!(
            fx.service.search_by_keyword("zeppelin", None),
            Err(CatalogError::NoResults)
        ));
        assert!(matches!(
            fx.service.search_by_title("zeppelin", "", 0, None),
            Err(CatalogError::NoResults)
        ));
        let err = fx.service.search_by_summary("zeppelin", None).unwrap_err();
        assert_eq!(err.to_string(), "No books found");
    }

    #[test]
    fn test_similar_books_excludes_self() {
        let fx = fixture();
        fx.service.initialize(None).unwrap();
        let id = id_of(&fx.service, "Winter Garden");
        let similar = fx.service.similar_books(id, Some(10)).unwrap();
        assert!(!similar.is_empty());
        assert!(similar.iter().all(|book| book.id != id));
    }

    #[test]
    fn test_lone_book_has_no_similar_books() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("Solo")).unwrap();
        fs::write(dir.path().join("Solo").join("Only.txt"), "a single lonely book").unwrap();
        let config = CatalogConfig {
            library: LibraryConfig {
                root_dir: dir.path().to_string_lossy().to_string(),
                ..LibraryConfig::default()
            },
            index: IndexConfig {
                storage_path: String::new(),
                ..IndexConfig::default()
            },
            ..CatalogConfig::default()
        };
        let service = CatalogService::open(&config).unwrap();
        service.initialize(None).unwrap();
        let id = id_of(&service, "Only");

        let err = service.similar_books(id, None).unwrap_err();
        assert!(matches!(err, CatalogError::NoSimilarBooks));
        assert_eq!(err.to_string(), "No similar books found");
    }

    #[test]
    fn test_book_file_checks_path() {
        let fx = fixture();
        fx.service.initialize(None).unwrap();
        let id = id_of(&fx.service, "Summer Rain");
        let stored = fx.service.get_book(id).unwrap().document.file_path;

        let file = fx.service.book_file(id, &stored).unwrap();
        assert_eq!(file.media_type, "text/plain");
        assert!(file.path.is_file());
        assert!(matches!(
            fx.service.book_file(id, "Novels/other.txt"),
            Err(CatalogError::PathMismatch { .. })
        ));
    }

    #[test]
    fn test_update_book_moves_file() {
        let fx = fixture();
        fx.service.initialize(None).unwrap();
        let id = id_of(&fx.service, "Notes on Rust");

        let update = BookUpdate {
            category: Some("Novels".to_string()),
            title: Some("Rust Notes".to_string()),
            author: Some("Ferris".to_string()),
            ..BookUpdate::default()
        };
        fx.service.update_book(id, update).unwrap();

        let moved = fx.root.join("Novels").join("[Ferris] Rust Notes.txt");
        assert!(moved.is_file());
        assert!(!fx.root.join("Essays").join("Notes on Rust.txt").exists());
        let book = fx.service.get_book(id).unwrap();
        assert_eq!(book.document.category, "Novels");
        assert_eq!(book.document.file_path, Path::new("Novels").join("[Ferris] Rust Notes.txt").to_string_lossy());
        assert_eq!(book.document.summary, "ownership and borrowing make memory safe");
    }

    #[test]
    fn test_update_into_missing_category_leaves_index() {
        let fx = fixture();
        fx.service.initialize(None).unwrap();
        let id = id_of(&fx.service, "Summer Rain");
        let before = fx.service.get_book(id).unwrap().document;

        let update = BookUpdate {
            category: Some("Nowhere".to_string()),
            ..BookUpdate::default()
        };
        assert!(matches!(
            fx.service.update_book(id, update),
            Err(CatalogError::Filesystem { .. })
        ));
        assert_eq!(fx.service.get_book(id).unwrap().document, before);
        assert!(fx.root.join(&before.file_path).is_file());
    }

    #[rstest]
    #[case(BookUpdate { category: Some("..".to_string()), ..BookUpdate::default() }, "category")]
    #[case(BookUpdate { category: Some(String::new()), ..BookUpdate::default() }, "category")]
    #[case(BookUpdate { title: Some("../../escape".to_string()), ..BookUpdate::default() }, "title")]
    #[case(BookUpdate { title: Some("a/b".to_string()), ..BookUpdate::default() }, "title")]
    #[case(BookUpdate { author: Some("..\\up".to_string()), ..BookUpdate::default() }, "author")]
    #[case(BookUpdate { file_type: Some(".".to_string()), ..BookUpdate::default() }, "file_type")]
    fn test_update_rejects_path_components(#[case] update: BookUpdate, #[case] expected: &str) {
        let fx = fixture();
        fx.service.initialize(None).unwrap();
        let id = id_of(&fx.service, "Summer Rain");
        let before = fx.service.get_book(id).unwrap().document;

        match fx.service.update_book(id, update) {
            Err(CatalogError::InvalidField { field, .. }) => assert_eq!(field, expected),
            other => panic!("expected InvalidField, got {:?}", other),
        }
        assert_eq!(fx.service.get_book(id).unwrap().document, before);
        assert!(fx.root.join(&before.file_path).is_file());
    }

    #[test]
    fn test_update_with_empty_author_drops_prefix() {
        let fx = fixture();
        fx.service.initialize(None).unwrap();
        let id = id_of(&fx.service, "Summer Rain");
        let update = BookUpdate {
            author: Some(String::new()),
            ..BookUpdate::default()
        };
        fx.service.update_book(id, update).unwrap();
        assert!(fx.root.join("Novels").join("Summer Rain.txt").is_file());
    }

    #[test]
    fn test_change_encoding_rewrites_as_utf8() {
        let fx = fixture();
        fx.service.initialize(None).unwrap();
        let sample = "대한민국 헌법 제1조 대한민국은 민주공화국이다. 대한민국의 주권은 국민에게 있고, 모든 권력은 국민으로부터 나온다.";
        let (bytes, _, _) = encoding_rs::EUC_KR.encode(sample);
        let path = fx.root.join("Essays").join("[Park] Constitution.txt");
        fs::write(&path, &bytes).unwrap();
        let id = fx.service.add_book(&path).unwrap();

        let change = fx.service.change_encoding(id).unwrap();
        assert_eq!(change.from, "EUC-KR");
        assert!(change.rewritten);
        assert_eq!(fs::read_to_string(&path).unwrap(), sample);
        assert_eq!(change.file_size, sample.len() as u64);

        let book = fx.service.get_book(id).unwrap();
        assert_eq!(book.document.file_size, sample.len() as u64);
        assert!(book.document.summary.starts_with("대한민국 헌법"));

        let again = fx.service.change_encoding(id).unwrap();
        assert_eq!(again.from, "UTF-8");
        assert!(!again.rewritten);
    }

    #[test]
    fn test_change_encoding_only_for_text() {
        let fx = fixture();
        fx.service.initialize(None).unwrap();
        let path = fx.root.join("Essays").join("Harbor.html");
        fs::write(&path, "<p>ships at dawn</p>").unwrap();
        let id = fx.service.add_book(&path).unwrap();

        assert!(matches!(fx.service.change_encoding(id), Err(CatalogError::Unsupported(_))));
        assert_eq!(fs::read_to_string(&path).unwrap(), "<p>ships at dawn</p>");
    }

    #[test]
    fn test_delete_book_removes_file_and_index() {
        let fx = fixture();
        fx.service.initialize(None).unwrap();
        let id = id_of(&fx.service, "Winter Garden");
        let path = fx.root.join(fx.service.get_book(id).unwrap().document.file_path);

        fx.service.delete_book(id).unwrap();
        assert!(!path.exists());
        assert!(matches!(fx.service.get_book(id), Err(CatalogError::NotFound(_))));
    }

    #[test]
    fn test_delete_with_missing_file_keeps_index() {
        let fx = fixture();
        fx.service.initialize(None).unwrap();
        let id = id_of(&fx.service, "Winter Garden");
        let path = fx.root.join(fx.service.get_book(id).unwrap().document.file_path);
        fs::remove_file(&path).unwrap();

        assert!(matches!(fx.service.delete_book(id), Err(CatalogError::Filesystem { .. })));
        assert!(fx.service.get_book(id).is_ok());
    }

    #[rstest]
    #[case("Kim", "Winter", "txt", "[Kim] Winter.txt")]
    #[case("", "Winter", "pdf", "Winter.pdf")]
    fn test_book_file_name(#[case] author: &str, #[case] title: &str, #[case] ext: &str, #[case] expected: &str) {
        assert_eq!(book_file_name(author, title, ext), expected);
    }
}
