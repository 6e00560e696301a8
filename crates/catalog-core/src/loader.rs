// catalog-core/src/loader.rs
//! 文件加载
//!
//! 遍历目录，按路径约定推导文档元数据，调用提取器生成摘要

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::config::LibraryConfig;
use crate::extract::{self, Format};
use crate::schema::{DocId, Document};
use crate::stats::{ExtractStat, LoadReport};

/// `[作者] 书名` 命名约定
static AUTHOR_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[(?P<author>[^\]]+)\]\s*(?P<title>.+)$").unwrap());

/// `limit` 的计数方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitPolicy {
    /// 只统计生成了文档的文件
    #[default]
    Indexed,
    /// 统计遍历到的每个文件，包括被跳过的
    Visited,
}

/// 一次目录加载的结果
#[derive(Debug, Default)]
pub struct LoadedBatch {
    pub documents: BTreeMap<DocId, Document>,
    pub report: LoadReport,
}

/// 文件加载器
#[derive(Debug, Clone)]
pub struct Loader {
    root: PathBuf,
    summary_limit: usize,
    image_extensions: Vec<String>,
}

impl Loader {
    pub fn new(root: impl Into<PathBuf>, summary_limit: usize) -> Self {
        Self {
            root: root.into(),
            summary_limit,
            image_extensions: extract::IMAGE_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
        }
    }

    pub fn from_config(config: &LibraryConfig) -> Self {
        Self {
            root: PathBuf::from(&config.root_dir),
            summary_limit: config.summary_limit,
            image_extensions: config.image_extensions.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn summary_limit(&self) -> usize {
        self.summary_limit
    }

    /// 识别文件格式，不支持时返回 None
    pub fn format_of(&self, path: &Path) -> Option<Format> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        Format::from_extension_with_images(&ext, &self.image_extensions)
    }

    /// 读取单个文件
    ///
    /// 不支持的扩展名、目录和不存在的文件返回空映射
    pub fn read_file(&self, path: &Path) -> BTreeMap<DocId, Document> {
        self.load_one(path)
            .map(|(id, doc, _)| (id, doc))
            .into_iter()
            .collect()
    }

    /// 递归读取目录下的文件
    pub fn read_files(&self, dir: &Path, limit: Option<usize>, policy: LimitPolicy) -> LoadedBatch {
        self.read_files_with_progress(dir, limit, policy, |_, _| {})
    }

    /// 递归读取目录下的文件（带进度回调）
    ///
    /// 回调参数为（已处理文件数，文件总数）。给出 `limit` 时不预先遍历整棵树，
    /// 总数即 `limit`，进度按计入上限的文件数报告
    pub fn read_files_with_progress<F>(
        &self,
        dir: &Path,
        limit: Option<usize>,
        policy: LimitPolicy,
        progress_callback: F,
    ) -> LoadedBatch
    where
        F: Fn(usize, usize),
    {
        let total_files = match limit {
            Some(limit) => limit,
            None => count_files(dir),
        };
        tracing::info!("正在扫描 {:?} (预计 {} 个文件)", dir, total_files);

        let mut batch = LoadedBatch::default();
        let mut counted = 0usize;
        let mut visited = 0usize;

        for entry in WalkDir::new(dir).sort_by_file_name() {
            if limit.is_some_and(|limit| counted >= limit) {
                break;
            }
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("遍历目录出错，已跳过: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            visited += 1;
            match self.load_one(entry.path()) {
                Some((id, doc, stat)) => {
                    batch.report.record(stat);
                    if batch.documents.insert(id, doc).is_some() {
                        tracing::debug!("文档 ID {} 重复，后读到的文件覆盖先前的", id);
                    }
                    counted += 1;
                }
                None => {
                    batch.report.record_skipped();
                    if policy == LimitPolicy::Visited {
                        counted += 1;
                    }
                }
            }
            let done = if limit.is_some() { counted } else { visited };
            progress_callback(done, total_files);
        }

        tracing::info!("扫描完成，共读取 {} 个文档 {}", batch.documents.len(), batch.report);
        batch
    }

    fn load_one(&self, path: &Path) -> Option<(DocId, Document, ExtractStat)> {
        let metadata = match fs::metadata(path) {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return None,
            Err(e) => {
                tracing::debug!("无法读取文件信息 {:?}: {}", path, e);
                return None;
            }
        };
        let format = self.format_of(path)?;

        let file_type = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_default();
        let (author, title) = parse_author_title(&stem);
        let category = path
            .parent()
            .and_then(|parent| parent.file_name())
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();

        let extraction = extract::extract(path, format, self.summary_limit);

        let document = Document {
            category,
            title,
            author,
            file_path: relative_path(&self.root, path),
            file_type,
            file_size: metadata.len(),
            summary: extraction.text,
            updated_time: Utc::now(),
        };
        Some((file_identity(&metadata, path), document, extraction.stat))
    }
}

/// 按 `[作者] 书名` 拆分文件名，返回 (作者, 书名)
pub fn parse_author_title(stem: &str) -> (String, String) {
    match AUTHOR_TITLE.captures(stem) {
        Some(caps) => (caps["author"].to_string(), caps["title"].to_string()),
        None => (String::new(), stem.to_string()),
    }
}

/// 相对于根目录的路径；不在根目录下时保留原路径
pub fn relative_path(root: &Path, path: &Path) -> String {
    if let Ok(relative) = path.strip_prefix(root) {
        return relative.to_string_lossy().to_string();
    }
    match (root.canonicalize(), path.canonicalize()) {
        (Ok(root), Ok(path)) => path
            .strip_prefix(&root)
            .map(|relative| relative.to_string_lossy().to_string())
            .unwrap_or_else(|_| path.to_string_lossy().to_string()),
        _ => path.to_string_lossy().to_string(),
    }
}

#[cfg(unix)]
fn file_identity(metadata: &fs::Metadata, _path: &Path) -> DocId {
    use std::os::unix::fs::MetadataExt;
    metadata.ino()
}

#[cfg(not(unix))]
fn file_identity(_metadata: &fs::Metadata, path: &Path) -> DocId {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let mut hasher = DefaultHasher::new();
    canonical.hash(&mut hasher);
    hasher.finish()
}

fn count_files(dir: &Path) -> usize {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .count()
}
