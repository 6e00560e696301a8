// catalog-core/src/config.rs
//! 配置模块

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::extract::IMAGE_EXTENSIONS;
use crate::loader::LimitPolicy;

/// 图书目录配置
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub library: LibraryConfig,
    pub index: IndexConfig,
    pub query: QueryConfig,
}

/// 文件库配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// 根目录，每个一级子目录是一个分类
    pub root_dir: String,
    /// 摘要最大字符数
    pub summary_limit: usize,
    pub limit_policy: LimitPolicy,
    /// 视为图片的扩展名（不提取文本）
    pub image_extensions: Vec<String>,
}

/// 索引配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IndexConfig {
    /// 索引目录，为空时使用内存索引
    pub storage_path: String,
    pub writer_memory: usize,
    /// 单次查询最多返回的条数，超过时使用滚动游标
    pub max_result_window: usize,
    pub scroll_ttl_secs: u64,
    pub bulk_batch_size: usize,
    pub bulk_timeout_secs: u64,
}

/// 查询配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QueryConfig {
    pub default_max_results: usize,
    /// 相似查询使用的摘要前缀长度
    pub similar_summary_chars: usize,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            root_dir: "./books".to_string(),
            summary_limit: 4096,
            limit_policy: LimitPolicy::default(),
            image_extensions: IMAGE_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            storage_path: "./storage".to_string(),
            writer_memory: 50_000_000,
            max_result_window: 10_000,
            scroll_ttl_secs: 600,
            bulk_batch_size: 1000,
            bulk_timeout_secs: 60,
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_max_results: 10,
            similar_summary_chars: 3500,
        }
    }
}

impl IndexConfig {
    pub fn scroll_ttl(&self) -> Duration {
        Duration::from_secs(self.scroll_ttl_secs)
    }

    pub fn bulk_timeout(&self) -> Duration {
        Duration::from_secs(self.bulk_timeout_secs)
    }
}

impl CatalogConfig {
    /// 从 TOML 文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: CatalogConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// 尝试加载配置，失败则使用默认值
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::load_from_file(path).unwrap_or_default()
    }
}
