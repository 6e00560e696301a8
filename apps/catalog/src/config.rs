use crate::error::{Result, WrapErr};
use catalog_core::CatalogConfig;
use config::{cache_dir, config_file, constants, create_strategy};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default = "default_config", deny_unknown_fields)]
pub struct Config {
    /// 相对的索引目录在此目录下解析
    pub cache_dir: PathBuf,
    /// 图书目录配置，结构与 catalog-core 的 CatalogConfig 相同
    pub catalog: CatalogConfig,
}

fn default_config() -> Config {
    let cache_dir = match create_strategy() {
        Ok(strategy) => cache_dir(&strategy),
        Err(_) => std::env::temp_dir().join(constants::APP_NAME),
    };
    Config {
        cache_dir,
        catalog: CatalogConfig::default(),
    }
}

impl Config {
    fn load_str(user_config_str: &str) -> Result<Config> {
        let user_config: Config = toml::from_str(user_config_str)?;
        Ok(user_config.resolve(std::env::var_os(constants::ROOT_ENV)))
    }

    /// 读取配置文件，`path` 为空时使用平台配置目录，文件不存在时创建示例
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => config_file(&create_strategy()?),
        };

        match std::fs::read_to_string(&config_path) {
            Ok(user_config_str) => {
                Self::load_str(&user_config_str).wrap_err_with(|| format!("Invalid configuration {:?}", config_path))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Self::create_example_config(&config_path)?;
                Self::load_str("")
            }
            Err(e) => Err(e.into()),
        }
    }

    /// 应用环境变量覆盖，并把相对的索引目录放到缓存目录下
    fn resolve(mut self, root_override: Option<OsString>) -> Self {
        if let Some(root) = root_override.filter(|root| !root.is_empty()) {
            self.catalog.library.root_dir = root.to_string_lossy().to_string();
        }
        let storage = &self.catalog.index.storage_path;
        if !storage.is_empty() && Path::new(storage).is_relative() {
            let resolved = self.cache_dir.join(storage.trim_start_matches("./"));
            self.catalog.index.storage_path = resolved.to_string_lossy().to_string();
        }
        self
    }

    fn create_example_config(config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let example_config = r#"# catalog 配置文件
#
# 此文件在首次运行时自动创建
# 环境变量 CATALOG_ROOT 覆盖 root_dir，CACHE_DIRECTORY 覆盖默认缓存目录

# 可选：自定义缓存目录，相对的 storage_path 在此目录下解析
# cache-dir = "/custom/cache/path"

[catalog.library]
# 图书根目录，每个一级子目录是一个分类，文件名约定为 "[作者] 书名.扩展名"
root_dir = "./books"
# 摘要最大字符数
# summary_limit = 4096
# limit 的计数方式: "indexed" 只计入成功读取的文件，"visited" 计入遍历到的每个文件
# limit_policy = "indexed"

[catalog.index]
# 索引目录，为空字符串时使用内存索引
# storage_path = "storage"
# max_result_window = 10000
# scroll_ttl_secs = 600
# bulk_batch_size = 1000
# bulk_timeout_secs = 60

[catalog.query]
# default_max_results = 10
# similar_summary_chars = 3500
"#;

        std::fs::write(config_path, example_config)?;

        eprintln!("\n📝 已创建配置文件: {:?}", config_path);
        eprintln!("💡 请编辑配置文件，设置图书根目录 root_dir");
        eprintln!("   然后运行: catalog init\n");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Config {
        let config: Config = toml::from_str(text).unwrap();
        config
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = parse("");
        assert_eq!(config.catalog.library.root_dir, "./books");
        assert_eq!(config.catalog.index.max_result_window, 10_000);
    }

    #[test]
    fn test_unknown_top_level_key_is_rejected() {
        assert!(toml::from_str::<Config>("watch-paths = []").is_err());
    }

    #[test]
    fn test_relative_storage_moves_under_cache_dir() {
        let config = parse("cache-dir = \"/var/cache/catalog\"\n[catalog.index]\nstorage_path = \"./storage\"\n");
        let resolved = config.resolve(None);
        assert_eq!(
            PathBuf::from(&resolved.catalog.index.storage_path),
            PathBuf::from("/var/cache/catalog/storage")
        );
    }

    #[test]
    fn test_absolute_and_memory_storage_are_kept() {
        let absolute = parse("[catalog.index]\nstorage_path = \"/srv/index\"\n").resolve(None);
        assert_eq!(absolute.catalog.index.storage_path, "/srv/index");
        let memory = parse("[catalog.index]\nstorage_path = \"\"\n").resolve(None);
        assert_eq!(memory.catalog.index.storage_path, "");
    }

    #[test]
    fn test_root_override() {
        let config = parse("[catalog.library]\nroot_dir = \"/srv/books\"\n");
        let resolved = config.resolve(Some(OsString::from("/mnt/library")));
        assert_eq!(resolved.catalog.library.root_dir, "/mnt/library");

        let untouched = parse("[catalog.library]\nroot_dir = \"/srv/books\"\n").resolve(Some(OsString::new()));
        assert_eq!(untouched.catalog.library.root_dir, "/srv/books");
    }

    #[test]
    fn test_example_config_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(constants::CONFIG_FILE_NAME);
        Config::create_example_config(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let config = parse(&text);
        assert_eq!(config.catalog.library.root_dir, "./books");
    }
}
