pub const TOP_LEVEL_DOMAIN: &str = "org";
pub const AUTHOR: &str = "catalog";
pub const APP_NAME: &str = "catalog";

/// 配置文件名，位于平台配置目录下
pub const CONFIG_FILE_NAME: &str = "catalog.toml";

/// 覆盖图书根目录
pub const ROOT_ENV: &str = "CATALOG_ROOT";
/// 覆盖缓存目录（索引默认存放处）
pub const CACHE_ENV: &str = "CACHE_DIRECTORY";
