//! 平台目录解析
//!
//! 环境变量优先，其次是平台约定目录，最后退回临时目录

pub mod constants;

pub use etcetera::AppStrategy;
use etcetera::{AppStrategyArgs, choose_app_strategy};

use std::env;
use std::path::PathBuf;

pub fn create_strategy() -> std::result::Result<impl AppStrategy, etcetera::HomeDirError> {
    choose_app_strategy(AppStrategyArgs {
        top_level_domain: constants::TOP_LEVEL_DOMAIN.to_string(),
        author: constants::AUTHOR.to_string(),
        app_name: constants::APP_NAME.to_string(),
    })
}

pub fn resolve_dir<S, F>(env_key: &str, strategy: &S, strategy_fn: F) -> PathBuf
where
    S: AppStrategy,
    F: FnOnce(&S) -> Option<PathBuf>,
{
    env::var_os(env_key)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .or_else(|| strategy_fn(strategy))
        .unwrap_or_else(|| env::temp_dir().join(constants::APP_NAME))
}

/// 配置文件的完整路径
pub fn config_file<S: AppStrategy>(strategy: &S) -> PathBuf {
    strategy.config_dir().join(constants::CONFIG_FILE_NAME)
}

/// 缓存目录，`CACHE_DIRECTORY` 优先
pub fn cache_dir<S: AppStrategy>(strategy: &S) -> PathBuf {
    resolve_dir(constants::CACHE_ENV, strategy, |s| Some(s.cache_dir()))
}
