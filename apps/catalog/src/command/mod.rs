pub mod library;
pub mod manage;
pub mod query;

use crate::config::Config;
use crate::error::{Result, WrapErr};
use catalog_core::{CatalogError, CatalogService};
use serde::Serialize;
use std::process::ExitCode;

pub use library::{LibraryCommand, LibraryTarget};
pub use manage::{ManageAction, ManageCommand};
pub use query::{QueryCommand, QueryKind};

#[async_trait::async_trait]
pub trait Command {
    async fn execute(&self) -> Result<ExitCode>;
}

/// 标准输出上的 JSON 响应
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum Envelope<T> {
    Ok { result: T },
    Error { error: String },
}

/// 把操作结果打印为 JSON，操作失败时返回非零退出码
fn respond<T: Serialize>(outcome: std::result::Result<T, CatalogError>) -> Result<ExitCode> {
    let (envelope, code) = match outcome {
        Ok(result) => (Envelope::Ok { result }, ExitCode::SUCCESS),
        Err(e) => {
            tracing::debug!("操作失败: {:?}", e);
            (Envelope::Error { error: e.to_string() }, ExitCode::FAILURE)
        }
    };
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(code)
}

/// 在阻塞线程中打开服务并执行操作
async fn run_blocking<T, F>(config: &Config, operation: F) -> Result<ExitCode>
where
    T: Serialize + Send + 'static,
    F: FnOnce(&CatalogService) -> std::result::Result<T, CatalogError> + Send + 'static,
{
    let catalog = config.catalog.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let service = CatalogService::open(&catalog)?;
        operation(&service)
    })
    .await
    .wrap_err("Catalog task panicked")?;
    respond(outcome)
}
