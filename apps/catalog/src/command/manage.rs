// apps/catalog/src/command/manage.rs
//! 修改、删除图书和转换文本编码

use super::{Command, run_blocking};
use crate::config::Config;
use crate::error::Result;
use catalog_core::BookUpdate;
use serde::Serialize;
use std::process::ExitCode;

#[derive(Debug, Clone)]
pub enum ManageAction {
    Update { id: u64, update: BookUpdate },
    Delete { id: u64 },
    ChangeEncoding { id: u64 },
}

/// 修改类操作成功时的输出
#[derive(Debug, Serialize)]
struct Done {
    id: u64,
}

pub struct ManageCommand {
    config: Config,
    action: ManageAction,
}

impl ManageCommand {
    pub fn new(config: Config, action: ManageAction) -> Self {
        Self { config, action }
    }
}

#[async_trait::async_trait]
impl Command for ManageCommand {
    async fn execute(&self) -> Result<ExitCode> {
        match self.action.clone() {
            ManageAction::Update { id, update } => {
                tracing::info!("更新图书 {}: {:?}", id, update);
                run_blocking(&self.config, move |service| service.update_book(id, update).map(|_| Done { id })).await
            }
            ManageAction::Delete { id } => {
                tracing::info!("删除图书 {}", id);
                run_blocking(&self.config, move |service| service.delete_book(id).map(|_| Done { id })).await
            }
            ManageAction::ChangeEncoding { id } => {
                tracing::info!("转换图书 {} 的编码", id);
                run_blocking(&self.config, move |service| service.change_encoding(id)).await
            }
        }
    }
}
