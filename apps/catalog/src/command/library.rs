// apps/catalog/src/command/library.rs
//! 加载图书：初始化、目录加载和单文件添加

use super::{Command, run_blocking};
use crate::config::Config;
use crate::error::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum LibraryTarget {
    /// 索引为空时加载根目录
    Init { limit: Option<usize> },
    /// 加载指定目录
    Directory { dir: PathBuf, limit: Option<usize> },
    /// 添加单个文件
    File(PathBuf),
}

pub struct LibraryCommand {
    config: Config,
    target: LibraryTarget,
}

impl LibraryCommand {
    pub fn new(config: Config, target: LibraryTarget) -> Self {
        Self { config, target }
    }
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::with_template("{spinner} 加载中 [{elapsed}] | 文件 {pos}/{len} ({percent}%)") {
        pb.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

#[async_trait::async_trait]
impl Command for LibraryCommand {
    async fn execute(&self) -> Result<ExitCode> {
        match self.target.clone() {
            LibraryTarget::Init { limit } => {
                let pb = progress_bar();
                let bar = pb.clone();
                let code = run_blocking(&self.config, move |service| {
                    service.initialize_with_progress(limit, move |visited, total| {
                        bar.set_length(total as u64);
                        bar.set_position(visited as u64);
                    })
                })
                .await;
                pb.finish_and_clear();
                code
            }
            LibraryTarget::Directory { dir, limit } => {
                let pb = progress_bar();
                let bar = pb.clone();
                let code = run_blocking(&self.config, move |service| {
                    service.reindex_with_progress(&dir, limit, move |visited, total| {
                        bar.set_length(total as u64);
                        bar.set_position(visited as u64);
                    })
                })
                .await;
                pb.finish_and_clear();
                code
            }
            LibraryTarget::File(path) => run_blocking(&self.config, move |service| service.add_book(&path)).await,
        }
    }
}
