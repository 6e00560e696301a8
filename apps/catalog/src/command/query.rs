// apps/catalog/src/command/query.rs
//! 只读查询命令

use super::{Command, run_blocking};
use crate::config::Config;
use crate::error::Result;
use std::process::ExitCode;

#[derive(Debug, Clone)]
pub enum QueryKind {
    Get { id: u64 },
    Categories,
    List { category: String, page: usize, page_size: usize },
    Keyword { keyword: String, max: Option<usize> },
    Title { title: String, file_type: String, file_size: u64, max: Option<usize> },
    Summary { text: String, max: Option<usize> },
    Similar { id: u64, max: Option<usize> },
    File { id: u64, path: String },
}

pub struct QueryCommand {
    config: Config,
    kind: QueryKind,
}

impl QueryCommand {
    pub fn new(config: Config, kind: QueryKind) -> Self {
        Self { config, kind }
    }
}

#[async_trait::async_trait]
impl Command for QueryCommand {
    async fn execute(&self) -> Result<ExitCode> {
        let config = &self.config;
        match self.kind.clone() {
            QueryKind::Get { id } => run_blocking(config, move |service| service.get_book(id)).await,
            QueryKind::Categories => run_blocking(config, |service| Ok(service.categories())).await,
            QueryKind::List { category, page, page_size } => {
                run_blocking(config, move |service| service.books_in_category(&category, page, page_size)).await
            }
            QueryKind::Keyword { keyword, max } => {
                run_blocking(config, move |service| service.search_by_keyword(&keyword, max)).await
            }
            QueryKind::Title { title, file_type, file_size, max } => {
                run_blocking(config, move |service| service.search_by_title(&title, &file_type, file_size, max)).await
            }
            QueryKind::Summary { text, max } => {
                run_blocking(config, move |service| service.search_by_summary(&text, max)).await
            }
            QueryKind::Similar { id, max } => run_blocking(config, move |service| service.similar_books(id, max)).await,
            QueryKind::File { id, path } => run_blocking(config, move |service| service.book_file(id, &path)).await,
        }
    }
}
