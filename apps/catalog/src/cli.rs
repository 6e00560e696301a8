use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Increase verbosity. Can be used multiple times (e.g., -v, -vv, -vvv).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// 使用指定的配置文件，而不是平台配置目录下的 catalog.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

/// 结果条数
#[derive(Args, Debug, Clone, Copy)]
pub struct MaxResults {
    /// 最多返回的条数，默认取配置中的 default_max_results
    #[arg(short = 'n', long = "max")]
    pub max: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the index and load the library root when the index is empty
    Init {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Load every supported file under a directory
    Load {
        dir: PathBuf,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Add a single file
    Add { file: PathBuf },
    /// Show one book
    Get { id: u64 },
    /// List categories by book count
    Categories,
    /// List the books of a category
    List {
        category: String,
        /// 页码，从 1 开始
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long, default_value_t = 20)]
        page_size: usize,
    },
    /// Search title, author and summary
    Search {
        keyword: String,
        #[command(flatten)]
        max: MaxResults,
    },
    /// Search by title, optionally with file type and size
    Title {
        title: String,
        #[arg(long, default_value = "")]
        file_type: String,
        #[arg(long, default_value_t = 0)]
        file_size: u64,
        #[command(flatten)]
        max: MaxResults,
    },
    /// Search summaries
    Summary {
        text: String,
        #[command(flatten)]
        max: MaxResults,
    },
    /// Books similar to the given one
    Similar {
        id: u64,
        #[command(flatten)]
        max: MaxResults,
    },
    /// Resolve the file of a book for download
    File {
        id: u64,
        /// 索引中记录的相对路径
        path: String,
    },
    /// Change book information and move its file accordingly
    Update {
        id: u64,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        author: Option<String>,
        #[arg(long)]
        file_type: Option<String>,
        #[arg(long)]
        summary: Option<String>,
    },
    /// Delete a book and its file
    Delete { id: u64 },
    /// Re-decode a text book and rewrite it as UTF-8
    Encoding { id: u64 },
}
