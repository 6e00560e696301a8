mod cli;
mod command;
mod config;
mod error;

use error::WrapErr;

use catalog_core::BookUpdate;
use clap::CommandFactory;
use clap::Parser;
use std::process::ExitCode;
use tracing::Level;

fn verbosity(count: u8) -> Level {
    match count {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

#[tokio::main]
async fn main() -> error::Result<ExitCode> {
    color_eyre::install()?;
    let command_line = cli::Cli::parse();

    // 日志写到标准错误，标准输出只留 JSON 结果
    tracing_subscriber::fmt()
        .with_max_level(verbosity(command_line.verbose))
        .with_writer(std::io::stderr)
        .init();

    let cfg = config::Config::load(command_line.config.as_deref()).context("Load configuration error")?;
    tracing::debug!("使用配置: {:?}", cfg);

    let Some(command) = command_line.command else {
        cli::Cli::command().print_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    use cli::Commands;
    use command::{LibraryTarget, ManageAction, QueryKind};
    let cmd: Box<dyn command::Command> = match command {
        Commands::Init { limit } => Box::new(command::LibraryCommand::new(cfg, LibraryTarget::Init { limit })),
        Commands::Load { dir, limit } => {
            Box::new(command::LibraryCommand::new(cfg, LibraryTarget::Directory { dir, limit }))
        }
        Commands::Add { file } => Box::new(command::LibraryCommand::new(cfg, LibraryTarget::File(file))),
        Commands::Get { id } => Box::new(command::QueryCommand::new(cfg, QueryKind::Get { id })),
        Commands::Categories => Box::new(command::QueryCommand::new(cfg, QueryKind::Categories)),
        Commands::List { category, page, page_size } => Box::new(command::QueryCommand::new(
            cfg,
            QueryKind::List { category, page, page_size },
        )),
        Commands::Search { keyword, max } => {
            Box::new(command::QueryCommand::new(cfg, QueryKind::Keyword { keyword, max: max.max }))
        }
        Commands::Title { title, file_type, file_size, max } => Box::new(command::QueryCommand::new(
            cfg,
            QueryKind::Title { title, file_type, file_size, max: max.max },
        )),
        Commands::Summary { text, max } => {
            Box::new(command::QueryCommand::new(cfg, QueryKind::Summary { text, max: max.max }))
        }
        Commands::Similar { id, max } => {
            Box::new(command::QueryCommand::new(cfg, QueryKind::Similar { id, max: max.max }))
        }
        Commands::File { id, path } => Box::new(command::QueryCommand::new(cfg, QueryKind::File { id, path })),
        Commands::Update { id, category, title, author, file_type, summary } => {
            let update = BookUpdate { category, title, author, file_type, summary };
            Box::new(command::ManageCommand::new(cfg, ManageAction::Update { id, update }))
        }
        Commands::Delete { id } => Box::new(command::ManageCommand::new(cfg, ManageAction::Delete { id })),
        Commands::Encoding { id } => {
            Box::new(command::ManageCommand::new(cfg, ManageAction::ChangeEncoding { id }))
        }
    };
    cmd.execute().await
}
