//! Corkboard CLI - Command-line interface for boards and sync
//!
//! Create boards, inspect the offline queue, and run sync cycles against the
//! remote API from the terminal.

mod cli;
mod commands;
mod error;
#[cfg(test)]
mod tests;

use clap::Parser;

use crate::cli::{Cli, Commands, QueueCommands};
use crate::commands::add::run_add;
use crate::commands::common::resolve_db_path;
use crate::commands::list::run_list;
use crate::commands::queue::{run_queue_clear, run_queue_list};
use crate::commands::status::run_status;
use crate::commands::sync::run_sync;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "corkboard=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);

    match cli.command {
        Commands::Add {
            title,
            tags,
            images,
        } => run_add(&title, &tags, &images, &db_path).await?,
        Commands::List { limit, json } => run_list(limit, json, &db_path).await?,
        Commands::Sync { boards, offline } => run_sync(&boards, offline, &db_path).await?,
        Commands::Status { json } => run_status(json, &db_path).await?,
        Commands::Queue { command } => match command {
            QueueCommands::List { json } => run_queue_list(json, &db_path).await?,
            QueueCommands::Clear => run_queue_clear(&db_path).await?,
        },
    }

    Ok(())
}
