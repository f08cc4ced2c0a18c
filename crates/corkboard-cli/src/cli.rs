use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "corkboard")]
#[command(about = "Manage and sync Corkboard boards from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a board, optionally placing images on it
    #[command(alias = "new")]
    Add {
        /// Board title
        title: Vec<String>,
        /// Category tag (repeatable)
        #[arg(short, long = "tag", value_name = "TAG")]
        tags: Vec<String>,
        /// Image file to place on the board (repeatable)
        #[arg(short, long = "image", value_name = "PATH")]
        images: Vec<PathBuf>,
    },
    /// List local boards
    List {
        /// Number of boards to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Push local changes and pull remote boards
    Sync {
        /// Only push these boards (ID or unique ID prefix)
        boards: Vec<String>,
        /// Treat the network as unavailable and queue the boards instead
        #[arg(long)]
        offline: bool,
    },
    /// Show the sync watermark and offline queue summary
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Inspect or reset the offline queue
    Queue {
        #[command(subcommand)]
        command: QueueCommands,
    },
}

#[derive(Subcommand)]
pub enum QueueCommands {
    /// List boards waiting for the next sync
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Forget every queued board
    Clear,
}
