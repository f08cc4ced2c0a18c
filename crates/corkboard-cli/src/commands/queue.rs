use std::path::Path;

use corkboard_core::store::SyncJournal;
use serde::Serialize;

use crate::commands::common::{board_preview, open_database};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct QueueItem {
    pub id: String,
    /// `None` when the queued board no longer exists locally
    pub title: Option<String>,
}

pub async fn run_queue_list(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;

    let mut items = Vec::new();
    for id in db.pending_ids().await? {
        let title = db
            .get_board(&id)
            .await?
            .map(|board| board_preview(&board, 40));
        items.push(QueueItem {
            id: id.to_string(),
            title,
        });
    }

    if as_json {
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else if items.is_empty() {
        println!("Offline queue is empty.");
    } else {
        for item in &items {
            println!(
                "{}  {}",
                item.id,
                item.title.as_deref().unwrap_or("(deleted locally)")
            );
        }
    }
    Ok(())
}

pub async fn run_queue_clear(db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let count = db.pending_ids().await?.len();
    db.clear_pending().await?;
    println!("Cleared {count} queued boards");
    Ok(())
}
