use std::path::{Path, PathBuf};

use corkboard_core::config::EngineConfig;
use corkboard_core::hash::ContentHasher;
use corkboard_core::models::CanvasImageRef;
use corkboard_core::Board;

use crate::commands::common::{image_mime_type, normalize_title, open_database, short_id};
use crate::error::CliError;

pub async fn run_add(
    title_parts: &[String],
    tags: &[String],
    images: &[PathBuf],
    db_path: &Path,
) -> Result<(), CliError> {
    let title = normalize_title(title_parts)?;
    let hasher = ContentHasher::new(EngineConfig::from_env()?.hash_strategy);
    let board = build_board(title, tags, images, &hasher).await?;

    let db = open_database(db_path).await?;
    db.save_board(&board).await?;

    println!("Created board {}", short_id(board.id));
    Ok(())
}

pub async fn build_board(
    title: String,
    tags: &[String],
    images: &[PathBuf],
    hasher: &ContentHasher,
) -> Result<Board, CliError> {
    let mut board = Board::new(title);
    for tag in tags {
        board.add_tag(tag);
    }

    for path in images {
        let mime_type = image_mime_type(path)?;
        let bytes = tokio::fs::read(path).await?;
        // Natural size is filled in by the editor on first open
        let image = CanvasImageRef::from_bytes(bytes, mime_type, 0, 0, hasher)?;
        board.add_image(image);
    }

    Ok(board)
}
