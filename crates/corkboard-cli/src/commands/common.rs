use std::env;
use std::path::{Path, PathBuf};

use chrono::Utc;
use corkboard_core::services::DatabaseService;
use corkboard_core::{Board, BoardId};
use serde::Serialize;

use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct BoardListItem {
    pub id: String,
    pub title: String,
    pub caption: String,
    pub image_count: usize,
    pub created_at: i64,
    pub updated_at: i64,
    pub relative_time: String,
    pub sync_version: i64,
    pub tags: Vec<String>,
}

pub async fn open_database(path: &Path) -> Result<DatabaseService, CliError> {
    Ok(DatabaseService::open_path(path.to_path_buf()).await?)
}

pub async fn list_boards(limit: usize, db_path: &Path) -> Result<Vec<Board>, CliError> {
    let db = open_database(db_path).await?;
    let mut boards = db.list_boards().await?;
    boards.truncate(limit);
    Ok(boards)
}

/// Resolve a full board ID or a unique ID prefix.
pub async fn resolve_board_id(query: &str, db: &DatabaseService) -> Result<BoardId, CliError> {
    let query = normalize_board_identifier(query)?;
    if let Ok(board_id) = query.parse::<BoardId>() {
        if db.get_board(&board_id).await?.is_some() {
            return Ok(board_id);
        }
    }

    let matching_ids = db
        .list_boards()
        .await?
        .into_iter()
        .map(|board| board.id)
        .filter(|id| id.as_str().starts_with(&query))
        .take(3)
        .collect::<Vec<_>>();

    match matching_ids.as_slice() {
        [] => Err(CliError::BoardNotFound(query)),
        [id] => Ok(*id),
        _ => {
            let options = matching_ids
                .iter()
                .map(|id| short_id(*id))
                .collect::<Vec<_>>()
                .join(", ");

            Err(CliError::AmbiguousBoardId(format!(
                "ID prefix '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

pub fn short_id(id: BoardId) -> String {
    id.as_str().chars().take(13).collect()
}

pub fn format_board_lines(boards: &[Board]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    boards
        .iter()
        .map(|board| {
            let short_id = short_id(board.id);
            let title = board_preview(board, 40);
            let relative_time = format_relative_time(board.updated_at, now_ms);
            let images = format!("{} img", board.images.len());
            let tags = render_tags(board);

            if tags.is_empty() {
                format!("{short_id:<13}  {title:<40}  {images:<7}  {relative_time}")
            } else {
                format!("{short_id:<13}  {title:<40}  {images:<7}  {relative_time:<10}  {tags}")
            }
        })
        .collect()
}

pub fn board_to_list_item(board: &Board) -> BoardListItem {
    let now_ms = Utc::now().timestamp_millis();

    BoardListItem {
        id: board.id.to_string(),
        title: board.title.clone(),
        caption: board.caption.clone(),
        image_count: board.images.len(),
        created_at: board.created_at,
        updated_at: board.updated_at,
        relative_time: format_relative_time(board.updated_at, now_ms),
        sync_version: board.sync_version,
        tags: board.tags.iter().cloned().collect(),
    }
}

pub fn board_preview(board: &Board, max_chars: usize) -> String {
    let collapsed = board.title.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.is_empty() {
        "(untitled)".to_string()
    } else if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn render_tags(board: &Board) -> String {
    board
        .tags
        .iter()
        .map(|tag| format!("#{tag}"))
        .collect::<Vec<String>>()
        .join(" ")
}

pub fn format_sync_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

pub fn normalize_title(parts: &[String]) -> Result<String, CliError> {
    let title = parts.join(" ");
    let trimmed = title.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyTitle)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn normalize_board_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyBoardId)
    } else {
        Ok(trimmed.to_string())
    }
}

/// Image mime type from a file extension.
pub fn image_mime_type(path: &Path) -> Result<&'static str, CliError> {
    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("png") => Ok("image/png"),
        Some("jpg" | "jpeg") => Ok("image/jpeg"),
        Some("gif") => Ok("image/gif"),
        Some("webp") => Ok("image/webp"),
        Some("heic") => Ok("image/heic"),
        _ => Err(CliError::UnsupportedImage(path.display().to_string())),
    }
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("CORKBOARD_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("corkboard")
        .join("corkboard.db")
}
