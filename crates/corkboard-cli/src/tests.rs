use std::path::{Path, PathBuf};

use corkboard_core::hash::ContentHasher;
use corkboard_core::state::{SyncState, SyncStatus};
use corkboard_core::Board;
use tempfile::tempdir;

use crate::commands::add::build_board;
use crate::commands::common::{
    board_preview, board_to_list_item, format_board_lines, format_relative_time,
    format_sync_timestamp, image_mime_type, list_boards, normalize_board_identifier,
    normalize_title, open_database, resolve_board_id, resolve_db_path, short_id,
};
use crate::commands::status::{format_status_lines, StatusReport};
use crate::commands::sync::sync_outcome_message;
use crate::error::CliError;

#[test]
fn format_relative_time_units() {
    let now = 10_000_000;
    assert_eq!(format_relative_time(now - 30_000, now), "just now");
    assert_eq!(format_relative_time(now - 120_000, now), "2m ago");
    assert_eq!(format_relative_time(now - 2 * 60 * 60_000, now), "2h ago");
}

#[test]
fn board_preview_truncates_with_ellipsis() {
    let board = Board::new("This is a very long board title that should be shortened");
    assert_eq!(board_preview(&board, 20), "This is a very lo...");
    assert_eq!(board_preview(&Board::new("  "), 20), "(untitled)");
}

#[test]
fn format_sync_timestamp_returns_utc_label() {
    assert_eq!(format_sync_timestamp(0), "1970-01-01 00:00:00 UTC");
}

#[test]
fn normalize_title_joins_and_rejects_empty() {
    let parts = vec!["  Summer".to_string(), "trip ".to_string()];
    assert_eq!(normalize_title(&parts).unwrap(), "Summer trip");
    assert!(matches!(
        normalize_title(&[" ".to_string()]),
        Err(CliError::EmptyTitle)
    ));
}

#[test]
fn normalize_board_identifier_rejects_empty() {
    assert!(matches!(
        normalize_board_identifier("   "),
        Err(CliError::EmptyBoardId)
    ));
    assert_eq!(normalize_board_identifier(" abc ").unwrap(), "abc");
}

#[test]
fn image_mime_type_maps_known_extensions() {
    assert_eq!(image_mime_type(Path::new("a.PNG")).unwrap(), "image/png");
    assert_eq!(image_mime_type(Path::new("b.jpeg")).unwrap(), "image/jpeg");
    assert!(matches!(
        image_mime_type(Path::new("notes.txt")),
        Err(CliError::UnsupportedImage(_))
    ));
}

#[test]
fn resolve_db_path_prefers_cli_argument() {
    let explicit = PathBuf::from("/tmp/explicit.db");
    assert_eq!(resolve_db_path(Some(explicit.clone())), explicit);
}

#[test]
fn board_lines_include_image_count_and_tags() {
    let mut board = Board::new("Moodboard");
    board.add_tag("Design");

    let lines = format_board_lines(&[board.clone()]);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with(&short_id(board.id)));
    assert!(lines[0].contains("0 img"));
    assert!(lines[0].contains("#design"));

    let item = board_to_list_item(&board);
    assert_eq!(item.tags, vec!["design".to_string()]);
    assert_eq!(item.image_count, 0);
}

#[test]
fn sync_outcome_message_reflects_status() {
    let synced = SyncState {
        status: SyncStatus::Synced,
        last_sync_at: Some(1),
    };
    assert_eq!(
        sync_outcome_message(&synced, 3, 0).unwrap(),
        "Sync completed (3 boards up to date)"
    );

    let offline = SyncState {
        status: SyncStatus::Offline,
        last_sync_at: None,
    };
    assert_eq!(
        sync_outcome_message(&offline, 0, 2).unwrap(),
        "Offline: 2 boards queued for the next sync"
    );

    let failed = SyncState {
        status: SyncStatus::Error,
        last_sync_at: None,
    };
    assert!(matches!(
        sync_outcome_message(&failed, 0, 0),
        Err(CliError::SyncFailed)
    ));
}

#[test]
fn status_lines_show_never_synced_and_queue() {
    let report = StatusReport {
        db_path: "/tmp/corkboard.db".to_string(),
        boards: 4,
        last_sync_at: None,
        pending: 2,
        queued_at: Some(0),
        remote_configured: false,
    };

    let lines = format_status_lines(&report, 120_000);
    assert!(lines.contains(&"Last sync:  never".to_string()));
    assert!(lines.contains(&"Queued:     2".to_string()));
    assert!(lines
        .iter()
        .any(|line| line.starts_with("Queued at:") && line.contains("2m ago")));
    assert!(lines.contains(&"Remote:     not configured".to_string()));
}

#[tokio::test(flavor = "current_thread")]
async fn build_board_hashes_image_files() {
    let dir = tempdir().unwrap();
    let image_path = dir.path().join("photo.png");
    std::fs::write(&image_path, b"not-really-a-png").unwrap();

    let board = build_board(
        "Trip".to_string(),
        &["Travel".to_string()],
        &[image_path],
        &ContentHasher::default(),
    )
    .await
    .unwrap();

    assert_eq!(board.images.len(), 1);
    assert_eq!(board.images[0].mime_type, "image/png");
    assert_eq!(
        board.images[0].hash,
        ContentHasher::default().hash(b"not-really-a-png")
    );
    assert!(board.tags.contains("travel"));
}

#[tokio::test(flavor = "current_thread")]
async fn list_boards_respects_limit() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("corkboard.db");
    {
        let db = open_database(&db_path).await.unwrap();
        for title in ["One", "Two", "Three"] {
            db.save_board(&Board::new(title)).await.unwrap();
        }
    }

    let boards = list_boards(2, &db_path).await.unwrap();
    assert_eq!(boards.len(), 2);
}

#[tokio::test(flavor = "current_thread")]
async fn resolve_board_id_supports_exact_and_prefix_id() {
    let dir = tempdir().unwrap();
    let db = open_database(&dir.path().join("corkboard.db")).await.unwrap();
    let board = Board::new("Findable");
    db.save_board(&board).await.unwrap();

    let full = board.id.to_string();
    assert_eq!(resolve_board_id(&full, &db).await.unwrap(), board.id);
    assert_eq!(resolve_board_id(&full[..13], &db).await.unwrap(), board.id);
    assert!(matches!(
        resolve_board_id("ffffffff", &db).await,
        Err(CliError::BoardNotFound(_))
    ));
}
