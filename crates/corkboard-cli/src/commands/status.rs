use std::path::Path;

use chrono::Utc;
use corkboard_core::store::SyncJournal;
use serde::Serialize;

use crate::commands::common::{format_relative_time, format_sync_timestamp, open_database};
use crate::error::CliError;

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct StatusReport {
    pub db_path: String,
    pub boards: usize,
    pub last_sync_at: Option<i64>,
    pub pending: usize,
    pub queued_at: Option<i64>,
    pub remote_configured: bool,
}

pub async fn run_status(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let remote_configured = corkboard_core::config::RemoteConfig::from_env()?.is_some();

    let report = StatusReport {
        db_path: db_path.display().to_string(),
        boards: db.list_boards().await?.len(),
        last_sync_at: db.last_sync_at().await?,
        pending: db.pending_ids().await?.len(),
        queued_at: db.queued_at().await?,
        remote_configured,
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in format_status_lines(&report, Utc::now().timestamp_millis()) {
            println!("{line}");
        }
    }
    Ok(())
}

pub fn format_status_lines(report: &StatusReport, now_ms: i64) -> Vec<String> {
    let last_sync = report.last_sync_at.map_or_else(
        || "never".to_string(),
        |timestamp| {
            format!(
                "{} ({})",
                format_sync_timestamp(timestamp),
                format_relative_time(timestamp, now_ms)
            )
        },
    );

    let mut lines = vec![
        format!("Database:   {}", report.db_path),
        format!("Boards:     {}", report.boards),
        format!("Last sync:  {last_sync}"),
        format!("Queued:     {}", report.pending),
    ];
    if let Some(queued_at) = report.queued_at {
        lines.push(format!(
            "Queued at:  {} ({})",
            format_sync_timestamp(queued_at),
            format_relative_time(queued_at, now_ms)
        ));
    }
    if !report.remote_configured {
        lines.push("Remote:     not configured".to_string());
    }
    lines
}
