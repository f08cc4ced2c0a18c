//! Sync status shared by the engine and its observers.

use serde::{Deserialize, Serialize};

/// Connectivity-aware status of the sync engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    #[default]
    Idle,
    Syncing,
    Synced,
    Offline,
    Error,
}

impl SyncStatus {
    /// Short label for status lines.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Syncing => "syncing",
            Self::Synced => "synced",
            Self::Offline => "offline",
            Self::Error => "error",
        }
    }
}

/// Current sync status plus the incremental push watermark.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    pub status: SyncStatus,
    /// Unix ms of the last fully successful cycle; `None` until the first one.
    pub last_sync_at: Option<i64>,
}

impl SyncState {
    #[must_use]
    pub const fn with_watermark(last_sync_at: Option<i64>) -> Self {
        Self {
            status: SyncStatus::Idle,
            last_sync_at,
        }
    }
}
