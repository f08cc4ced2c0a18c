use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] corkboard_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Board title cannot be empty")]
    EmptyTitle,
    #[error("Board ID cannot be empty")]
    EmptyBoardId,
    #[error("Board not found for id/prefix: {0}")]
    BoardNotFound(String),
    #[error("{0}")]
    AmbiguousBoardId(String),
    #[error("Unsupported image file: {0}")]
    UnsupportedImage(String),
    #[error("Sync failed; run with RUST_LOG=corkboard=debug for details")]
    SyncFailed,
    #[error(
        "Sync is not configured. Set CORKBOARD_API_BASE_URL (and CORKBOARD_ACCESS_TOKEN if the API requires one)."
    )]
    SyncNotConfigured,
}
