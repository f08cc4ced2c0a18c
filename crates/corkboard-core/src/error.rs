//! Error types for corkboard-core

use thiserror::Error;

/// Result type alias using corkboard-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in corkboard-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Local SQLite store error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Transport error from the HTTP client
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// No network path to the remote store
    #[error("Remote store unreachable: {0}")]
    Connectivity(String),

    /// Non-success response from a push, pull, or upload endpoint
    #[error("Remote store rejected request: {message} ({status})")]
    Remote { status: u16, message: String },

    /// A single image upload failed during a push cycle
    #[error("Image upload failed for {hash}: {reason}")]
    Upload { hash: String, reason: String },

    /// Board not found
    #[error("Board not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Blob storage error
    #[error("Storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Whether the failure means the remote store could not be reached at all.
    pub fn is_connectivity(&self) -> bool {
        match self {
            Self::Connectivity(_) => true,
            Self::Http(error) => error.is_connect() || error.is_timeout(),
            _ => false,
        }
    }
}
