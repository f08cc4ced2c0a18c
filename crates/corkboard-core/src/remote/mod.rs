//! Remote store and blob store seams.
//!
//! The remote store owns the authoritative board copies and enforces the
//! `sync_version` fence; the blob store holds content-addressed image bytes.

mod http;
mod memory;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::hash::ContentHash;
use crate::models::{Board, BoardId, ImageLocation, ImageMetadata};
use crate::Result;

pub use http::HttpRemoteClient;
pub use memory::{FailureMode, InMemoryRemote};

/// Outcome of a push as reported by the remote store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushReport {
    /// Boards whose version fence passed
    #[serde(default)]
    pub accepted: Vec<BoardId>,
    /// Boards with a stale `sync_version`
    #[serde(default)]
    pub rejected: Vec<BoardId>,
}

/// Authoritative board list for the caller plus where each image lives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PullResponse {
    pub boards: Vec<Board>,
    #[serde(default)]
    pub hash_to_location: HashMap<ContentHash, ImageLocation>,
}

/// Push/pull endpoints of the remote board store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Send boards already filtered by the caller's watermark.
    async fn push_boards(&self, boards: &[Board]) -> Result<PushReport>;

    async fn pull_boards(&self) -> Result<PullResponse>;
}

/// Content-addressed image storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under `hash` and return their location.
    ///
    /// Must be idempotent: uploading a hash that is already stored returns the
    /// existing location.
    async fn upload(
        &self,
        hash: &ContentHash,
        bytes: &[u8],
        metadata: &ImageMetadata,
    ) -> Result<String>;

    async fn fetch(&self, location: &str) -> Result<Vec<u8>>;
}
