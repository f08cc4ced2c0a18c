//! Local-side collaborator seams used by the sync engine.

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::models::{Board, BoardId};
use crate::Result;

/// Client-resident board store.
///
/// No transactional batch guarantee is required; the engine writes one board
/// at a time.
#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn get_all(&self) -> Result<Vec<Board>>;

    async fn get(&self, id: &BoardId) -> Result<Option<Board>>;

    /// Insert or overwrite by id.
    async fn put(&self, board: &Board) -> Result<()>;

    async fn delete(&self, id: &BoardId) -> Result<()>;
}

/// Durable sync bookkeeping: the offline pending set and the push watermark.
#[async_trait]
pub trait SyncJournal: Send + Sync {
    async fn add_pending(&self, ids: &[BoardId], queued_at: i64) -> Result<()>;

    async fn pending_ids(&self) -> Result<BTreeSet<BoardId>>;

    async fn queued_at(&self) -> Result<Option<i64>>;

    async fn clear_pending(&self) -> Result<()>;

    async fn last_sync_at(&self) -> Result<Option<i64>>;

    async fn set_last_sync_at(&self, timestamp: i64) -> Result<()>;
}
