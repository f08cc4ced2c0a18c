//! Durable set of board ids with changes not yet confirmed by the remote.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::models::BoardId;
use crate::store::SyncJournal;
use crate::util::unix_millis_now;
use crate::Result;

/// Offline queue backed by the sync journal.
#[derive(Clone)]
pub struct OfflineQueue {
    journal: Arc<dyn SyncJournal>,
}

impl OfflineQueue {
    pub fn new(journal: Arc<dyn SyncJournal>) -> Self {
        Self { journal }
    }

    /// Add ids to the pending set. Ids already queued stay queued once.
    pub async fn enqueue(&self, ids: &[BoardId]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.journal.add_pending(ids, unix_millis_now()).await?;
        tracing::debug!(count = ids.len(), "Queued boards for the next sync");
        Ok(())
    }

    pub async fn pending_ids(&self) -> Result<BTreeSet<BoardId>> {
        self.journal.pending_ids().await
    }

    /// When the queue was last added to, `None` while empty.
    pub async fn queued_at(&self) -> Result<Option<i64>> {
        self.journal.queued_at().await
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.pending_ids().await?.is_empty())
    }

    /// Drop every pending id. Only called after a fully successful cycle.
    pub async fn clear(&self) -> Result<()> {
        self.journal.clear_pending().await
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;
    use crate::services::DatabaseService;

    #[tokio::test]
    async fn enqueue_is_an_idempotent_union() {
        let queue = OfflineQueue::new(Arc::new(DatabaseService::open_in_memory().unwrap()));
        let a = BoardId::new();
        let b = BoardId::new();

        assert!(queue.is_empty().await.unwrap());
        assert_eq!(queue.queued_at().await.unwrap(), None);

        queue.enqueue(&[a]).await.unwrap();
        queue.enqueue(&[a, b]).await.unwrap();
        queue.enqueue(&[]).await.unwrap();

        assert_eq!(queue.pending_ids().await.unwrap(), BTreeSet::from([a, b]));
        assert!(queue.queued_at().await.unwrap().is_some());

        queue.clear().await.unwrap();
        assert!(queue.is_empty().await.unwrap());
        assert_eq!(queue.queued_at().await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn pending_ids_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corkboard.db");
        let id = BoardId::new();

        {
            let service = DatabaseService::open_path(&path).await.unwrap();
            OfflineQueue::new(Arc::new(service))
                .enqueue(&[id])
                .await
                .unwrap();
        }

        let reopened = DatabaseService::open_path(&path).await.unwrap();
        let queue = OfflineQueue::new(Arc::new(reopened));
        assert_eq!(queue.pending_ids().await.unwrap(), BTreeSet::from([id]));
    }
}
