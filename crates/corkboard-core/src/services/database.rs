//! Shared database service wrapper used by the sync engine and clients.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::db::{
    BoardRepository, Database, SqliteBoardRepository, SqliteSyncJournalRepository,
    SyncJournalRepository,
};
use crate::models::{Board, BoardId};
use crate::store::{LocalStore, SyncJournal};
use crate::Result;

/// Thread-safe service for DB and repository operations.
#[derive(Clone)]
pub struct DatabaseService {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
}

impl DatabaseService {
    /// Open a database service at the given filesystem path.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let path = db_path.clone();
        let db = tokio::task::spawn_blocking(move || Database::open(&path))
            .await
            .map_err(|error| crate::Error::Storage(error.to_string()))??;
        tracing::debug!("Opened local store at {}", db_path.display());

        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: Some(db_path),
        })
    }

    /// Open an in-memory database service (primarily for tests).
    pub fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: None,
        })
    }

    /// Filesystem path backing this service, if any.
    pub fn path(&self) -> Option<&PathBuf> {
        self.db_path.as_ref()
    }

    /// List boards, most recently updated first.
    pub async fn list_boards(&self) -> Result<Vec<Board>> {
        let db = self.db.lock().await;
        SqliteBoardRepository::new(db.connection()).list()
    }

    /// Fetch a board by id.
    pub async fn get_board(&self, id: &BoardId) -> Result<Option<Board>> {
        let db = self.db.lock().await;
        SqliteBoardRepository::new(db.connection()).get(id)
    }

    /// Insert or overwrite a board.
    pub async fn save_board(&self, board: &Board) -> Result<()> {
        let db = self.db.lock().await;
        SqliteBoardRepository::new(db.connection()).upsert(board)
    }

    /// Delete a board.
    pub async fn delete_board(&self, id: &BoardId) -> Result<()> {
        let db = self.db.lock().await;
        SqliteBoardRepository::new(db.connection()).delete(id)
    }
}

#[async_trait]
impl LocalStore for DatabaseService {
    async fn get_all(&self) -> Result<Vec<Board>> {
        self.list_boards().await
    }

    async fn get(&self, id: &BoardId) -> Result<Option<Board>> {
        self.get_board(id).await
    }

    async fn put(&self, board: &Board) -> Result<()> {
        self.save_board(board).await
    }

    async fn delete(&self, id: &BoardId) -> Result<()> {
        self.delete_board(id).await
    }
}

#[async_trait]
impl SyncJournal for DatabaseService {
    async fn add_pending(&self, ids: &[BoardId], queued_at: i64) -> Result<()> {
        let db = self.db.lock().await;
        SqliteSyncJournalRepository::new(db.connection()).add_pending(ids, queued_at)
    }

    async fn pending_ids(&self) -> Result<BTreeSet<BoardId>> {
        let db = self.db.lock().await;
        SqliteSyncJournalRepository::new(db.connection()).pending_ids()
    }

    async fn queued_at(&self) -> Result<Option<i64>> {
        let db = self.db.lock().await;
        SqliteSyncJournalRepository::new(db.connection()).queued_at()
    }

    async fn clear_pending(&self) -> Result<()> {
        let db = self.db.lock().await;
        SqliteSyncJournalRepository::new(db.connection()).clear_pending()
    }

    async fn last_sync_at(&self) -> Result<Option<i64>> {
        let db = self.db.lock().await;
        SqliteSyncJournalRepository::new(db.connection()).last_sync_at()
    }

    async fn set_last_sync_at(&self, timestamp: i64) -> Result<()> {
        let db = self.db.lock().await;
        SqliteSyncJournalRepository::new(db.connection()).set_last_sync_at(timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test(flavor = "multi_thread")]
    async fn in_memory_save_and_list_roundtrip() {
        let service = DatabaseService::open_in_memory().unwrap();

        let board = Board::new("hello core");
        service.save_board(&board).await.unwrap();
        let boards = service.list_boards().await.unwrap();
        assert_eq!(boards.len(), 1);
        assert_eq!(boards[0].title, "hello core");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn open_path_creates_parent_directories() {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("nested").join("dir").join("corkboard.db");

        let service = DatabaseService::open_path(&db_path).await.unwrap();
        assert!(db_path.exists());
        assert_eq!(service.path(), Some(&db_path));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn local_store_trait_overwrites_by_id() {
        let service = DatabaseService::open_in_memory().unwrap();
        let store: &dyn LocalStore = &service;

        let mut board = Board::new("v1");
        store.put(&board).await.unwrap();
        board.title = "v2".to_string();
        store.put(&board).await.unwrap();

        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "v2");

        store.delete(&board.id).await.unwrap();
        assert!(store.get(&board.id).await.unwrap().is_none());
    }
}
