//! Sync journal repository: pending board ids and the sync watermark

use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::models::BoardId;
use rusqlite::{params, Connection, OptionalExtension};

const KEY_QUEUED_AT: &str = "offline_queued_at";
const KEY_LAST_SYNC_AT: &str = "last_sync_at";

/// Trait for durable sync bookkeeping
pub trait SyncJournalRepository {
    /// Union `ids` into the pending set and stamp `queued_at`
    fn add_pending(&self, ids: &[BoardId], queued_at: i64) -> Result<()>;

    /// Current pending set
    fn pending_ids(&self) -> Result<BTreeSet<BoardId>>;

    /// When ids were last enqueued, if anything is pending
    fn queued_at(&self) -> Result<Option<i64>>;

    /// Drop all pending state
    fn clear_pending(&self) -> Result<()>;

    /// Load the last successful sync timestamp
    fn last_sync_at(&self) -> Result<Option<i64>>;

    /// Save the last successful sync timestamp
    fn set_last_sync_at(&self, timestamp: i64) -> Result<()>;
}

/// `SQLite` implementation of `SyncJournalRepository`
pub struct SqliteSyncJournalRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteSyncJournalRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn get_meta(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT value FROM sync_meta WHERE key = ?",
                [key],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn get_meta_timestamp(&self, key: &str) -> Result<Option<i64>> {
        self.get_meta(key)?
            .map(|value| {
                value
                    .parse::<i64>()
                    .map_err(|_| Error::InvalidInput(format!("Invalid {key} value: {value}")))
            })
            .transpose()
    }

    fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO sync_meta (key, value) VALUES (?, ?)",
            [key, value],
        )?;
        Ok(())
    }
}

impl SyncJournalRepository for SqliteSyncJournalRepository<'_> {
    fn add_pending(&self, ids: &[BoardId], queued_at: i64) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        for id in ids {
            tx.execute(
                "INSERT OR IGNORE INTO offline_queue (board_id) VALUES (?)",
                params![id.as_str()],
            )?;
        }
        tx.execute(
            "INSERT OR REPLACE INTO sync_meta (key, value) VALUES (?, ?)",
            params![KEY_QUEUED_AT, queued_at.to_string()],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn pending_ids(&self) -> Result<BTreeSet<BoardId>> {
        let mut stmt = self.conn.prepare("SELECT board_id FROM offline_queue")?;
        let raw_ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        raw_ids
            .into_iter()
            .map(|raw| {
                raw.parse::<BoardId>()
                    .map_err(|_| Error::InvalidInput(format!("Invalid queued board id: {raw}")))
            })
            .collect()
    }

    fn queued_at(&self) -> Result<Option<i64>> {
        let pending: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM offline_queue)",
            [],
            |row| row.get(0),
        )?;
        if !pending {
            return Ok(None);
        }
        self.get_meta_timestamp(KEY_QUEUED_AT)
    }

    fn clear_pending(&self) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM offline_queue", [])?;
        tx.execute("DELETE FROM sync_meta WHERE key = ?", [KEY_QUEUED_AT])?;
        tx.commit()?;
        Ok(())
    }

    fn last_sync_at(&self) -> Result<Option<i64>> {
        self.get_meta_timestamp(KEY_LAST_SYNC_AT)
    }

    fn set_last_sync_at(&self, timestamp: i64) -> Result<()> {
        self.set_meta(KEY_LAST_SYNC_AT, &timestamp.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    fn setup() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_add_pending_is_a_union() {
        let db = setup();
        let repo = SqliteSyncJournalRepository::new(db.connection());

        let a = BoardId::new();
        let b = BoardId::new();
        repo.add_pending(&[a, b], 100).unwrap();
        repo.add_pending(&[b, a, b], 200).unwrap();

        let pending = repo.pending_ids().unwrap();
        assert_eq!(pending.len(), 2);
        assert!(pending.contains(&a));
        assert!(pending.contains(&b));
        assert_eq!(repo.queued_at().unwrap(), Some(200));
    }

    #[test]
    fn test_clear_pending() {
        let db = setup();
        let repo = SqliteSyncJournalRepository::new(db.connection());

        repo.add_pending(&[BoardId::new()], 100).unwrap();
        repo.clear_pending().unwrap();

        assert!(repo.pending_ids().unwrap().is_empty());
        assert_eq!(repo.queued_at().unwrap(), None);
    }

    #[test]
    fn test_watermark_roundtrip() {
        let db = setup();
        let repo = SqliteSyncJournalRepository::new(db.connection());

        assert_eq!(repo.last_sync_at().unwrap(), None);
        repo.set_last_sync_at(1_700_000_000_000).unwrap();
        assert_eq!(repo.last_sync_at().unwrap(), Some(1_700_000_000_000));

        // Clearing the queue keeps the watermark
        repo.clear_pending().unwrap();
        assert_eq!(repo.last_sync_at().unwrap(), Some(1_700_000_000_000));
    }
}
