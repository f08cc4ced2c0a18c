//! Local `SQLite` store for Corkboard

mod connection;
mod journal_repository;
mod migrations;
mod repository;

pub use connection::Database;
pub use journal_repository::{SqliteSyncJournalRepository, SyncJournalRepository};
pub use repository::{BoardRepository, SqliteBoardRepository};
