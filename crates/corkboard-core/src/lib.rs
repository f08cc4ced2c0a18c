//! corkboard-core - Board and image sync engine
//!
//! This crate contains the board models, the SQLite local store and sync
//! journal, content hashing, the remote client seams, and the sync engine used
//! by the Corkboard clients.

pub mod config;
pub mod connectivity;
pub mod db;
pub mod error;
pub mod hash;
pub mod models;
pub mod remote;
pub mod services;
pub mod state;
pub mod store;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{Board, BoardId};
