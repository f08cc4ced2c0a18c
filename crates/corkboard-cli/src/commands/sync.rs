use std::path::Path;
use std::sync::Arc;

use corkboard_core::config::{EngineConfig, RemoteConfig};
use corkboard_core::connectivity::ConnectivitySignal;
use corkboard_core::remote::HttpRemoteClient;
use corkboard_core::services::DatabaseService;
use corkboard_core::state::{SyncState, SyncStatus};
use corkboard_core::sync::{SyncDeps, SyncOrchestrator};
use corkboard_core::BoardId;

use crate::commands::common::{open_database, resolve_board_id};
use crate::error::CliError;

pub async fn run_sync(
    board_queries: &[String],
    offline: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let remote_config = RemoteConfig::from_env()?.ok_or(CliError::SyncNotConfigured)?;
    let engine_config = EngineConfig::from_env()?;

    let db = Arc::new(open_database(db_path).await?);
    let target = resolve_targets(board_queries, &db).await?;
    let client = Arc::new(HttpRemoteClient::new(&remote_config)?);
    tracing::debug!(base_url = client.base_url(), "Using remote sync API");

    let engine = SyncOrchestrator::new(
        SyncDeps {
            local: db.clone(),
            journal: db.clone(),
            remote: client.clone(),
            blobs: client,
            connectivity: Arc::new(ConnectivitySignal::new(!offline)),
        },
        engine_config,
    )
    .await?;

    let merged = engine.sync(target).await;
    let pending = engine.offline_queue().pending_ids().await?.len();
    println!("{}", sync_outcome_message(&engine.state(), merged.len(), pending)?);
    Ok(())
}

async fn resolve_targets(
    queries: &[String],
    db: &DatabaseService,
) -> Result<Option<Vec<BoardId>>, CliError> {
    if queries.is_empty() {
        return Ok(None);
    }

    let mut ids = Vec::with_capacity(queries.len());
    for query in queries {
        ids.push(resolve_board_id(query, db).await?);
    }
    Ok(Some(ids))
}

pub fn sync_outcome_message(
    state: &SyncState,
    merged: usize,
    pending: usize,
) -> Result<String, CliError> {
    match state.status {
        SyncStatus::Synced => Ok(format!("Sync completed ({merged} boards up to date)")),
        SyncStatus::Offline => Ok(format!(
            "Offline: {pending} boards queued for the next sync"
        )),
        SyncStatus::Error => Err(CliError::SyncFailed),
        status => Ok(format!("Sync {}", status.label())),
    }
}
