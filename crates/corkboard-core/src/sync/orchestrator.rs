//! Single-flight sync coordinator with a connectivity-aware state machine.
//!
//! One cycle runs at a time. A call made while a cycle is in flight waits in a
//! single waiter slot; later calls replace the queued target and share its
//! result. When the in-flight cycle finishes, the lock is handed straight to
//! the queued cycle.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use crate::config::EngineConfig;
use crate::connectivity::Connectivity;
use crate::hash::ContentHasher;
use crate::models::{Board, BoardId};
use crate::remote::{BlobStore, RemoteStore};
use crate::state::{SyncState, SyncStatus};
use crate::store::{LocalStore, SyncJournal};
use crate::sync::{OfflineQueue, PullMerger, TaskPool, UploadPipeline};
use crate::util::unix_millis_now;
use crate::{Error, Result};

/// Collaborators the engine talks to.
#[derive(Clone)]
pub struct SyncDeps {
    pub local: Arc<dyn LocalStore>,
    pub journal: Arc<dyn SyncJournal>,
    pub remote: Arc<dyn RemoteStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub connectivity: Arc<dyn Connectivity>,
}

#[derive(Default)]
struct Waiter {
    target: Option<Vec<BoardId>>,
    replies: Vec<oneshot::Sender<Vec<Board>>>,
}

#[derive(Default)]
struct Gate {
    in_flight: bool,
    waiter: Option<Waiter>,
}

struct Inner {
    local: Arc<dyn LocalStore>,
    journal: Arc<dyn SyncJournal>,
    remote: Arc<dyn RemoteStore>,
    connectivity: Arc<dyn Connectivity>,
    queue: OfflineQueue,
    uploads: UploadPipeline,
    merger: PullMerger,
    hasher: ContentHasher,
    state: watch::Sender<SyncState>,
    gate: Mutex<Gate>,
}

/// Cheaply cloneable handle to one sync engine.
#[derive(Clone)]
pub struct SyncOrchestrator {
    inner: Arc<Inner>,
}

/// Releases the single-flight lock when a cycle ends, even on panic or drop.
struct CycleGuard {
    orchestrator: SyncOrchestrator,
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        self.orchestrator.release();
    }
}

impl SyncOrchestrator {
    /// Build an engine and load the persisted watermark.
    pub async fn new(deps: SyncDeps, config: EngineConfig) -> Result<Self> {
        let pool = TaskPool::new(config.concurrency);
        let last_sync_at = deps.journal.last_sync_at().await?;
        let (state, _receiver) = watch::channel(SyncState::with_watermark(last_sync_at));

        tracing::debug!(
            concurrency = pool.concurrency(),
            ?last_sync_at,
            "Sync engine ready"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                queue: OfflineQueue::new(Arc::clone(&deps.journal)),
                uploads: UploadPipeline::new(Arc::clone(&deps.blobs), pool),
                merger: PullMerger::new(
                    Arc::clone(&deps.remote),
                    Arc::clone(&deps.blobs),
                    Arc::clone(&deps.local),
                    pool,
                ),
                local: deps.local,
                journal: deps.journal,
                remote: deps.remote,
                connectivity: deps.connectivity,
                hasher: ContentHasher::new(config.hash_strategy),
                state,
                gate: Mutex::new(Gate::default()),
            }),
        })
    }

    /// Current status and watermark.
    pub fn state(&self) -> SyncState {
        *self.inner.state.borrow()
    }

    /// Receive every state change.
    pub fn subscribe_state(&self) -> watch::Receiver<SyncState> {
        self.inner.state.subscribe()
    }

    pub fn offline_queue(&self) -> &OfflineQueue {
        &self.inner.queue
    }

    /// Hasher configured for this engine, for building new image refs.
    pub fn hasher(&self) -> ContentHasher {
        self.inner.hasher
    }

    /// Run a push-then-pull cycle.
    ///
    /// `target` restricts the push to those boards; `None` means every local
    /// board. Returns the merged boards, or an empty list when the cycle failed
    /// or was deferred to the offline queue.
    pub async fn sync(&self, target: Option<Vec<BoardId>>) -> Vec<Board> {
        if !self.inner.connectivity.is_online() {
            self.defer_offline(target).await;
            return Vec::new();
        }

        if let Some(reply) = self.acquire_or_wait(target.clone()) {
            tracing::debug!("Sync already in flight; waiting for the queued cycle");
            return reply.await.unwrap_or_default();
        }

        let guard = CycleGuard {
            orchestrator: self.clone(),
        };
        let boards = self.run_cycle(target).await;
        drop(guard);
        boards
    }

    /// Drain the offline queue after connectivity comes back.
    pub async fn handle_reconnect(&self) -> Vec<Board> {
        match self.inner.queue.is_empty().await {
            Ok(false) => {
                tracing::info!("Connectivity restored; draining offline queue");
                self.sync(None).await
            }
            Ok(true) => {
                self.transition_if(SyncStatus::Idle, |status| status == SyncStatus::Offline);
                Vec::new()
            }
            Err(error) => {
                tracing::warn!(%error, "Failed to read offline queue after reconnect");
                Vec::new()
            }
        }
    }

    /// Follow the connectivity signal until the returned handle is dropped.
    ///
    /// Each offline to online transition runs [`Self::handle_reconnect`]; each
    /// online to offline transition moves a resting engine to `Offline`.
    pub fn spawn_reconnect_listener(&self) -> ReconnectListener {
        let mut receiver = self.inner.connectivity.subscribe();
        let mut was_online = *receiver.borrow_and_update();
        let orchestrator = self.clone();
        let handle = tokio::spawn(async move {
            while receiver.changed().await.is_ok() {
                let online = *receiver.borrow_and_update();
                if online == was_online {
                    continue;
                }
                was_online = online;
                if online {
                    orchestrator.handle_reconnect().await;
                } else {
                    orchestrator.handle_connectivity_lost();
                }
            }
        });
        ReconnectListener { handle }
    }

    fn handle_connectivity_lost(&self) {
        self.transition_if(SyncStatus::Offline, |status| {
            matches!(
                status,
                SyncStatus::Idle | SyncStatus::Synced | SyncStatus::Error
            )
        });
    }

    fn gate(&self) -> MutexGuard<'_, Gate> {
        self.inner
            .gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Take the lock, or park in the waiter slot and return its reply channel.
    fn acquire_or_wait(&self, target: Option<Vec<BoardId>>) -> Option<oneshot::Receiver<Vec<Board>>> {
        let mut gate = self.gate();
        if !gate.in_flight {
            gate.in_flight = true;
            return None;
        }

        let (reply, receiver) = oneshot::channel();
        let waiter = gate.waiter.get_or_insert_with(Waiter::default);
        waiter.target = target;
        waiter.replies.push(reply);
        Some(receiver)
    }

    /// Hand the lock to the queued waiter, or free it.
    fn release(&self) {
        let waiter = {
            let mut gate = self.gate();
            let waiter = gate.waiter.take();
            if waiter.is_none() {
                gate.in_flight = false;
            }
            waiter
        };
        let Some(waiter) = waiter else {
            return;
        };

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No runtime to run the queued sync; dropping it");
            self.gate().in_flight = false;
            return;
        };

        let orchestrator = self.clone();
        runtime.spawn(async move {
            let guard = CycleGuard {
                orchestrator: orchestrator.clone(),
            };
            let boards = orchestrator.run_cycle(waiter.target).await;
            for reply in waiter.replies {
                let _ = reply.send(boards.clone());
            }
            drop(guard);
        });
    }

    async fn run_cycle(&self, target: Option<Vec<BoardId>>) -> Vec<Board> {
        let started_at = unix_millis_now();
        self.set_status(SyncStatus::Syncing);

        let mut attempted = target.clone().unwrap_or_default();
        match self
            .push_then_pull(target.as_deref(), started_at, &mut attempted)
            .await
        {
            Ok(boards) => {
                self.inner.state.send_modify(|state| {
                    state.status = SyncStatus::Synced;
                    state.last_sync_at = Some(started_at);
                });
                tracing::info!(boards = boards.len(), "Sync cycle completed");
                boards
            }
            Err(error) => {
                self.handle_failure(&error, &attempted).await;
                Vec::new()
            }
        }
    }

    async fn push_then_pull(
        &self,
        target: Option<&[BoardId]>,
        started_at: i64,
        attempted: &mut Vec<BoardId>,
    ) -> Result<Vec<Board>> {
        let queue_pending = !self.inner.queue.is_empty().await?;
        let since = if queue_pending {
            None
        } else {
            self.state().last_sync_at
        };

        // Queued boards ride along with a targeted push.
        let target = match target {
            Some(ids) if queue_pending => {
                let mut ids = ids.to_vec();
                for id in self.inner.queue.pending_ids().await? {
                    if !ids.contains(&id) {
                        ids.push(id);
                    }
                }
                Some(ids)
            }
            other => other.map(<[BoardId]>::to_vec),
        };

        let candidates = self.push_candidates(target.as_deref(), since).await?;
        if target.is_none() {
            *attempted = candidates.iter().map(|board| board.id).collect();
        }
        tracing::debug!(
            candidates = candidates.len(),
            ?since,
            queue_pending,
            "Computed push set"
        );

        if candidates.is_empty() {
            tracing::debug!("Nothing to push");
        } else {
            let locations = self.inner.uploads.upload_all(&candidates).await?;
            tracing::debug!(images = locations.len(), "Images uploaded");

            let report = self.inner.remote.push_boards(&candidates).await?;
            if !report.rejected.is_empty() {
                tracing::warn!(
                    rejected = report.rejected.len(),
                    "Remote kept newer versions of some boards"
                );
            }
            tracing::debug!(accepted = report.accepted.len(), "Boards pushed");
        }

        let boards = self.inner.merger.pull().await?;
        self.inner.queue.clear().await?;
        self.inner.journal.set_last_sync_at(started_at).await?;
        Ok(boards)
    }

    /// Boards to push: the target set (or every local board) changed after `since`.
    async fn push_candidates(
        &self,
        target: Option<&[BoardId]>,
        since: Option<i64>,
    ) -> Result<Vec<Board>> {
        let boards = match target {
            None => self.inner.local.get_all().await?,
            Some(ids) => {
                let mut boards = Vec::with_capacity(ids.len());
                for id in ids {
                    match self.inner.local.get(id).await? {
                        Some(board) => boards.push(board),
                        None => tracing::debug!(board = %id, "Target board not found locally"),
                    }
                }
                boards
            }
        };

        Ok(boards
            .into_iter()
            .filter(|board| board.is_modified_since(since))
            .collect())
    }

    async fn handle_failure(&self, error: &Error, attempted: &[BoardId]) {
        let offline = !self.inner.connectivity.is_online() || error.is_connectivity();
        if offline {
            tracing::info!(%error, queued = attempted.len(), "Sync deferred until reconnect");
            if let Err(queue_error) = self.inner.queue.enqueue(attempted).await {
                tracing::warn!(error = %queue_error, "Failed to queue boards for later sync");
            }
            self.set_status(SyncStatus::Offline);
        } else {
            tracing::warn!(%error, "Sync cycle failed");
            self.set_status(SyncStatus::Error);
        }
    }

    async fn defer_offline(&self, target: Option<Vec<BoardId>>) {
        let ids = match target {
            Some(ids) => Ok(ids),
            None => self.changed_since_watermark().await,
        };

        match ids {
            Ok(ids) => {
                tracing::info!(queued = ids.len(), "Offline; queued boards for later sync");
                if let Err(error) = self.inner.queue.enqueue(&ids).await {
                    tracing::warn!(%error, "Failed to queue boards for later sync");
                }
            }
            Err(error) => tracing::warn!(%error, "Failed to read local boards while offline"),
        }
        self.set_status(SyncStatus::Offline);
    }

    async fn changed_since_watermark(&self) -> Result<Vec<BoardId>> {
        let since = self.state().last_sync_at;
        Ok(self
            .inner
            .local
            .get_all()
            .await?
            .into_iter()
            .filter(|board| board.is_modified_since(since))
            .map(|board| board.id)
            .collect())
    }

    fn set_status(&self, status: SyncStatus) {
        self.transition_if(status, |_| true);
    }

    fn transition_if(&self, status: SyncStatus, allowed: impl FnOnce(SyncStatus) -> bool) {
        let mut previous = None;
        self.inner.state.send_if_modified(|state| {
            if state.status == status || !allowed(state.status) {
                return false;
            }
            previous = Some(state.status);
            state.status = status;
            true
        });
        if let Some(previous) = previous {
            tracing::debug!(
                from = previous.label(),
                to = status.label(),
                "Sync status changed"
            );
        }
    }
}

/// Active connectivity subscription. Dropping it stops listening.
#[derive(Debug)]
pub struct ReconnectListener {
    handle: JoinHandle<()>,
}

impl ReconnectListener {
    pub fn unsubscribe(self) {
        self.handle.abort();
    }

    pub fn is_listening(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for ReconnectListener {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
