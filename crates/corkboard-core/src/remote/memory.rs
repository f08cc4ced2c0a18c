//! In-process remote store.
//!
//! Applies the same rules as the hosted API: the `sync_version` fence on push
//! and hash-idempotent uploads. Call counters and failure switches make it the
//! remote used by the engine's tests and by offline demos.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::{BlobStore, PullResponse, PushReport, RemoteStore};
use crate::hash::ContentHash;
use crate::models::{Board, BoardId, ImageLocation, ImageMetadata};
use crate::{Error, Result};

const LOCATION_PREFIX: &str = "memory://blobs/";

/// How an injected failure presents itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// The host cannot be reached
    Unreachable,
    /// The host answers with a non-success status
    Status(u16),
}

impl FailureMode {
    fn into_error(self, operation: &str) -> Error {
        match self {
            Self::Unreachable => Error::Connectivity(format!("{operation}: connection refused")),
            Self::Status(status) => Error::Remote {
                status,
                message: format!("{operation} failed"),
            },
        }
    }
}

#[derive(Debug, Clone)]
struct StoredBlob {
    bytes: Vec<u8>,
    metadata: ImageMetadata,
}

#[derive(Debug, Default)]
struct RemoteData {
    boards: BTreeMap<BoardId, Board>,
    blobs: HashMap<ContentHash, StoredBlob>,
    upload_calls: HashMap<ContentHash, usize>,
    fetch_calls: usize,
    push_calls: Vec<Vec<BoardId>>,
    pull_calls: usize,
    latency: Duration,
    push_failure: Option<FailureMode>,
    pull_failure: Option<FailureMode>,
    failing_uploads: HashSet<ContentHash>,
}

/// Remote store and blob store held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryRemote {
    data: Mutex<RemoteData>,
    board_calls_in_flight: AtomicUsize,
    max_board_calls_in_flight: AtomicUsize,
    uploads_in_flight: AtomicUsize,
    max_uploads_in_flight: AtomicUsize,
}

struct InFlight<'a> {
    current: &'a AtomicUsize,
}

impl<'a> InFlight<'a> {
    fn enter(current: &'a AtomicUsize, max: &AtomicUsize) -> Self {
        let now = current.fetch_add(1, Ordering::SeqCst) + 1;
        max.fetch_max(now, Ordering::SeqCst);
        Self { current }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

impl InMemoryRemote {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn data(&self) -> MutexGuard<'_, RemoteData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Delay applied to every call, to keep cycles observably in flight.
    pub fn set_latency(&self, latency: Duration) {
        self.data().latency = latency;
    }

    pub fn fail_pushes(&self, mode: Option<FailureMode>) {
        self.data().push_failure = mode;
    }

    pub fn fail_pulls(&self, mode: Option<FailureMode>) {
        self.data().pull_failure = mode;
    }

    /// Make every upload of `hash` fail with HTTP 500.
    pub fn fail_upload_of(&self, hash: ContentHash) {
        self.data().failing_uploads.insert(hash);
    }

    /// Drop a stored blob so pulls report no location for it.
    pub fn forget_blob(&self, hash: &ContentHash) {
        self.data().blobs.remove(hash);
    }

    /// Seed a board directly into remote storage.
    pub fn insert_board(&self, board: Board) {
        let board = strip_image_data(board);
        self.data().boards.insert(board.id, board);
    }

    /// Seed a blob directly into remote storage.
    pub fn insert_blob(&self, hash: ContentHash, bytes: Vec<u8>, metadata: ImageMetadata) {
        self.data()
            .blobs
            .insert(hash, StoredBlob { bytes, metadata });
    }

    pub fn board(&self, id: &BoardId) -> Option<Board> {
        self.data().boards.get(id).cloned()
    }

    pub fn board_count(&self) -> usize {
        self.data().boards.len()
    }

    pub fn upload_calls(&self, hash: &ContentHash) -> usize {
        self.data().upload_calls.get(hash).copied().unwrap_or(0)
    }

    pub fn total_upload_calls(&self) -> usize {
        self.data().upload_calls.values().sum()
    }

    pub fn fetch_calls(&self) -> usize {
        self.data().fetch_calls
    }

    /// Board ids sent by each push call, in call order.
    pub fn push_calls(&self) -> Vec<Vec<BoardId>> {
        self.data().push_calls.clone()
    }

    pub fn pull_calls(&self) -> usize {
        self.data().pull_calls
    }

    /// Every network call this remote has served.
    pub fn total_calls(&self) -> usize {
        let data = self.data();
        data.push_calls.len()
            + data.pull_calls
            + data.fetch_calls
            + data.upload_calls.values().sum::<usize>()
    }

    /// Highest number of overlapping push/pull calls observed.
    pub fn max_board_calls_in_flight(&self) -> usize {
        self.max_board_calls_in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of overlapping uploads observed.
    pub fn max_uploads_in_flight(&self) -> usize {
        self.max_uploads_in_flight.load(Ordering::SeqCst)
    }

    async fn simulate_latency(&self) {
        let latency = self.data().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }

    fn location_for(hash: &ContentHash) -> String {
        format!("{LOCATION_PREFIX}{hash}")
    }
}

fn strip_image_data(mut board: Board) -> Board {
    for image in &mut board.images {
        image.data = None;
    }
    board
}

#[async_trait]
impl RemoteStore for InMemoryRemote {
    async fn push_boards(&self, boards: &[Board]) -> Result<PushReport> {
        let _guard = InFlight::enter(
            &self.board_calls_in_flight,
            &self.max_board_calls_in_flight,
        );
        {
            let mut data = self.data();
            data.push_calls.push(boards.iter().map(|board| board.id).collect());
            if let Some(mode) = data.push_failure {
                return Err(mode.into_error("push"));
            }
        }
        self.simulate_latency().await;

        let mut data = self.data();
        let mut report = PushReport::default();
        for incoming in boards {
            let stored_version = data.boards.get(&incoming.id).map(|board| board.sync_version);
            if stored_version.is_some_and(|stored| incoming.sync_version < stored) {
                report.rejected.push(incoming.id);
                continue;
            }

            let mut accepted = strip_image_data(incoming.clone());
            accepted.sync_version = incoming.sync_version + 1;
            data.boards.insert(accepted.id, accepted);
            report.accepted.push(incoming.id);
        }

        Ok(report)
    }

    async fn pull_boards(&self) -> Result<PullResponse> {
        let _guard = InFlight::enter(
            &self.board_calls_in_flight,
            &self.max_board_calls_in_flight,
        );
        {
            let mut data = self.data();
            data.pull_calls += 1;
            if let Some(mode) = data.pull_failure {
                return Err(mode.into_error("pull"));
            }
        }
        self.simulate_latency().await;

        let data = self.data();
        let boards: Vec<Board> = data.boards.values().cloned().collect();
        let hash_to_location = boards
            .iter()
            .flat_map(|board| board.images.iter())
            .filter_map(|image| {
                data.blobs.get(&image.hash).map(|blob| {
                    (
                        image.hash.clone(),
                        ImageLocation {
                            location: Self::location_for(&image.hash),
                            width: blob.metadata.width,
                            height: blob.metadata.height,
                        },
                    )
                })
            })
            .collect();

        Ok(PullResponse {
            boards,
            hash_to_location,
        })
    }
}

#[async_trait]
impl BlobStore for InMemoryRemote {
    async fn upload(
        &self,
        hash: &ContentHash,
        bytes: &[u8],
        metadata: &ImageMetadata,
    ) -> Result<String> {
        let _guard = InFlight::enter(&self.uploads_in_flight, &self.max_uploads_in_flight);
        *self.data().upload_calls.entry(hash.clone()).or_insert(0) += 1;
        self.simulate_latency().await;

        let mut data = self.data();
        if data.failing_uploads.contains(hash) {
            return Err(Error::Remote {
                status: 500,
                message: format!("upload of {hash} failed"),
            });
        }

        data.blobs.entry(hash.clone()).or_insert_with(|| StoredBlob {
            bytes: bytes.to_vec(),
            metadata: metadata.clone(),
        });
        Ok(Self::location_for(hash))
    }

    async fn fetch(&self, location: &str) -> Result<Vec<u8>> {
        self.data().fetch_calls += 1;
        self.simulate_latency().await;

        let data = self.data();
        location
            .strip_prefix(LOCATION_PREFIX)
            .and_then(|hash| data.blobs.get(&ContentHash::new(hash)))
            .map(|blob| blob.bytes.clone())
            .ok_or_else(|| Error::Remote {
                status: 404,
                message: format!("no blob at {location}"),
            })
    }
}
