//! Pull path: fetch the remote board list and merge it into the local store.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::hash::ContentHash;
use crate::models::{Board, ImageLocation};
use crate::remote::{BlobStore, RemoteStore};
use crate::store::LocalStore;
use crate::sync::task_pool::TaskPool;
use crate::Result;

/// Resolves remote boards' image bytes and overwrites local copies.
#[derive(Clone)]
pub struct PullMerger {
    remote: Arc<dyn RemoteStore>,
    blobs: Arc<dyn BlobStore>,
    local: Arc<dyn LocalStore>,
    pool: TaskPool,
}

impl PullMerger {
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        blobs: Arc<dyn BlobStore>,
        local: Arc<dyn LocalStore>,
        pool: TaskPool,
    ) -> Self {
        Self {
            remote,
            blobs,
            local,
            pool,
        }
    }

    /// Pull every remote board, attach image bytes, and write each board locally.
    ///
    /// Each unique hash is fetched at most once. An image whose hash has no
    /// location or whose fetch fails is dropped from its board; the board
    /// itself is still merged.
    pub async fn pull(&self) -> Result<Vec<Board>> {
        let response = self.remote.pull_boards().await?;
        tracing::debug!(
            boards = response.boards.len(),
            locations = response.hash_to_location.len(),
            "Pulled remote boards"
        );

        let bytes_by_hash = self
            .fetch_unique(&response.boards, &response.hash_to_location)
            .await;

        let mut merged = Vec::with_capacity(response.boards.len());
        for board in response.boards {
            let board = attach_images(board, &response.hash_to_location, &bytes_by_hash);
            self.local.put(&board).await?;
            merged.push(board);
        }

        tracing::debug!(boards = merged.len(), "Merged remote boards into local store");
        Ok(merged)
    }

    async fn fetch_unique(
        &self,
        boards: &[Board],
        locations: &HashMap<ContentHash, ImageLocation>,
    ) -> HashMap<ContentHash, Vec<u8>> {
        let hashes: Vec<(&ContentHash, &ImageLocation)> = boards
            .iter()
            .flat_map(|board| board.images.iter())
            .map(|image| &image.hash)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .filter_map(|hash| locations.get(hash).map(|location| (hash, location)))
            .collect();

        let tasks: Vec<_> = hashes
            .iter()
            .map(|(_, location)| {
                let blobs = Arc::clone(&self.blobs);
                move || async move { blobs.fetch(&location.location).await }
            })
            .collect();
        let outcomes = self.pool.run(tasks).await;

        let mut bytes_by_hash = HashMap::with_capacity(hashes.len());
        for ((hash, location), outcome) in hashes.into_iter().zip(outcomes) {
            match outcome {
                Ok(bytes) => {
                    bytes_by_hash.insert(hash.clone(), bytes);
                }
                Err(failure) => {
                    tracing::warn!(
                        %hash,
                        location = %location.location,
                        error = %failure,
                        "Failed to fetch image bytes"
                    );
                }
            }
        }
        bytes_by_hash
    }
}

fn attach_images(
    mut board: Board,
    locations: &HashMap<ContentHash, ImageLocation>,
    bytes_by_hash: &HashMap<ContentHash, Vec<u8>>,
) -> Board {
    let board_id = board.id;
    board.images.retain_mut(|image| {
        let Some(location) = locations.get(&image.hash) else {
            tracing::warn!(board = %board_id, hash = %image.hash, "Dropping image with no remote location");
            return false;
        };
        let Some(bytes) = bytes_by_hash.get(&image.hash) else {
            tracing::warn!(board = %board_id, hash = %image.hash, "Dropping image whose bytes could not be fetched");
            return false;
        };

        image.data = Some(bytes.clone());
        if image.natural_width == 0 {
            image.natural_width = location.width;
        }
        if image.natural_height == 0 {
            image.natural_height = location.height;
        }
        true
    });
    board
}
