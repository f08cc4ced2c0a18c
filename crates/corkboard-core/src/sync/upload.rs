//! Content-addressed image upload for the push path.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::hash::ContentHash;
use crate::models::{Board, ImageMetadata};
use crate::remote::BlobStore;
use crate::sync::task_pool::{TaskFailure, TaskPool};
use crate::{Error, Result};

/// One unique image waiting to be uploaded.
#[derive(Debug, Clone)]
struct PendingUpload {
    hash: ContentHash,
    bytes: Vec<u8>,
    metadata: ImageMetadata,
}

/// Uploads each distinct image referenced by a set of boards exactly once.
#[derive(Clone)]
pub struct UploadPipeline {
    blobs: Arc<dyn BlobStore>,
    pool: TaskPool,
}

impl UploadPipeline {
    pub fn new(blobs: Arc<dyn BlobStore>, pool: TaskPool) -> Self {
        Self { blobs, pool }
    }

    /// Upload every unique image carried by `boards`.
    ///
    /// Images are keyed by content hash with the first occurrence winning.
    /// Images without local bytes are already remote and are skipped. Any
    /// single failure fails the whole batch with [`Error::Upload`], except
    /// that an unreachable host is reported as the underlying connectivity
    /// error.
    pub async fn upload_all(&self, boards: &[Board]) -> Result<HashMap<ContentHash, String>> {
        let pending = collect_unique_images(boards);
        if pending.is_empty() {
            tracing::debug!("No image bytes to upload");
            return Ok(HashMap::new());
        }

        tracing::debug!(
            images = pending.len(),
            concurrency = self.pool.concurrency(),
            "Uploading unique images"
        );

        let tasks: Vec<_> = pending
            .iter()
            .map(|upload| {
                let blobs = Arc::clone(&self.blobs);
                move || async move {
                    blobs
                        .upload(&upload.hash, &upload.bytes, &upload.metadata)
                        .await
                }
            })
            .collect();
        let outcomes = self.pool.run(tasks).await;

        let mut locations = HashMap::with_capacity(pending.len());
        let mut first_failure = None;
        for (upload, outcome) in pending.iter().zip(outcomes) {
            match outcome {
                Ok(location) => {
                    locations.insert(upload.hash.clone(), location);
                }
                Err(TaskFailure::Failed(error)) if error.is_connectivity() => {
                    tracing::debug!(hash = %upload.hash, %error, "Image upload could not reach the host");
                    if !first_failure.as_ref().is_some_and(Error::is_connectivity) {
                        first_failure = Some(error);
                    }
                }
                Err(failure) => {
                    let reason = match failure {
                        TaskFailure::Failed(error) => error.to_string(),
                        TaskFailure::Panicked(message) => format!("upload panicked: {message}"),
                    };
                    tracing::debug!(hash = %upload.hash, %reason, "Image upload failed");
                    if first_failure.is_none() {
                        first_failure = Some(Error::Upload {
                            hash: upload.hash.to_string(),
                            reason,
                        });
                    }
                }
            }
        }

        match first_failure {
            Some(error) => Err(error),
            None => Ok(locations),
        }
    }
}

fn collect_unique_images(boards: &[Board]) -> Vec<PendingUpload> {
    let mut seen = HashSet::new();
    let mut pending = Vec::new();
    for image in boards.iter().flat_map(|board| board.images.iter()) {
        let Some(bytes) = image.data.as_ref() else {
            continue;
        };
        if !seen.insert(image.hash.clone()) {
            continue;
        }
        pending.push(PendingUpload {
            hash: image.hash.clone(),
            bytes: bytes.clone(),
            metadata: image.metadata(),
        });
    }
    pending
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::hash::ContentHasher;
    use crate::models::CanvasImageRef;
    use crate::remote::InMemoryRemote;

    fn image(bytes: &[u8]) -> CanvasImageRef {
        CanvasImageRef::from_bytes(bytes.to_vec(), "image/png", 4, 3, &ContentHasher::default())
            .unwrap()
    }

    fn pipeline(remote: &Arc<InMemoryRemote>) -> UploadPipeline {
        UploadPipeline::new(remote.clone(), TaskPool::new(3))
    }

    #[tokio::test]
    async fn shared_image_is_uploaded_once() {
        let remote = Arc::new(InMemoryRemote::new());
        let shared = image(b"same-bytes");
        let mut first = Board::new("First");
        first.add_image(shared.clone());
        let mut second = Board::new("Second");
        second.add_image(image(b"same-bytes"));
        second.add_image(image(b"other-bytes"));

        let locations = pipeline(&remote)
            .upload_all(&[first, second])
            .await
            .unwrap();

        assert_eq!(locations.len(), 2);
        assert_eq!(remote.upload_calls(&shared.hash), 1);
        assert_eq!(remote.total_upload_calls(), 2);
    }

    #[tokio::test]
    async fn images_without_bytes_are_skipped() {
        let remote = Arc::new(InMemoryRemote::new());
        let mut board = Board::new("Remote only");
        board.add_image(image(b"already-remote").without_data());

        let locations = pipeline(&remote).upload_all(&[board]).await.unwrap();
        assert!(locations.is_empty());
        assert_eq!(remote.total_upload_calls(), 0);
    }

    #[tokio::test]
    async fn single_failure_fails_the_batch() {
        let remote = Arc::new(InMemoryRemote::new());
        let broken = image(b"broken");
        remote.fail_upload_of(broken.hash.clone());
        let mut board = Board::new("Mixed");
        board.add_image(image(b"fine"));
        board.add_image(broken.clone());

        let err = pipeline(&remote).upload_all(&[board]).await.unwrap_err();
        match err {
            Error::Upload { hash, .. } => assert_eq!(hash, broken.hash.to_string()),
            other => panic!("unexpected error: {other:?}"),
        }
        // Siblings still ran
        assert_eq!(remote.total_upload_calls(), 2);
    }
}
