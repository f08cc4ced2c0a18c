//! Board sync engine.
//!
//! A cycle pushes locally changed boards (uploading their images first) and
//! then pulls the authoritative remote list back into the local store. The
//! [`SyncOrchestrator`] owns the cycle lock, the status state machine, and the
//! offline queue drain.

mod offline_queue;
mod orchestrator;
mod pull;
mod task_pool;
mod upload;


pub use offline_queue::OfflineQueue;
pub use orchestrator::{ReconnectListener, SyncDeps, SyncOrchestrator};
pub use pull::PullMerger;
pub use task_pool::{TaskFailure, TaskPool};
pub use upload::UploadPipeline;
