//! Bounded-concurrency runner for independent async operations.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use futures::future::join_all;
use futures::FutureExt;

/// Why a single task produced no value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskFailure<E> {
    #[error("task failed: {0}")]
    Failed(E),
    #[error("task panicked: {0}")]
    Panicked(String),
}

/// Runs operations with at most `concurrency` of them active at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskPool {
    concurrency: usize,
}

impl TaskPool {
    /// A zero limit is treated as one.
    #[must_use]
    pub const fn new(concurrency: usize) -> Self {
        Self {
            concurrency: if concurrency == 0 { 1 } else { concurrency },
        }
    }

    #[must_use]
    pub const fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Run every task and return one outcome per task, in input order.
    ///
    /// Workers claim the next unstarted index from a shared cursor until the
    /// list is exhausted, so a slow task never holds back the others. A task
    /// that fails or panics only affects its own slot.
    pub async fn run<T, E, F, Fut>(&self, tasks: Vec<F>) -> Vec<Result<T, TaskFailure<E>>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let total = tasks.len();
        if total == 0 {
            return Vec::new();
        }

        let queue: Vec<Mutex<Option<F>>> = tasks
            .into_iter()
            .map(|task| Mutex::new(Some(task)))
            .collect();
        let slots: Vec<Mutex<Option<Result<T, TaskFailure<E>>>>> =
            (0..total).map(|_| Mutex::new(None)).collect();
        let cursor = AtomicUsize::new(0);

        let queue = &queue;
        let slots = &slots;
        let cursor = &cursor;
        let workers = self.concurrency.min(total);

        join_all((0..workers).map(|_| async move {
            loop {
                let index = cursor.fetch_add(1, Ordering::SeqCst);
                if index >= total {
                    break;
                }
                let task = queue[index]
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take();
                let Some(task) = task else {
                    continue;
                };

                let outcome = match AssertUnwindSafe(async move { task().await })
                    .catch_unwind()
                    .await
                {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(error)) => Err(TaskFailure::Failed(error)),
                    Err(payload) => Err(TaskFailure::Panicked(panic_message(payload.as_ref()))),
                };
                *slots[index].lock().unwrap_or_else(PoisonError::into_inner) = Some(outcome);
            }
        }))
        .await;

        slots
            .iter()
            .map(|slot| {
                slot.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take()
                    .unwrap_or_else(|| Err(TaskFailure::Panicked("task never ran".to_string())))
            })
            .collect()
    }
}

impl Default for TaskPool {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_CONCURRENCY)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
