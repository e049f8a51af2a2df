//! Background execution contexts.
//!
//! - [`TaskQueue`]: one thread running posted tasks sequentially
//! - [`CameraWorker`]: the reference-counted queue that owns camera access

mod camera_worker;
mod queue;

pub use camera_worker::{CameraWorker, WorkerHandle};
pub use queue::{Task, TaskQueue};

use thiserror::Error;

/// Errors from submitting work to a background context.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The worker has no live references (or the handle is from an earlier lifetime).
    #[error("worker not running")]
    NotRunning,
    /// The operating system refused to start the thread.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}
