//! Reference-counted background context that owns all camera hardware access.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::queue::{Task, TaskQueue};
use super::WorkerError;

const THREAD_NAME: &str = "camera-worker";

/// Token proving a session holds a reference on the worker.
///
/// A handle is bound to one worker lifetime: once the count returns to zero
/// and the thread quits, handles from that lifetime are rejected even if a
/// new lifetime has started since.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerHandle {
    generation: u64,
}

#[derive(Default)]
struct WorkerState {
    count: usize,
    generation: u64,
    queue: Option<TaskQueue>,
}

/// Shared camera worker.
///
/// Construct one per process (or per test) and clone it into each session.
/// The first [`acquire`](CameraWorker::acquire) starts a single sequential
/// task thread; the last [`release`](CameraWorker::release) enqueues a quit
/// message behind every task already submitted, so nothing is dropped before
/// teardown and nothing runs after it.
#[derive(Clone, Default)]
pub struct CameraWorker {
    state: Arc<Mutex<WorkerState>>,
}

impl std::fmt::Debug for CameraWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("CameraWorker")
            .field("count", &state.count)
            .field("generation", &state.generation)
            .field("running", &state.queue.is_some())
            .finish()
    }
}

impl CameraWorker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, WorkerState> {
        // A panicking task never holds this lock, so poisoning only means a
        // caller panicked mid-call; the counters are still consistent.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Take a reference, starting the worker thread on the 0 -> 1 transition.
    pub fn acquire(&self) -> Result<WorkerHandle, WorkerError> {
        let mut state = self.lock();
        if state.queue.is_none() {
            state.generation += 1;
            state.queue = Some(TaskQueue::spawn(THREAD_NAME)?);
            log::debug!("Camera worker started (generation {})", state.generation);
        }
        state.count += 1;
        Ok(WorkerHandle {
            generation: state.generation,
        })
    }

    /// Drop a reference. On the transition to zero the worker quits once all
    /// previously submitted tasks have run.
    ///
    /// May be called from a task running on the worker itself.
    pub fn release(&self, handle: &WorkerHandle) {
        let mut state = self.lock();
        if state.queue.is_none() || handle.generation != state.generation {
            log::warn!("Ignoring release of a camera worker handle that is no longer live");
            return;
        }
        state.count -= 1;
        if state.count == 0 {
            if let Some(queue) = state.queue.take() {
                queue.quit();
            }
            log::debug!("Camera worker released (generation {})", state.generation);
        }
    }

    /// Enqueue `task` for in-order execution on the worker thread.
    ///
    /// Fails with [`WorkerError::NotRunning`] once the count has reached zero
    /// or when the handle belongs to an earlier lifetime.
    pub fn submit<F>(&self, handle: &WorkerHandle, task: F) -> Result<(), WorkerError>
    where
        F: FnOnce() + Send + 'static,
    {
        let state = self.lock();
        let queue = Self::live_queue(&state, handle)?;
        queue.post(Box::new(task) as Task)
    }

    /// Enqueue `task` to run after `delay` on the worker thread.
    pub fn submit_delayed<F>(
        &self,
        handle: &WorkerHandle,
        task: F,
        delay: Duration,
    ) -> Result<(), WorkerError>
    where
        F: FnOnce() + Send + 'static,
    {
        let state = self.lock();
        let queue = Self::live_queue(&state, handle)?;
        queue.post_delayed(Box::new(task), delay)
    }

    fn live_queue<'a>(
        state: &'a WorkerState,
        handle: &WorkerHandle,
    ) -> Result<&'a TaskQueue, WorkerError> {
        match &state.queue {
            Some(queue) if handle.generation == state.generation => Ok(queue),
            _ => Err(WorkerError::NotRunning),
        }
    }

    /// Number of outstanding references.
    pub fn ref_count(&self) -> usize {
        self.lock().count
    }

    /// True while at least one reference is held.
    pub fn is_running(&self) -> bool {
        self.lock().queue.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_acquire_starts_worker() {
        let worker = CameraWorker::new();
        assert!(!worker.is_running());
        let handle = worker.acquire().unwrap();
        assert!(worker.is_running());
        assert_eq!(worker.ref_count(), 1);
        worker.release(&handle);
        assert!(!worker.is_running());
    }

    #[test]
    fn test_tasks_run_on_worker_thread() {
        let worker = CameraWorker::new();
        let handle = worker.acquire().unwrap();
        let (tx, rx) = mpsc::channel();
        worker
            .submit(&handle, move || {
                let _ = tx.send(std::thread::current().name().map(str::to_string));
            })
            .unwrap();
        let name = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(name.as_deref(), Some(THREAD_NAME));
        worker.release(&handle);
    }

    #[test]
    fn test_stale_handle_rejected_after_restart() {
        let worker = CameraWorker::new();
        let old = worker.acquire().unwrap();
        worker.release(&old);
        let new = worker.acquire().unwrap();
        assert!(matches!(
            worker.submit(&old, || {}),
            Err(WorkerError::NotRunning)
        ));
        assert!(worker.submit(&new, || {}).is_ok());
        // Releasing the stale handle must not drop the live reference.
        worker.release(&old);
        assert_eq!(worker.ref_count(), 1);
        worker.release(&new);
    }

    #[test]
    fn test_release_from_worker_task() {
        let worker = CameraWorker::new();
        let handle = worker.acquire().unwrap();
        let (tx, rx) = mpsc::channel();
        let inner = worker.clone();
        let inner_handle = handle.clone();
        worker
            .submit(&handle, move || {
                inner.release(&inner_handle);
                let _ = tx.send(());
            })
            .unwrap();
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(!worker.is_running());
    }
}
