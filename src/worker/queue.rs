//! A single background thread that runs posted tasks one at a time, in order.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::WorkerError;

/// A unit of work run on a queue's thread.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Messages sent to the queue thread.
enum Job {
    Run { epoch: u64, task: Task },
    RunAt { epoch: u64, due: Instant, task: Task },
    Quit,
}

/// A delayed task waiting in the heap, ordered by due time then post order.
struct Delayed {
    due: Instant,
    seq: u64,
    epoch: u64,
    task: Task,
}

impl PartialEq for Delayed {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Delayed {}

impl PartialOrd for Delayed {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Delayed {
    // Reversed so the earliest task sits at the top of the max-heap.
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Sequential task queue backed by one named thread.
///
/// Tasks posted from any thread run in FIFO order. [`TaskQueue::quit`]
/// enqueues a final stop message, so every task posted before it still runs
/// and nothing runs after it.
///
/// [`TaskQueue::cancel_pending`] discards everything queued but not yet
/// started; a task that is already running is left to finish.
pub struct TaskQueue {
    name: String,
    tx: Sender<Job>,
    epoch: Arc<AtomicU64>,
    thread: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQueue")
            .field("name", &self.name)
            .field("epoch", &self.epoch.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl TaskQueue {
    /// Start the queue thread.
    pub fn spawn(name: &str) -> Result<Self, WorkerError> {
        let (tx, rx) = mpsc::channel();
        let epoch = Arc::new(AtomicU64::new(0));
        let thread_epoch = Arc::clone(&epoch);
        let thread_name = name.to_string();

        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run_queue(&thread_name, rx, thread_epoch))?;

        log::debug!("Started task queue '{}'", name);
        Ok(Self {
            name: name.to_string(),
            tx,
            epoch,
            thread: Some(handle),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Enqueue a task to run after everything already posted.
    pub fn post(&self, task: Task) -> Result<(), WorkerError> {
        let epoch = self.epoch.load(Ordering::SeqCst);
        self.tx
            .send(Job::Run { epoch, task })
            .map_err(|_| WorkerError::NotRunning)
    }

    /// Enqueue a task to run no earlier than `delay` from now.
    pub fn post_delayed(&self, task: Task, delay: Duration) -> Result<(), WorkerError> {
        let epoch = self.epoch.load(Ordering::SeqCst);
        let due = Instant::now() + delay;
        self.tx
            .send(Job::RunAt { epoch, due, task })
            .map_err(|_| WorkerError::NotRunning)
    }

    /// Drop every task that has been posted but has not started yet.
    pub fn cancel_pending(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
    }

    /// Enqueue the stop message and detach from the thread.
    ///
    /// Safe to call from a task running on this queue.
    pub fn quit(mut self) {
        let _ = self.tx.send(Job::Quit);
        self.thread.take();
    }

    /// Enqueue the stop message and wait for the thread to drain.
    ///
    /// Must not be called from a task running on this queue.
    pub fn quit_and_join(mut self) {
        let _ = self.tx.send(Job::Quit);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

fn run_queue(name: &str, rx: Receiver<Job>, epoch: Arc<AtomicU64>) {
    let mut delayed: BinaryHeap<Delayed> = BinaryHeap::new();
    let mut seq = 0u64;

    loop {
        // Run delayed tasks that have come due.
        let now = Instant::now();
        while delayed.peek().is_some_and(|d| d.due <= now) {
            if let Some(next) = delayed.pop() {
                if next.epoch == epoch.load(Ordering::SeqCst) {
                    (next.task)();
                }
            }
        }

        let job = match delayed.peek() {
            Some(next) => {
                let wait = next.due.saturating_duration_since(Instant::now());
                match rx.recv_timeout(wait) {
                    Ok(job) => job,
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            None => match rx.recv() {
                Ok(job) => job,
                Err(_) => break,
            },
        };

        match job {
            Job::Run { epoch: posted, task } => {
                if posted == epoch.load(Ordering::SeqCst) {
                    task();
                }
            }
            Job::RunAt {
                epoch: posted,
                due,
                task,
            } => {
                seq += 1;
                delayed.push(Delayed {
                    due,
                    seq,
                    epoch: posted,
                    task,
                });
            }
            Job::Quit => break,
        }
    }

    if !delayed.is_empty() {
        log::debug!(
            "Task queue '{}' dropped {} delayed task(s) on quit",
            name,
            delayed.len()
        );
    }
    log::debug!("Task queue '{}' stopped", name);
}
