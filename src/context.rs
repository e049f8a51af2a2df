//! The interactive context: a single-threaded event queue where results,
//! camera errors and lifecycle notifications are delivered.
//!
//! Background threads hold a [`MainHandle`] and post typed [`Event`]s; the
//! thread that owns the [`MainLoop`] drains them and dispatches by pattern
//! match. Public control methods of the session, decode loop and controller
//! assert they run on that thread via [`ThreadGuard`].

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, ThreadId};
use std::time::Duration;

use crate::camera::CameraError;
use crate::decode::ScanResult;
use crate::frame::{Point, Size};

/// Notifications delivered to the interactive context.
#[derive(Debug)]
pub enum Event {
    /// The camera was configured; carries the negotiated preview size.
    PreviewSizeReady(Size),
    /// The preview is running and frames may be requested.
    PreviewStarted,
    /// A hardware fault while opening, configuring, starting or closing the camera.
    CameraError(CameraError),
    /// The close task finished; the hardware handle is released.
    CameraClosed,
    /// A decode attempt found a symbol.
    DecodeSucceeded { generation: u64, result: ScanResult },
    /// A decode attempt ran and found nothing.
    DecodeFailed { generation: u64 },
    /// Candidate points seen during the last attempt, for display only.
    PossiblePoints { generation: u64, points: Vec<Point> },
    /// The decode loop stopped itself on a frame it cannot process.
    DecodeAborted { generation: u64, reason: String },
}

/// Remembers which thread is the interactive one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadGuard {
    id: ThreadId,
}

impl ThreadGuard {
    /// Bind to the calling thread.
    pub fn current() -> Self {
        Self {
            id: thread::current().id(),
        }
    }

    pub fn is_current(&self) -> bool {
        thread::current().id() == self.id
    }

    /// Panic unless called from the bound thread.
    #[track_caller]
    pub fn check(&self, operation: &str) {
        assert!(
            self.is_current(),
            "{} must be called from the interactive thread",
            operation
        );
    }
}

/// Cloneable, thread-safe sender into the interactive context.
#[derive(Debug, Clone)]
pub struct MainHandle {
    tx: Sender<Event>,
}

impl MainHandle {
    /// Post an event. Returns false if the interactive context is gone, in
    /// which case the event is silently discarded.
    pub fn post(&self, event: Event) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// The interactive event queue, owned by one thread.
#[derive(Debug)]
pub struct MainLoop {
    tx: Sender<Event>,
    rx: Receiver<Event>,
    guard: ThreadGuard,
}

impl Default for MainLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl MainLoop {
    /// Create the loop, making the calling thread the interactive thread.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            tx,
            rx,
            guard: ThreadGuard::current(),
        }
    }

    pub fn handle(&self) -> MainHandle {
        MainHandle {
            tx: self.tx.clone(),
        }
    }

    pub fn guard(&self) -> ThreadGuard {
        self.guard
    }

    /// Take the next event if one is already queued.
    pub fn try_next(&self) -> Option<Event> {
        self.guard.check("MainLoop::try_next");
        self.rx.try_recv().ok()
    }

    /// Wait up to `timeout` for the next event.
    pub fn next_timeout(&self, timeout: Duration) -> Option<Event> {
        self.guard.check("MainLoop::next_timeout");
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}
