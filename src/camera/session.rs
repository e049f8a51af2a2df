//! Camera session: drives one device through open, configure, preview and
//! close, with every hardware call running on the camera worker.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::context::{Event, MainHandle, ThreadGuard};
use crate::frame::{Rotation, Size};
use crate::worker::{CameraWorker, WorkerError, WorkerHandle};

use super::device::{CameraDevice, FrameCallback, PreviewSurface};
use super::types::{CameraConfig, CameraError, SessionState};

/// State shared between the interactive thread and worker tasks.
struct Shared {
    device: Mutex<Box<dyn CameraDevice>>,
    state: Mutex<SessionState>,
    /// Cleared by `close()` before the close task runs; late frame callbacks check it.
    open: AtomicBool,
    camera_closed: AtomicBool,
    /// Ticket of the only frame request that will be honored.
    frame_ticket: AtomicU64,
    rotation: Mutex<Rotation>,
    preview_size: Mutex<Option<Size>>,
    handle: Mutex<Option<WorkerHandle>>,
    worker: CameraWorker,
    main: MainHandle,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl Shared {
    fn state(&self) -> SessionState {
        *lock(&self.state)
    }

    fn set_state(&self, state: SessionState) {
        let mut current = lock(&self.state);
        log::debug!("Camera session {} -> {}", *current, state);
        *current = state;
    }

    fn notify_error(&self, error: CameraError) {
        self.main.post(Event::CameraError(error));
    }

    fn submit<F>(self: &Arc<Self>, task: F) -> Result<(), WorkerError>
    where
        F: FnOnce(&Arc<Shared>) + Send + 'static,
    {
        let handle = lock(&self.handle).clone().ok_or(WorkerError::NotRunning)?;
        let shared = Arc::clone(self);
        self.worker.submit(&handle, move || task(&shared))
    }

    fn run_open(&self, config: &CameraConfig) {
        self.set_state(SessionState::Opening);
        log::debug!("Opening camera {}", config.camera_id);
        match lock(&self.device).open(config.camera_id) {
            Ok(()) => self.set_state(SessionState::Configuring),
            Err(e) => {
                log::error!("Failed to open camera: {}", e);
                self.notify_error(e);
            }
        }
    }

    fn run_configure(&self, config: &CameraConfig) {
        if self.state() != SessionState::Configuring {
            log::debug!("Camera not opened, skipping configure");
            return;
        }
        log::debug!("Configuring camera");
        let mut device = lock(&self.device);
        match device.configure(config) {
            Ok(size) => {
                *lock(&self.rotation) = device.rotation();
                *lock(&self.preview_size) = Some(size);
                self.main.post(Event::PreviewSizeReady(size));
            }
            Err(e) => {
                log::error!("Failed to configure camera: {}", e);
                self.notify_error(e);
            }
        }
    }

    fn run_start_preview(&self, surface: Option<PreviewSurface>) {
        if self.state() != SessionState::Configuring || lock(&self.preview_size).is_none() {
            log::debug!("Camera not configured, skipping preview start");
            return;
        }
        log::debug!("Starting preview");
        match lock(&self.device).start_preview(surface.as_ref()) {
            Ok(()) => {
                self.set_state(SessionState::Previewing);
                self.main.post(Event::PreviewStarted);
            }
            Err(e) => {
                log::error!("Failed to start preview: {}", e);
                self.notify_error(e);
            }
        }
    }

    fn run_reconfigure(&self, config: &CameraConfig, surface: Option<PreviewSurface>) {
        let was_previewing = self.state() == SessionState::Previewing;
        if was_previewing {
            if let Err(e) = lock(&self.device).stop_preview() {
                log::error!("Failed to stop preview for reconfigure: {}", e);
                self.notify_error(e);
                return;
            }
            self.set_state(SessionState::Configuring);
        }
        self.run_configure(config);
        if was_previewing {
            self.run_start_preview(surface);
        }
    }

    fn run_capture(self: &Arc<Self>, ticket: u64, callback: FrameCallback) {
        if !self.open.load(Ordering::SeqCst) {
            log::debug!("Camera is closed, dropping frame request");
            return;
        }
        if self.frame_ticket.load(Ordering::SeqCst) != ticket {
            log::debug!("Frame request superseded before capture");
            return;
        }
        if self.state() != SessionState::Previewing {
            log::debug!("Preview not running, dropping frame request");
            return;
        }

        let shared = Arc::clone(self);
        let guarded: FrameCallback = Box::new(move |result| {
            // The device may call back after close; never touch a torn-down session.
            if !shared.open.load(Ordering::SeqCst) {
                log::debug!("Dropping frame delivered after close");
                return;
            }
            if shared.frame_ticket.load(Ordering::SeqCst) != ticket {
                log::debug!("Dropping frame for a superseded request");
                return;
            }
            callback(result);
        });
        lock(&self.device).capture_one_frame(guarded);
    }

    fn run_close(&self, handle: WorkerHandle) {
        let previous = self.state();
        self.set_state(SessionState::Closing);
        log::debug!("Closing camera");
        let close_error = {
            let mut device = lock(&self.device);
            if previous == SessionState::Previewing {
                if let Err(e) = device.stop_preview() {
                    log::error!("Failed to stop preview: {}", e);
                }
            }
            match previous {
                SessionState::Opening => None,
                _ => device.close().err(),
            }
        };
        if let Some(e) = close_error {
            log::error!("Failed to close camera: {}", e);
            self.notify_error(match e {
                e @ CameraError::CloseFailed(_) => e,
                other => CameraError::CloseFailed(other.to_string()),
            });
        }
        // A reopen may already be queued behind us.
        if !self.open.load(Ordering::SeqCst) {
            self.camera_closed.store(true, Ordering::SeqCst);
        }
        self.main.post(Event::CameraClosed);
        self.worker.release(&handle);
    }
}

/// Cloneable, thread-safe way to ask a session for one frame.
///
/// Used by the decode loop, which issues its next request from its own
/// thread once the previous decode has finished.
#[derive(Clone)]
pub struct FrameRequester {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for FrameRequester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameRequester")
            .field("open", &self.shared.open.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl FrameRequester {
    /// Enqueue one capture on the camera worker.
    ///
    /// Only the most recent request is honored: a request made before the
    /// previous one resolved supersedes it, and the older callback is dropped.
    /// Requests against a closed session are dropped silently.
    pub fn request_frame(&self, callback: FrameCallback) {
        if !self.shared.open.load(Ordering::SeqCst) {
            log::debug!("Camera is closed, not requesting frame");
            return;
        }
        let ticket = self.shared.frame_ticket.fetch_add(1, Ordering::SeqCst) + 1;
        let result = self
            .shared
            .submit(move |shared| shared.run_capture(ticket, callback));
        if let Err(e) = result {
            log::debug!("Discarding frame request: {}", e);
        }
    }

    pub fn is_open(&self) -> bool {
        self.shared.open.load(Ordering::SeqCst)
    }
}

/// One use of a camera device.
///
/// All methods must be called from the interactive thread and return without
/// blocking; the work runs on the shared [`CameraWorker`]. Hardware faults
/// arrive later as [`Event::CameraError`], and the session stays closable.
pub struct CameraSession {
    shared: Arc<Shared>,
    config: CameraConfig,
    surface: Option<PreviewSurface>,
    guard: ThreadGuard,
}

impl std::fmt::Debug for CameraSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraSession")
            .field("state", &self.state())
            .field("open", &self.is_open())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CameraSession {
    /// Create a closed session bound to the calling (interactive) thread.
    pub fn new(
        worker: CameraWorker,
        device: Box<dyn CameraDevice>,
        config: CameraConfig,
        main: MainHandle,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                device: Mutex::new(device),
                state: Mutex::new(SessionState::Closed),
                open: AtomicBool::new(false),
                camera_closed: AtomicBool::new(true),
                frame_ticket: AtomicU64::new(0),
                rotation: Mutex::new(Rotation::Deg0),
                preview_size: Mutex::new(None),
                handle: Mutex::new(None),
                worker,
                main,
            }),
            config,
            surface: None,
            guard: ThreadGuard::current(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    pub fn is_open(&self) -> bool {
        self.shared.open.load(Ordering::SeqCst)
    }

    /// True once the close task has released the device.
    pub fn is_camera_closed(&self) -> bool {
        self.shared.camera_closed.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    /// Replace the configuration. Ignored while the session is open; use
    /// [`reconfigure`](Self::reconfigure) instead.
    pub fn set_config(&mut self, config: CameraConfig) {
        self.guard.check("CameraSession::set_config");
        if !self.is_open() {
            self.config = config;
        } else {
            log::warn!("Camera session is open, ignoring new configuration");
        }
    }

    pub fn set_surface(&mut self, surface: PreviewSurface) {
        self.guard.check("CameraSession::set_surface");
        self.surface = Some(surface);
    }

    /// Negotiated preview size in sensor orientation, once configured.
    pub fn preview_size(&self) -> Option<Size> {
        *lock(&self.shared.preview_size)
    }

    /// Sensor rotation relative to the display, once configured.
    pub fn camera_rotation(&self) -> Rotation {
        *lock(&self.shared.rotation)
    }

    pub fn frame_requester(&self) -> FrameRequester {
        FrameRequester {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Take a worker reference and enqueue the open task.
    pub fn open(&mut self) -> Result<(), WorkerError> {
        self.guard.check("CameraSession::open");
        if self.is_open() {
            log::warn!("Camera session already open");
            return Ok(());
        }
        let handle = self.shared.worker.acquire()?;
        *lock(&self.shared.handle) = Some(handle);
        self.shared.open.store(true, Ordering::SeqCst);
        self.shared.camera_closed.store(false, Ordering::SeqCst);

        let config = self.config.clone();
        self.enqueue(move |shared| shared.run_open(&config));
        Ok(())
    }

    /// Enqueue configuration with the current configuration snapshot.
    ///
    /// # Panics
    ///
    /// Panics if the session is not open.
    pub fn configure(&mut self) {
        self.guard.check("CameraSession::configure");
        self.validate_open();
        let config = self.config.clone();
        self.enqueue(move |shared| shared.run_configure(&config));
    }

    /// Enqueue the preview start. [`Event::PreviewStarted`] follows on success.
    ///
    /// # Panics
    ///
    /// Panics if the session is not open.
    pub fn start_preview(&mut self) {
        self.guard.check("CameraSession::start_preview");
        self.validate_open();
        let surface = self.surface;
        self.enqueue(move |shared| shared.run_start_preview(surface));
    }

    /// Apply a new configuration to an open session, restarting the preview
    /// if it was running.
    pub fn reconfigure(&mut self, config: CameraConfig) {
        self.guard.check("CameraSession::reconfigure");
        self.validate_open();
        self.config = config.clone();
        let surface = self.surface;
        self.enqueue(move |shared| shared.run_reconfigure(&config, surface));
    }

    /// Switch the torch. Ignored while closed.
    pub fn set_torch(&mut self, on: bool) {
        self.guard.check("CameraSession::set_torch");
        if !self.is_open() {
            return;
        }
        self.enqueue(move |shared| {
            if let Err(e) = lock(&shared.device).set_torch(on) {
                log::error!("Failed to set torch: {}", e);
                shared.notify_error(e);
            }
        });
    }

    /// Run an arbitrary parameter change against the device on the worker.
    /// Ignored while closed.
    pub fn change_parameters<F>(&mut self, change: F)
    where
        F: FnOnce(&mut dyn CameraDevice) + Send + 'static,
    {
        self.guard.check("CameraSession::change_parameters");
        if !self.is_open() {
            return;
        }
        self.enqueue(move |shared| {
            let mut device = lock(&shared.device);
            change(device.as_mut());
        });
    }

    /// Request one frame; see [`FrameRequester::request_frame`].
    pub fn request_frame(&self, callback: FrameCallback) {
        self.guard.check("CameraSession::request_frame");
        self.frame_requester().request_frame(callback);
    }

    /// Mark the session closed and enqueue the close task.
    ///
    /// The open flag drops before the task runs, so frame callbacks racing
    /// with the close are discarded. [`Event::CameraClosed`] follows.
    pub fn close(&mut self) {
        self.guard.check("CameraSession::close");
        self.begin_close();
    }

    /// Complete the close on the interactive thread after [`Event::CameraClosed`].
    pub fn handle_closed(&mut self) {
        self.guard.check("CameraSession::handle_closed");
        if self.shared.state() == SessionState::Closing {
            self.shared.set_state(SessionState::Closed);
        }
    }

    fn begin_close(&mut self) {
        if !self.shared.open.swap(false, Ordering::SeqCst) {
            self.shared.camera_closed.store(true, Ordering::SeqCst);
            return;
        }
        let Some(handle) = lock(&self.shared.handle).take() else {
            return;
        };
        let shared = Arc::clone(&self.shared);
        let task_handle = handle.clone();
        if let Err(e) = self
            .shared
            .worker
            .submit(&handle, move || shared.run_close(task_handle))
        {
            log::error!("Failed to enqueue camera close: {}", e);
        }
    }

    fn enqueue<F>(&self, task: F)
    where
        F: FnOnce(&Arc<Shared>) + Send + 'static,
    {
        if let Err(e) = self.shared.submit(task) {
            // We hold a worker reference while open, so this is a bug.
            log::error!("Failed to enqueue camera task: {}", e);
        }
    }

    #[track_caller]
    fn validate_open(&self) {
        assert!(self.is_open(), "CameraSession is not open");
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.begin_close();
    }
}
