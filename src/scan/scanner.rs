//! Scanner facade: one camera session plus a decode mode controller, driven
//! from a single interactive event loop.

use std::sync::Arc;
use std::time::Duration;

use crate::camera::{CameraDevice, CameraError, CameraSession, PreviewSurface, SessionState};
use crate::config::{Config, DecodeConfig};
use crate::context::{Event, MainHandle, MainLoop};
use crate::decode::{DecoderFactory, QrDecoderFactory};
use crate::frame::{framing_rect, Size};
use crate::worker::{CameraWorker, WorkerError};

use super::controller::{ResultSink, ScanMode, ScanModeController};
use super::decode_loop::DecodeOptions;

/// Camera lifecycle notifications, delivered on the interactive thread.
pub trait SessionListener {
    fn preview_size_ready(&mut self, _size: Size) {}

    fn preview_started(&mut self) {}

    /// A hardware fault. Unless it is a close failure, the session is still
    /// open and should be paused.
    fn camera_error(&mut self, _error: &CameraError) {}

    fn camera_closed(&mut self) {}
}

impl SessionListener for () {}

/// Owns the interactive event loop, the camera session and the decode mode.
///
/// Must be created and used on one thread, which becomes the interactive
/// thread. Call [`pump`](Scanner::pump) regularly to dispatch events.
pub struct Scanner {
    main: MainLoop,
    session: CameraSession,
    controller: ScanModeController,
    decode: DecodeConfig,
    listener: Box<dyn SessionListener>,
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("session", &self.session)
            .field("controller", &self.controller)
            .finish_non_exhaustive()
    }
}

impl Scanner {
    /// Build a scanner decoding QR codes with the configured strategy.
    pub fn new(worker: CameraWorker, device: Box<dyn CameraDevice>, config: &Config) -> Self {
        let factory = Arc::new(QrDecoderFactory::new(config.decode.strategy));
        Self::with_factory(worker, device, config, factory)
    }

    pub fn with_factory(
        worker: CameraWorker,
        device: Box<dyn CameraDevice>,
        config: &Config,
        factory: Arc<dyn DecoderFactory>,
    ) -> Self {
        let main = MainLoop::new();
        let session = CameraSession::new(worker, device, config.camera.clone(), main.handle());
        let mut controller = ScanModeController::new(main.handle(), factory);
        controller.set_options(DecodeOptions {
            crop: None,
            scale: config.decode.scale,
        });
        Self {
            main,
            session,
            controller,
            decode: config.decode.clone(),
            listener: Box::new(()),
        }
    }

    pub fn set_listener<L: SessionListener + 'static>(&mut self, listener: L) {
        self.listener = Box::new(listener);
    }

    pub fn set_surface(&mut self, surface: PreviewSurface) {
        self.session.set_surface(surface);
    }

    /// Posting side of the interactive loop, for other producers of events.
    pub fn main_handle(&self) -> MainHandle {
        self.main.handle()
    }

    pub fn session(&self) -> &CameraSession {
        &self.session
    }

    pub fn controller(&self) -> &ScanModeController {
        &self.controller
    }

    pub fn mode(&self) -> ScanMode {
        self.controller.mode()
    }

    /// Open the camera, configure it and start the preview.
    pub fn resume(&mut self) -> Result<(), WorkerError> {
        self.session.open()?;
        self.session.configure();
        self.session.start_preview();
        Ok(())
    }

    /// Stop decoding and close the camera. The decode mode is kept and
    /// resumes with the next preview.
    pub fn pause(&mut self) {
        self.controller.preview_stopped();
        self.session.close();
    }

    pub fn decode_single<S: ResultSink + 'static>(&mut self, sink: S) {
        self.controller.decode_single(sink);
    }

    pub fn decode_continuous<S: ResultSink + 'static>(&mut self, sink: S) {
        self.controller.decode_continuous(sink);
    }

    pub fn stop_decoding(&mut self) {
        self.controller.stop_decoding();
    }

    pub fn set_torch(&mut self, on: bool) {
        self.session.set_torch(on);
    }

    /// Dispatch every event already queued. Returns how many were handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.main.try_next() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Wait up to `timeout` for an event, then dispatch it and everything
    /// queued behind it. Returns how many were handled.
    pub fn pump_timeout(&mut self, timeout: Duration) -> usize {
        match self.main.next_timeout(timeout) {
            Some(event) => {
                self.handle_event(event);
                1 + self.pump()
            }
            None => 0,
        }
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::PreviewSizeReady(size) => {
                self.apply_framing(size);
                self.listener.preview_size_ready(size);
            }
            Event::PreviewStarted => {
                if self.session.state() != SessionState::Previewing || !self.session.is_open() {
                    log::debug!("Ignoring preview start for a closed session");
                    return;
                }
                self.controller
                    .preview_started(Arc::new(self.session.frame_requester()));
                self.listener.preview_started();
            }
            Event::CameraError(e) => {
                log::warn!("Camera error: {}", e);
                self.listener.camera_error(&e);
            }
            Event::CameraClosed => {
                self.session.handle_closed();
                self.listener.camera_closed();
            }
            Event::DecodeSucceeded { generation, result } => {
                self.controller.on_decode_succeeded(generation, result);
            }
            Event::DecodeFailed { generation } => {
                self.controller.on_decode_failed(generation);
            }
            Event::PossiblePoints { generation, points } => {
                self.controller.on_possible_points(generation, &points);
            }
            Event::DecodeAborted { generation, reason } => {
                self.controller.on_decode_aborted(generation, &reason);
            }
        }
    }

    /// Restrict decoding to the framing rectangle of the display-oriented preview.
    fn apply_framing(&mut self, preview: Size) {
        let crop = if self.decode.crop {
            let display = if self.session.camera_rotation().is_orthogonal() {
                preview.transposed()
            } else {
                preview
            };
            let rect = framing_rect(display, self.decode.margin);
            log::debug!("Framing rectangle {} in {}", rect, display);
            Some(rect)
        } else {
            None
        };
        self.controller.set_options(DecodeOptions {
            crop,
            scale: self.decode.scale,
        });
    }
}

impl Drop for Scanner {
    fn drop(&mut self) {
        // Decoding must stop before the session gives up its worker reference.
        self.controller.stop_decoding();
        self.session.close();
    }
}
