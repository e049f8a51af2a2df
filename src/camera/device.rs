//! The platform camera capability consumed by [`CameraSession`](super::CameraSession).

use crate::frame::{RawFrame, Rotation, Size};

use super::types::{CameraConfig, CameraError, CameraId};

/// Receives exactly one captured frame, or the reason capture failed.
pub type FrameCallback = Box<dyn FnOnce(Result<RawFrame, CameraError>) + Send + 'static>;

/// Opaque display target handed to the device when the preview starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewSurface {
    pub size: Size,
}

/// A camera device.
///
/// Every method is called from the camera worker thread only, so
/// implementations need not be internally synchronized. `capture_one_frame`
/// may invoke its callback immediately or later from any thread.
pub trait CameraDevice: Send + 'static {
    fn open(&mut self, camera_id: CameraId) -> Result<(), CameraError>;

    /// Apply `config` and return the negotiated preview size in sensor orientation.
    fn configure(&mut self, config: &CameraConfig) -> Result<Size, CameraError>;

    fn start_preview(&mut self, surface: Option<&PreviewSurface>) -> Result<(), CameraError>;

    fn stop_preview(&mut self) -> Result<(), CameraError>;

    fn close(&mut self) -> Result<(), CameraError>;

    fn set_torch(&mut self, _on: bool) -> Result<(), CameraError> {
        Ok(())
    }

    /// Sensor rotation relative to the display, known once configured.
    fn rotation(&self) -> Rotation {
        Rotation::Deg0
    }

    /// Deliver the next preview frame to `on_frame`.
    fn capture_one_frame(&mut self, on_frame: FrameCallback);
}
