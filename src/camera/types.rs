//! Camera configuration, session states and hardware errors.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which camera to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum CameraId {
    /// Let the device layer pick (typically the first back-facing camera).
    #[default]
    NoPreference,
    /// A specific camera index.
    Index(u32),
}

impl From<i32> for CameraId {
    /// Negative values mean "no preference".
    fn from(raw: i32) -> Self {
        if raw < 0 {
            CameraId::NoPreference
        } else {
            CameraId::Index(raw as u32)
        }
    }
}

impl From<CameraId> for i32 {
    fn from(id: CameraId) -> Self {
        match id {
            CameraId::NoPreference => -1,
            CameraId::Index(index) => index as i32,
        }
    }
}

impl fmt::Display for CameraId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraId::NoPreference => write!(f, "auto"),
            CameraId::Index(index) => write!(f, "{}", index),
        }
    }
}

/// Focus behaviour requested from the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FocusMode {
    #[default]
    Auto,
    Continuous,
    Infinity,
    Macro,
    /// Leave focus alone.
    None,
}

/// Snapshot of the options applied when the session configures the camera.
///
/// Changing it after the session is open has no effect until
/// [`CameraSession::reconfigure`](super::CameraSession::reconfigure) is called.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub camera_id: CameraId,
    pub focus_mode: FocusMode,
    /// Let the device switch the torch on in low light.
    pub torch_auto: bool,
    pub metering: bool,
    pub exposure: bool,
    /// Ask the device for its barcode scene mode, if it has one.
    pub scene_mode: bool,
    /// Dark and light are swapped in the symbols being scanned.
    pub inverted_scan: bool,
}

/// Lifecycle of a camera session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Closed,
    Opening,
    Configuring,
    Previewing,
    Closing,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Closed => "closed",
            SessionState::Opening => "opening",
            SessionState::Configuring => "configuring",
            SessionState::Previewing => "previewing",
            SessionState::Closing => "closing",
        };
        write!(f, "{}", name)
    }
}

/// Faults reported by the camera device.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
    #[error("Failed to open camera: {0}")]
    OpenFailed(String),
    #[error("Failed to configure camera: {0}")]
    ConfigureFailed(String),
    #[error("Failed to start camera preview: {0}")]
    PreviewFailed(String),
    #[error("Failed to capture frame: {0}")]
    CaptureFailed(String),
    #[error("Failed to close camera: {0}")]
    CloseFailed(String),
    /// A finite frame source has nothing left to deliver.
    #[error("Frame source exhausted")]
    SourceExhausted,
}
