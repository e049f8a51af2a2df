//! Camera module: device abstraction, session state machine and a replay device.
//!
//! - [`CameraDevice`]: the platform capability, always driven from the camera worker
//! - [`CameraSession`]: open, configure, preview and close on behalf of the interactive thread
//! - [`ReplayCamera`]: a device backed by prepared frames or image files

mod device;
mod replay;
mod session;
mod types;

pub use device::{CameraDevice, FrameCallback, PreviewSurface};
pub use replay::{ReplayCamera, ReplayStats};
pub use session::{CameraSession, FrameRequester};
pub use types::{CameraConfig, CameraError, CameraId, FocusMode, SessionState};
