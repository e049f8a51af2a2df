//! Scanning: the decode loop, decode modes and the scanner facade.

mod controller;
mod decode_loop;
mod scanner;

pub use controller::{ResultSink, ScanMode, ScanModeController};
pub use decode_loop::{DecodeLoop, DecodeOptions, FrameSource};
pub use scanner::{Scanner, SessionListener};
