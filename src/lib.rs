//! scanloop library crate.
//!
//! Camera frame capture feeding a single-flight barcode decode loop:
//!
//! - [`worker`]: the reference-counted camera worker and task queues
//! - [`camera`]: device abstraction and the camera session state machine
//! - [`frame`]: raw frames and the rotate / crop / scale transforms
//! - [`decode`]: the decoder capability, scan strategies and a QR decoder
//! - [`scan`]: the decode loop, decode modes and the scanner facade
//! - [`context`]: the interactive event loop everything reports back to

pub mod camera;
pub mod cli;
pub mod config;
pub mod context;
pub mod decode;
pub mod frame;
pub mod scan;
pub mod worker;
