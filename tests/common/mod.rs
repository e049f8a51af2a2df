//! Shared fixtures: a scripted camera device and fake decoders.

#![allow(dead_code)]

use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use scanloop::camera::{
    CameraConfig, CameraDevice, CameraError, CameraId, FrameCallback, PreviewSurface,
};
use scanloop::decode::{BarcodeFormat, DecodeOutcome, Decoder, Symbol};
use scanloop::frame::{FrameBuffer, PixelFormat, Point, RawFrame, Rotation, Size};
use scanloop::scan::Scanner;

/// Marker at the start of row 0 of a synthetic test pattern.
pub const MAGIC: [u8; 2] = [0x5a, 0xa5];

/// A Y8 frame whose first row carries `payload` behind [`MAGIC`].
pub fn pattern_frame(payload: &str, size: Size) -> RawFrame {
    let mut data = vec![128u8; size.area()];
    data[..2].copy_from_slice(&MAGIC);
    data[2] = payload.len() as u8;
    data[3..3 + payload.len()].copy_from_slice(payload.as_bytes());
    RawFrame::new(data, size.width, size.height, PixelFormat::Y8, Rotation::Deg0).unwrap()
}

pub fn blank_frame(size: Size) -> RawFrame {
    RawFrame::new(
        vec![128u8; size.area()],
        size.width,
        size.height,
        PixelFormat::Y8,
        Rotation::Deg0,
    )
    .unwrap()
}

/// Reads the synthetic pattern written by [`pattern_frame`].
#[derive(Debug, Default)]
pub struct PatternDecoder;

impl Decoder for PatternDecoder {
    fn decode(&mut self, buffer: &FrameBuffer) -> DecodeOutcome {
        let bytes = buffer.as_bytes();
        if bytes.len() < 3 || bytes[..2] != MAGIC {
            return DecodeOutcome::NotFound;
        }
        let len = bytes[2] as usize;
        let text = String::from_utf8_lossy(&bytes[3..3 + len]).into_owned();
        let (w, h) = (buffer.width() as f32, buffer.height() as f32);
        DecodeOutcome::Found(Symbol::from_text(text, BarcodeFormat::Unknown).with_points(vec![
            Point::new(0.0, 0.0),
            Point::new(w, 0.0),
            Point::new(w, h),
            Point::new(0.0, h),
        ]))
    }
}

/// Signals when a decode starts, then takes `delay` and finds "late".
pub struct SlowDecoder {
    pub started: Sender<()>,
    pub delay: Duration,
}

impl Decoder for SlowDecoder {
    fn decode(&mut self, _buffer: &FrameBuffer) -> DecodeOutcome {
        let _ = self.started.send(());
        thread::sleep(self.delay);
        DecodeOutcome::Found(Symbol::from_text("late", BarcodeFormat::Unknown))
    }
}

/// What a [`ScriptedCamera`] saw, shared with the test.
#[derive(Clone, Default)]
pub struct CameraTrace {
    pub calls: Arc<Mutex<Vec<String>>>,
    pub held: Arc<Mutex<Vec<FrameCallback>>>,
    pub threads: Arc<Mutex<Vec<Option<String>>>>,
}

impl CameraTrace {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn held_count(&self) -> usize {
        self.held.lock().unwrap().len()
    }

    /// Deliver `result` to the oldest held callback.
    pub fn release_held(&self, result: Result<RawFrame, CameraError>) {
        let callback = self.held.lock().unwrap().remove(0);
        callback(result);
    }
}

type FrameScript = Box<dyn FnMut(usize) -> Result<RawFrame, CameraError> + Send>;

/// A camera device driven by a script of frames and faults.
pub struct ScriptedCamera {
    size: Size,
    script: FrameScript,
    captured: usize,
    fail_open: Option<CameraError>,
    fail_configure: Option<CameraError>,
    fail_close: Option<CameraError>,
    hold: bool,
    trace: CameraTrace,
}

impl ScriptedCamera {
    /// Delivers blank frames of `size` forever.
    pub fn new(size: Size) -> Self {
        Self {
            size,
            script: Box::new(move |_| Ok(blank_frame(size))),
            captured: 0,
            fail_open: None,
            fail_configure: None,
            fail_close: None,
            hold: false,
            trace: CameraTrace::default(),
        }
    }

    pub fn with_script<F>(mut self, script: F) -> Self
    where
        F: FnMut(usize) -> Result<RawFrame, CameraError> + Send + 'static,
    {
        self.script = Box::new(script);
        self
    }

    pub fn failing_open(mut self, error: CameraError) -> Self {
        self.fail_open = Some(error);
        self
    }

    pub fn failing_configure(mut self, error: CameraError) -> Self {
        self.fail_configure = Some(error);
        self
    }

    pub fn failing_close(mut self, error: CameraError) -> Self {
        self.fail_close = Some(error);
        self
    }

    /// Keep capture callbacks in the trace instead of answering them.
    pub fn holding(mut self) -> Self {
        self.hold = true;
        self
    }

    pub fn trace(&self) -> CameraTrace {
        self.trace.clone()
    }

    fn record(&self, call: &str) {
        self.trace.calls.lock().unwrap().push(call.to_string());
        self.trace
            .threads
            .lock()
            .unwrap()
            .push(thread::current().name().map(str::to_string));
    }
}

impl CameraDevice for ScriptedCamera {
    fn open(&mut self, camera_id: CameraId) -> Result<(), CameraError> {
        self.record(&format!("open:{}", camera_id));
        match self.fail_open.clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn configure(&mut self, _config: &CameraConfig) -> Result<Size, CameraError> {
        self.record("configure");
        match self.fail_configure.clone() {
            Some(e) => Err(e),
            None => Ok(self.size),
        }
    }

    fn start_preview(&mut self, _surface: Option<&PreviewSurface>) -> Result<(), CameraError> {
        self.record("start_preview");
        Ok(())
    }

    fn stop_preview(&mut self) -> Result<(), CameraError> {
        self.record("stop_preview");
        Ok(())
    }

    fn close(&mut self) -> Result<(), CameraError> {
        self.record("close");
        match self.fail_close.clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn set_torch(&mut self, on: bool) -> Result<(), CameraError> {
        self.record(if on { "torch:on" } else { "torch:off" });
        Ok(())
    }

    fn capture_one_frame(&mut self, on_frame: FrameCallback) {
        if self.hold {
            self.trace.held.lock().unwrap().push(on_frame);
            return;
        }
        let n = self.captured;
        self.captured += 1;
        on_frame((self.script)(n));
    }
}

/// Pump `scanner` until `done` holds or `timeout` passes. Returns whether it held.
pub fn pump_until<F>(scanner: &mut Scanner, timeout: Duration, mut done: F) -> bool
where
    F: FnMut(&Scanner) -> bool,
{
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if done(scanner) {
            return true;
        }
        scanner.pump_timeout(Duration::from_millis(10));
    }
    done(scanner)
}

/// Wait for `done` without pumping anything.
pub fn wait_until<F: FnMut() -> bool>(timeout: Duration, mut done: F) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    done()
}
