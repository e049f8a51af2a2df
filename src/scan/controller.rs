//! Decode modes: idle, single shot and continuous.

use std::fmt;
use std::sync::Arc;

use crate::context::{MainHandle, ThreadGuard};
use crate::decode::{DecoderFactory, ScanResult};
use crate::frame::Point;

use super::decode_loop::{DecodeLoop, DecodeOptions, FrameSource};

/// Receives decode results on the interactive thread.
pub trait ResultSink {
    fn on_result(&mut self, result: ScanResult);

    /// Advisory candidate points for display. Never affects control flow.
    fn on_possible_points(&mut self, _points: &[Point]) {}
}

impl<F> ResultSink for F
where
    F: FnMut(ScanResult),
{
    fn on_result(&mut self, result: ScanResult) {
        self(result)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanMode {
    #[default]
    Idle,
    SingleShot,
    Continuous,
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScanMode::Idle => "idle",
            ScanMode::SingleShot => "single",
            ScanMode::Continuous => "continuous",
        };
        write!(f, "{}", name)
    }
}

/// Starts and stops the decode loop according to the requested mode and
/// forwards results to the sink.
pub struct ScanModeController {
    mode: ScanMode,
    sink: Option<Box<dyn ResultSink>>,
    decode_loop: DecodeLoop,
    factory: Arc<dyn DecoderFactory>,
    options: DecodeOptions,
    /// Set while the preview is running.
    source: Option<Arc<dyn FrameSource>>,
    misses: u64,
    guard: ThreadGuard,
}

impl fmt::Debug for ScanModeController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanModeController")
            .field("mode", &self.mode)
            .field("previewing", &self.source.is_some())
            .field("decode_loop", &self.decode_loop)
            .finish_non_exhaustive()
    }
}

impl ScanModeController {
    pub fn new(main: MainHandle, factory: Arc<dyn DecoderFactory>) -> Self {
        Self {
            mode: ScanMode::Idle,
            sink: None,
            decode_loop: DecodeLoop::new(main),
            factory,
            options: DecodeOptions::default(),
            source: None,
            misses: 0,
            guard: ThreadGuard::current(),
        }
    }

    pub fn mode(&self) -> ScanMode {
        self.mode
    }

    pub fn is_decoding(&self) -> bool {
        self.decode_loop.is_running()
    }

    pub fn options(&self) -> DecodeOptions {
        self.options
    }

    /// Frames decoded without a result while the current mode was active.
    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn decode_loop(&self) -> &DecodeLoop {
        &self.decode_loop
    }

    /// Change the decode region. Takes effect on the next loop start.
    pub fn set_options(&mut self, options: DecodeOptions) {
        self.guard.check("ScanModeController::set_options");
        self.options = options;
    }

    /// Decode until the first result, then stop and deliver it once.
    pub fn decode_single<S: ResultSink + 'static>(&mut self, sink: S) {
        self.guard.check("ScanModeController::decode_single");
        self.begin(ScanMode::SingleShot, Box::new(sink));
    }

    /// Decode and deliver every result until stopped. Repeats are not filtered.
    pub fn decode_continuous<S: ResultSink + 'static>(&mut self, sink: S) {
        self.guard.check("ScanModeController::decode_continuous");
        self.begin(ScanMode::Continuous, Box::new(sink));
    }

    pub fn stop_decoding(&mut self) {
        self.guard.check("ScanModeController::stop_decoding");
        self.mode = ScanMode::Idle;
        self.decode_loop.stop();
        self.sink = None;
    }

    /// The preview is running; (re)start decoding if a mode is requested.
    pub fn preview_started(&mut self, source: Arc<dyn FrameSource>) {
        self.guard.check("ScanModeController::preview_started");
        self.source = Some(source);
        if self.mode != ScanMode::Idle {
            self.start_loop();
        }
    }

    /// The preview is going away. Decoding stops but the mode is kept, so it
    /// resumes on the next [`preview_started`](Self::preview_started).
    pub fn preview_stopped(&mut self) {
        self.guard.check("ScanModeController::preview_stopped");
        self.source = None;
        self.decode_loop.stop();
    }

    pub fn on_decode_succeeded(&mut self, generation: u64, result: ScanResult) {
        self.guard.check("ScanModeController::on_decode_succeeded");
        if !self.is_current(generation) {
            log::debug!("Dropping result from stale decode loop {}", generation);
            return;
        }
        match self.mode {
            ScanMode::SingleShot => {
                let sink = self.sink.take();
                self.decode_loop.stop();
                self.mode = ScanMode::Idle;
                if let Some(mut sink) = sink {
                    sink.on_result(result);
                }
            }
            ScanMode::Continuous => {
                if let Some(sink) = self.sink.as_mut() {
                    sink.on_result(result);
                }
            }
            ScanMode::Idle => {}
        }
    }

    pub fn on_decode_failed(&mut self, generation: u64) {
        self.guard.check("ScanModeController::on_decode_failed");
        if self.is_current(generation) {
            self.misses += 1;
        }
    }

    pub fn on_possible_points(&mut self, generation: u64, points: &[Point]) {
        self.guard.check("ScanModeController::on_possible_points");
        if !self.is_current(generation) {
            return;
        }
        if let Some(sink) = self.sink.as_mut() {
            sink.on_possible_points(points);
        }
    }

    /// The loop hit a frame that contradicts the decode options, such as a
    /// crop larger than the frame.
    ///
    /// # Panics
    ///
    /// Panics with `reason` unless the loop was already replaced.
    pub fn on_decode_aborted(&mut self, generation: u64, reason: &str) {
        self.guard.check("ScanModeController::on_decode_aborted");
        if !self.is_current(generation) {
            log::debug!("Ignoring abort of stale decode loop {}", generation);
            return;
        }
        self.mode = ScanMode::Idle;
        self.decode_loop.stop();
        self.sink = None;
        panic!("decode loop {} aborted: {}", generation, reason);
    }

    fn is_current(&self, generation: u64) -> bool {
        self.decode_loop.generation() == Some(generation)
    }

    fn begin(&mut self, mode: ScanMode, sink: Box<dyn ResultSink>) {
        self.mode = mode;
        self.sink = Some(sink);
        self.misses = 0;
        if self.source.is_some() {
            self.start_loop();
        }
    }

    fn start_loop(&mut self) {
        let Some(source) = self.source.clone() else {
            return;
        };
        let decoder = self.factory.create();
        if let Err(e) = self.decode_loop.start(source, decoder, self.options) {
            log::error!("Failed to start decode loop: {}", e);
        }
    }
}
