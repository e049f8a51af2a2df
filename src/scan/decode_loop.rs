//! Single-flight request → decode → request loop.
//!
//! One frame is requested at a time. When it arrives it is handed to the
//! decode thread, transformed, decoded, and the outcome is posted to the
//! interactive context. Only then is the next frame requested, so at most one
//! frame is ever in flight regardless of the capture rate.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use crate::camera::{CameraError, FrameCallback, FrameRequester};
use crate::context::{Event, MainHandle, ThreadGuard};
use crate::decode::{DecodeOutcome, Decoder, ScanResult};
use crate::frame::{RawFrame, Rect};
use crate::worker::{TaskQueue, WorkerError};

const THREAD_NAME: &str = "decoder";

/// Anything that can deliver one frame on request.
pub trait FrameSource: Send + Sync + 'static {
    fn request_frame(&self, callback: FrameCallback);
}

impl FrameSource for FrameRequester {
    fn request_frame(&self, callback: FrameCallback) {
        FrameRequester::request_frame(self, callback);
    }
}

/// Region of each frame handed to the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Crop in display orientation. `None` decodes the whole frame.
    pub crop: Option<Rect>,
    /// Power-of-two downscale factor applied after cropping.
    pub scale: u32,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            crop: None,
            scale: 1,
        }
    }
}

/// Messages handled on the decode thread.
enum FrameEvent {
    Captured(RawFrame),
    Failed(CameraError),
}

#[derive(Debug, Default)]
struct Counters {
    attempts: AtomicU64,
    transient_failures: AtomicU64,
}

/// State of one started loop. Replaced wholesale on every start.
struct Active {
    generation: u64,
    running: Mutex<bool>,
    queue: Mutex<Option<TaskQueue>>,
    source: Arc<dyn FrameSource>,
    decoder: Mutex<Box<dyn Decoder>>,
    options: DecodeOptions,
    main: MainHandle,
    counters: Arc<Counters>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl Active {
    fn is_running(&self) -> bool {
        *lock(&self.running)
    }

    fn request_next(self: &Arc<Self>) {
        if !self.is_running() {
            return;
        }
        let active = Arc::clone(self);
        self.source.request_frame(Box::new(move |result| {
            let event = match result {
                Ok(frame) => FrameEvent::Captured(frame),
                Err(e) => FrameEvent::Failed(e),
            };
            active.post(event);
        }));
    }

    /// Hand a frame event to the decode thread. Runs on the camera worker.
    fn post(self: &Arc<Self>, event: FrameEvent) {
        if !self.is_running() {
            return;
        }
        let queue = lock(&self.queue);
        let Some(queue) = queue.as_ref() else {
            return;
        };
        let active = Arc::clone(self);
        if queue.post(Box::new(move || active.handle(event))).is_err() {
            log::debug!("Decode thread gone, dropping frame");
        }
    }

    fn handle(self: &Arc<Self>, event: FrameEvent) {
        match event {
            FrameEvent::Captured(frame) => self.decode(&frame),
            FrameEvent::Failed(e) => {
                let failures = self.counters.transient_failures.fetch_add(1, Ordering::SeqCst) + 1;
                log::debug!("Frame capture failed ({} so far): {}", failures, e);
            }
        }
        self.request_next();
    }

    fn decode(&self, frame: &RawFrame) {
        if !self.is_running() {
            return;
        }
        if let Some(crop) = self.options.crop {
            let bounds = frame.display_size();
            if !crop.fits_within(bounds) {
                self.abort(format!(
                    "crop rectangle {} exceeds frame bounds {}",
                    crop, bounds
                ));
                return;
            }
        }
        let start = Instant::now();
        let buffer = frame.decode_buffer(self.options.crop, self.options.scale);
        let (outcome, possible) = {
            let mut decoder = lock(&self.decoder);
            let outcome = decoder.decode(&buffer);
            (outcome, decoder.take_possible_points())
        };
        self.counters.attempts.fetch_add(1, Ordering::SeqCst);

        // Posting under the lock means stop() either sees this result in the
        // queue with our generation or prevents it from being posted.
        let running = lock(&self.running);
        if !*running {
            log::debug!("Decode loop stopped, discarding result");
            return;
        }
        let generation = self.generation;
        match outcome {
            DecodeOutcome::Found(symbol) => {
                log::debug!("Found barcode in {} ms", start.elapsed().as_millis());
                let result =
                    ScanResult::from_symbol(symbol, frame, self.options.crop, self.options.scale);
                self.main.post(Event::DecodeSucceeded { generation, result });
            }
            DecodeOutcome::NotFound => {
                self.main.post(Event::DecodeFailed { generation });
            }
        }
        if !possible.is_empty() {
            let points = possible
                .into_iter()
                .map(|p| frame.translate_point(p, self.options.crop, self.options.scale))
                .collect();
            self.main.post(Event::PossiblePoints { generation, points });
        }
    }

    /// Stop from the decode thread and tell the interactive context why.
    fn abort(&self, reason: String) {
        {
            let mut running = lock(&self.running);
            if !*running {
                return;
            }
            *running = false;
            log::error!("Decode loop {} aborted: {}", self.generation, reason);
            self.main.post(Event::DecodeAborted {
                generation: self.generation,
                reason,
            });
        }
        self.stop();
    }

    fn stop(&self) {
        *lock(&self.running) = false;
        if let Some(queue) = lock(&self.queue).take() {
            queue.cancel_pending();
            queue.quit();
        }
    }
}

/// Drives decoding for one consumer. Control methods must be called from
/// the interactive thread.
pub struct DecodeLoop {
    main: MainHandle,
    active: Option<Arc<Active>>,
    next_generation: u64,
    counters: Arc<Counters>,
    guard: ThreadGuard,
}

impl std::fmt::Debug for DecodeLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodeLoop")
            .field("running", &self.is_running())
            .field("generation", &self.generation())
            .field("attempts", &self.attempts())
            .finish_non_exhaustive()
    }
}

impl DecodeLoop {
    pub fn new(main: MainHandle) -> Self {
        Self {
            main,
            active: None,
            next_generation: 0,
            counters: Arc::new(Counters::default()),
            guard: ThreadGuard::current(),
        }
    }

    /// Start decoding frames from `source`, stopping any previous run first.
    ///
    /// Returns the generation tag carried by every event this run posts.
    ///
    /// # Panics
    ///
    /// Panics if `options.scale` is not a power of two.
    pub fn start(
        &mut self,
        source: Arc<dyn FrameSource>,
        decoder: Box<dyn Decoder>,
        options: DecodeOptions,
    ) -> Result<u64, WorkerError> {
        self.guard.check("DecodeLoop::start");
        assert!(
            options.scale.is_power_of_two(),
            "downscale factor must be a power of two, got {}",
            options.scale
        );
        self.stop();

        let queue = TaskQueue::spawn(THREAD_NAME)?;
        self.next_generation += 1;
        let active = Arc::new(Active {
            generation: self.next_generation,
            running: Mutex::new(true),
            queue: Mutex::new(Some(queue)),
            source,
            decoder: Mutex::new(decoder),
            options,
            main: self.main.clone(),
            counters: Arc::clone(&self.counters),
        });
        log::debug!("Decode loop {} started", active.generation);
        active.request_next();
        let generation = active.generation;
        self.active = Some(active);
        Ok(generation)
    }

    /// Stop decoding. Queued work is dropped; a decode already running
    /// finishes but its result is discarded.
    pub fn stop(&mut self) {
        self.guard.check("DecodeLoop::stop");
        if let Some(active) = self.active.take() {
            active.stop();
            log::debug!("Decode loop {} stopped", active.generation);
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.as_ref().is_some_and(|a| a.is_running())
    }

    /// Generation of the current run, if running.
    pub fn generation(&self) -> Option<u64> {
        self.active.as_ref().map(|a| a.generation)
    }

    /// Decode attempts completed across all runs.
    pub fn attempts(&self) -> u64 {
        self.counters.attempts.load(Ordering::SeqCst)
    }

    /// Frame captures that failed and were retried, across all runs.
    pub fn transient_failures(&self) -> u64 {
        self.counters.transient_failures.load(Ordering::SeqCst)
    }
}

impl Drop for DecodeLoop {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.stop();
        }
    }
}
