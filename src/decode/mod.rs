//! The decode capability consumed by the decode loop.
//!
//! A [`Decoder`] turns one luminance buffer into one [`DecodeOutcome`]. A
//! [`DecoderFactory`] builds a fresh decoder each time a decode loop starts.

mod qr;
mod strategy;
mod types;

pub use qr::QrDecoder;
pub use strategy::{ScanStrategy, StrategyDecoder};
pub use types::{BarcodeFormat, DecodeOutcome, ScanResult, Symbol};

use crate::frame::{FrameBuffer, Point};

/// Decodes symbols from luminance buffers.
///
/// Called repeatedly from the decode thread. Implementations must not keep
/// the buffer past the call.
pub trait Decoder: Send {
    fn decode(&mut self, buffer: &FrameBuffer) -> DecodeOutcome;

    /// Candidate points seen since the last call, in decode-buffer coordinates.
    fn take_possible_points(&mut self) -> Vec<Point> {
        Vec::new()
    }
}

impl Decoder for Box<dyn Decoder> {
    fn decode(&mut self, buffer: &FrameBuffer) -> DecodeOutcome {
        (**self).decode(buffer)
    }

    fn take_possible_points(&mut self) -> Vec<Point> {
        (**self).take_possible_points()
    }
}

/// Builds decoders for decode loops.
pub trait DecoderFactory: Send + Sync {
    fn create(&self) -> Box<dyn Decoder>;
}

impl<F> DecoderFactory for F
where
    F: Fn() -> Box<dyn Decoder> + Send + Sync,
{
    fn create(&self) -> Box<dyn Decoder> {
        self()
    }
}

/// Factory for [`QrDecoder`]s wrapped in a [`ScanStrategy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct QrDecoderFactory {
    pub strategy: ScanStrategy,
}

impl QrDecoderFactory {
    pub fn new(strategy: ScanStrategy) -> Self {
        Self { strategy }
    }
}

impl DecoderFactory for QrDecoderFactory {
    fn create(&self) -> Box<dyn Decoder> {
        Box::new(StrategyDecoder::new(QrDecoder::new(), self.strategy))
    }
}
