//! Scan strategies: which luminance polarity to hand the decoder.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::frame::{FrameBuffer, Point};

use super::types::DecodeOutcome;
use super::Decoder;

/// Selected once, when the decoder is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ScanStrategy {
    /// Dark symbols on a light background.
    #[default]
    Normal,
    /// Light symbols on a dark background.
    Inverted,
    /// Alternate normal and inverted on successive frames.
    Mixed,
}

impl fmt::Display for ScanStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScanStrategy::Normal => "normal",
            ScanStrategy::Inverted => "inverted",
            ScanStrategy::Mixed => "mixed",
        };
        write!(f, "{}", name)
    }
}

/// Applies a [`ScanStrategy`] in front of any decoder.
#[derive(Debug)]
pub struct StrategyDecoder<D> {
    inner: D,
    strategy: ScanStrategy,
    invert_next: bool,
}

impl<D: Decoder> StrategyDecoder<D> {
    pub fn new(inner: D, strategy: ScanStrategy) -> Self {
        Self {
            inner,
            strategy,
            invert_next: strategy == ScanStrategy::Inverted,
        }
    }

    pub fn strategy(&self) -> ScanStrategy {
        self.strategy
    }

    pub fn into_inner(self) -> D {
        self.inner
    }
}

impl<D: Decoder> Decoder for StrategyDecoder<D> {
    fn decode(&mut self, buffer: &FrameBuffer) -> DecodeOutcome {
        let invert = self.invert_next;
        if self.strategy == ScanStrategy::Mixed {
            self.invert_next = !self.invert_next;
        }
        if invert {
            self.inner.decode(&buffer.inverted())
        } else {
            self.inner.decode(buffer)
        }
    }

    fn take_possible_points(&mut self) -> Vec<Point> {
        self.inner.take_possible_points()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::types::{BarcodeFormat, Symbol};

    /// Reports the first byte it was given as the symbol text.
    #[derive(Default)]
    struct FirstByte {
        seen: Vec<u8>,
    }

    impl Decoder for FirstByte {
        fn decode(&mut self, buffer: &FrameBuffer) -> DecodeOutcome {
            let first = buffer.as_bytes()[0];
            self.seen.push(first);
            DecodeOutcome::Found(Symbol::from_text(first.to_string(), BarcodeFormat::Unknown))
        }
    }

    fn buffer() -> FrameBuffer {
        FrameBuffer::new(vec![10, 20, 30, 40], 2, 2).unwrap()
    }

    #[test]
    fn test_normal_passes_buffer_through() {
        let mut decoder = StrategyDecoder::new(FirstByte::default(), ScanStrategy::Normal);
        decoder.decode(&buffer());
        decoder.decode(&buffer());
        assert_eq!(decoder.into_inner().seen, vec![10, 10]);
    }

    #[test]
    fn test_inverted_flips_every_frame() {
        let mut decoder = StrategyDecoder::new(FirstByte::default(), ScanStrategy::Inverted);
        decoder.decode(&buffer());
        decoder.decode(&buffer());
        assert_eq!(decoder.into_inner().seen, vec![245, 245]);
    }

    #[test]
    fn test_mixed_alternates() {
        let mut decoder = StrategyDecoder::new(FirstByte::default(), ScanStrategy::Mixed);
        for _ in 0..4 {
            decoder.decode(&buffer());
        }
        assert_eq!(decoder.into_inner().seen, vec![10, 245, 10, 245]);
    }

    #[test]
    fn test_strategy_parses_lowercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            strategy: ScanStrategy,
        }
        let w: Wrapper = toml::from_str("strategy = \"mixed\"").unwrap();
        assert_eq!(w.strategy, ScanStrategy::Mixed);
    }
}
