//! Decode outcomes and scan results.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::frame::{Point, Rect, RawFrame};

/// Symbology of a decoded symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BarcodeFormat {
    QrCode,
    /// Reported by decoders that do not name their symbology.
    Unknown,
}

impl fmt::Display for BarcodeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BarcodeFormat::QrCode => write!(f, "QR_CODE"),
            BarcodeFormat::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// A symbol found by a decoder, in decode-buffer coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub text: String,
    pub raw_bytes: Vec<u8>,
    pub format: BarcodeFormat,
    pub points: Vec<Point>,
    /// Format-specific details such as QR version or error correction level.
    pub metadata: BTreeMap<String, String>,
}

impl Symbol {
    /// A symbol whose raw bytes are its UTF-8 text.
    pub fn from_text(text: impl Into<String>, format: BarcodeFormat) -> Self {
        let text = text.into();
        Self {
            raw_bytes: text.as_bytes().to_vec(),
            text,
            format,
            points: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_points(mut self, points: Vec<Point>) -> Self {
        self.points = points;
        self
    }
}

/// Result of exactly one decode attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeOutcome {
    Found(Symbol),
    /// The attempt ran and found nothing. Not an error.
    NotFound,
}

impl DecodeOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, DecodeOutcome::Found(_))
    }
}

/// A decoded symbol as delivered to the result sink, with its points mapped
/// back into frame coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanResult {
    pub text: String,
    #[serde(skip)]
    pub raw_bytes: Vec<u8>,
    pub format: BarcodeFormat,
    pub points: Vec<Point>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    /// Sensor rotation of the frame the symbol was found in.
    pub rotation: u32,
}

impl ScanResult {
    /// Map `symbol` from the decode buffer of `frame` (built with `crop` and
    /// `scale`) back to frame coordinates.
    pub fn from_symbol(symbol: Symbol, frame: &RawFrame, crop: Option<Rect>, scale: u32) -> Self {
        let points = symbol
            .points
            .iter()
            .map(|p| frame.translate_point(*p, crop, scale))
            .collect();
        Self {
            text: symbol.text,
            raw_bytes: symbol.raw_bytes,
            format: symbol.format,
            points,
            metadata: symbol.metadata,
            rotation: frame.rotation().degrees(),
        }
    }
}

impl fmt::Display for ScanResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.format, self.text)
    }
}
