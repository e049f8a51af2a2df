//! QR code decoder backed by `rqrr`.

use std::time::Instant;

use crate::frame::{FrameBuffer, Point};

use super::types::{BarcodeFormat, DecodeOutcome, Symbol};
use super::Decoder;

/// Finds and decodes QR codes in a luminance buffer.
///
/// Grids that are located but fail to decode are kept as possible points.
#[derive(Debug, Default)]
pub struct QrDecoder {
    possible: Vec<Point>,
}

impl QrDecoder {
    pub fn new() -> Self {
        Self::default()
    }
}

fn corners(bounds: &[rqrr::Point; 4]) -> Vec<Point> {
    bounds
        .iter()
        .map(|p| Point::new(p.x as f32, p.y as f32))
        .collect()
}

impl Decoder for QrDecoder {
    fn decode(&mut self, buffer: &FrameBuffer) -> DecodeOutcome {
        let start = Instant::now();
        let width = buffer.width() as usize;
        let height = buffer.height() as usize;
        let data = buffer.as_bytes();

        let mut prepared =
            rqrr::PreparedImage::prepare_from_greyscale(width, height, |x, y| data[y * width + x]);
        let grids = prepared.detect_grids();

        for grid in &grids {
            let mut raw = Vec::new();
            match grid.decode_to(&mut raw) {
                Ok(meta) => {
                    let mut symbol = Symbol {
                        text: String::from_utf8_lossy(&raw).into_owned(),
                        raw_bytes: raw,
                        format: BarcodeFormat::QrCode,
                        points: corners(&grid.bounds),
                        metadata: Default::default(),
                    };
                    symbol
                        .metadata
                        .insert("version".to_string(), meta.version.0.to_string());
                    symbol
                        .metadata
                        .insert("ecc_level".to_string(), meta.ecc_level.to_string());
                    symbol
                        .metadata
                        .insert("mask".to_string(), meta.mask.to_string());
                    log::debug!("Found QR code in {} ms", start.elapsed().as_millis());
                    return DecodeOutcome::Found(symbol);
                }
                Err(e) => {
                    log::trace!("QR grid located but not decoded: {}", e);
                    self.possible.extend(corners(&grid.bounds));
                }
            }
        }
        DecodeOutcome::NotFound
    }

    fn take_possible_points(&mut self) -> Vec<Point> {
        std::mem::take(&mut self.possible)
    }
}
