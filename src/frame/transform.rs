//! Byte-exact luminance plane transforms.
//!
//! All functions take a row-major, one-byte-per-pixel plane and return a new
//! plane; the input is never modified. Decoding depends on these producing
//! exactly the same bytes every time, so they avoid any interpolation.

use super::geometry::Rect;

/// Rotate a plane 90 degrees clockwise. The output is `height` wide and `width` tall.
///
/// Reads the input column by column, bottom to top, and writes the output row
/// by row.
pub fn rotate_cw(data: &[u8], width: usize, height: usize) -> Vec<u8> {
    let mut out = vec![0u8; width * height];
    let mut i = 0;
    for x in 0..width {
        for y in (0..height).rev() {
            out[i] = data[y * width + x];
            i += 1;
        }
    }
    out
}

/// Rotate a plane 90 degrees counter-clockwise. The output is `height` wide and `width` tall.
pub fn rotate_ccw(data: &[u8], width: usize, height: usize) -> Vec<u8> {
    let n = width * height;
    let mut out = vec![0u8; n];
    let mut i = n;
    for x in 0..width {
        for y in (0..height).rev() {
            i -= 1;
            out[i] = data[y * width + x];
        }
    }
    out
}

/// Rotate a plane 180 degrees, which is a reversal of the byte sequence.
pub fn rotate_180(data: &[u8], width: usize, height: usize) -> Vec<u8> {
    let n = width * height;
    data[..n].iter().rev().copied().collect()
}

/// Copy `rect` out of a plane `stride` bytes wide, keeping every `scale`-th
/// pixel in both directions.
///
/// The output is `rect.width / scale` by `rect.height / scale` (rounded down).
/// Callers validate that `rect` lies within the plane and that `scale >= 1`.
pub fn crop_and_scale(data: &[u8], stride: usize, rect: Rect, scale: usize) -> Vec<u8> {
    let out_width = rect.width as usize / scale;
    let out_height = rect.height as usize / scale;
    let mut out = Vec::with_capacity(out_width * out_height);

    let mut input_offset = rect.top as usize * stride + rect.left as usize;
    if scale == 1 {
        // Copy one cropped row at a time.
        for _ in 0..out_height {
            out.extend_from_slice(&data[input_offset..input_offset + out_width]);
            input_offset += stride;
        }
    } else {
        for _ in 0..out_height {
            out.extend(
                data[input_offset..]
                    .iter()
                    .step_by(scale)
                    .take(out_width)
                    .copied(),
            );
            input_offset += stride * scale;
        }
    }
    out
}

/// Invert every sample (dark becomes light).
pub fn invert(data: &[u8]) -> Vec<u8> {
    data.iter().map(|b| 255 - b).collect()
}

/// Pull the luminance samples out of an interleaved YUYV (YUY2) buffer.
pub fn extract_luma_yuyv(data: &[u8], width: usize, height: usize) -> Vec<u8> {
    data.iter().step_by(2).take(width * height).copied().collect()
}
