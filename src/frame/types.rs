//! Frame types: pixel formats, rotations, luminance buffers and raw camera frames.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

use super::geometry::{Point, Rect, Size};
use super::transform;

/// Errors raised while building frames.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The byte buffer is shorter than the declared resolution requires.
    #[error("image data does not match the resolution: {width}x{height} {format} needs {required} bytes, got {actual}")]
    BufferTooSmall {
        width: u32,
        height: u32,
        format: PixelFormat,
        required: usize,
        actual: usize,
    },
    /// Rotation other than 0, 90, 180 or 270 degrees.
    #[error("unsupported rotation: {0} degrees")]
    UnsupportedRotation(i32),
    /// An image file could not be read or decoded.
    #[error("failed to load image '{}': {source}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    /// A frame in a sequence differs in size from the first one.
    #[error("frame {index} is {actual}, expected {expected} like the first frame")]
    SizeMismatch {
        index: usize,
        expected: Size,
        actual: Size,
    },
    /// A frame in a sequence differs in sensor rotation from the first one.
    #[error("frame {index} is rotated {actual} degrees, expected {expected} like the first frame")]
    RotationMismatch {
        index: usize,
        expected: u32,
        actual: u32,
    },
}

/// Pixel layout of a raw camera frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// Luminance only, one byte per pixel.
    Y8,
    /// Semi-planar YUV 4:2:0; the full luminance plane comes first.
    Nv21,
    /// Interleaved YUV 4:2:2, two bytes per pixel.
    Yuyv,
}

impl PixelFormat {
    /// Minimum number of bytes needed to read the luminance of a frame.
    pub fn required_len(self, width: u32, height: u32) -> usize {
        let pixels = width as usize * height as usize;
        match self {
            PixelFormat::Y8 | PixelFormat::Nv21 => pixels,
            PixelFormat::Yuyv => pixels * 2,
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PixelFormat::Y8 => write!(f, "Y8"),
            PixelFormat::Nv21 => write!(f, "NV21"),
            PixelFormat::Yuyv => write!(f, "YUYV"),
        }
    }
}

/// Camera rotation relative to the display, in quarter turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub const ALL: [Rotation; 4] = [
        Rotation::Deg0,
        Rotation::Deg90,
        Rotation::Deg180,
        Rotation::Deg270,
    ];

    /// Parse a rotation in degrees. Multiples of 360 are folded, so -90 is 270.
    pub fn from_degrees(degrees: i32) -> Result<Self, FrameError> {
        match degrees.rem_euclid(360) {
            0 => Ok(Rotation::Deg0),
            90 => Ok(Rotation::Deg90),
            180 => Ok(Rotation::Deg180),
            270 => Ok(Rotation::Deg270),
            _ => Err(FrameError::UnsupportedRotation(degrees)),
        }
    }

    pub fn degrees(self) -> u32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// The rotation that undoes this one: `(360 - d) mod 360`.
    pub fn inverse(self) -> Self {
        match self {
            Rotation::Deg0 => Rotation::Deg0,
            Rotation::Deg90 => Rotation::Deg270,
            Rotation::Deg180 => Rotation::Deg180,
            Rotation::Deg270 => Rotation::Deg90,
        }
    }

    /// True for quarter turns, which swap width and height.
    pub fn is_orthogonal(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

/// Crop rectangle plus integer downscale factor applied before decoding.
///
/// The rectangle is expressed in display orientation, i.e. against the frame
/// after its rotation has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropSpec {
    pub rect: Rect,
    /// Downscale factor, a power of two.
    pub scale: u32,
}

impl CropSpec {
    pub fn new(rect: Rect, scale: u32) -> Self {
        Self { rect, scale }
    }

    /// Output size: `floor(width / scale) x floor(height / scale)`.
    pub fn output_size(&self) -> Size {
        Size::new(self.rect.width / self.scale, self.rect.height / self.scale)
    }
}

/// An immutable luminance plane, one byte per pixel, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl FrameBuffer {
    /// Wrap a plane. The buffer must hold at least `width * height` bytes;
    /// anything beyond that is discarded.
    pub fn new(mut data: Vec<u8>, width: u32, height: u32) -> Result<Self, FrameError> {
        let required = PixelFormat::Y8.required_len(width, height);
        if data.len() < required {
            return Err(FrameError::BufferTooSmall {
                width,
                height,
                format: PixelFormat::Y8,
                required,
                actual: data.len(),
            });
        }
        data.truncate(required);
        Ok(Self {
            data,
            width,
            height,
        })
    }

    fn from_parts(data: Vec<u8>, width: u32, height: u32) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize);
        Self {
            data,
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Sample at column `x`, row `y`.
    pub fn pixel(&self, x: u32, y: u32) -> u8 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Rotate clockwise by `rotation`, returning a new buffer.
    pub fn rotate(&self, rotation: Rotation) -> FrameBuffer {
        let (w, h) = (self.width as usize, self.height as usize);
        match rotation {
            Rotation::Deg0 => self.clone(),
            Rotation::Deg90 => {
                Self::from_parts(transform::rotate_cw(&self.data, w, h), self.height, self.width)
            }
            Rotation::Deg180 => {
                Self::from_parts(transform::rotate_180(&self.data, w, h), self.width, self.height)
            }
            Rotation::Deg270 => {
                Self::from_parts(transform::rotate_ccw(&self.data, w, h), self.height, self.width)
            }
        }
    }

    /// Crop to `spec.rect` and keep every `spec.scale`-th pixel.
    ///
    /// # Panics
    ///
    /// Panics if the scale is not a power of two or the rectangle does not lie
    /// within this buffer. Both indicate a caller bug.
    pub fn crop_and_scale(&self, spec: &CropSpec) -> FrameBuffer {
        assert!(
            spec.scale.is_power_of_two(),
            "downscale factor must be a power of two, got {}",
            spec.scale
        );
        assert!(
            spec.rect.fits_within(self.size()),
            "crop rectangle {} exceeds frame bounds {}",
            spec.rect,
            self.size()
        );
        let out = spec.output_size();
        Self::from_parts(
            transform::crop_and_scale(
                &self.data,
                self.width as usize,
                spec.rect,
                spec.scale as usize,
            ),
            out.width,
            out.height,
        )
    }

    /// Dark and light swapped.
    pub fn inverted(&self) -> FrameBuffer {
        Self::from_parts(transform::invert(&self.data), self.width, self.height)
    }
}

/// A raw frame delivered by the camera.
///
/// The pixel data is shared, so cloning a frame is cheap. Transforms never
/// mutate it; they produce new [`FrameBuffer`]s.
#[derive(Debug, Clone)]
pub struct RawFrame {
    data: Arc<[u8]>,
    width: u32,
    height: u32,
    format: PixelFormat,
    rotation: Rotation,
    mirrored: bool,
    timestamp: Instant,
}

impl RawFrame {
    /// Build a frame, checking the buffer covers the declared resolution.
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        format: PixelFormat,
        rotation: Rotation,
    ) -> Result<Self, FrameError> {
        let required = format.required_len(width, height);
        if data.len() < required {
            return Err(FrameError::BufferTooSmall {
                width,
                height,
                format,
                required,
                actual: data.len(),
            });
        }
        Ok(Self {
            data: data.into(),
            width,
            height,
            format,
            rotation,
            mirrored: false,
            timestamp: Instant::now(),
        })
    }

    /// Mark the frame as horizontally mirrored (front-facing preview).
    pub fn with_mirror(mut self, mirrored: bool) -> Self {
        self.mirrored = mirrored;
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn is_mirrored(&self) -> bool {
        self.mirrored
    }

    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// True when the sensor is oriented a quarter turn from the display.
    pub fn is_rotated(&self) -> bool {
        self.rotation.is_orthogonal()
    }

    /// Frame size in display orientation.
    pub fn display_size(&self) -> Size {
        let size = Size::new(self.width, self.height);
        if self.is_rotated() {
            size.transposed()
        } else {
            size
        }
    }

    /// The luminance plane in sensor orientation. Chroma is dropped.
    pub fn luminance(&self) -> FrameBuffer {
        let (w, h) = (self.width as usize, self.height as usize);
        let plane = match self.format {
            PixelFormat::Y8 | PixelFormat::Nv21 => self.data[..w * h].to_vec(),
            PixelFormat::Yuyv => transform::extract_luma_yuyv(&self.data, w, h),
        };
        FrameBuffer::from_parts(plane, self.width, self.height)
    }

    /// Produce the decode-ready buffer: rotate into display orientation, then
    /// crop and downscale. Without a crop rectangle the whole frame is used.
    ///
    /// # Panics
    ///
    /// Panics if the crop does not fit the rotated frame (see
    /// [`FrameBuffer::crop_and_scale`]).
    pub fn decode_buffer(&self, crop: Option<Rect>, scale: u32) -> FrameBuffer {
        let rotated = self.luminance().rotate(self.rotation);
        let rect = crop.unwrap_or_else(|| Rect::full(rotated.size()));
        rotated.crop_and_scale(&CropSpec::new(rect, scale))
    }

    /// Map a point found in a decode buffer back to display-oriented frame
    /// coordinates.
    pub fn translate_point(&self, point: Point, crop: Option<Rect>, scale: u32) -> Point {
        let (left, top) = crop.map(|r| (r.left, r.top)).unwrap_or((0, 0));
        let mut x = point.x * scale as f32 + left as f32;
        let y = point.y * scale as f32 + top as f32;
        if self.mirrored {
            x = self.display_size().width as f32 - x;
        }
        Point::new(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plane(width: u32, height: u32) -> FrameBuffer {
        let data = (0..width * height).map(|i| (i % 251) as u8).collect();
        FrameBuffer::new(data, width, height).unwrap()
    }

    #[test]
    fn test_rotation_from_degrees() {
        assert_eq!(Rotation::from_degrees(0).unwrap(), Rotation::Deg0);
        assert_eq!(Rotation::from_degrees(90).unwrap(), Rotation::Deg90);
        assert_eq!(Rotation::from_degrees(-90).unwrap(), Rotation::Deg270);
        assert_eq!(Rotation::from_degrees(540).unwrap(), Rotation::Deg180);
        assert!(matches!(
            Rotation::from_degrees(45),
            Err(FrameError::UnsupportedRotation(45))
        ));
    }

    #[test]
    fn test_rotation_inverse() {
        for rotation in Rotation::ALL {
            let sum = rotation.degrees() + rotation.inverse().degrees();
            assert_eq!(sum % 360, 0);
        }
    }

    #[test]
    fn test_frame_buffer_rejects_short_data() {
        let err = FrameBuffer::new(vec![0; 5], 3, 2).unwrap_err();
        assert!(matches!(
            err,
            FrameError::BufferTooSmall {
                required: 6,
                actual: 5,
                ..
            }
        ));
    }

    #[test]
    fn test_frame_buffer_truncates_extra_data() {
        let buffer = FrameBuffer::new(vec![1; 9], 2, 2).unwrap();
        assert_eq!(buffer.as_bytes().len(), 4);
    }

    #[test]
    fn test_rotate_swaps_dimensions() {
        let buffer = plane(4, 3);
        assert_eq!(buffer.rotate(Rotation::Deg90).size(), Size::new(3, 4));
        assert_eq!(buffer.rotate(Rotation::Deg180).size(), Size::new(4, 3));
        assert_eq!(buffer.rotate(Rotation::Deg270).size(), Size::new(3, 4));
    }

    #[test]
    fn test_rotate_90_pixel_mapping() {
        let buffer = plane(4, 3);
        let rotated = buffer.rotate(Rotation::Deg90);
        // Clockwise: output (x, y) comes from input (y, height - 1 - x).
        for y in 0..rotated.height() {
            for x in 0..rotated.width() {
                assert_eq!(rotated.pixel(x, y), buffer.pixel(y, buffer.height() - 1 - x));
            }
        }
    }

    #[test]
    fn test_crop_and_scale_output_size() {
        let buffer = plane(10, 10);
        let out = buffer.crop_and_scale(&CropSpec::new(Rect::new(1, 1, 7, 9), 2));
        assert_eq!(out.size(), Size::new(3, 4));
        assert_eq!(out.pixel(0, 0), buffer.pixel(1, 1));
        assert_eq!(out.pixel(1, 1), buffer.pixel(3, 3));
    }

    #[test]
    #[should_panic(expected = "exceeds frame bounds")]
    fn test_crop_out_of_bounds_panics() {
        plane(10, 10).crop_and_scale(&CropSpec::new(Rect::new(5, 5, 6, 5), 1));
    }

    #[test]
    #[should_panic(expected = "power of two")]
    fn test_crop_non_power_of_two_scale_panics() {
        plane(10, 10).crop_and_scale(&CropSpec::new(Rect::new(0, 0, 9, 9), 3));
    }

    #[test]
    fn test_raw_frame_rejects_short_yuyv() {
        let err = RawFrame::new(vec![0; 7], 2, 2, PixelFormat::Yuyv, Rotation::Deg0).unwrap_err();
        assert!(matches!(
            err,
            FrameError::BufferTooSmall {
                required: 8,
                actual: 7,
                ..
            }
        ));
    }

    #[test]
    fn test_raw_frame_nv21_luminance_drops_chroma() {
        let mut data = vec![7u8; 4];
        data.extend_from_slice(&[128, 128]);
        let frame = RawFrame::new(data, 2, 2, PixelFormat::Nv21, Rotation::Deg0).unwrap();
        assert_eq!(frame.luminance().as_bytes(), &[7, 7, 7, 7]);
    }

    #[test]
    fn test_decode_buffer_rotates_before_cropping() {
        // 2x1 sensor frame [a b] rotated 90 becomes a 1x2 column [a; b].
        let frame = RawFrame::new(vec![10, 20], 2, 1, PixelFormat::Y8, Rotation::Deg90).unwrap();
        assert_eq!(frame.display_size(), Size::new(1, 2));
        let buffer = frame.decode_buffer(Some(Rect::new(0, 1, 1, 1)), 1);
        assert_eq!(buffer.as_bytes(), &[20]);
    }

    #[test]
    fn test_translate_point_applies_scale_and_crop() {
        let frame = RawFrame::new(vec![0; 100], 10, 10, PixelFormat::Y8, Rotation::Deg0).unwrap();
        let p = frame.translate_point(Point::new(2.0, 3.0), Some(Rect::new(1, 2, 8, 8)), 2);
        assert_eq!(p, Point::new(5.0, 8.0));
    }

    #[test]
    fn test_translate_point_mirrored() {
        let frame = RawFrame::new(vec![0; 100], 10, 10, PixelFormat::Y8, Rotation::Deg0)
            .unwrap()
            .with_mirror(true);
        let p = frame.translate_point(Point::new(2.0, 3.0), None, 1);
        assert_eq!(p, Point::new(8.0, 3.0));
    }
}
