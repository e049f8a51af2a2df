//! Raw camera frames and the luminance transforms applied before decoding.
//!
//! - [`RawFrame`]: an immutable frame as delivered by the camera
//! - [`FrameBuffer`]: a luminance plane with rotate / crop / scale transforms
//! - [`geometry`]: points, sizes, rectangles and the framing rectangle

pub mod geometry;
mod load;
pub mod transform;
mod types;

pub use geometry::{framing_rect, Point, Rect, Size};
pub use load::load_luma_frame;
pub use types::{CropSpec, FrameBuffer, FrameError, PixelFormat, RawFrame, Rotation};
