//! Loading still images from disk as Y8 frames.

use std::path::Path;

use super::types::{FrameError, PixelFormat, RawFrame, Rotation};

/// Read an image file and convert it to a luminance frame.
///
/// `rotation` is recorded on the frame as if the sensor delivered it that way;
/// it is not applied to the pixels.
pub fn load_luma_frame(path: &Path, rotation: Rotation) -> Result<RawFrame, FrameError> {
    let image = image::open(path).map_err(|source| FrameError::Load {
        path: path.to_path_buf(),
        source,
    })?;
    let luma = image.to_luma8();
    let (width, height) = luma.dimensions();
    log::debug!("Loaded {} ({}x{})", path.display(), width, height);
    RawFrame::new(luma.into_raw(), width, height, PixelFormat::Y8, rotation)
}
