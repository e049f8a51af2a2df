//! Value parsers for command-line options.

use std::time::Duration;

use crate::camera::CameraId;
use crate::frame::Rotation;

/// Parse rotation degrees (0, 90, 180 or 270)
pub fn parse_rotation(s: &str) -> Result<Rotation, String> {
    let degrees: i32 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid rotation", s))?;
    if !matches!(degrees, 0 | 90 | 180 | 270) {
        return Err(format!(
            "Rotation must be one of 0, 90, 180, 270, got {}",
            degrees
        ));
    }
    Rotation::from_degrees(degrees).map_err(|e| e.to_string())
}

/// Parse and validate a downscale factor (power of two, 1-64)
pub fn parse_scale(s: &str) -> Result<u32, String> {
    let scale: u32 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid scale", s))?;
    if !scale.is_power_of_two() || scale > 64 {
        return Err(format!(
            "Scale must be a power of two between 1 and 64, got {}",
            scale
        ));
    }
    Ok(scale)
}

/// Parse a camera index; negative means no preference
pub fn parse_camera_id(s: &str) -> Result<CameraId, String> {
    let raw: i32 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid camera id", s))?;
    Ok(CameraId::from(raw))
}

/// Parse a frame interval in milliseconds (0-10000)
pub fn parse_interval(s: &str) -> Result<Duration, String> {
    let ms: u64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid interval", s))?;
    if ms > 10_000 {
        return Err(format!("Interval must be at most 10000 ms, got {}", ms));
    }
    Ok(Duration::from_millis(ms))
}
