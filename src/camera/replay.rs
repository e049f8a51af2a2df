//! A camera device that replays prepared frames.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::frame::{load_luma_frame, FrameError, PixelFormat, RawFrame, Rotation, Size};

use super::device::{CameraDevice, FrameCallback, PreviewSurface};
use super::types::{CameraConfig, CameraError, CameraId};

/// Counters shared between a [`ReplayCamera`] and whoever drives it.
#[derive(Debug, Default)]
pub struct ReplayStats {
    delivered: AtomicUsize,
    exhausted: AtomicBool,
}

impl ReplayStats {
    /// Frames handed to capture callbacks so far.
    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::SeqCst)
    }

    /// True once a non-looping replay has run out of frames.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted.load(Ordering::SeqCst)
    }
}

/// Replays a fixed list of frames as if they came off a sensor.
///
/// There is a single camera, index 0. Once a non-looping replay runs out,
/// every capture fails with [`CameraError::SourceExhausted`].
pub struct ReplayCamera {
    frames: Vec<RawFrame>,
    next: usize,
    looping: bool,
    interval: Option<Duration>,
    rotation: Rotation,
    /// Negative colour effect, as requested by `inverted_scan`.
    negative: bool,
    opened: bool,
    previewing: bool,
    stats: Arc<ReplayStats>,
}

fn check_uniform(frames: &[RawFrame]) -> Result<(), FrameError> {
    let Some(first) = frames.first() else {
        return Ok(());
    };
    let expected = Size::new(first.width(), first.height());
    for (index, frame) in frames.iter().enumerate().skip(1) {
        let actual = Size::new(frame.width(), frame.height());
        if actual != expected {
            return Err(FrameError::SizeMismatch {
                index,
                expected,
                actual,
            });
        }
        if frame.rotation() != first.rotation() {
            return Err(FrameError::RotationMismatch {
                index,
                expected: first.rotation().degrees(),
                actual: frame.rotation().degrees(),
            });
        }
    }
    Ok(())
}

impl std::fmt::Debug for ReplayCamera {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayCamera")
            .field("frames", &self.frames.len())
            .field("next", &self.next)
            .field("looping", &self.looping)
            .field("previewing", &self.previewing)
            .finish_non_exhaustive()
    }
}

impl ReplayCamera {
    /// Replay `frames` in order. Every frame must match the first one in
    /// size and rotation, since the preview size is negotiated once.
    pub fn new(frames: Vec<RawFrame>) -> Result<Self, FrameError> {
        check_uniform(&frames)?;
        let rotation = frames
            .first()
            .map(RawFrame::rotation)
            .unwrap_or(Rotation::Deg0);
        Ok(Self {
            frames,
            next: 0,
            looping: false,
            interval: None,
            rotation,
            negative: false,
            opened: false,
            previewing: false,
            stats: Arc::new(ReplayStats::default()),
        })
    }

    /// Load each image as a luminance frame with the given sensor rotation.
    pub fn from_images<P: AsRef<Path>>(
        paths: &[P],
        rotation: Rotation,
    ) -> Result<Self, FrameError> {
        let frames = paths
            .iter()
            .map(|path| load_luma_frame(path.as_ref(), rotation))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(frames)
    }

    /// Start over from the first frame when the list runs out.
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Sleep this long before delivering each frame, like a real frame rate.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn stats(&self) -> Arc<ReplayStats> {
        Arc::clone(&self.stats)
    }

    fn next_frame(&mut self) -> Option<RawFrame> {
        if self.next >= self.frames.len() {
            if !self.looping || self.frames.is_empty() {
                return None;
            }
            self.next = 0;
        }
        let frame = self.frames[self.next].clone();
        self.next += 1;
        Some(frame)
    }

    fn apply_effects(&self, frame: RawFrame) -> Result<RawFrame, CameraError> {
        if !self.negative {
            return Ok(frame);
        }
        let plane = frame.luminance().inverted();
        RawFrame::new(
            plane.into_bytes(),
            frame.width(),
            frame.height(),
            PixelFormat::Y8,
            frame.rotation(),
        )
        .map(|f| f.with_mirror(frame.is_mirrored()))
        .map_err(|e| CameraError::CaptureFailed(e.to_string()))
    }
}

impl CameraDevice for ReplayCamera {
    fn open(&mut self, camera_id: CameraId) -> Result<(), CameraError> {
        if let CameraId::Index(index) = camera_id {
            if index > 0 {
                return Err(CameraError::OpenFailed(format!(
                    "no camera with index {}",
                    index
                )));
            }
        }
        if self.frames.is_empty() {
            return Err(CameraError::OpenFailed("no frames to replay".to_string()));
        }
        self.opened = true;
        self.next = 0;
        Ok(())
    }

    fn configure(&mut self, config: &CameraConfig) -> Result<Size, CameraError> {
        if !self.opened {
            return Err(CameraError::ConfigureFailed("camera not open".to_string()));
        }
        log::debug!("Replay camera focus mode {:?}", config.focus_mode);
        self.negative = config.inverted_scan;
        let first = &self.frames[0];
        Ok(Size::new(first.width(), first.height()))
    }

    fn start_preview(&mut self, _surface: Option<&PreviewSurface>) -> Result<(), CameraError> {
        if !self.opened {
            return Err(CameraError::PreviewFailed("camera not open".to_string()));
        }
        self.previewing = true;
        Ok(())
    }

    fn stop_preview(&mut self) -> Result<(), CameraError> {
        self.previewing = false;
        Ok(())
    }

    fn close(&mut self) -> Result<(), CameraError> {
        self.previewing = false;
        self.opened = false;
        Ok(())
    }

    fn rotation(&self) -> Rotation {
        self.rotation
    }

    fn capture_one_frame(&mut self, on_frame: FrameCallback) {
        if !self.previewing {
            on_frame(Err(CameraError::CaptureFailed(
                "preview not running".to_string(),
            )));
            return;
        }
        if let Some(interval) = self.interval {
            std::thread::sleep(interval);
        }
        match self.next_frame() {
            Some(frame) => {
                self.stats.delivered.fetch_add(1, Ordering::SeqCst);
                on_frame(self.apply_effects(frame));
            }
            None => {
                self.stats.exhausted.store(true, Ordering::SeqCst);
                on_frame(Err(CameraError::SourceExhausted));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn frame(fill: u8) -> RawFrame {
        RawFrame::new(vec![fill; 16], 4, 4, PixelFormat::Y8, Rotation::Deg0).unwrap()
    }

    fn capture(camera: &mut ReplayCamera) -> Result<RawFrame, CameraError> {
        let (tx, rx) = mpsc::channel();
        camera.capture_one_frame(Box::new(move |result| {
            let _ = tx.send(result);
        }));
        rx.recv().unwrap()
    }

    fn started(camera: &mut ReplayCamera) {
        camera.open(CameraId::NoPreference).unwrap();
        camera.configure(&CameraConfig::default()).unwrap();
        camera.start_preview(None).unwrap();
    }

    #[test]
    fn test_replay_delivers_in_order_then_exhausts() {
        let mut camera = ReplayCamera::new(vec![frame(1), frame(2)]).unwrap();
        let stats = camera.stats();
        started(&mut camera);

        assert_eq!(capture(&mut camera).unwrap().data()[0], 1);
        assert_eq!(capture(&mut camera).unwrap().data()[0], 2);
        assert!(matches!(
            capture(&mut camera),
            Err(CameraError::SourceExhausted)
        ));
        assert_eq!(stats.delivered(), 2);
        assert!(stats.is_exhausted());
    }

    #[test]
    fn test_replay_looping() {
        let mut camera = ReplayCamera::new(vec![frame(1), frame(2)]).unwrap().looping(true);
        started(&mut camera);
        let fills: Vec<u8> = (0..5)
            .map(|_| capture(&mut camera).unwrap().data()[0])
            .collect();
        assert_eq!(fills, vec![1, 2, 1, 2, 1]);
    }

    #[test]
    fn test_open_rejects_unknown_index() {
        let mut camera = ReplayCamera::new(vec![frame(0)]).unwrap();
        assert!(camera.open(CameraId::Index(0)).is_ok());
        assert!(matches!(
            camera.open(CameraId::Index(2)),
            Err(CameraError::OpenFailed(_))
        ));
    }

    #[test]
    fn test_open_rejects_empty_replay() {
        let mut camera = ReplayCamera::new(Vec::new()).unwrap();
        assert!(matches!(
            camera.open(CameraId::NoPreference),
            Err(CameraError::OpenFailed(_))
        ));
    }

    #[test]
    fn test_capture_without_preview_fails() {
        let mut camera = ReplayCamera::new(vec![frame(0)]).unwrap();
        camera.open(CameraId::NoPreference).unwrap();
        assert!(matches!(
            capture(&mut camera),
            Err(CameraError::CaptureFailed(_))
        ));
    }

    #[test]
    fn test_inverted_scan_applies_negative_effect() {
        let mut camera = ReplayCamera::new(vec![frame(10)]).unwrap();
        camera.open(CameraId::NoPreference).unwrap();
        let config = CameraConfig {
            inverted_scan: true,
            ..CameraConfig::default()
        };
        camera.configure(&config).unwrap();
        camera.start_preview(None).unwrap();
        assert_eq!(capture(&mut camera).unwrap().data()[0], 245);
    }

    #[test]
    fn test_configure_reports_first_frame_size() {
        let data = vec![0u8; 6 * 3];
        let wide = RawFrame::new(data, 6, 3, PixelFormat::Y8, Rotation::Deg90).unwrap();
        let mut camera = ReplayCamera::new(vec![wide]).unwrap();
        camera.open(CameraId::NoPreference).unwrap();
        assert_eq!(
            camera.configure(&CameraConfig::default()).unwrap(),
            Size::new(6, 3)
        );
        assert_eq!(camera.rotation(), Rotation::Deg90);
    }

    #[test]
    fn test_new_rejects_mismatched_frames() {
        let small = RawFrame::new(vec![0u8; 4], 2, 2, PixelFormat::Y8, Rotation::Deg0).unwrap();
        let err = ReplayCamera::new(vec![frame(0), frame(1), small]).unwrap_err();
        assert!(matches!(
            err,
            FrameError::SizeMismatch { index: 2, expected, actual }
                if expected == Size::new(4, 4) && actual == Size::new(2, 2)
        ));

        let turned = RawFrame::new(vec![0u8; 16], 4, 4, PixelFormat::Y8, Rotation::Deg90).unwrap();
        let err = ReplayCamera::new(vec![frame(0), turned]).unwrap_err();
        assert!(matches!(
            err,
            FrameError::RotationMismatch { index: 1, expected: 0, actual: 90 }
        ));
    }
}
