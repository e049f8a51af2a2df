//! Byte-exact properties of the frame transforms.

use scanloop::frame::{CropSpec, FrameBuffer, PixelFormat, Point, RawFrame, Rect, Rotation};

fn buffer(width: u32, height: u32) -> FrameBuffer {
    let data = (0..width * height).map(|i| (i * 31 % 256) as u8).collect();
    FrameBuffer::new(data, width, height).unwrap()
}

const SIZES: [(u32, u32); 5] = [(1, 1), (3, 2), (7, 5), (16, 9), (33, 64)];

#[test]
fn test_rotation_then_inverse_is_identity() {
    for (w, h) in SIZES {
        let original = buffer(w, h);
        for rotation in Rotation::ALL {
            let back = original.rotate(rotation).rotate(rotation.inverse());
            assert_eq!(back, original, "{}x{} rotated {}", w, h, rotation.degrees());
        }
    }
}

#[test]
fn test_four_quarter_turns_are_identity() {
    for (w, h) in SIZES {
        let original = buffer(w, h);
        let mut turned = original.clone();
        for _ in 0..4 {
            turned = turned.rotate(Rotation::Deg90);
        }
        assert_eq!(turned, original);
    }
}

#[test]
fn test_quarter_turn_maps_pixels() {
    let original = buffer(7, 5);
    let rotated = original.rotate(Rotation::Deg90);
    assert_eq!((rotated.width(), rotated.height()), (5, 7));
    for y in 0..rotated.height() {
        for x in 0..rotated.width() {
            // Clockwise: output (x, y) comes from input (y, height-1-x).
            assert_eq!(
                rotated.pixel(x, y),
                original.pixel(y, original.height() - 1 - x)
            );
        }
    }
}

#[test]
fn test_half_turn_reverses_bytes() {
    let original = buffer(16, 9);
    let mut expected = original.as_bytes().to_vec();
    expected.reverse();
    assert_eq!(original.rotate(Rotation::Deg180).as_bytes(), &expected[..]);
}

#[test]
fn test_crop_output_dimensions_floor() {
    let source = buffer(64, 48);
    let cases = [
        (Rect::new(0, 0, 64, 48), 1, (64, 48)),
        (Rect::new(3, 5, 31, 17), 2, (15, 8)),
        (Rect::new(10, 10, 50, 30), 4, (12, 7)),
        (Rect::new(0, 0, 7, 7), 8, (0, 0)),
        (Rect::new(1, 1, 63, 47), 16, (3, 2)),
    ];
    for (rect, scale, (w, h)) in cases {
        let out = source.crop_and_scale(&CropSpec::new(rect, scale));
        assert_eq!((out.width(), out.height()), (w, h), "{} / {}", rect, scale);
        assert_eq!(out.as_bytes().len(), (w * h) as usize);
    }
}

#[test]
fn test_unscaled_crop_is_sub_rectangle_copy() {
    let source = buffer(20, 12);
    let rect = Rect::new(4, 3, 9, 6);
    let out = source.crop_and_scale(&CropSpec::new(rect, 1));
    for y in 0..rect.height {
        for x in 0..rect.width {
            assert_eq!(out.pixel(x, y), source.pixel(rect.left + x, rect.top + y));
        }
    }
}

#[test]
fn test_scaled_crop_samples_every_nth_pixel() {
    let source = buffer(20, 12);
    let rect = Rect::new(2, 1, 16, 8);
    let out = source.crop_and_scale(&CropSpec::new(rect, 4));
    assert_eq!((out.width(), out.height()), (4, 2));
    for y in 0..out.height() {
        for x in 0..out.width() {
            assert_eq!(out.pixel(x, y), source.pixel(rect.left + x * 4, rect.top + y * 4));
        }
    }
}

#[test]
#[should_panic(expected = "exceeds frame bounds")]
fn test_crop_outside_frame_panics() {
    let source = buffer(10, 10);
    source.crop_and_scale(&CropSpec::new(Rect::new(5, 5, 6, 5), 1));
}

#[test]
#[should_panic(expected = "power of two")]
fn test_non_power_of_two_scale_panics() {
    let source = buffer(10, 10);
    source.crop_and_scale(&CropSpec::new(Rect::new(0, 0, 9, 9), 3));
}

#[test]
fn test_decode_buffer_rotates_before_cropping() {
    // 4x2 sensor frame, rotated a quarter turn into a 2x4 display frame.
    let data = vec![1, 2, 3, 4, 5, 6, 7, 8];
    let frame = RawFrame::new(data, 4, 2, PixelFormat::Y8, Rotation::Deg90).unwrap();
    assert_eq!(frame.display_size().width, 2);

    let whole = frame.decode_buffer(None, 1);
    assert_eq!(whole.as_bytes(), &[5, 1, 6, 2, 7, 3, 8, 4]);

    let bottom = frame.decode_buffer(Some(Rect::new(0, 2, 2, 2)), 1);
    assert_eq!(bottom.as_bytes(), &[7, 3, 8, 4]);
}

#[test]
fn test_nv21_and_yuyv_decode_luminance_only() {
    let mut nv21 = vec![9u8; 4 * 2];
    nv21.extend_from_slice(&[200; 4]);
    let frame = RawFrame::new(nv21, 4, 2, PixelFormat::Nv21, Rotation::Deg0).unwrap();
    assert_eq!(frame.decode_buffer(None, 1).as_bytes(), &[9; 8]);

    let yuyv = vec![10, 128, 20, 128, 30, 128, 40, 128];
    let frame = RawFrame::new(yuyv, 4, 1, PixelFormat::Yuyv, Rotation::Deg0).unwrap();
    assert_eq!(frame.decode_buffer(None, 1).as_bytes(), &[10, 20, 30, 40]);
}

#[test]
fn test_translate_point_back_to_frame() {
    let frame =
        RawFrame::new(vec![0; 100 * 80], 100, 80, PixelFormat::Y8, Rotation::Deg0).unwrap();
    let crop = Some(Rect::new(10, 20, 40, 40));
    assert_eq!(
        frame.translate_point(Point::new(5.0, 3.0), crop, 2),
        Point::new(20.0, 26.0)
    );

    let mirrored = frame.with_mirror(true);
    assert_eq!(
        mirrored.translate_point(Point::new(5.0, 3.0), crop, 2),
        Point::new(80.0, 26.0)
    );
}
