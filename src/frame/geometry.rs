//! Points, sizes and rectangles in frame pixel coordinates.

use serde::Serialize;
use std::fmt;

/// A point in frame coordinates. Decoders may report sub-pixel positions.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// The same size with width and height swapped (a quarter turn).
    pub fn transposed(self) -> Self {
        Self {
            width: self.height,
            height: self.width,
        }
    }

    pub fn area(self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// An axis-aligned rectangle. `left`/`top` are inclusive, `right()`/`bottom()` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Rect {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(left: u32, top: u32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Rectangle covering a whole frame of the given size.
    pub fn full(size: Size) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    pub fn right(&self) -> u64 {
        self.left as u64 + self.width as u64
    }

    pub fn bottom(&self) -> u64 {
        self.top as u64 + self.height as u64
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// True when the rectangle lies entirely inside a frame of `bounds`.
    pub fn fits_within(&self, bounds: Size) -> bool {
        self.right() <= bounds.width as u64 && self.bottom() <= bounds.height as u64
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{},{} {}x{}]",
            self.left, self.top, self.width, self.height
        )
    }
}

/// Compute the centered framing rectangle inside `container`.
///
/// `margin` is the fraction of each dimension left empty on every side, so a
/// margin of 0.1 keeps the central 80% of the width and height. Values are
/// clamped to `0.0..0.5`.
pub fn framing_rect(container: Size, margin: f32) -> Rect {
    let margin = margin.clamp(0.0, 0.499);
    let inset_x = (container.width as f32 * margin) as u32;
    let inset_y = (container.height as f32 * margin) as u32;
    Rect::new(
        inset_x,
        inset_y,
        container.width - 2 * inset_x,
        container.height - 2 * inset_y,
    )
}
