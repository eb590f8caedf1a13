// THEORY:
// A `Region` is the rectangle descriptor the harness hands to the engine: two corners,
// top-left inclusive and bottom-right exclusive. It knows how to check itself against a
// frame and how to build the handful of rectangles the calibration workflow needs (the
// centered calibration square and the left/right halves used for the diagnostic
// comparison). It never touches pixel data.

use crate::error::{Result, SegmentError};

/// A pixel position in frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// A rectangle covering rows `top_left.y..bottom_right.y` and columns `top_left.x..bottom_right.x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub top_left: Point,
    pub bottom_right: Point,
}

impl Region {
    pub fn new(top_left: Point, bottom_right: Point) -> Self {
        Self { top_left, bottom_right }
    }

    /// A `size`x`size` square centered in a `width`x`height` frame, clamped to the frame.
    pub fn centered(width: u32, height: u32, size: u32) -> Self {
        let size = size.min(width).min(height);
        let x0 = width / 2 - size / 2;
        let y0 = height / 2 - size / 2;
        Self::new(Point::new(x0, y0), Point::new(x0 + size, y0 + size))
    }

    /// The full frame.
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(Point::new(0, 0), Point::new(width, height))
    }

    /// Left and right halves of a `width`x`height` frame.
    pub fn halves(width: u32, height: u32) -> (Self, Self) {
        let middle = width / 2;
        (
            Self::new(Point::new(0, 0), Point::new(middle, height)),
            Self::new(Point::new(middle, 0), Point::new(width, height)),
        )
    }

    pub fn width(&self) -> u32 {
        self.bottom_right.x.saturating_sub(self.top_left.x)
    }

    pub fn height(&self) -> u32 {
        self.bottom_right.y.saturating_sub(self.top_left.y)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Checks that the region is non-empty and lies inside a `width`x`height` frame.
    pub fn validate(&self, width: u32, height: u32) -> Result<()> {
        if self.bottom_right.x > width || self.bottom_right.y > height {
            return Err(SegmentError::RegionOutOfBounds {
                x0: self.top_left.x,
                y0: self.top_left.y,
                x1: self.bottom_right.x,
                y1: self.bottom_right.y,
                width,
                height,
            });
        }
        if self.is_empty() {
            return Err(SegmentError::EmptyRegion);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_square_matches_calibration_layout() {
        let region = Region::centered(640, 480, 50);
        assert_eq!(region.top_left, Point::new(295, 215));
        assert_eq!(region.bottom_right, Point::new(345, 265));
    }

    #[test]
    fn centered_square_is_clamped_to_small_frames() {
        let region = Region::centered(20, 10, 50);
        assert_eq!(region.width(), 10);
        assert_eq!(region.height(), 10);
        assert!(region.validate(20, 10).is_ok());
    }

    #[test]
    fn halves_cover_the_frame() {
        let (left, right) = Region::halves(641, 480);
        assert_eq!(left.width() + right.width(), 641);
        assert_eq!(left.bottom_right.x, right.top_left.x);
    }

    #[test]
    fn validation_rejects_empty_and_out_of_bounds() {
        let empty = Region::new(Point::new(5, 5), Point::new(5, 9));
        assert!(matches!(empty.validate(10, 10), Err(SegmentError::EmptyRegion)));

        let inverted = Region::new(Point::new(8, 8), Point::new(2, 2));
        assert!(matches!(inverted.validate(10, 10), Err(SegmentError::EmptyRegion)));

        let outside = Region::new(Point::new(0, 0), Point::new(11, 4));
        assert!(matches!(outside.validate(10, 10), Err(SegmentError::RegionOutOfBounds { .. })));
    }
}
