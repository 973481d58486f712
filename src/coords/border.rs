//! Scanned-area offset correction.

use tracing::debug;

use crate::slide::SlideReader;

use super::{Geometry, Point};

/// Shifts coordinates from the scanned-area view into level-0 pixel space.
///
/// Annotation tools show a slide cropped to its scanned area, so their
/// coordinates start at the scanned area's corner. Region reads address the
/// full canvas, which may include an unscanned border.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BorderAdjuster {
    offset: Point,
}

impl BorderAdjuster {
    /// No adjustment.
    pub fn none() -> Self {
        BorderAdjuster::default()
    }

    pub fn with_offset(offset: Point) -> Self {
        BorderAdjuster { offset }
    }

    /// Read the border offset from slide metadata.
    pub fn from_slide<S: SlideReader + ?Sized>(slide: &S) -> Self {
        let (x, y) = slide.bounds_offset();
        debug!(offset_x = x, offset_y = y, "Applying slide border offset");
        BorderAdjuster::with_offset(Point::new(x, y))
    }

    pub fn offset(&self) -> Point {
        self.offset
    }

    pub fn adjust(&self, geometry: &Geometry) -> Geometry {
        geometry.translated(self.offset)
    }
}
