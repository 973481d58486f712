//! Cropping geometries out of a slide.
//!
//! A crop is computed from the polygon's corners without looking at the
//! pixels: the origin is the truncated top-left corner (level-0 space) and
//! the size is the truncated top-left to bottom-right extent. The
//! bottom-left corner must lie inside the resolved level.
//!
//! Pixels outside the scanned area come back from the decoder with alpha
//! below 255. They are painted white before the alpha channel is dropped.

use image::{Rgb, RgbImage, Rgba, RgbaImage};
use tracing::trace;

use crate::coords::Geometry;
use crate::error::CropError;
use crate::slide::SlideReader;

use super::level::ResolvedLevel;

const OPAQUE: u8 = u8::MAX;
const WHITE: [u8; 3] = [u8::MAX; 3];

/// Origin and size of one region read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropWindow {
    /// Top-left corner in level-0 pixels.
    pub origin: (i64, i64),
    /// Size in pixels of the resolved level.
    pub size: (u32, u32),
}

/// A cropped RGB region.
#[derive(Debug, Clone)]
pub struct Patch {
    pub image: RgbImage,
    pub origin: (i64, i64),
    pub size: (u32, u32),
}

/// Compute the crop window of `geometry`, or of the whole level when `None`.
pub fn crop_window(
    level: &ResolvedLevel,
    geometry: Option<&Geometry>,
) -> Result<CropWindow, CropError> {
    let Some(geometry) = geometry else {
        return Ok(CropWindow {
            origin: (0, 0),
            size: (level.width, level.height),
        });
    };

    let corners = match geometry {
        Geometry::Polygon(points) if points.len() >= 4 => points,
        other => {
            return Err(CropError::UnsupportedGeometry {
                points: other.points().len(),
            })
        }
    };
    let (top_left, bottom_right, bottom_left) = (corners[0], corners[2], corners[3]);

    if bottom_left.x > f64::from(level.width) || bottom_left.y > f64::from(level.height) {
        return Err(CropError::OutOfBounds {
            x: bottom_left.x,
            y: bottom_left.y,
            level: level.index,
            level_width: level.width,
            level_height: level.height,
        });
    }

    let width = (bottom_right.x - top_left.x) as i64;
    let height = (bottom_right.y - top_left.y) as i64;
    if width <= 0 || height <= 0 || width > i64::from(u32::MAX) || height > i64::from(u32::MAX) {
        return Err(CropError::EmptyRegion { width, height });
    }

    Ok(CropWindow {
        origin: (top_left.x as i64, top_left.y as i64),
        size: (width as u32, height as u32),
    })
}

/// Crop `geometry` (or the whole level) out of `slide`.
pub fn crop<S: SlideReader + ?Sized>(
    slide: &S,
    level: &ResolvedLevel,
    geometry: Option<&Geometry>,
) -> Result<Patch, CropError> {
    let window = crop_window(level, geometry)?;
    trace!(
        x = window.origin.0,
        y = window.origin.1,
        width = window.size.0,
        height = window.size.1,
        level = level.index,
        "Reading region"
    );

    let region = slide.read_region(window.origin, level.index, window.size)?;
    Ok(Patch {
        image: normalize_background(region),
        origin: window.origin,
        size: window.size,
    })
}

/// Paint every non-opaque pixel white and drop alpha.
pub fn normalize_background(region: RgbaImage) -> RgbImage {
    let (width, height) = region.dimensions();
    RgbImage::from_fn(width, height, |x, y| {
        let Rgba([r, g, b, a]) = *region.get_pixel(x, y);
        if a == OPAQUE {
            Rgb([r, g, b])
        } else {
            Rgb(WHITE)
        }
    })
}
