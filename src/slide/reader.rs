//! SlideReader trait for format-agnostic slide access.
//!
//! Everything the extraction pipeline knows about a slide goes through this
//! trait: the pyramid geometry, the scanned-area offset, and region reads.
//! [`super::TiffSlide`] implements it for TIFF-based files; tests implement
//! it over in-memory images.

use image::RgbaImage;
use serde::Serialize;

use crate::error::SlideError;

// =============================================================================
// Level Information
// =============================================================================

/// Snapshot of one pyramid level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LevelInfo {
    pub width: u32,
    pub height: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub tiles_x: u32,
    pub tiles_y: u32,

    /// Downsample factor relative to level 0 (1.0 for level 0)
    pub downsample: f64,
}

// =============================================================================
// SlideReader Trait
// =============================================================================

/// Read access to a multi-resolution slide.
pub trait SlideReader {
    /// Number of pyramid levels. Level 0 is the highest resolution.
    fn level_count(&self) -> usize;

    /// `(width, height)` of a level, `None` when out of range.
    fn level_dimensions(&self, level: usize) -> Option<(u32, u32)>;

    /// Downsample factor of a level relative to level 0.
    fn level_downsample(&self, level: usize) -> Option<f64>;

    /// Tile size of a level. Edge tiles may hold fewer image pixels.
    fn tile_size(&self, level: usize) -> Option<(u32, u32)>;

    /// Offset of the scanned area's top-left corner in level-0 pixels.
    ///
    /// `(0.0, 0.0)` when the slide covers its whole canvas.
    fn bounds_offset(&self) -> (f64, f64);

    /// Read a region as RGBA.
    ///
    /// `origin` is the top-left corner in level-0 pixel space; `size` is in
    /// pixels of `level`. Pixels outside the level, or inside tiles that
    /// were never scanned, have alpha 0.
    fn read_region(
        &self,
        origin: (i64, i64),
        level: usize,
        size: (u32, u32),
    ) -> Result<RgbaImage, SlideError>;

    /// Dimensions of level 0.
    fn dimensions(&self) -> Option<(u32, u32)> {
        self.level_dimensions(0)
    }

    /// Downsample factors of all levels, in level order.
    fn level_downsamples(&self) -> Vec<f64> {
        (0..self.level_count())
            .filter_map(|level| self.level_downsample(level))
            .collect()
    }

    /// Complete information about a level.
    fn level_info(&self, level: usize) -> Option<LevelInfo> {
        let (width, height) = self.level_dimensions(level)?;
        let (tile_width, tile_height) = self.tile_size(level)?;
        let downsample = self.level_downsample(level)?;

        Some(LevelInfo {
            width,
            height,
            tile_width,
            tile_height,
            tiles_x: width.div_ceil(tile_width.max(1)),
            tiles_y: height.div_ceil(tile_height.max(1)),
            downsample,
        })
    }
}
