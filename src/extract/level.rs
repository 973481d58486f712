//! Requested level to pyramid level.
//!
//! A requested level is a downsample factor, not an index: `--level 4`
//! selects the level whose reported downsample is exactly 4. The first
//! equal factor wins. Without an exact match the scan falls back to index
//! 0; there is no nearest-level search.

use serde::Serialize;
use tracing::warn;

use crate::error::{CropError, SlideError};
use crate::slide::SlideReader;

/// A requested level mapped onto a concrete pyramid level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResolvedLevel {
    pub index: usize,
    pub downsample: f64,
    pub width: u32,
    pub height: u32,
}

/// Index of the first factor equal to `requested`.
///
/// Returns `(index, matched)`; `index` is 0 when nothing matched.
pub fn match_downsample(downsamples: &[f64], requested: u32) -> (usize, bool) {
    match downsamples.iter().position(|&d| d == f64::from(requested)) {
        Some(index) => (index, true),
        None => (0, false),
    }
}

/// Resolve `requested` against the levels of `slide`.
pub fn resolve_level<S: SlideReader + ?Sized>(
    slide: &S,
    requested: u32,
) -> Result<ResolvedLevel, CropError> {
    let downsamples = slide.level_downsamples();
    let (index, matched) = match_downsample(&downsamples, requested);
    if !matched {
        warn!(
            requested,
            available = ?downsamples,
            "No level with this downsample factor, using level 0"
        );
    }

    let count = slide.level_count();
    let out_of_range = || SlideError::LevelOutOfRange {
        level: index,
        count,
    };
    let (width, height) = slide.level_dimensions(index).ok_or_else(out_of_range)?;
    let downsample = slide.level_downsample(index).ok_or_else(out_of_range)?;

    Ok(ResolvedLevel {
        index,
        downsample,
        width,
        height,
    })
}
