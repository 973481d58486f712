//! Opening slides by path.
//!
//! The batch runner is generic over [`SlideSource`] so it can be driven by
//! real files in production and by in-memory slides in tests.

use std::path::Path;

use crate::error::{FormatError, SlideError};
use crate::io::FileRangeReader;

use super::reader::SlideReader;
use super::tiff_slide::TiffSlide;

/// Something that can open a slide from a path.
pub trait SlideSource {
    /// The slide type this source produces.
    type Slide: SlideReader;

    /// Open the slide stored at `path`.
    fn open(&self, path: &Path) -> Result<Self::Slide, SlideError>;
}

/// Opens TIFF-based slides from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalSlideSource;

impl LocalSlideSource {
    pub fn new() -> Self {
        Self
    }
}

impl SlideSource for LocalSlideSource {
    type Slide = TiffSlide<FileRangeReader>;

    fn open(&self, path: &Path) -> Result<Self::Slide, SlideError> {
        let reader = FileRangeReader::open(path).map_err(FormatError::from)?;
        TiffSlide::open(reader)
    }
}
