//! Slide abstraction layer.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              Extractor                  │
//! └────────────────────┬────────────────────┘
//!                      │ open(path)
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │          SlideSource trait              │
//! │   (LocalSlideSource, test doubles)      │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │          SlideReader trait              │
//! │  (levels, bounds offset, read_region)   │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │     TiffSlide (SVS, generic TIFF)       │
//! └─────────────────────────────────────────┘
//! ```

mod reader;
mod source;
mod tiff_slide;

pub use reader::{LevelInfo, SlideReader};
pub use source::{LocalSlideSource, SlideSource};
pub use tiff_slide::TiffSlide;
