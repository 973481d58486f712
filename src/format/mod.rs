//! Parsers for TIFF-based Whole Slide Image files.
//!
//! - **Aperio SVS**: identified by the "Aperio" marker in ImageDescription
//! - **Generic pyramidal TIFF**: any tiled TIFF/BigTIFF with a pyramid
//!
//! Use [`detect_format`] to classify a file and [`decode_tile`] to turn
//! stored tiles into pixels.

pub mod decode;
pub mod detect;
pub mod jpeg;
pub mod svs;
pub mod tiff;

pub use decode::decode_tile;
pub use detect::{detect_format, is_tiff_header, SlideFormat};
pub use svs::SvsMetadata;
