//! # WSI Patches
//!
//! Export regions of pyramidal whole-slide images as PNG files.
//!
//! Regions come from ASAP annotation XML, from tissue-microarray spot CSV
//! files, or cover the whole slide. Each region is read at a requested
//! downsample level, pixels outside the scanned area are painted white,
//! and the result is written as an 8-bit RGB PNG.
//!
//! ## Architecture
//!
//! - [`io`] - Synchronous range readers over local files
//! - [`mod@format`] - TIFF/SVS parsing and tile decoding
//! - [`slide`] - Slide abstraction with region reads
//! - [`coords`] - CSV and XML coordinate sources
//! - [`extract`] - Level resolution, cropping, naming and the batch runner
//! - [`matching`] - Pairing slides with coordinate files
//! - [`config`] - CLI configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use wsi_patches::{
//!     CoordinateProvider, ExtractOptions, Extractor, FileMatcher, LocalSlideSource, OutputNaming,
//!     ANNOTATION_EXTENSIONS,
//! };
//!
//! let provider = CoordinateProvider::XmlAnnotated { tag: "hotspot".into() };
//! let matcher = FileMatcher::new(OutputNaming::new("out", 4), provider.clone(), false);
//! let outcome = matcher
//!     .pair_paths(Path::new("slides"), Path::new("xml"), "_HE", &ANNOTATION_EXTENSIONS)
//!     .unwrap();
//!
//! let options = ExtractOptions { level: 4, overwrite: false, border_offset: true };
//! let report = Extractor::new(LocalSlideSource::new(), provider, options).run(&outcome.pairings);
//! println!("{} patches written", report.patches_written);
//! ```

pub mod config;
pub mod coords;
pub mod error;
pub mod extract;
pub mod format;
pub mod io;
pub mod matching;
pub mod slide;

// Re-export commonly used types
pub use config::{
    AnnotationConfig, Cli, Command, ExtractArgs, InspectConfig, InspectFormat, TmaConfig,
    WholeConfig,
};
pub use coords::{
    AnnotationGroup, BorderAdjuster, CoordinateProvider, CoordinateSet, Geometry, Point,
    SpotRecord,
};
pub use error::{
    CoordinateError, CropError, ExtractError, FormatError, IoError, MatchError, SlideError,
    TiffError,
};
pub use extract::{
    crop, crop_window, normalize_background, resolve_level, BatchReport, CropWindow,
    ExtractOptions, Extractor, OutputNaming, Patch, PngPatchEncoder, ResolvedLevel,
};
pub use format::{detect_format, SlideFormat, SvsMetadata};
pub use io::{FileRangeReader, MemoryRangeReader, RangeReader};
pub use matching::{
    should_skip, FileMatcher, MappingColumns, MappingTable, MatchDiagnostic, MatchOutcome,
    SlideCoordinatePairing, ANNOTATION_EXTENSIONS, SLIDE_EXTENSIONS, SPOT_EXTENSIONS,
};
pub use slide::{LevelInfo, LocalSlideSource, SlideReader, SlideSource, TiffSlide};
