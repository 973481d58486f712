//! Patch extraction.
//!
//! - [`level`]: requested level to pyramid level
//! - [`crop`]: crop windows, bounds checks and background normalization
//! - [`naming`]: output file names
//! - [`encoder`]: PNG writing
//! - [`pipeline`]: the batch runner tying them together

pub mod crop;
pub mod encoder;
pub mod level;
pub mod naming;
pub mod pipeline;

pub use crop::{crop, crop_window, normalize_background, CropWindow, Patch};
pub use encoder::PngPatchEncoder;
pub use level::{match_downsample, resolve_level, ResolvedLevel};
pub use naming::{plan_patches, OutputNaming, PlannedPatch};
pub use pipeline::{BatchReport, ExtractOptions, Extractor, PairingFailure, PairingReport};
