//! Batch extraction.
//!
//! Pairings are processed one at a time, in order. For each pairing the
//! slide is opened, its coordinates are parsed and shifted, the requested
//! level is resolved, and every planned patch is cropped, normalized and
//! written before the next one is read. A failing pairing is logged and
//! the batch moves on.

use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::coords::{BorderAdjuster, CoordinateProvider, CoordinateSet};
use crate::error::{CropError, ExtractError, FormatError, IoError, SlideError};
use crate::matching::{should_skip, SlideCoordinatePairing};
use crate::slide::SlideSource;

use super::crop::crop;
use super::encoder::PngPatchEncoder;
use super::level::resolve_level;
use super::naming::plan_patches;

/// Settings shared by every pairing of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Requested level, matched against downsample factors.
    pub level: u32,
    pub overwrite: bool,
    /// Shift coordinates by the slide's scanned-area offset.
    pub border_offset: bool,
}

/// Result of one pairing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PairingReport {
    pub written: usize,
    /// Outputs that already existed.
    pub skipped: usize,
    /// Geometries that cannot be cropped (single points, zero-area squares).
    pub rejected: usize,
}

/// A pairing that ended with an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairingFailure {
    pub slide: PathBuf,
    pub error: String,
}

/// Summary of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub pairings: usize,
    pub succeeded: usize,
    pub patches_written: usize,
    pub patches_skipped: usize,
    pub patches_rejected: usize,
    pub failures: Vec<PairingFailure>,
}

impl BatchReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// Runs pairings against slides opened from `S`.
#[derive(Debug, Clone)]
pub struct Extractor<S: SlideSource> {
    source: S,
    provider: CoordinateProvider,
    options: ExtractOptions,
    encoder: PngPatchEncoder,
}

impl<S: SlideSource> Extractor<S> {
    pub fn new(source: S, provider: CoordinateProvider, options: ExtractOptions) -> Self {
        Extractor {
            source,
            provider,
            options,
            encoder: PngPatchEncoder::new(),
        }
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Process every pairing; failures are recorded, never propagated.
    pub fn run(&self, pairings: &[SlideCoordinatePairing]) -> BatchReport {
        let mut report = BatchReport {
            pairings: pairings.len(),
            ..BatchReport::default()
        };

        for pairing in pairings {
            match self.process_pairing(pairing) {
                Ok(result) => {
                    report.succeeded += 1;
                    report.patches_written += result.written;
                    report.patches_skipped += result.skipped;
                    report.patches_rejected += result.rejected;
                }
                Err(e) => {
                    error!(slide = %pairing.slide.display(), error = %e, "Pairing failed");
                    report.failures.push(PairingFailure {
                        slide: pairing.slide.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        report
    }

    /// Extract every patch of one pairing.
    ///
    /// An out-of-bounds geometry stops the pairing; patches written before
    /// it stay on disk. Geometries without a usable area are skipped.
    pub fn process_pairing(
        &self,
        pairing: &SlideCoordinatePairing,
    ) -> Result<PairingReport, ExtractError> {
        if let Some(coordinates) = &pairing.coordinates {
            if !coordinates.exists() {
                return Err(ExtractError::MissingInput(coordinates.clone()));
            }
        }

        let slide = self.source.open(&pairing.slide).map_err(|e| match e {
            SlideError::Format(FormatError::Io(IoError::NotFound(_))) => {
                ExtractError::MissingInput(pairing.slide.clone())
            }
            other => ExtractError::Slide(other),
        })?;

        let adjuster = if self.options.border_offset && self.provider.needs_source() {
            BorderAdjuster::from_slide(&slide)
        } else {
            BorderAdjuster::none()
        };
        let set = self
            .provider
            .load(pairing.coordinates.as_deref(), adjuster.offset())?;
        if let CoordinateSet::Group(group) = &set {
            if group.is_empty() {
                info!(
                    slide = %pairing.slide.display(),
                    tag = %group.tag,
                    "No annotations with this tag, nothing to export"
                );
            }
        }

        let level = resolve_level(&slide, self.options.level)?;
        debug!(
            slide = %pairing.slide.display(),
            requested = self.options.level,
            index = level.index,
            width = level.width,
            height = level.height,
            patches = set.patch_count(),
            "Resolved level"
        );

        let mut result = PairingReport::default();
        for planned in plan_patches(&pairing.output_prefix, &set) {
            if should_skip(planned.path.exists(), self.options.overwrite) {
                info!(
                    "File {} already exists. Output saving is skipped. To overwrite add --overwrite.",
                    planned.path.display()
                );
                result.skipped += 1;
                continue;
            }

            let patch = match crop(&slide, &level, planned.geometry.as_ref()) {
                Ok(patch) => patch,
                Err(CropError::UnsupportedGeometry { points }) => {
                    warn!(
                        output = %planned.path.display(),
                        points,
                        "Geometry is not a rectangle, patch skipped"
                    );
                    result.rejected += 1;
                    continue;
                }
                Err(CropError::EmptyRegion { width, height }) => {
                    warn!(
                        output = %planned.path.display(),
                        width,
                        height,
                        "Geometry has no area, patch skipped"
                    );
                    result.rejected += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            info!("Saving image {}", planned.path.display());
            self.encoder.write(&patch.image, &planned.path)?;
            result.written += 1;
        }

        Ok(result)
    }
}
