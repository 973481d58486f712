//! Pairing slides with coordinate files.
//!
//! Pairings come from one of four strategies:
//!
//! - whole-slide: every slide, no coordinates
//! - direct: one slide file and one coordinate file given explicitly
//! - substring: a coordinate file belongs to a slide when its path contains
//!   the slide's file stem, and exactly one such file must exist
//! - mapping table: rows of a [`MappingTable`]
//!
//! Every strategy applies the overwrite policy first: a slide whose output
//! already exists is left out before anything is decoded.

pub mod discovery;
pub mod table;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::coords::CoordinateProvider;
use crate::error::MatchError;
use crate::extract::OutputNaming;

pub use discovery::{discover, ANNOTATION_EXTENSIONS, SLIDE_EXTENSIONS, SPOT_EXTENSIONS};
pub use table::{MappingColumns, MappingEntry, MappingTable};

/// Whether an output file should be left alone.
pub fn should_skip(output_exists: bool, overwrite: bool) -> bool {
    output_exists && !overwrite
}

/// A slide, its coordinate file and its output name prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlideCoordinatePairing {
    pub slide: PathBuf,
    /// `None` for whole-slide export.
    pub coordinates: Option<PathBuf>,
    /// `<output dir>/<slide stem>-level<L>`
    pub output_prefix: PathBuf,
}

/// Why a slide was left out of the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MatchDiagnostic {
    /// The slide's output already exists and overwrite is off.
    OutputExists { slide: PathBuf, output: PathBuf },

    /// Substring matching found zero or several coordinate files.
    Ambiguous { slide: PathBuf, matches: Vec<PathBuf> },

    /// A slide or coordinate path named by the input does not exist.
    MissingInput { path: PathBuf },
}

impl fmt::Display for MatchDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchDiagnostic::OutputExists { output, .. } => write!(
                f,
                "File {} already exists. Output saving is skipped. To overwrite add --overwrite.",
                output.display()
            ),
            MatchDiagnostic::Ambiguous { slide, matches } if matches.is_empty() => write!(
                f,
                "File {} does not have a corresponding coordinate file. File will be skipped.",
                slide.display()
            ),
            MatchDiagnostic::Ambiguous { slide, matches } => write!(
                f,
                "File {} has {} corresponding coordinate files. File will be skipped.",
                slide.display(),
                matches.len()
            ),
            MatchDiagnostic::MissingInput { path } => {
                write!(f, "Input {} does not exist. Pairing will be skipped.", path.display())
            }
        }
    }
}

/// Pairings plus one diagnostic per slide that was left out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchOutcome {
    pub pairings: Vec<SlideCoordinatePairing>,
    pub diagnostics: Vec<MatchDiagnostic>,
}

impl MatchOutcome {
    fn skip(&mut self, diagnostic: MatchDiagnostic) {
        match diagnostic {
            MatchDiagnostic::OutputExists { .. } => info!("{}", diagnostic),
            _ => warn!("{}", diagnostic),
        }
        self.diagnostics.push(diagnostic);
    }
}

/// Builds pairings for one export run.
#[derive(Debug, Clone)]
pub struct FileMatcher {
    naming: OutputNaming,
    provider: CoordinateProvider,
    overwrite: bool,
}

impl FileMatcher {
    pub fn new(naming: OutputNaming, provider: CoordinateProvider, overwrite: bool) -> Self {
        FileMatcher {
            naming,
            provider,
            overwrite,
        }
    }

    pub fn naming(&self) -> &OutputNaming {
        &self.naming
    }

    pub fn provider(&self) -> &CoordinateProvider {
        &self.provider
    }

    /// Pair the slides under `slides` with the coordinate files under
    /// `coordinates`.
    ///
    /// Two files are paired directly; two directories are listed and
    /// matched by substring.
    pub fn pair_paths(
        &self,
        slides: &Path,
        coordinates: &Path,
        staining: &str,
        extensions: &[&str],
    ) -> Result<MatchOutcome, MatchError> {
        for path in [slides, coordinates] {
            if !path.exists() {
                return Err(MatchError::MissingInput(path.to_path_buf()));
            }
        }

        match (slides.is_file(), coordinates.is_file()) {
            (true, true) => Ok(self.direct(slides, coordinates)),
            (false, false) => {
                let slide_files = discover(slides, staining, &SLIDE_EXTENSIONS)?;
                let coordinate_files = discover(coordinates, staining, extensions)?;
                debug!(
                    slides = slide_files.len(),
                    coordinates = coordinate_files.len(),
                    "Matching by file name"
                );
                Ok(self.by_substring(&slide_files, &coordinate_files))
            }
            _ => Err(MatchError::MixedInputs {
                slides: slides.to_path_buf(),
                coordinates: coordinates.to_path_buf(),
            }),
        }
    }

    /// Pair every slide with no coordinates.
    pub fn whole(&self, slides: &[PathBuf]) -> MatchOutcome {
        let mut outcome = MatchOutcome::default();
        for slide in slides {
            if let Some(pairing) = self.admit(slide, None, &mut outcome) {
                outcome.pairings.push(pairing);
            }
        }
        outcome
    }

    /// Pair one slide with one coordinate file, without name matching.
    pub fn direct(&self, slide: &Path, coordinates: &Path) -> MatchOutcome {
        let mut outcome = MatchOutcome::default();
        if let Some(pairing) = self.admit(slide, Some(coordinates.to_path_buf()), &mut outcome) {
            outcome.pairings.push(pairing);
        }
        outcome
    }

    /// Pair each slide with the single coordinate file whose path contains
    /// the slide's stem.
    pub fn by_substring(&self, slides: &[PathBuf], coordinate_files: &[PathBuf]) -> MatchOutcome {
        let mut outcome = MatchOutcome::default();
        for slide in slides {
            if self.output_exists(slide, &mut outcome) {
                continue;
            }

            let stem = slide
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let mut matches: Vec<PathBuf> = coordinate_files
                .iter()
                .filter(|c| c.to_string_lossy().contains(stem.as_str()))
                .cloned()
                .collect();

            if matches.len() != 1 {
                outcome.skip(MatchDiagnostic::Ambiguous {
                    slide: slide.clone(),
                    matches,
                });
                continue;
            }

            outcome.pairings.push(SlideCoordinatePairing {
                slide: slide.clone(),
                coordinates: matches.pop(),
                output_prefix: self.naming.prefix(slide),
            });
        }
        outcome
    }

    /// Pair the rows of a mapping table, resolving names against base
    /// directories.
    pub fn by_table(
        &self,
        table: &MappingTable,
        slide_base: &Path,
        coordinate_base: &Path,
    ) -> MatchOutcome {
        let mut outcome = MatchOutcome::default();
        for entry in &table.entries {
            let slide = entry.slide_path(slide_base);
            let coordinates = entry.coordinate_path(coordinate_base);
            if let Some(pairing) = self.admit(&slide, Some(coordinates), &mut outcome) {
                outcome.pairings.push(pairing);
            }
        }
        outcome
    }

    /// Existence and overwrite checks shared by the explicit strategies.
    fn admit(
        &self,
        slide: &Path,
        coordinates: Option<PathBuf>,
        outcome: &mut MatchOutcome,
    ) -> Option<SlideCoordinatePairing> {
        if self.output_exists(slide, outcome) {
            return None;
        }
        for path in std::iter::once(slide).chain(coordinates.as_deref()) {
            if !path.exists() {
                outcome.skip(MatchDiagnostic::MissingInput {
                    path: path.to_path_buf(),
                });
                return None;
            }
        }

        Some(SlideCoordinatePairing {
            slide: slide.to_path_buf(),
            coordinates,
            output_prefix: self.naming.prefix(slide),
        })
    }

    fn output_exists(&self, slide: &Path, outcome: &mut MatchOutcome) -> bool {
        let Some(output) = self.naming.sentinel(slide, &self.provider) else {
            return false;
        };
        if !should_skip(output.exists(), self.overwrite) {
            return false;
        }
        outcome.skip(MatchDiagnostic::OutputExists {
            slide: slide.to_path_buf(),
            output,
        });
        true
    }
}
