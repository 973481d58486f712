//! Listing slides and coordinate files.
//!
//! An input path is either a single file, used as is, or a directory whose
//! direct children are filtered by staining suffix and extension. Results
//! are sorted so batches run in a stable order.

use std::path::{Path, PathBuf};

use crate::error::MatchError;

/// Extensions recognised as slides.
pub const SLIDE_EXTENSIONS: [&str; 5] = ["mrxs", "ndpi", "svs", "tif", "tiff"];

/// Extension of ASAP annotation files.
pub const ANNOTATION_EXTENSIONS: [&str; 1] = ["xml"];

/// Extension of spot detection tables.
pub const SPOT_EXTENSIONS: [&str; 1] = ["csv"];

/// Files under `input` named `*<staining>.<ext>` for one of `extensions`.
///
/// A file path is returned unchanged regardless of its name.
pub fn discover(
    input: &Path,
    staining: &str,
    extensions: &[&str],
) -> Result<Vec<PathBuf>, MatchError> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        return Err(MatchError::MissingInput(input.to_path_buf()));
    }

    let unlistable = |e: std::io::Error| MatchError::Unlistable {
        path: input.to_path_buf(),
        message: e.to_string(),
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(input).map_err(unlistable)? {
        let path = entry.map_err(unlistable)?.path();
        if path.is_file() && matches_pattern(&path, staining, extensions) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

fn matches_pattern(path: &Path, staining: &str, extensions: &[&str]) -> bool {
    let (Some(stem), Some(extension)) = (
        path.file_stem().and_then(|s| s.to_str()),
        path.extension().and_then(|e| e.to_str()),
    ) else {
        return false;
    };

    extensions
        .iter()
        .any(|ext| ext.eq_ignore_ascii_case(extension))
        && stem.ends_with(staining)
}
