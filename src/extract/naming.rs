//! Output file names.
//!
//! `<slide stem>-level<requested level>[-<tag or spot id>][-<index>].png`
//!
//! Annotation patches carry an index suffix only when the group holds more
//! than one geometry. Spot patches are named by spot id alone.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::coords::{CoordinateProvider, CoordinateSet, Geometry};

/// Names output files for one requested level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputNaming {
    output_dir: PathBuf,
    level: u32,
}

/// One output file and the geometry that fills it.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedPatch {
    pub path: PathBuf,
    /// `None` exports the whole level.
    pub geometry: Option<Geometry>,
}

impl OutputNaming {
    pub fn new(output_dir: impl Into<PathBuf>, level: u32) -> Self {
        OutputNaming {
            output_dir: output_dir.into(),
            level,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    /// `<output dir>/<slide stem>-level<L>`.
    pub fn prefix(&self, slide: &Path) -> PathBuf {
        let stem = slide
            .file_stem()
            .map(|s| s.to_os_string())
            .unwrap_or_default();
        let mut name = stem;
        name.push(format!("-level{}", self.level));
        self.output_dir.join(name)
    }

    /// The file whose presence marks a pairing as already exported.
    ///
    /// Spot exports have no such file; each spot is checked on its own.
    pub fn sentinel(&self, slide: &Path, provider: &CoordinateProvider) -> Option<PathBuf> {
        let prefix = self.prefix(slide);
        match provider {
            CoordinateProvider::Unbounded => Some(with_suffix(&prefix, "")),
            CoordinateProvider::XmlAnnotated { tag } => {
                Some(with_suffix(&prefix, &format!("-{}", tag)))
            }
            CoordinateProvider::CsvCircular => None,
        }
    }
}

/// Output files for every geometry of `set`, in source order.
pub fn plan_patches(prefix: &Path, set: &CoordinateSet) -> Vec<PlannedPatch> {
    match set {
        CoordinateSet::Whole => vec![PlannedPatch {
            path: with_suffix(prefix, ""),
            geometry: None,
        }],
        CoordinateSet::Spots(spots) => spots
            .iter()
            .map(|spot| PlannedPatch {
                path: with_suffix(prefix, &format!("-{}", spot.id)),
                geometry: Some(spot.geometry.clone()),
            })
            .collect(),
        CoordinateSet::Group(group) => {
            let indexed = group.len() > 1;
            group
                .geometries
                .iter()
                .enumerate()
                .map(|(i, geometry)| {
                    let suffix = if indexed {
                        format!("-{}-{}", group.tag, i)
                    } else {
                        format!("-{}", group.tag)
                    };
                    PlannedPatch {
                        path: with_suffix(prefix, &suffix),
                        geometry: Some(geometry.clone()),
                    }
                })
                .collect()
        }
    }
}

fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(prefix.as_os_str());
    name.push(suffix);
    name.push(".png");
    PathBuf::from(name)
}
