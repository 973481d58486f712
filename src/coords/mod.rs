//! Coordinate sources.
//!
//! A pairing's coordinates come from one of three places, chosen by the
//! subcommand rather than by the file contents:
//!
//! - [`CoordinateProvider::Unbounded`]: no coordinates, the whole level is exported
//! - [`CoordinateProvider::CsvCircular`]: TMA spot detections, see [`csv_spots`]
//! - [`CoordinateProvider::XmlAnnotated`]: ASAP annotations, see [`asap`]
//!
//! All geometries are in level-0 pixel space. Polygons are expected in
//! `[top-left, top-right, bottom-right, bottom-left]` order; nothing here
//! reorders them.

pub mod asap;
mod border;
pub mod csv_spots;

use std::path::Path;

use serde::Serialize;

use crate::error::CoordinateError;

pub use asap::parse_annotations;
pub use border::BorderAdjuster;
pub use csv_spots::{parse_spots, spot_square};

// =============================================================================
// Geometry
// =============================================================================

/// A position in level-0 pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    pub fn translated(self, offset: Point) -> Self {
        Point::new(self.x + offset.x, self.y + offset.y)
    }
}

/// Region described by a coordinate source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Geometry {
    /// A single point (`Dot` annotations).
    Point(Point),

    /// Corner list, in document order.
    Polygon(Vec<Point>),
}

impl Geometry {
    pub fn points(&self) -> &[Point] {
        match self {
            Geometry::Point(p) => std::slice::from_ref(p),
            Geometry::Polygon(points) => points,
        }
    }

    /// Shift every point by `offset`.
    pub fn translated(&self, offset: Point) -> Geometry {
        match self {
            Geometry::Point(p) => Geometry::Point(p.translated(offset)),
            Geometry::Polygon(points) => {
                Geometry::Polygon(points.iter().map(|p| p.translated(offset)).collect())
            }
        }
    }
}

/// All geometries of one annotation tag, in document order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AnnotationGroup {
    pub tag: String,
    pub geometries: Vec<Geometry>,
}

impl AnnotationGroup {
    pub fn new(tag: impl Into<String>) -> Self {
        AnnotationGroup {
            tag: tag.into(),
            geometries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.geometries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }
}

/// One tissue-microarray spot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpotRecord {
    pub id: i64,
    pub geometry: Geometry,
}

/// Parsed coordinates of one pairing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CoordinateSet {
    /// Export the full level.
    Whole,
    Spots(Vec<SpotRecord>),
    Group(AnnotationGroup),
}

impl CoordinateSet {
    /// Number of patches this set will produce.
    pub fn patch_count(&self) -> usize {
        match self {
            CoordinateSet::Whole => 1,
            CoordinateSet::Spots(spots) => spots.len(),
            CoordinateSet::Group(group) => group.len(),
        }
    }
}

// =============================================================================
// Provider
// =============================================================================

/// Where a pairing's coordinates come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinateProvider {
    Unbounded,
    CsvCircular,
    XmlAnnotated { tag: String },
}

impl CoordinateProvider {
    pub fn name(&self) -> &'static str {
        match self {
            CoordinateProvider::Unbounded => "whole-slide",
            CoordinateProvider::CsvCircular => "CSV spot",
            CoordinateProvider::XmlAnnotated { .. } => "XML annotation",
        }
    }

    /// Whether this provider reads a coordinate file.
    pub fn needs_source(&self) -> bool {
        !matches!(self, CoordinateProvider::Unbounded)
    }

    /// Parse the coordinates at `path`, shifting them by `offset`.
    ///
    /// `Unbounded` ignores both arguments.
    pub fn load(
        &self,
        path: Option<&Path>,
        offset: Point,
    ) -> Result<CoordinateSet, CoordinateError> {
        let source = || path.ok_or(CoordinateError::MissingSource(self.name()));

        match self {
            CoordinateProvider::Unbounded => Ok(CoordinateSet::Whole),
            CoordinateProvider::CsvCircular => {
                let text = read_source(source()?)?;
                Ok(CoordinateSet::Spots(parse_spots(&text, offset)?))
            }
            CoordinateProvider::XmlAnnotated { tag } => {
                let text = read_source(source()?)?;
                Ok(CoordinateSet::Group(parse_annotations(&text, tag, offset)?))
            }
        }
    }
}

fn read_source(path: &Path) -> Result<String, CoordinateError> {
    std::fs::read_to_string(path).map_err(|e| CoordinateError::Unreadable {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
