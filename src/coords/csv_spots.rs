//! TMA spot detections exported as semicolon-separated CSV.
//!
//! Each row describes a circular spot by centroid and radius. The spot is
//! exported as its axis-aligned bounding square. Rows without a spot id
//! are detections that were never assigned to a core and are dropped.

use tracing::debug;

use crate::error::CoordinateError;

use super::{Geometry, Point, SpotRecord};

pub const ID_COLUMN: &str = "Core Unique ID";
pub const CENTROID_X_COLUMN: &str = "Centroid X (pixels)";
pub const CENTROID_Y_COLUMN: &str = "Centroid Y (pixels)";
pub const RADIUS_COLUMN: &str = "Radius (pixels)";

const DELIMITER: u8 = b';';

/// Bounding square of a circle, as `[tl, tr, br, bl]`.
pub fn spot_square(cx: f64, cy: f64, r: f64) -> Geometry {
    Geometry::Polygon(vec![
        Point::new(cx - r, cy - r),
        Point::new(cx + r, cy - r),
        Point::new(cx + r, cy + r),
        Point::new(cx - r, cy + r),
    ])
}

/// Parse spot records from CSV text, shifting each square by `offset`.
pub fn parse_spots(text: &str, offset: Point) -> Result<Vec<SpotRecord>, CoordinateError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let column = |name: &'static str| {
        headers
            .iter()
            .position(|h| h.trim().trim_start_matches('\u{feff}') == name)
            .ok_or(CoordinateError::MissingColumn(name))
    };
    let id_col = column(ID_COLUMN)?;
    let x_col = column(CENTROID_X_COLUMN)?;
    let y_col = column(CENTROID_Y_COLUMN)?;
    let r_col = column(RADIUS_COLUMN)?;

    let mut spots = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row = row?;
        let record = index + 1;
        let field = |col: usize| row.get(col).unwrap_or("").trim();

        let Some(id) = parse_id(field(id_col)) else {
            debug!(record, "Dropping spot without id");
            continue;
        };

        let number = |col: usize, name: &'static str| -> Result<f64, CoordinateError> {
            let raw = field(col);
            raw.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| CoordinateError::InvalidValue {
                    column: name,
                    record,
                    value: raw.to_string(),
                })
        };
        let cx = number(x_col, CENTROID_X_COLUMN)?;
        let cy = number(y_col, CENTROID_Y_COLUMN)?;
        let r = number(r_col, RADIUS_COLUMN)?;

        spots.push(SpotRecord {
            id,
            geometry: spot_square(cx, cy, r).translated(offset),
        });
    }

    debug!(spots = spots.len(), "Parsed spot records");
    Ok(spots)
}

/// Integer part of a spot id; `None` for blank or non-numeric ids.
fn parse_id(raw: &str) -> Option<i64> {
    let value = raw.parse::<f64>().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(value.trunc() as i64)
}
