//! ASAP annotation XML.
//!
//! ```xml
//! <ASAP_Annotations>
//!   <Annotations>
//!     <Annotation Name="A1" Type="Polygon" PartOfGroup="hotspot">
//!       <Coordinates>
//!         <Coordinate Order="0" X="10.5" Y="20" />
//!         ...
//!       </Coordinates>
//!     </Annotation>
//!   </Annotations>
//! </ASAP_Annotations>
//! ```
//!
//! Only annotations whose `PartOfGroup` equals the requested tag are kept.
//! `Dot` annotations yield their first coordinate; every other type yields
//! all coordinates in document order.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use crate::error::CoordinateError;

use super::{AnnotationGroup, Geometry, Point};

const DOT_TYPE: &str = "Dot";

/// Annotation currently being read.
struct OpenAnnotation {
    is_dot: bool,
    points: Vec<Point>,
}

/// Collect the annotations tagged `tag`, shifting them by `offset`.
///
/// A document without that tag yields an empty group.
pub fn parse_annotations(
    text: &str,
    tag: &str,
    offset: Point,
) -> Result<AnnotationGroup, CoordinateError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut group = AnnotationGroup::new(tag);
    let mut current: Option<OpenAnnotation> = None;
    let mut skipped = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"Annotation" => {
                current = open_annotation(&e, tag)?;
                if current.is_none() {
                    skipped += 1;
                }
            }
            Event::Empty(e) if e.name().as_ref() == b"Annotation" => {
                // Self-closing annotation without coordinates.
                if open_annotation(&e, tag)?.is_none() {
                    skipped += 1;
                }
            }
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"Coordinate" => {
                if let Some(annotation) = current.as_mut() {
                    annotation.points.push(coordinate(&e)?);
                }
            }
            Event::End(e) if e.name().as_ref() == b"Annotation" => {
                if let Some(annotation) = current.take() {
                    if let Some(geometry) = finish(annotation) {
                        group.geometries.push(geometry.translated(offset));
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    debug!(
        tag,
        kept = group.len(),
        other_groups = skipped,
        "Parsed annotations"
    );
    Ok(group)
}

/// Start collecting `e` if it belongs to `tag`.
fn open_annotation(e: &BytesStart<'_>, tag: &str) -> Result<Option<OpenAnnotation>, CoordinateError> {
    let mut group = None;
    let mut kind = None;
    for attr in e.attributes() {
        let attr = attr.map_err(|err| CoordinateError::Xml(err.to_string()))?;
        match attr.key.as_ref() {
            b"PartOfGroup" => group = Some(attr.unescape_value()?.into_owned()),
            b"Type" => kind = Some(attr.unescape_value()?.into_owned()),
            _ => {}
        }
    }

    if group.as_deref() != Some(tag) {
        return Ok(None);
    }
    Ok(Some(OpenAnnotation {
        is_dot: kind.as_deref() == Some(DOT_TYPE),
        points: Vec::new(),
    }))
}

fn coordinate(e: &BytesStart<'_>) -> Result<Point, CoordinateError> {
    let mut x = None;
    let mut y = None;
    for attr in e.attributes() {
        let attr = attr.map_err(|err| CoordinateError::Xml(err.to_string()))?;
        let target = match attr.key.as_ref() {
            b"X" => &mut x,
            b"Y" => &mut y,
            _ => continue,
        };
        let raw = attr.unescape_value()?;
        let value = raw.trim().parse::<f64>().map_err(|_| {
            CoordinateError::Xml(format!("invalid coordinate value '{}'", raw))
        })?;
        *target = Some(value);
    }

    match (x, y) {
        (Some(x), Some(y)) => Ok(Point::new(x, y)),
        _ => Err(CoordinateError::Xml(
            "Coordinate element without X and Y".to_string(),
        )),
    }
}

fn finish(annotation: OpenAnnotation) -> Option<Geometry> {
    if annotation.is_dot {
        annotation.points.first().copied().map(Geometry::Point)
    } else if annotation.points.is_empty() {
        None
    } else {
        Some(Geometry::Polygon(annotation.points))
    }
}
