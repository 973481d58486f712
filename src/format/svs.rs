//! Aperio SVS metadata.
//!
//! SVS files are pyramidal TIFFs whose first ImageDescription reads like
//!
//! ```text
//! Aperio Image Library v12.0.15
//! 46920x33600 (256x256) JPEG/RGB Q=70|AppMag = 20|MPP = 0.499
//! ```
//!
//! Pixel access goes through the generic TIFF path; only the key/value
//! metadata is specific to the format.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::TiffError;
use crate::io::RangeReader;

use super::tiff::{TiffPyramid, TiffTag, ValueReader};

/// Parsed metadata from an SVS ImageDescription.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SvsMetadata {
    /// Microns per pixel
    pub mpp: Option<f64>,

    /// Objective magnification (e.g. 20, 40)
    pub magnification: Option<f64>,

    pub vendor: Option<String>,

    /// Every `key = value` pair of the description
    pub properties: BTreeMap<String, String>,
}

impl SvsMetadata {
    /// Parse the pipe-separated `key = value` pairs of a description.
    pub fn parse(description: &str) -> Self {
        let mut metadata = SvsMetadata::default();

        if description.contains("Aperio") {
            metadata.vendor = Some("Aperio".to_string());
        }

        for part in description.split('|') {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };
            let (key, value) = (key.trim(), value.trim());

            match key {
                "MPP" => metadata.mpp = value.parse().ok(),
                "AppMag" => metadata.magnification = value.parse().ok(),
                _ => {}
            }
            metadata
                .properties
                .insert(key.to_string(), value.to_string());
        }

        metadata
    }

    /// Read metadata from the base level's ImageDescription.
    ///
    /// A slide without a description yields empty metadata.
    pub fn read<R: RangeReader>(reader: &R, pyramid: &TiffPyramid) -> Result<Self, TiffError> {
        let entry = pyramid
            .base_level()
            .and_then(|level| level.ifd.get_entry_by_tag(TiffTag::ImageDescription));

        match entry {
            Some(entry) => {
                let description = ValueReader::new(reader, &pyramid.header).read_string(entry)?;
                Ok(Self::parse(&description))
            }
            None => Ok(Self::default()),
        }
    }
}
