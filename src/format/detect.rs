//! Slide format detection.
//!
//! The header must be TIFF or BigTIFF. An "Aperio" marker in the first
//! ImageDescription identifies SVS; anything else is a generic pyramidal TIFF.

use serde::Serialize;

use crate::error::FormatError;
use crate::io::RangeReader;

use super::tiff::{ByteOrder, Ifd, TiffHeader, TiffTag, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE};

/// Detected slide format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SlideFormat {
    /// Aperio SVS (JPEG tiles with shared JPEGTables)
    AperioSvs,

    /// Tiled pyramidal TIFF or BigTIFF
    GenericTiff,
}

impl SlideFormat {
    pub const fn name(&self) -> &'static str {
        match self {
            SlideFormat::AperioSvs => "Aperio SVS",
            SlideFormat::GenericTiff => "Generic Pyramidal TIFF",
        }
    }
}

/// Only the start of ImageDescription is needed to find the marker.
const MAX_DESCRIPTION_BYTES: usize = 1024;

const APERIO_MARKER: &[u8] = b"Aperio";

/// Detect the format of a slide.
///
/// Files that are not TIFF at all (e.g. MIRAX or NDPI containers this reader
/// cannot open) fail with [`FormatError::UnsupportedFormat`].
pub fn detect_format<R: RangeReader>(reader: &R) -> Result<SlideFormat, FormatError> {
    let header_len = (BIGTIFF_HEADER_SIZE as u64).min(reader.size()) as usize;
    let header_bytes = reader.read_exact_at(0, header_len)?;

    if !is_tiff_header(&header_bytes) {
        return Err(FormatError::UnsupportedFormat {
            reason: format!("{} is not a TIFF-based slide", reader.identifier()),
        });
    }
    let header = TiffHeader::parse(&header_bytes, reader.size())?;

    let count_bytes = reader.read_exact_at(header.first_ifd_offset, header.ifd_count_size())?;
    let entry_count = if header.is_bigtiff {
        header.byte_order.read_u64(&count_bytes)
    } else {
        header.byte_order.read_u16(&count_bytes) as u64
    };
    let ifd_bytes = reader.read_exact_at(
        header.first_ifd_offset,
        Ifd::calculate_size(entry_count, &header),
    )?;
    let ifd = Ifd::parse(&ifd_bytes, &header)?;

    match read_description_prefix(reader, &ifd, &header)? {
        Some(description) if contains_aperio_marker(&description) => Ok(SlideFormat::AperioSvs),
        _ => Ok(SlideFormat::GenericTiff),
    }
}

fn read_description_prefix<R: RangeReader>(
    reader: &R,
    ifd: &Ifd,
    header: &TiffHeader,
) -> Result<Option<Vec<u8>>, FormatError> {
    let Some(entry) = ifd.get_entry_by_tag(TiffTag::ImageDescription) else {
        return Ok(None);
    };

    let read_len = (entry.count as usize).min(MAX_DESCRIPTION_BYTES);
    if read_len == 0 {
        return Ok(None);
    }

    let bytes = if entry.is_inline {
        entry.value_offset_bytes[..read_len.min(entry.value_offset_bytes.len())].to_vec()
    } else {
        let offset = entry.value_offset(header.byte_order);
        reader.read_exact_at(offset, read_len)?.to_vec()
    };

    Ok(Some(bytes))
}

fn contains_aperio_marker(data: &[u8]) -> bool {
    data.windows(APERIO_MARKER.len())
        .any(|window| window == APERIO_MARKER)
}

/// Quick check for a TIFF or BigTIFF signature.
pub fn is_tiff_header(bytes: &[u8]) -> bool {
    if bytes.len() < TIFF_HEADER_SIZE {
        return false;
    }

    let byte_order = match [bytes[0], bytes[1]] {
        [0x49, 0x49] => ByteOrder::LittleEndian,
        [0x4D, 0x4D] => ByteOrder::BigEndian,
        _ => return false,
    };

    matches!(byte_order.read_u16(&bytes[2..4]), 42 | 43)
}
