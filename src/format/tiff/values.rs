//! TIFF tag value reading.
//!
//! Values live either inline in the IFD entry or at an offset in the file.
//! Arrays such as TileOffsets are fetched with a single range read.

use bytes::Bytes;

use crate::error::TiffError;
use crate::io::RangeReader;

use super::parser::{ByteOrder, IfdEntry, TiffHeader};
use super::tags::FieldType;

/// Reads tag values through a [`RangeReader`], honoring the file's byte order.
pub struct ValueReader<'a, R: RangeReader> {
    reader: &'a R,
    header: &'a TiffHeader,
}

impl<'a, R: RangeReader> ValueReader<'a, R> {
    pub fn new(reader: &'a R, header: &'a TiffHeader) -> Self {
        Self { reader, header }
    }

    #[inline]
    pub fn byte_order(&self) -> ByteOrder {
        self.header.byte_order
    }

    /// Raw bytes of an entry's value, inline or fetched from its offset.
    pub fn read_bytes(&self, entry: &IfdEntry) -> Result<Bytes, TiffError> {
        let size = entry
            .value_byte_size()
            .ok_or(TiffError::UnknownFieldType(entry.field_type_raw))?;

        if entry.is_inline {
            Ok(Bytes::copy_from_slice(
                &entry.value_offset_bytes[..size as usize],
            ))
        } else {
            let offset = entry.value_offset(self.header.byte_order);
            Ok(self.reader.read_exact_at(offset, size as usize)?)
        }
    }

    /// Read a single integer value (Short, Long or Long8).
    pub fn read_u64(&self, entry: &IfdEntry) -> Result<u64, TiffError> {
        if let Some(value) = entry.inline_u64(self.header.byte_order) {
            return Ok(value);
        }
        if entry.count != 1 {
            return Err(TiffError::InvalidTagValue {
                tag: tag_name(entry),
                message: format!("expected count 1, got {}", entry.count),
            });
        }
        self.read_u64_array(entry)?
            .first()
            .copied()
            .ok_or(TiffError::InvalidTagValue {
                tag: tag_name(entry),
                message: "empty value".to_string(),
            })
    }

    /// Read a single u32 value, rejecting anything that does not fit.
    pub fn read_u32(&self, entry: &IfdEntry) -> Result<u32, TiffError> {
        let value = self.read_u64(entry)?;
        u32::try_from(value).map_err(|_| TiffError::InvalidTagValue {
            tag: tag_name(entry),
            message: format!("value {} does not fit in 32 bits", value),
        })
    }

    /// Read an integer array; TileOffsets and TileByteCounts go through here.
    pub fn read_u64_array(&self, entry: &IfdEntry) -> Result<Vec<u64>, TiffError> {
        let field_type = entry
            .field_type
            .ok_or(TiffError::UnknownFieldType(entry.field_type_raw))?;

        if !matches!(
            field_type,
            FieldType::Short | FieldType::Long | FieldType::Long8
        ) {
            return Err(TiffError::InvalidTagValue {
                tag: tag_name(entry),
                message: format!("expected Short, Long, or Long8, got {:?}", field_type),
            });
        }
        if entry.count == 0 {
            return Ok(Vec::new());
        }

        let bytes = self.read_bytes(entry)?;
        Ok(parse_u64_array(
            &bytes,
            entry.count as usize,
            field_type,
            self.header.byte_order,
        ))
    }

    /// Read a single Rational as `numerator / denominator`.
    ///
    /// A zero denominator yields 0.0 rather than an infinite value.
    pub fn read_rational(&self, entry: &IfdEntry) -> Result<f64, TiffError> {
        match entry.field_type {
            Some(FieldType::Rational) => {}
            Some(FieldType::Short | FieldType::Long | FieldType::Long8) => {
                return Ok(self.read_u64(entry)? as f64);
            }
            Some(other) => {
                return Err(TiffError::InvalidTagValue {
                    tag: tag_name(entry),
                    message: format!("expected Rational, got {:?}", other),
                })
            }
            None => return Err(TiffError::UnknownFieldType(entry.field_type_raw)),
        }

        let bytes = self.read_bytes(entry)?;
        if bytes.len() < 8 {
            return Err(TiffError::InvalidTagValue {
                tag: tag_name(entry),
                message: "rational value is truncated".to_string(),
            });
        }
        let order = self.header.byte_order;
        let numerator = order.read_u32(&bytes[0..4]) as f64;
        let denominator = order.read_u32(&bytes[4..8]) as f64;

        if denominator == 0.0 {
            Ok(0.0)
        } else {
            Ok(numerator / denominator)
        }
    }

    /// Read an ASCII value, stopping at the first NUL.
    pub fn read_string(&self, entry: &IfdEntry) -> Result<String, TiffError> {
        if entry.field_type != Some(FieldType::Ascii) {
            return Err(TiffError::InvalidTagValue {
                tag: tag_name(entry),
                message: format!("expected Ascii, got {:?}", entry.field_type),
            });
        }

        let bytes = self.read_bytes(entry)?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }

    /// Read opaque bytes such as JPEGTables.
    pub fn read_raw_bytes(&self, entry: &IfdEntry) -> Result<Bytes, TiffError> {
        self.read_bytes(entry)
    }
}

fn tag_name(entry: &IfdEntry) -> &'static str {
    use super::tags::TiffTag;

    match entry.tag() {
        Some(TiffTag::TileOffsets) => "TileOffsets",
        Some(TiffTag::TileByteCounts) => "TileByteCounts",
        Some(TiffTag::XResolution) => "XResolution",
        Some(TiffTag::YResolution) => "YResolution",
        Some(TiffTag::XPosition) => "XPosition",
        Some(TiffTag::YPosition) => "YPosition",
        Some(TiffTag::ImageDescription) => "ImageDescription",
        Some(TiffTag::JpegTables) => "JPEGTables",
        _ => "unknown",
    }
}

/// Parse an integer array from raw bytes, ignoring a truncated tail.
pub fn parse_u64_array(
    bytes: &[u8],
    count: usize,
    field_type: FieldType,
    byte_order: ByteOrder,
) -> Vec<u64> {
    let width = match field_type {
        FieldType::Short => 2,
        FieldType::Long => 4,
        FieldType::Long8 => 8,
        _ => return Vec::new(),
    };

    bytes
        .chunks_exact(width)
        .take(count)
        .map(|chunk| match width {
            2 => byte_order.read_u16(chunk) as u64,
            4 => byte_order.read_u32(chunk) as u64,
            _ => byte_order.read_u64(chunk),
        })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
