//! JPEG tile streams.
//!
//! Aperio SVS tiles are "abbreviated" JPEG streams: the quantization (DQT)
//! and Huffman (DHT) tables are stored once in the `JPEGTables` tag instead
//! of in every tile. Before decoding, the tables are spliced in:
//!
//! ```text
//! tables: SOI DQT DHT ... EOI
//! tile:   SOI SOF SOS <scan> EOI
//! merged: SOI DQT DHT ... SOF SOS <scan> EOI
//! ```

use std::io::Cursor;

use bytes::{Bytes, BytesMut};
use image::{ImageFormat, ImageReader, RgbImage};

pub const SOI: [u8; 2] = [0xFF, 0xD8];
pub const EOI: [u8; 2] = [0xFF, 0xD9];
pub const DHT: [u8; 2] = [0xFF, 0xC4];
pub const DQT: [u8; 2] = [0xFF, 0xDB];
pub const SOS: [u8; 2] = [0xFF, 0xDA];

/// Whether a stream reaches its scan without defining any tables.
pub fn is_abbreviated_stream(data: &[u8]) -> bool {
    if data.len() < 4 || data[0..2] != SOI {
        return false;
    }

    let mut pos = 2;
    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }

        let marker = [data[pos], data[pos + 1]];
        if marker == DQT || marker == DHT {
            return false;
        }
        if marker == SOS {
            return true;
        }

        // Skip the segment body using its big-endian length.
        let has_length = !matches!(marker[1], 0x00 | 0x01 | 0xD0..=0xD9);
        if has_length && pos + 3 < data.len() {
            let length = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
            pos += 2 + length;
        } else {
            pos += 2;
        }
    }

    false
}

/// Whether a stream carries its own quantization tables.
pub fn is_complete_stream(data: &[u8]) -> bool {
    data.len() >= 4 && data[0..2] == SOI && data[2..].windows(2).any(|w| w == DQT)
}

/// Splice shared tables in front of an abbreviated tile stream.
pub fn merge_jpeg_tables(tables: &[u8], tile_data: &[u8]) -> Bytes {
    if tables.is_empty() {
        return Bytes::copy_from_slice(tile_data);
    }
    if tile_data.is_empty() {
        return Bytes::new();
    }

    let tables = tables.strip_suffix(&EOI).unwrap_or(tables);
    let tile = tile_data.strip_prefix(&SOI).unwrap_or(tile_data);

    let mut merged = BytesMut::with_capacity(tables.len() + tile.len());
    merged.extend_from_slice(tables);
    merged.extend_from_slice(tile);
    merged.freeze()
}

/// Produce a decodable stream from raw tile bytes, merging tables when the
/// tile needs them.
pub fn prepare_tile_jpeg(tables: Option<&[u8]>, tile_data: &[u8]) -> Bytes {
    match tables {
        Some(tables) if !is_complete_stream(tile_data) && is_abbreviated_stream(tile_data) => {
            merge_jpeg_tables(tables, tile_data)
        }
        _ => Bytes::copy_from_slice(tile_data),
    }
}

/// Decode a complete JPEG stream to 8-bit RGB.
pub fn decode_jpeg(data: &[u8]) -> Result<RgbImage, String> {
    let reader = ImageReader::with_format(Cursor::new(data), ImageFormat::Jpeg);
    let image = reader.decode().map_err(|e| e.to_string())?;
    Ok(image.into_rgb8())
}
