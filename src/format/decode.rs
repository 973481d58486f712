//! Tile decoding.
//!
//! Turns the stored bytes of one tile into RGBA pixels. Supported tile
//! encodings are uncompressed interleaved 8-bit RGB/RGBA and JPEG (with
//! shared JPEGTables). Decoded tiles are always the full tile size; callers
//! clip edge tiles to the level.

use image::{Rgba, RgbaImage};

use crate::error::TiffError;

use super::jpeg::{decode_jpeg, prepare_tile_jpeg};
use super::tiff::{compression_name, Compression, PyramidLevel};

/// Decode one tile of `level`.
pub fn decode_tile(
    level: &PyramidLevel,
    tile_index: u32,
    jpeg_tables: Option<&[u8]>,
    raw: &[u8],
) -> Result<RgbaImage, TiffError> {
    let decode_error = |message: String| TiffError::TileDecode {
        level: level.level_index,
        tile_index,
        message,
    };

    match Compression::from_u16(level.compression) {
        Some(Compression::None) => decode_uncompressed(level, raw).map_err(decode_error),
        Some(Compression::Jpeg) => {
            let stream = prepare_tile_jpeg(jpeg_tables, raw);
            let rgb = decode_jpeg(&stream).map_err(decode_error)?;
            if rgb.dimensions() != (level.tile_width, level.tile_height) {
                return Err(decode_error(format!(
                    "decoded {}x{} pixels, expected {}x{}",
                    rgb.width(),
                    rgb.height(),
                    level.tile_width,
                    level.tile_height
                )));
            }
            Ok(RgbaImage::from_fn(rgb.width(), rgb.height(), |x, y| {
                let [r, g, b] = rgb.get_pixel(x, y).0;
                Rgba([r, g, b, u8::MAX])
            }))
        }
        _ => Err(TiffError::UnsupportedCompression(compression_name(
            level.compression,
        ))),
    }
}

fn decode_uncompressed(level: &PyramidLevel, raw: &[u8]) -> Result<RgbaImage, String> {
    let samples = level.samples_per_pixel as usize;
    if samples != 3 && samples != 4 {
        return Err(format!(
            "{} samples per pixel, expected 3 (RGB) or 4 (RGBA)",
            samples
        ));
    }

    let pixels = level.tile_width as usize * level.tile_height as usize;
    let expected = pixels * samples;
    if raw.len() < expected {
        return Err(format!(
            "tile holds {} bytes, expected {}",
            raw.len(),
            expected
        ));
    }

    let mut rgba = Vec::with_capacity(pixels * 4);
    for px in raw[..expected].chunks_exact(samples) {
        rgba.extend_from_slice(&px[..3]);
        rgba.push(if samples == 4 { px[3] } else { u8::MAX });
    }

    RgbaImage::from_raw(level.tile_width, level.tile_height, rgba)
        .ok_or_else(|| "tile buffer size mismatch".to_string())
}
