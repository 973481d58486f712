//! PNG output.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage};

use crate::error::ExtractError;

/// Writes patches as 8-bit RGB PNG files with the encoder's default settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngPatchEncoder;

impl PngPatchEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Encode `image` into an in-memory PNG.
    pub fn encode(&self, image: &RgbImage) -> Result<Vec<u8>, String> {
        let mut output = Vec::new();
        self.encode_to(image, &mut output)?;
        Ok(output)
    }

    /// Encode `image` and write it to `path`, replacing any existing file.
    pub fn write(&self, image: &RgbImage, path: &Path) -> Result<(), ExtractError> {
        let encode_error = |message: String| ExtractError::Encode {
            path: path.to_path_buf(),
            message,
        };

        let file = File::create(path).map_err(|e| encode_error(e.to_string()))?;
        let mut writer = BufWriter::new(file);
        self.encode_to(image, &mut writer).map_err(encode_error)?;
        writer.flush().map_err(|e| encode_error(e.to_string()))
    }

    fn encode_to<W: Write>(&self, image: &RgbImage, writer: W) -> Result<(), String> {
        PngEncoder::new(writer)
            .write_image(
                image.as_raw(),
                image.width(),
                image.height(),
                ExtendedColorType::Rgb8,
            )
            .map_err(|e| format!("PNG encoding failed: {}", e))
    }
}
