//! Region reader for tiled pyramidal TIFF and Aperio SVS slides.
//!
//! Opening a slide parses the IFD chain once, loads every level's tile
//! offset arrays and JPEGTables, and reads the scanned-area offset. Region
//! reads then fetch and decode only the tiles that intersect the request.

use image::RgbaImage;
use tracing::{debug, trace};

use crate::error::{SlideError, TiffError};
use crate::format::tiff::{
    compression_name, Compression, PyramidLevel, TiffPyramid, TiffTag, TileData, ValueReader,
};
use crate::format::{decode_tile, detect_format, SlideFormat, SvsMetadata};
use crate::io::RangeReader;

use super::reader::SlideReader;

/// One pyramid level with its tile locations.
#[derive(Debug, Clone)]
struct LevelData {
    level: PyramidLevel,
    tiles: TileData,
}

/// A TIFF-based slide opened for region reads.
#[derive(Debug)]
pub struct TiffSlide<R: RangeReader> {
    reader: R,
    format: SlideFormat,
    levels: Vec<LevelData>,
    bounds_offset: (f64, f64),
    metadata: SvsMetadata,
}

impl<R: RangeReader> TiffSlide<R> {
    /// Parse the slide structure behind `reader`.
    ///
    /// Fails when the file is not a TIFF, holds no tiled pyramid, or stores
    /// any level with a compression that cannot be decoded.
    pub fn open(reader: R) -> Result<Self, SlideError> {
        let format = detect_format(&reader)?;
        let pyramid = TiffPyramid::parse(&reader)?;

        if pyramid.levels.is_empty() {
            return Err(SlideError::NoLevels(reader.identifier().to_string()));
        }

        let mut levels = Vec::with_capacity(pyramid.level_count());
        for level in &pyramid.levels {
            let supported = Compression::from_u16(level.compression)
                .map(Compression::is_supported)
                .unwrap_or(false);
            if !supported {
                return Err(
                    TiffError::UnsupportedCompression(compression_name(level.compression)).into(),
                );
            }

            let tiles = TileData::load(&reader, level, &pyramid.header)?;
            levels.push(LevelData {
                level: level.clone(),
                tiles,
            });
        }

        let bounds_offset = read_bounds_offset(&reader, &pyramid)?;
        let metadata = match format {
            SlideFormat::AperioSvs => SvsMetadata::read(&reader, &pyramid)?,
            SlideFormat::GenericTiff => SvsMetadata::default(),
        };

        debug!(
            slide = reader.identifier(),
            format = format.name(),
            levels = levels.len(),
            offset_x = bounds_offset.0,
            offset_y = bounds_offset.1,
            "Opened slide"
        );

        Ok(TiffSlide {
            reader,
            format,
            levels,
            bounds_offset,
            metadata,
        })
    }

    pub fn format(&self) -> SlideFormat {
        self.format
    }

    /// Vendor metadata (empty for generic TIFF).
    pub fn metadata(&self) -> &SvsMetadata {
        &self.metadata
    }

    pub fn identifier(&self) -> &str {
        self.reader.identifier()
    }

    fn level_data(&self, level: usize) -> Result<&LevelData, SlideError> {
        self.levels.get(level).ok_or(SlideError::LevelOutOfRange {
            level,
            count: self.levels.len(),
        })
    }

    /// Fetch and decode a tile; `None` for tiles that were never written.
    fn read_tile(
        &self,
        data: &LevelData,
        tile_x: u32,
        tile_y: u32,
    ) -> Result<Option<RgbaImage>, SlideError> {
        let Some(index) = data.level.tile_index(tile_x, tile_y) else {
            return Ok(None);
        };
        let Some((offset, size)) = data.tiles.get_tile_location(index) else {
            return Ok(None);
        };
        if offset == 0 || size == 0 {
            trace!(level = data.level.level_index, tile_x, tile_y, "Sparse tile");
            return Ok(None);
        }

        let raw = self
            .reader
            .read_exact_at(offset, size as usize)
            .map_err(TiffError::from)?;
        let tile = decode_tile(
            &data.level,
            index,
            data.tiles.jpeg_tables.as_deref(),
            &raw,
        )?;
        Ok(Some(tile))
    }
}

/// Scanned-area offset in level-0 pixels.
///
/// XPosition/YPosition are stored in resolution units; multiplying by the
/// pixels-per-unit resolution gives pixels. Any missing tag means no offset.
fn read_bounds_offset<R: RangeReader>(
    reader: &R,
    pyramid: &TiffPyramid,
) -> Result<(f64, f64), TiffError> {
    let Some(base) = pyramid.base_level() else {
        return Ok((0.0, 0.0));
    };
    let values = ValueReader::new(reader, &pyramid.header);

    let axis = |position: TiffTag, resolution: TiffTag| -> Result<f64, TiffError> {
        match (
            base.ifd.get_entry_by_tag(position),
            base.ifd.get_entry_by_tag(resolution),
        ) {
            (Some(position), Some(resolution)) => {
                Ok(values.read_rational(position)? * values.read_rational(resolution)?)
            }
            _ => Ok(0.0),
        }
    };

    Ok((
        axis(TiffTag::XPosition, TiffTag::XResolution)?,
        axis(TiffTag::YPosition, TiffTag::YResolution)?,
    ))
}

impl<R: RangeReader> SlideReader for TiffSlide<R> {
    fn level_count(&self) -> usize {
        self.levels.len()
    }

    fn level_dimensions(&self, level: usize) -> Option<(u32, u32)> {
        self.levels
            .get(level)
            .map(|d| (d.level.width, d.level.height))
    }

    fn level_downsample(&self, level: usize) -> Option<f64> {
        self.levels.get(level).map(|d| d.level.downsample)
    }

    fn tile_size(&self, level: usize) -> Option<(u32, u32)> {
        self.levels
            .get(level)
            .map(|d| (d.level.tile_width, d.level.tile_height))
    }

    fn bounds_offset(&self) -> (f64, f64) {
        self.bounds_offset
    }

    fn read_region(
        &self,
        origin: (i64, i64),
        level: usize,
        size: (u32, u32),
    ) -> Result<RgbaImage, SlideError> {
        let data = self.level_data(level)?;
        let (w, h) = size;

        (w as usize)
            .checked_mul(h as usize)
            .and_then(|n| n.checked_mul(4))
            .filter(|&n| n <= isize::MAX as usize)
            .ok_or(SlideError::RegionTooLarge {
                width: w,
                height: h,
            })?;

        let mut out = RgbaImage::new(w, h);
        if w == 0 || h == 0 {
            return Ok(out);
        }

        // Region in level pixel space.
        let x = (origin.0 as f64 / data.level.downsample).floor() as i64;
        let y = (origin.1 as f64 / data.level.downsample).floor() as i64;
        let x2 = x.saturating_add(i64::from(w));
        let y2 = y.saturating_add(i64::from(h));

        // Clip to the level; everything outside stays transparent.
        let left = x.max(0);
        let top = y.max(0);
        let right = x2.min(data.level.width as i64);
        let bottom = y2.min(data.level.height as i64);
        if left >= right || top >= bottom {
            return Ok(out);
        }

        let tile_w = data.level.tile_width as i64;
        let tile_h = data.level.tile_height as i64;
        let out_stride = w as usize * 4;

        for tile_y in (top / tile_h)..=((bottom - 1) / tile_h) {
            for tile_x in (left / tile_w)..=((right - 1) / tile_w) {
                let Some(tile) = self.read_tile(data, tile_x as u32, tile_y as u32)? else {
                    continue;
                };
                let Some((content_w, content_h)) =
                    data.level.tile_dimensions(tile_x as u32, tile_y as u32)
                else {
                    continue;
                };

                let tile_left = tile_x * tile_w;
                let tile_top = tile_y * tile_h;

                // Intersection of request, level and the tile's image content.
                let ix0 = left.max(tile_left);
                let iy0 = top.max(tile_top);
                let ix1 = right.min(tile_left + content_w as i64);
                let iy1 = bottom.min(tile_top + content_h as i64);
                if ix0 >= ix1 || iy0 >= iy1 {
                    continue;
                }

                let copy_bytes = (ix1 - ix0) as usize * 4;
                let src_stride = tile.width() as usize * 4;
                let src = tile.as_raw();
                let dst: &mut [u8] = &mut out;

                for row in iy0..iy1 {
                    let src_start =
                        (row - tile_top) as usize * src_stride + (ix0 - tile_left) as usize * 4;
                    let dst_start = (row - y) as usize * out_stride + (ix0 - x) as usize * 4;
                    dst[dst_start..dst_start + copy_bytes]
                        .copy_from_slice(&src[src_start..src_start + copy_bytes]);
                }
            }
        }

        Ok(out)
    }
}
