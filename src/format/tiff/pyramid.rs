//! TIFF pyramid level identification.
//!
//! A slide file holds several IFDs: the full-resolution image, its reduced
//! copies, and usually a label, a macro photo and a thumbnail. Only tiled
//! IFDs whose size relates to the largest one by a power of two are treated
//! as pyramid levels. Labels, macros and thumbnails are stored as strips in
//! the files we read, so the tiling requirement alone rejects them.

use bytes::Bytes;
use tracing::debug;

use crate::error::TiffError;
use crate::io::RangeReader;

use super::parser::{ByteOrder, Ifd, IfdEntry, TiffHeader, BIGTIFF_HEADER_SIZE};
use super::tags::{Compression, TiffTag};
use super::values::ValueReader;

/// Maximum number of IFDs to follow (guards against offset cycles)
const MAX_IFDS: usize = 100;

/// NewSubfileType bit marking a transparency mask
const SUBFILE_MASK: u32 = 0x4;

/// Accepted relative deviation from the nominal power-of-two downsample
const DOWNSAMPLE_TOLERANCE: f64 = 0.2;

// =============================================================================
// PyramidLevel
// =============================================================================

/// A single level in the image pyramid.
#[derive(Debug, Clone)]
pub struct PyramidLevel {
    /// Index of this level in the pyramid (0 = highest resolution)
    pub level_index: usize,

    /// Index of the IFD in the file's IFD chain
    pub ifd_index: usize,

    pub width: u32,
    pub height: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub tiles_x: u32,
    pub tiles_y: u32,
    pub tile_count: u32,

    /// Nominal downsample factor relative to level 0 (1, 2, 4, ...)
    pub downsample: f64,

    /// Raw compression value (1 = none, 7 = JPEG)
    pub compression: u16,

    pub samples_per_pixel: u32,

    /// The parsed IFD for this level
    pub ifd: Ifd,

    pub tile_offsets_entry: Option<IfdEntry>,
    pub tile_byte_counts_entry: Option<IfdEntry>,
    pub jpeg_tables_entry: Option<IfdEntry>,
}

impl PyramidLevel {
    /// Build a level from a tiled IFD. Returns `None` for strip images.
    fn from_ifd(ifd: Ifd, ifd_index: usize, byte_order: ByteOrder) -> Option<Self> {
        let tile_width = ifd.tile_width(byte_order)?;
        let tile_height = ifd.tile_height(byte_order)?;
        let width = ifd.image_width(byte_order)?;
        let height = ifd.image_height(byte_order)?;

        if tile_width == 0 || tile_height == 0 || width == 0 || height == 0 {
            return None;
        }

        // Missing tag means uncompressed per the TIFF baseline.
        let compression = ifd
            .compression(byte_order)
            .unwrap_or(Compression::None as u16);
        let samples_per_pixel = ifd.samples_per_pixel(byte_order);

        let tiles_x = width.div_ceil(tile_width);
        let tiles_y = height.div_ceil(tile_height);

        let tile_offsets_entry = ifd.get_entry_by_tag(TiffTag::TileOffsets).cloned();
        let tile_byte_counts_entry = ifd.get_entry_by_tag(TiffTag::TileByteCounts).cloned();
        let jpeg_tables_entry = ifd.get_entry_by_tag(TiffTag::JpegTables).cloned();

        Some(PyramidLevel {
            level_index: 0,
            ifd_index,
            width,
            height,
            tile_width,
            tile_height,
            tiles_x,
            tiles_y,
            tile_count: tiles_x.saturating_mul(tiles_y),
            downsample: 1.0,
            compression,
            samples_per_pixel,
            ifd,
            tile_offsets_entry,
            tile_byte_counts_entry,
            jpeg_tables_entry,
        })
    }

    /// Check if this level has tile offset and byte count entries.
    pub fn has_tile_data(&self) -> bool {
        self.tile_offsets_entry.is_some() && self.tile_byte_counts_entry.is_some()
    }

    /// Linear tile index for a tile coordinate, `None` when out of range.
    pub fn tile_index(&self, tile_x: u32, tile_y: u32) -> Option<u32> {
        if tile_x >= self.tiles_x || tile_y >= self.tiles_y {
            return None;
        }
        Some(tile_y * self.tiles_x + tile_x)
    }

    /// Pixel size of the image content of a tile.
    ///
    /// Edge tiles are clipped to the level; their encoded data is still a
    /// full `tile_width` x `tile_height` block.
    pub fn tile_dimensions(&self, tile_x: u32, tile_y: u32) -> Option<(u32, u32)> {
        if tile_x >= self.tiles_x || tile_y >= self.tiles_y {
            return None;
        }
        let w = (self.width - tile_x * self.tile_width).min(self.tile_width);
        let h = (self.height - tile_y * self.tile_height).min(self.tile_height);
        Some((w, h))
    }
}

// =============================================================================
// TiffPyramid
// =============================================================================

/// Pyramid levels of a TIFF file, sorted by resolution (level 0 first).
#[derive(Debug, Clone)]
pub struct TiffPyramid {
    pub header: TiffHeader,
    pub levels: Vec<PyramidLevel>,

    /// IFDs that are not pyramid levels (label, macro, thumbnail, masks)
    pub other_ifds: Vec<(usize, Ifd)>,
}

impl TiffPyramid {
    /// Read the header and IFD chain, then identify the pyramid.
    pub fn parse<R: RangeReader>(reader: &R) -> Result<Self, TiffError> {
        let header_len = (BIGTIFF_HEADER_SIZE as u64).min(reader.size()) as usize;
        let header_bytes = reader.read_exact_at(0, header_len)?;
        let header = TiffHeader::parse(&header_bytes, reader.size())?;

        let ifds = Self::parse_all_ifds(reader, &header)?;
        debug!(
            source = reader.identifier(),
            ifds = ifds.len(),
            "Parsed IFD chain"
        );

        Ok(Self::build_pyramid(header, ifds))
    }

    fn parse_all_ifds<R: RangeReader>(
        reader: &R,
        header: &TiffHeader,
    ) -> Result<Vec<Ifd>, TiffError> {
        let mut ifds = Vec::new();
        let mut offset = header.first_ifd_offset;

        while offset != 0 && ifds.len() < MAX_IFDS {
            if offset >= reader.size() {
                return Err(TiffError::InvalidIfdOffset(offset));
            }

            let count_bytes = reader.read_exact_at(offset, header.ifd_count_size())?;
            let entry_count = if header.is_bigtiff {
                header.byte_order.read_u64(&count_bytes)
            } else {
                header.byte_order.read_u16(&count_bytes) as u64
            };

            let ifd_size = Ifd::calculate_size(entry_count, header);
            let ifd_bytes = reader.read_exact_at(offset, ifd_size)?;
            let ifd = Ifd::parse(&ifd_bytes, header)?;

            offset = ifd.next_ifd_offset;
            ifds.push(ifd);
        }

        Ok(ifds)
    }

    fn build_pyramid(header: TiffHeader, ifds: Vec<Ifd>) -> Self {
        let byte_order = header.byte_order;
        let mut candidates: Vec<PyramidLevel> = Vec::new();
        let mut other_ifds: Vec<(usize, Ifd)> = Vec::new();

        for (ifd_index, ifd) in ifds.into_iter().enumerate() {
            if ifd.subfile_type(byte_order) & SUBFILE_MASK != 0 {
                other_ifds.push((ifd_index, ifd));
                continue;
            }
            match PyramidLevel::from_ifd(ifd.clone(), ifd_index, byte_order) {
                Some(level) if level.has_tile_data() => candidates.push(level),
                _ => other_ifds.push((ifd_index, ifd)),
            }
        }

        // Largest area first; the stable sort keeps file order between equals.
        candidates.sort_by_key(|l| std::cmp::Reverse(l.width as u64 * l.height as u64));

        let levels = Self::filter_pyramid_levels(candidates, &mut other_ifds);

        TiffPyramid {
            header,
            levels,
            other_ifds,
        }
    }

    /// Keep candidates whose size ratio to level 0 is a power of two,
    /// one level per factor.
    fn filter_pyramid_levels(
        candidates: Vec<PyramidLevel>,
        rejected: &mut Vec<(usize, Ifd)>,
    ) -> Vec<PyramidLevel> {
        let Some(base) = candidates.first() else {
            return candidates;
        };
        let base_width = base.width as f64;
        let base_height = base.height as f64;

        let mut levels: Vec<PyramidLevel> = Vec::new();

        for (idx, mut level) in candidates.into_iter().enumerate() {
            let measured =
                (base_width / level.width as f64 + base_height / level.height as f64) / 2.0;

            let nominal = match Self::nominal_downsample(measured, idx) {
                Some(nominal) if levels.iter().all(|l| l.downsample != nominal) => nominal,
                _ => {
                    debug!(
                        ifd = level.ifd_index,
                        width = level.width,
                        height = level.height,
                        "Skipping IFD outside the pyramid"
                    );
                    rejected.push((level.ifd_index, level.ifd));
                    continue;
                }
            };

            level.level_index = levels.len();
            level.downsample = nominal;
            levels.push(level);
        }

        levels
    }

    /// Snap a measured downsample to its power of two, or reject it.
    ///
    /// Level 0 must be ~1; every other level must be at least 2.
    fn nominal_downsample(measured: f64, level_idx: usize) -> Option<f64> {
        if !measured.is_finite() || measured <= 0.0 {
            return None;
        }
        if level_idx == 0 {
            return ((measured - 1.0).abs() < 0.1).then_some(1.0);
        }

        let exponent = measured.log2().round();
        if exponent < 1.0 {
            return None;
        }
        let nominal = 2.0_f64.powf(exponent);
        let ratio = measured / nominal;
        (ratio > 1.0 - DOWNSAMPLE_TOLERANCE && ratio < 1.0 + DOWNSAMPLE_TOLERANCE)
            .then_some(nominal)
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn base_level(&self) -> Option<&PyramidLevel> {
        self.levels.first()
    }
}

// =============================================================================
// Tile Data Loading
// =============================================================================

/// Tile locations and shared tables for one pyramid level.
#[derive(Debug, Clone)]
pub struct TileData {
    pub offsets: Vec<u64>,
    pub byte_counts: Vec<u64>,
    pub jpeg_tables: Option<Bytes>,
}

impl TileData {
    /// Load the TileOffsets/TileByteCounts arrays and JPEGTables of a level.
    pub fn load<R: RangeReader>(
        reader: &R,
        level: &PyramidLevel,
        header: &TiffHeader,
    ) -> Result<Self, TiffError> {
        let values = ValueReader::new(reader, header);

        let offsets_entry = level
            .tile_offsets_entry
            .as_ref()
            .ok_or(TiffError::MissingTag("TileOffsets"))?;
        let counts_entry = level
            .tile_byte_counts_entry
            .as_ref()
            .ok_or(TiffError::MissingTag("TileByteCounts"))?;

        let offsets = values.read_u64_array(offsets_entry)?;
        let byte_counts = values.read_u64_array(counts_entry)?;

        if offsets.len() != byte_counts.len() {
            return Err(TiffError::InvalidTagValue {
                tag: "TileByteCounts",
                message: format!(
                    "{} byte counts for {} tile offsets",
                    byte_counts.len(),
                    offsets.len()
                ),
            });
        }

        let jpeg_tables = match level.jpeg_tables_entry {
            Some(ref entry) => Some(values.read_raw_bytes(entry)?),
            None => None,
        };

        Ok(TileData {
            offsets,
            byte_counts,
            jpeg_tables,
        })
    }

    /// Offset and size of a tile; `None` past the end of the arrays.
    pub fn get_tile_location(&self, tile_index: u32) -> Option<(u64, u64)> {
        let idx = tile_index as usize;
        Some((*self.offsets.get(idx)?, *self.byte_counts.get(idx)?))
    }
}

// =============================================================================
// Tests
// =============================================================================
