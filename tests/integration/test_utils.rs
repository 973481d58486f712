//! Test utilities for integration tests.
//!
//! This module provides a builder for small tiled pyramidal TIFF files, an
//! in-memory slide with the same region semantics as the TIFF reader, and
//! helpers for writing coordinate files.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage, Rgba, RgbaImage};

use wsi_patches::error::{FormatError, IoError, SlideError};
use wsi_patches::slide::{SlideReader, SlideSource};

// =============================================================================
// Pixel Patterns
// =============================================================================

/// Deterministic pixel for level `level` at level coordinates `(x, y)`.
pub fn pattern_pixel(level: usize, x: u32, y: u32) -> [u8; 3] {
    [(x % 256) as u8, (y % 256) as u8, (level as u8).wrapping_mul(60)]
}

/// A full level filled with [`pattern_pixel`].
pub fn pattern_level(level: usize, width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        let [r, g, b] = pattern_pixel(level, x, y);
        Rgba([r, g, b, 255])
    })
}

// =============================================================================
// TIFF Builder
// =============================================================================

/// How tiles are stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TileEncoding {
    /// Uncompressed 8-bit RGB
    Rgb,
    /// Uncompressed 8-bit RGBA
    Rgba,
    /// Baseline JPEG, one complete stream per tile
    Jpeg,
    /// Compression tag set to JPEG 2000; tiles hold garbage
    Jpeg2000,
}

/// One pyramid level of a test TIFF.
pub struct LevelSpec {
    pub pixels: RgbaImage,
    pub tile_width: u32,
    pub tile_height: u32,
    pub encoding: TileEncoding,
    /// Tile indices written with offset and byte count 0.
    pub sparse_tiles: Vec<usize>,
}

impl LevelSpec {
    pub fn new(pixels: RgbaImage, tile_size: u32, encoding: TileEncoding) -> Self {
        Self {
            pixels,
            tile_width: tile_size,
            tile_height: tile_size,
            encoding,
            sparse_tiles: Vec::new(),
        }
    }

    pub fn with_sparse_tile(mut self, index: usize) -> Self {
        self.sparse_tiles.push(index);
        self
    }

    fn tiles_across(&self) -> u32 {
        self.pixels.width().div_ceil(self.tile_width)
    }

    fn tiles_down(&self) -> u32 {
        self.pixels.height().div_ceil(self.tile_height)
    }

    /// Full-size tile image; pixels past the level edge are black.
    fn tile_image(&self, tile_x: u32, tile_y: u32) -> RgbaImage {
        RgbaImage::from_fn(self.tile_width, self.tile_height, |x, y| {
            let px = tile_x * self.tile_width + x;
            let py = tile_y * self.tile_height + y;
            if px < self.pixels.width() && py < self.pixels.height() {
                *self.pixels.get_pixel(px, py)
            } else {
                Rgba([0, 0, 0, 255])
            }
        })
    }

    fn encode_tiles(&self) -> Vec<Vec<u8>> {
        let mut tiles = Vec::new();
        for tile_y in 0..self.tiles_down() {
            for tile_x in 0..self.tiles_across() {
                let index = tiles.len();
                if self.sparse_tiles.contains(&index) {
                    tiles.push(Vec::new());
                    continue;
                }
                let tile = self.tile_image(tile_x, tile_y);
                tiles.push(match self.encoding {
                    TileEncoding::Rgba => tile.into_raw(),
                    TileEncoding::Rgb => tile
                        .into_raw()
                        .chunks_exact(4)
                        .flat_map(|px| px[..3].to_vec())
                        .collect(),
                    TileEncoding::Jpeg => encode_jpeg(&tile),
                    TileEncoding::Jpeg2000 => vec![0xAB; 64],
                });
            }
        }
        tiles
    }

    fn compression(&self) -> u16 {
        match self.encoding {
            TileEncoding::Rgb | TileEncoding::Rgba => 1,
            TileEncoding::Jpeg => 7,
            TileEncoding::Jpeg2000 => 33005,
        }
    }

    fn samples_per_pixel(&self) -> u16 {
        match self.encoding {
            TileEncoding::Rgba => 4,
            _ => 3,
        }
    }
}

fn encode_jpeg(tile: &RgbaImage) -> Vec<u8> {
    let rgb = RgbImage::from_fn(tile.width(), tile.height(), |x, y| {
        let [r, g, b, _] = tile.get_pixel(x, y).0;
        Rgb([r, g, b])
    });
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, 95);
    encoder.encode_image(&rgb).unwrap();
    buf
}

/// One IFD entry with its little-endian value bytes.
struct Entry {
    tag: u16,
    field_type: u16,
    count: u32,
    payload: Vec<u8>,
}

impl Entry {
    fn short(tag: u16, value: u16) -> Self {
        Self {
            tag,
            field_type: 3,
            count: 1,
            payload: value.to_le_bytes().to_vec(),
        }
    }

    fn long(tag: u16, value: u32) -> Self {
        Self::longs(tag, &[value])
    }

    fn longs(tag: u16, values: &[u32]) -> Self {
        Self {
            tag,
            field_type: 4,
            count: values.len() as u32,
            payload: values.iter().flat_map(|v| v.to_le_bytes()).collect(),
        }
    }

    fn rational(tag: u16, numerator: u32, denominator: u32) -> Self {
        let mut payload = numerator.to_le_bytes().to_vec();
        payload.extend_from_slice(&denominator.to_le_bytes());
        Self {
            tag,
            field_type: 5,
            count: 1,
            payload,
        }
    }

    fn ascii(tag: u16, text: &str) -> Self {
        let mut payload = text.as_bytes().to_vec();
        payload.push(0);
        Self {
            tag,
            field_type: 2,
            count: payload.len() as u32,
            payload,
        }
    }
}

/// Builder for little-endian tiled pyramidal TIFF files.
#[derive(Default)]
pub struct SlideTiffBuilder {
    levels: Vec<LevelSpec>,
    description: Option<String>,
    /// (XPosition, YPosition) as rationals, plus pixels per unit
    position: Option<((u32, u32), (u32, u32), u32)>,
}

impl SlideTiffBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(mut self, level: LevelSpec) -> Self {
        self.levels.push(level);
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Store a scanned-area position of `x`/`y` resolution units at
    /// `pixels_per_unit`; positions are `(numerator, denominator)`.
    pub fn position(mut self, x: (u32, u32), y: (u32, u32), pixels_per_unit: u32) -> Self {
        self.position = Some((x, y, pixels_per_unit));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = vec![b'I', b'I', 42, 0, 8, 0, 0, 0];

        for (index, level) in self.levels.iter().enumerate() {
            let ifd_start = out.len();
            let tiles = level.encode_tiles();

            let mut entries = vec![
                Entry::long(256, level.pixels.width()),
                Entry::long(257, level.pixels.height()),
                Entry::short(258, 8),
                Entry::short(259, level.compression()),
                Entry::short(262, if level.encoding == TileEncoding::Jpeg { 6 } else { 2 }),
                Entry::short(277, level.samples_per_pixel()),
                Entry::long(322, level.tile_width),
                Entry::long(323, level.tile_height),
                Entry::longs(324, &vec![0; tiles.len()]),
                Entry::longs(
                    325,
                    &tiles.iter().map(|t| t.len() as u32).collect::<Vec<_>>(),
                ),
            ];
            if level.encoding == TileEncoding::Rgba {
                entries.push(Entry::short(338, 2));
            }
            if index == 0 {
                if let Some(text) = &self.description {
                    entries.push(Entry::ascii(270, text));
                }
                if let Some((x, y, resolution)) = self.position {
                    entries.push(Entry::rational(282, resolution, 1));
                    entries.push(Entry::rational(283, resolution, 1));
                    entries.push(Entry::rational(286, x.0, x.1));
                    entries.push(Entry::rational(287, y.0, y.1));
                }
            }
            entries.sort_by_key(|e| e.tag);

            // Values that do not fit inline follow the IFD, then the tiles.
            let ifd_size = 2 + 12 * entries.len() + 4;
            let mut cursor = ifd_start + ifd_size;
            let mut external = vec![None; entries.len()];
            for (k, entry) in entries.iter().enumerate() {
                if entry.payload.len() > 4 {
                    external[k] = Some(cursor as u32);
                    cursor += entry.payload.len();
                }
            }

            let mut offsets = Vec::with_capacity(tiles.len());
            for tile in &tiles {
                if tile.is_empty() {
                    offsets.push(0);
                } else {
                    offsets.push(cursor as u32);
                    cursor += tile.len();
                }
            }
            if let Some(entry) = entries.iter_mut().find(|e| e.tag == 324) {
                entry.payload = offsets.iter().flat_map(|v| v.to_le_bytes()).collect();
            }

            let next_ifd = if index + 1 < self.levels.len() {
                cursor as u32
            } else {
                0
            };

            out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
            for (k, entry) in entries.iter().enumerate() {
                out.extend_from_slice(&entry.tag.to_le_bytes());
                out.extend_from_slice(&entry.field_type.to_le_bytes());
                out.extend_from_slice(&entry.count.to_le_bytes());
                match external[k] {
                    Some(offset) => out.extend_from_slice(&offset.to_le_bytes()),
                    None => {
                        let mut inline = entry.payload.clone();
                        inline.resize(4, 0);
                        out.extend_from_slice(&inline);
                    }
                }
            }
            out.extend_from_slice(&next_ifd.to_le_bytes());

            for (k, entry) in entries.iter().enumerate() {
                if external[k].is_some() {
                    out.extend_from_slice(&entry.payload);
                }
            }
            for tile in &tiles {
                out.extend_from_slice(tile);
            }
            assert_eq!(out.len(), cursor);
        }

        out
    }

    pub fn write_to(&self, path: &Path) {
        std::fs::write(path, self.build()).unwrap();
    }
}

/// Three-level uncompressed pyramid with downsamples 1, 4 and 16.
///
/// Level 0 is 512x512 in 64px tiles.
pub fn three_level_tiff() -> SlideTiffBuilder {
    SlideTiffBuilder::new()
        .level(LevelSpec::new(pattern_level(0, 512, 512), 64, TileEncoding::Rgb))
        .level(LevelSpec::new(pattern_level(1, 128, 128), 64, TileEncoding::Rgb))
        .level(LevelSpec::new(pattern_level(2, 32, 32), 16, TileEncoding::Rgb))
}

// =============================================================================
// Mock Slide
// =============================================================================

/// An in-memory slide.
///
/// Region reads follow the TIFF reader: origin in level-0 pixels divided by
/// the downsample and floored, size in level pixels, alpha 0 outside.
#[derive(Clone, Debug)]
pub struct MockSlide {
    levels: Vec<(RgbaImage, f64)>,
    bounds_offset: (f64, f64),
}

impl MockSlide {
    pub fn new() -> Self {
        Self {
            levels: Vec::new(),
            bounds_offset: (0.0, 0.0),
        }
    }

    pub fn with_level(mut self, pixels: RgbaImage, downsample: f64) -> Self {
        self.levels.push((pixels, downsample));
        self
    }

    pub fn with_bounds_offset(mut self, x: f64, y: f64) -> Self {
        self.bounds_offset = (x, y);
        self
    }

    /// Levels of size `width/d x height/d` for each downsample `d`, filled
    /// with [`pattern_pixel`].
    pub fn patterned(width: u32, height: u32, downsamples: &[f64]) -> Self {
        downsamples
            .iter()
            .enumerate()
            .fold(Self::new(), |slide, (index, &d)| {
                let w = (width as f64 / d) as u32;
                let h = (height as f64 / d) as u32;
                slide.with_level(pattern_level(index, w, h), d)
            })
    }
}

impl Default for MockSlide {
    fn default() -> Self {
        Self::new()
    }
}

impl SlideReader for MockSlide {
    fn level_count(&self) -> usize {
        self.levels.len()
    }

    fn level_dimensions(&self, level: usize) -> Option<(u32, u32)> {
        self.levels.get(level).map(|(img, _)| img.dimensions())
    }

    fn level_downsample(&self, level: usize) -> Option<f64> {
        self.levels.get(level).map(|(_, d)| *d)
    }

    fn tile_size(&self, level: usize) -> Option<(u32, u32)> {
        self.levels.get(level).map(|_| (256, 256))
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
        let (pixels, downsample) = self.levels.get(level).ok_or(SlideError::LevelOutOfRange {
            level,
            count: self.levels.len(),
        })?;
        let x0 = (origin.0 as f64 / downsample).floor() as i64;
        let y0 = (origin.1 as f64 / downsample).floor() as i64;

        Ok(RgbaImage::from_fn(size.0, size.1, |x, y| {
            let px = x0 + x as i64;
            let py = y0 + y as i64;
            if px >= 0 && py >= 0 && (px as u32) < pixels.width() && (py as u32) < pixels.height()
            {
                *pixels.get_pixel(px as u32, py as u32)
            } else {
                Rgba([0, 0, 0, 0])
            }
        }))
    }
}

/// Serves [`MockSlide`]s by path.
#[derive(Clone, Debug, Default)]
pub struct MockSlideSource {
    slides: HashMap<PathBuf, MockSlide>,
}

impl MockSlideSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_slide(mut self, path: impl Into<PathBuf>, slide: MockSlide) -> Self {
        self.slides.insert(path.into(), slide);
        self
    }
}

impl SlideSource for MockSlideSource {
    type Slide = MockSlide;

    fn open(&self, path: &Path) -> Result<MockSlide, SlideError> {
        self.slides
            .get(path)
            .cloned()
            .ok_or_else(|| FormatError::Io(IoError::NotFound(path.display().to_string())).into())
    }
}

// =============================================================================
// Coordinate Files
// =============================================================================

pub const SPOT_HEADER: &str =
    "Image;Core Unique ID;Centroid X (pixels);Centroid Y (pixels);Radius (pixels)";

/// Write a spot CSV with `(id, cx, cy, r)` rows.
pub fn write_spot_csv(path: &Path, rows: &[(&str, f64, f64, f64)]) {
    let mut text = format!("{}\n", SPOT_HEADER);
    for (id, cx, cy, r) in rows {
        text.push_str(&format!("slide;{};{};{};{}\n", id, cx, cy, r));
    }
    std::fs::write(path, text).unwrap();
}

/// An ASAP annotation.
pub enum Annotation<'a> {
    Rect {
        group: &'a str,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    Dot {
        group: &'a str,
        x: f64,
        y: f64,
    },
}

/// Write an ASAP annotation file.
pub fn write_asap_xml(path: &Path, annotations: &[Annotation<'_>]) {
    let mut xml = String::from("<?xml version=\"1.0\"?>\n<ASAP_Annotations>\n  <Annotations>\n");
    for (i, annotation) in annotations.iter().enumerate() {
        let (kind, group, points) = match *annotation {
            Annotation::Rect {
                group,
                x,
                y,
                width,
                height,
            } => (
                "Rectangle",
                group,
                vec![
                    (x, y),
                    (x + width, y),
                    (x + width, y + height),
                    (x, y + height),
                ],
            ),
            Annotation::Dot { group, x, y } => ("Dot", group, vec![(x, y)]),
        };
        xml.push_str(&format!(
            "    <Annotation Name=\"Annotation {}\" Type=\"{}\" PartOfGroup=\"{}\" Color=\"#F4FA58\">\n      <Coordinates>\n",
            i, kind, group
        ));
        for (order, (x, y)) in points.iter().enumerate() {
            xml.push_str(&format!(
                "        <Coordinate Order=\"{}\" X=\"{}\" Y=\"{}\" />\n",
                order, x, y
            ));
        }
        xml.push_str("      </Coordinates>\n    </Annotation>\n");
    }
    xml.push_str("  </Annotations>\n</ASAP_Annotations>\n");
    std::fs::write(path, xml).unwrap();
}

/// Decode a written PNG.
pub fn read_png(path: &Path) -> RgbImage {
    image::open(path).unwrap().to_rgb8()
}
