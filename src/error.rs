use std::path::PathBuf;

use thiserror::Error;

/// I/O errors that can occur when reading slide bytes
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// File does not exist or cannot be opened
    #[error("File not found: {0}")]
    NotFound(String),

    /// Underlying read failed
    #[error("Read error on {path}: {message}")]
    Read { path: String, message: String },

    /// Requested range exceeds resource bounds
    #[error("Range out of bounds: requested {requested} bytes at offset {offset}, size is {size}")]
    RangeOutOfBounds {
        offset: u64,
        requested: u64,
        size: u64,
    },
}

/// Errors related to format detection and validation
#[derive(Debug, Clone, Error)]
pub enum FormatError {
    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// TIFF parsing error
    #[error("TIFF error: {0}")]
    Tiff(#[from] TiffError),

    /// File format is not supported
    #[error("Unsupported format: {reason}")]
    UnsupportedFormat { reason: String },
}

/// Errors that can occur when parsing TIFF files
#[derive(Debug, Clone, Error)]
pub enum TiffError {
    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Invalid TIFF magic bytes (not II or MM)
    #[error("Invalid TIFF magic bytes: expected 0x4949 (II) or 0x4D4D (MM), got 0x{0:04X}")]
    InvalidMagic(u16),

    /// Invalid TIFF version number
    #[error("Invalid TIFF version: expected 42 (TIFF) or 43 (BigTIFF), got {0}")]
    InvalidVersion(u16),

    /// Invalid BigTIFF offset byte size (must be 8)
    #[error("Invalid BigTIFF offset byte size: expected 8, got {0}")]
    InvalidBigTiffOffsetSize(u16),

    /// File is too small to contain a valid TIFF header
    #[error("File too small: need at least {required} bytes, got {actual}")]
    FileTooSmall { required: u64, actual: u64 },

    /// Invalid IFD offset (points outside file or to invalid location)
    #[error("Invalid IFD offset: {0}")]
    InvalidIfdOffset(u64),

    /// Required tag is missing from IFD
    #[error("Missing required tag: {0}")]
    MissingTag(&'static str),

    /// Tag has unexpected type or count
    #[error("Invalid tag value for {tag}: {message}")]
    InvalidTagValue { tag: &'static str, message: String },

    /// Unsupported compression scheme
    #[error("Unsupported compression: {0} (only uncompressed and JPEG tiles are supported)")]
    UnsupportedCompression(String),

    /// Unknown field type in IFD entry
    #[error("Unknown field type: {0}")]
    UnknownFieldType(u16),

    /// Tile bytes could not be turned into pixels
    #[error("Failed to decode tile {tile_index} of level {level}: {message}")]
    TileDecode {
        level: usize,
        tile_index: u32,
        message: String,
    },
}

/// Errors raised by a slide decoder
#[derive(Debug, Clone, Error)]
pub enum SlideError {
    /// Slide could not be opened or identified
    #[error("{0}")]
    Format(#[from] FormatError),

    /// Failure while reading pyramid data
    #[error("{0}")]
    Tiff(#[from] TiffError),

    /// The slide has no usable pyramid level
    #[error("No pyramid levels found in {0}")]
    NoLevels(String),

    /// Level index beyond the pyramid
    #[error("Level {level} out of range (slide has {count} levels)")]
    LevelOutOfRange { level: usize, count: usize },

    /// Region buffer would not fit in memory
    #[error("Region {width}x{height} is too large to allocate")]
    RegionTooLarge { width: u32, height: u32 },
}

/// Errors raised while reading coordinate sources
#[derive(Debug, Clone, Error)]
pub enum CoordinateError {
    /// Coordinate file could not be read
    #[error("Cannot read coordinate file {}: {message}", .path.display())]
    Unreadable { path: PathBuf, message: String },

    /// CSV structure error
    #[error("CSV error: {0}")]
    Csv(String),

    /// A required column is missing from the CSV header
    #[error("Missing required column '{0}'")]
    MissingColumn(&'static str),

    /// A numeric field could not be parsed
    #[error("Invalid value '{value}' in column '{column}' (record {record})")]
    InvalidValue {
        column: &'static str,
        record: usize,
        value: String,
    },

    /// XML structure or attribute error
    #[error("XML error: {0}")]
    Xml(String),

    /// A coordinate-driven provider was given no file
    #[error("No coordinate file given for {0} coordinates")]
    MissingSource(&'static str),
}

impl From<csv::Error> for CoordinateError {
    fn from(err: csv::Error) -> Self {
        CoordinateError::Csv(err.to_string())
    }
}

impl From<quick_xml::Error> for CoordinateError {
    fn from(err: quick_xml::Error) -> Self {
        CoordinateError::Xml(err.to_string())
    }
}

/// Errors raised while computing or reading a crop
#[derive(Debug, Clone, Error)]
pub enum CropError {
    /// The geometry reaches outside the resolved level
    #[error(
        "Geometry corner ({x}, {y}) exceeds level {level} dimensions {level_width}x{level_height}"
    )]
    OutOfBounds {
        x: f64,
        y: f64,
        level: usize,
        level_width: u32,
        level_height: u32,
    },

    /// The geometry is not a four-corner quadrilateral
    #[error("Cannot crop a geometry with {points} point(s); four corners are required")]
    UnsupportedGeometry { points: usize },

    /// The crop has no area
    #[error("Crop region {width}x{height} is empty")]
    EmptyRegion { width: i64, height: i64 },

    /// Decoder failure
    #[error("{0}")]
    Slide(#[from] SlideError),
}

/// Errors raised while pairing slides with coordinate files
#[derive(Debug, Clone, Error)]
pub enum MatchError {
    /// An input path does not exist
    #[error("Input path does not exist: {}", .0.display())]
    MissingInput(PathBuf),

    /// A directory could not be listed
    #[error("Cannot list directory {}: {message}", .path.display())]
    Unlistable { path: PathBuf, message: String },

    /// One input is a file and the other a directory
    #[error("{} and {} must both be files or both be directories", .slides.display(), .coordinates.display())]
    MixedInputs { slides: PathBuf, coordinates: PathBuf },

    /// The mapping table could not be read
    #[error("Mapping table {}: {message}", .path.display())]
    MappingTable { path: PathBuf, message: String },
}

/// Errors that end the processing of one slide/coordinate pairing
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// Slide or coordinate path does not exist
    #[error("Input path does not exist: {}", .0.display())]
    MissingInput(PathBuf),

    /// Slide could not be opened or read
    #[error("Slide error: {0}")]
    Slide(#[from] SlideError),

    /// Coordinate source could not be parsed
    #[error("Coordinate error: {0}")]
    Coordinates(#[from] CoordinateError),

    /// Fatal crop failure
    #[error("Crop error: {0}")]
    Crop(#[from] CropError),

    /// PNG encoding or writing failed
    #[error("Failed to write {}: {message}", .path.display())]
    Encode { path: PathBuf, message: String },
}
