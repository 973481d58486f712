//! TIFF and BigTIFF parsing for pyramidal slides.
//!
//! - **Byte order**: declared in the header (II = little-endian, MM = big-endian).
//! - **Classic TIFF vs BigTIFF**: 32-bit vs 64-bit offsets, handled transparently.
//! - **IFD**: one image per directory; slides chain the pyramid levels with
//!   label, macro and thumbnail images.
//! - **Inline vs offset values**: small values sit in the entry itself, larger
//!   ones at an offset in the file.

mod parser;
mod pyramid;
mod tags;
mod values;

pub use parser::{ByteOrder, Ifd, IfdEntry, TiffHeader, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE};
pub use pyramid::{PyramidLevel, TiffPyramid, TileData};
pub use tags::{compression_name, Compression, FieldType, TiffTag};
pub use values::{parse_u64_array, ValueReader};
