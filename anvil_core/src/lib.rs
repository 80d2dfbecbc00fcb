pub mod codec;
pub mod error;
pub mod format;
pub mod nbt;
pub mod reader;
pub mod source;
pub mod tag;

pub use codec::DecompressedSource;
pub use error::{DecodeError, Result};
pub use format::{
    CompressionScheme, LocationEntry, RecordHeader, RegionHeader, HEADER_SIZE, SECTOR_SIZE,
};
pub use nbt::{TagReader, DEFAULT_MAX_DEPTH};
pub use reader::{decode_cell, CellResult, DecodeOptions, RegionReader};
pub use source::{ByteSource, SliceSource};
pub use tag::{Compound, List, NbtString, Tag, TagKind};
