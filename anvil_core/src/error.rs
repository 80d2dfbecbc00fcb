/// Errors raised while decoding a region file or one of its cells.
///
/// Everything except [`DecodeError::HeaderTooShort`] and
/// [`DecodeError::CellOutOfRange`] is cell-level: it ends
/// the decode of one cell, is recorded as that cell's result, and the rest of
/// the region keeps decoding.
///
/// ```text
///   DecodeError
///   ├── HeaderTooShort         ← file smaller than the 8 KiB header (file-level)
///   ├── CellOutOfRange         ← caller asked for x or z outside 0..32
///   ├── CorruptLocationTable   ← entry outside the file or overlapping the header
///   ├── CorruptChunkHeader     ← record length does not fit its sectors
///   ├── UnsupportedScheme      ← compression tag other than gzip/zlib
///   ├── CorruptStream          ← bad gzip/zlib framing or checksum
///   ├── TruncatedInput         ← bytes ran out mid-field
///   ├── InvalidLength          ← negative array count, End-typed list
///   ├── UnknownTagKind         ← kind byte outside 0..=12
///   ├── InvalidRoot            ← tree root is not a Compound
///   └── NestingTooDeep         ← Compound/List nesting past the configured bound
/// ```
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("region file is {len} bytes, shorter than the 8192-byte header")]
    HeaderTooShort { len: usize },

    #[error("cell ({x}, {z}) is outside the 32x32 region")]
    CellOutOfRange { x: usize, z: usize },

    #[error(
        "location (sector {sector_offset}, {sector_count} sectors) outside the {file_len}-byte file"
    )]
    CorruptLocationTable {
        sector_offset: u32,
        sector_count: u8,
        file_len: u64,
    },

    #[error("record declares length {length} but its sectors hold {available} payload bytes")]
    CorruptChunkHeader { length: u32, available: u64 },

    #[error("unsupported compression scheme {0}")]
    UnsupportedScheme(u8),

    #[error("corrupt compressed stream: {0}")]
    CorruptStream(String),

    /// A fixed-width or length-prefixed field was cut short.
    #[error("input truncated: needed {needed} bytes, got {got}")]
    TruncatedInput { needed: usize, got: usize },

    #[error("invalid length {length} for {kind} payload")]
    InvalidLength { kind: &'static str, length: i32 },

    #[error("unknown tag kind {kind}")]
    UnknownTagKind { kind: u8 },

    #[error("root tag has kind {kind}, expected Compound")]
    InvalidRoot { kind: u8 },

    #[error("tag nesting exceeds depth limit {limit}")]
    NestingTooDeep { limit: usize },
}

pub type Result<T> = std::result::Result<T, DecodeError>;
