use crate::error::{DecodeError, Result};

/// Cells per region along each horizontal axis.
pub const REGION_WIDTH: usize = 32;

/// Total number of cell slots in a region: 32 × 32.
pub const CELLS_PER_REGION: usize = REGION_WIDTH * REGION_WIDTH;

/// Size of one sector in bytes. Every cell record starts on a sector boundary.
pub const SECTOR_SIZE: u64 = 4096;

/// Size of a location or timestamp entry in bytes.
pub const ENTRY_SIZE: usize = 4;

/// Fixed size of the region header in bytes.
///   location[1024 × 4] + timestamp[1024 × 4] = 8192
pub const HEADER_SIZE: usize = 2 * CELLS_PER_REGION * ENTRY_SIZE;

/// Number of sectors occupied by the header. No cell record may start inside them.
pub const HEADER_SECTORS: u32 = (HEADER_SIZE as u64 / SECTOR_SIZE) as u32;

/// Size of the per-cell record header in bytes.
///   length:u32 BE + scheme:u8 = 5
pub const RECORD_HEADER_SIZE: usize = 5;

// ── Compression schemes ────────────────────────────────────────────────────

pub const SCHEME_GZIP: u8 = 1;
pub const SCHEME_ZLIB: u8 = 2;

/// Compression scheme tag from a cell record header.
///
/// Resolved per cell, never configured globally. Only gzip and zlib framings
/// decode; every other tag (including the uncompressed and LZ4 variants used by
/// newer writers) is kept as `Unsupported` so the cell fails loudly instead of
/// being passed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionScheme {
    Gzip,
    Zlib,
    Unsupported(u8),
}

impl CompressionScheme {
    pub fn from_tag(tag: u8) -> Self {
        match tag {
            SCHEME_GZIP => Self::Gzip,
            SCHEME_ZLIB => Self::Zlib,
            other => Self::Unsupported(other),
        }
    }

    pub fn tag(self) -> u8 {
        match self {
            Self::Gzip => SCHEME_GZIP,
            Self::Zlib => SCHEME_ZLIB,
            Self::Unsupported(tag) => tag,
        }
    }

    /// Human-readable scheme name for CLI display.
    pub fn name(self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Zlib => "zlib",
            Self::Unsupported(_) => "unsupported",
        }
    }
}

// ── Coordinates ────────────────────────────────────────────────────────────

/// Header slot for cell `(x, z)`: `x + z * 32`.
///
/// Callers pass coordinates already reduced to `0..32`; see
/// [`RegionHeader::location`].
#[inline]
pub fn cell_index(x: usize, z: usize) -> usize {
    debug_assert!(x < REGION_WIDTH && z < REGION_WIDTH);
    x + z * REGION_WIDTH
}

/// Inverse of [`cell_index`].
#[inline]
pub fn cell_coords(index: usize) -> (usize, usize) {
    (index % REGION_WIDTH, index / REGION_WIDTH)
}

// ── Location table entry ───────────────────────────────────────────────────

/// One 4-byte location entry: `|sector offset:3 BE|sector count:1|`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocationEntry {
    /// Offset of the cell record from the start of the file, in sectors.
    pub sector_offset: u32,
    /// Number of sectors reserved for the cell record.
    pub sector_count: u8,
}

impl LocationEntry {
    pub fn from_bytes(buf: [u8; ENTRY_SIZE]) -> Self {
        let packed = u32::from_be_bytes(buf);
        Self {
            sector_offset: packed >> 8,
            sector_count: (packed & 0xFF) as u8,
        }
    }

    /// An all-zero entry marks an absent cell; it is never dereferenced.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sector_offset == 0 && self.sector_count == 0
    }

    /// Byte offset of the cell record.
    #[inline]
    pub fn byte_offset(&self) -> u64 {
        self.sector_offset as u64 * SECTOR_SIZE
    }

    /// Bytes reserved for the cell record.
    #[inline]
    pub fn byte_len(&self) -> u64 {
        self.sector_count as u64 * SECTOR_SIZE
    }

    /// Check the entry against the loaded file length.
    ///
    /// Returns the reserved byte range on success. Entries that reserve no
    /// sectors, overlap the header, or run past the end of the file are
    /// [`DecodeError::CorruptLocationTable`].
    pub fn validate(&self, file_len: u64) -> Result<std::ops::Range<usize>> {
        let start = self.byte_offset();
        let end = start + self.byte_len();
        if self.sector_count == 0 || self.sector_offset < HEADER_SECTORS || end > file_len {
            return Err(DecodeError::CorruptLocationTable {
                sector_offset: self.sector_offset,
                sector_count: self.sector_count,
                file_len,
            });
        }
        // Both bounds are <= file_len, which is a buffer length.
        Ok(start as usize..end as usize)
    }
}

// ── Header ─────────────────────────────────────────────────────────────────

/// Decoded 8 KiB region header: 1024 location entries then 1024 timestamps.
///
/// Read once per file and immutable afterwards; shared read-only across
/// concurrent cell decodes.
#[derive(Debug, Clone)]
pub struct RegionHeader {
    locations: Vec<LocationEntry>,
    timestamps: Vec<u32>,
}

impl RegionHeader {
    /// Parse the header from the start of a region file.
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(DecodeError::HeaderTooShort { len: buf.len() });
        }
        let (location_table, rest) = buf[..HEADER_SIZE].split_at(CELLS_PER_REGION * ENTRY_SIZE);

        let locations = location_table
            .chunks_exact(ENTRY_SIZE)
            .map(|raw| LocationEntry::from_bytes([raw[0], raw[1], raw[2], raw[3]]))
            .collect();
        let timestamps = rest
            .chunks_exact(ENTRY_SIZE)
            .map(|raw| u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]))
            .collect();

        Ok(Self {
            locations,
            timestamps,
        })
    }

    /// # Panics
    ///
    /// If `x` or `z` is not below 32.
    #[inline]
    pub fn location(&self, x: usize, z: usize) -> LocationEntry {
        assert!(x < REGION_WIDTH && z < REGION_WIDTH, "cell ({x}, {z}) out of range");
        self.locations[cell_index(x, z)]
    }

    /// Last-modified timestamp of cell `(x, z)`. Opaque to the decoder.
    ///
    /// # Panics
    ///
    /// If `x` or `z` is not below 32.
    #[inline]
    pub fn timestamp(&self, x: usize, z: usize) -> u32 {
        assert!(x < REGION_WIDTH && z < REGION_WIDTH, "cell ({x}, {z}) out of range");
        self.timestamps[cell_index(x, z)]
    }

    pub fn locations(&self) -> &[LocationEntry] {
        &self.locations
    }

    pub fn timestamps(&self) -> &[u32] {
        &self.timestamps
    }

    /// Number of cells with a non-empty location entry.
    pub fn present_count(&self) -> usize {
        self.locations.iter().filter(|e| !e.is_empty()).count()
    }

    /// `(x, z, entry)` for every non-empty location, in ascending index order.
    pub fn present(&self) -> impl Iterator<Item = (usize, usize, LocationEntry)> + '_ {
        self.locations
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.is_empty())
            .map(|(i, e)| {
                let (x, z) = cell_coords(i);
                (x, z, *e)
            })
    }
}

// ── Cell record header ─────────────────────────────────────────────────────

/// The 5 bytes at the start of every cell record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Counts the scheme byte plus the compressed payload, not itself.
    pub length: u32,
    pub scheme: CompressionScheme,
}

impl RecordHeader {
    pub fn from_bytes(buf: [u8; RECORD_HEADER_SIZE]) -> Self {
        Self {
            length: u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]),
            scheme: CompressionScheme::from_tag(buf[4]),
        }
    }

    /// Bytes of compressed payload following the header.
    #[inline]
    pub fn payload_len(&self) -> u64 {
        (self.length as u64).saturating_sub(1)
    }

    /// Check the declared payload against the sector span reserved for it.
    ///
    /// `reserved` is the byte length of the location entry's sector span.
    pub fn validate(&self, reserved: u64) -> Result<()> {
        let available = reserved.saturating_sub(RECORD_HEADER_SIZE as u64);
        if self.length == 0 || self.payload_len() > available {
            return Err(DecodeError::CorruptChunkHeader {
                length: self.length,
                available,
            });
        }
        Ok(())
    }
}
