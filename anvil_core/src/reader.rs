use rayon::prelude::*;

use crate::codec;
use crate::error::{DecodeError, Result};
use crate::format::{
    cell_coords, cell_index, LocationEntry, RecordHeader, RegionHeader, CELLS_PER_REGION,
    RECORD_HEADER_SIZE, REGION_WIDTH,
};
use crate::nbt::{self, DEFAULT_MAX_DEPTH};
use crate::source::SliceSource;
use crate::tag::Tag;

/// Tunables for decoding a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Maximum Compound/List nesting inside one cell, root included.
    pub max_depth: usize,
    /// Decode cells on the rayon pool instead of one after another.
    pub parallel: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            parallel: true,
        }
    }
}

/// Outcome of decoding one present cell.
#[derive(Debug)]
pub struct CellResult {
    pub x: usize,
    pub z: usize,
    /// Last-modified timestamp from the header, passed through untouched.
    pub timestamp: u32,
    pub result: Result<Tag>,
}

/// Reader over one fully loaded region file.
///
/// # Open sequence
/// 1. Parse the 8 KiB header (1024 locations, 1024 timestamps).
/// 2. Nothing else. Cell records are only touched when decoded.
///
/// # Per-cell decode
/// For a non-empty location entry:
/// 1. Check its sector span lies inside the file and outside the header.
/// 2. Read the 5-byte record header at the start of the span.
/// 3. Check the declared payload fits the span.
/// 4. Inflate exactly that payload and decode the tag tree from it.
/// 5. Inflate to the end of the stream so its checksum trailer is verified.
///
/// Every step's failure is local to the cell. The reader holds no mutable
/// state, so cells may be decoded in any order, repeatedly, or in parallel.
pub struct RegionReader<'a> {
    data: &'a [u8],
    header: RegionHeader,
    options: DecodeOptions,
}

impl<'a> RegionReader<'a> {
    /// Parse the header of `data`, the full bytes of one region file.
    ///
    /// # Errors
    ///
    /// [`crate::DecodeError::HeaderTooShort`] if `data` cannot hold a header.
    pub fn new(data: &'a [u8], options: DecodeOptions) -> Result<Self> {
        let header = RegionHeader::from_bytes(data)?;
        log::debug!(
            "region header: {} of {} cells present, {} bytes",
            header.present_count(),
            CELLS_PER_REGION,
            data.len()
        );
        Ok(Self {
            data,
            header,
            options,
        })
    }

    pub fn header(&self) -> &RegionHeader {
        &self.header
    }

    /// Length of the underlying file in bytes.
    pub fn file_len(&self) -> usize {
        self.data.len()
    }

    /// Decode cell `(x, z)`. `Ok(None)` when the cell is absent.
    pub fn decode_cell(&self, x: usize, z: usize) -> Result<Option<Tag>> {
        decode_cell(&self.header, self.data, x, z, &self.options)
    }

    /// Decode every present cell, in ascending `x + z * 32` order.
    ///
    /// Absent cells produce no entry. A failing cell is reported in its own
    /// [`CellResult`] and does not stop the others.
    pub fn decode_all(&self) -> Vec<CellResult> {
        let results: Vec<CellResult> = if self.options.parallel {
            (0..CELLS_PER_REGION)
                .into_par_iter()
                .filter_map(|index| self.decode_index(index))
                .collect()
        } else {
            (0..CELLS_PER_REGION)
                .filter_map(|index| self.decode_index(index))
                .collect()
        };

        let failed = results.iter().filter(|r| r.result.is_err()).count();
        log::debug!(
            "decoded {} cells ({} failed)",
            results.len() - failed,
            failed
        );
        results
    }

    fn decode_index(&self, index: usize) -> Option<CellResult> {
        let entry = self.header.locations()[index];
        if entry.is_empty() {
            return None;
        }
        let (x, z) = cell_coords(index);
        Some(CellResult {
            x,
            z,
            timestamp: self.header.timestamps()[index],
            result: decode_entry(self.data, entry, self.options.max_depth),
        })
    }
}

/// Decode cell `(x, z)` of a region file.
///
/// Pure function of its inputs: `header` must be the header parsed from
/// `data`, and `data` the whole file. Returns `Ok(None)` for an absent cell
/// and [`DecodeError::CellOutOfRange`] unless both coordinates are below 32.
pub fn decode_cell(
    header: &RegionHeader,
    data: &[u8],
    x: usize,
    z: usize,
    options: &DecodeOptions,
) -> Result<Option<Tag>> {
    if x >= REGION_WIDTH || z >= REGION_WIDTH {
        return Err(DecodeError::CellOutOfRange { x, z });
    }
    let entry = header.location(x, z);
    if entry.is_empty() {
        return Ok(None);
    }
    log::trace!("decoding cell {} {} (slot {})", x, z, cell_index(x, z));
    decode_entry(data, entry, options.max_depth).map(Some)
}

fn decode_entry(data: &[u8], entry: LocationEntry, max_depth: usize) -> Result<Tag> {
    let span = &data[entry.validate(data.len() as u64)?];

    // validate() guarantees at least one full sector, so the record header fits.
    let mut raw = [0u8; RECORD_HEADER_SIZE];
    raw.copy_from_slice(&span[..RECORD_HEADER_SIZE]);
    let record = RecordHeader::from_bytes(raw);
    record.validate(span.len() as u64)?;

    let payload_end = RECORD_HEADER_SIZE + record.payload_len() as usize;
    let payload = SliceSource::new(&span[RECORD_HEADER_SIZE..payload_end]);

    let mut inflated = codec::open(record.scheme, payload)?;
    let root = nbt::read_root(&mut inflated, max_depth)?;
    // The tree can end before the compressed stream does; its trailer still
    // has to check out.
    inflated.finish()?;
    Ok(root)
}
