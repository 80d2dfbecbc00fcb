//! Test-only tag-tree encoder and region builder.
//!
//! The crate only decodes; these helpers produce known-good bytes to decode.
#![allow(dead_code)]

use std::io::Write;

use anvil_core::format::{cell_index, CELLS_PER_REGION, HEADER_SIZE, SECTOR_SIZE};
use anvil_core::{Compound, Tag, TagKind};
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;

// ── tag tree encoder ──────────────────────────────────────────────────────

/// Encode `root` as an unnamed root Compound.
pub fn encode_root(root: &Compound) -> Vec<u8> {
    let mut out = vec![TagKind::Compound.as_byte(), 0, 0];
    write_compound(&mut out, root);
    out
}

fn write_name(out: &mut Vec<u8>, name: &[u8]) {
    out.extend_from_slice(&(name.len() as u16).to_be_bytes());
    out.extend_from_slice(name);
}

fn write_compound(out: &mut Vec<u8>, compound: &Compound) {
    for (name, tag) in compound.iter() {
        out.push(tag.kind().as_byte());
        write_name(out, name.as_bytes());
        write_payload(out, tag);
    }
    out.push(TagKind::End.as_byte());
}

fn write_payload(out: &mut Vec<u8>, tag: &Tag) {
    match tag {
        Tag::End => {}
        Tag::Byte(v) => out.push(*v as u8),
        Tag::Short(v) => out.extend_from_slice(&v.to_be_bytes()),
        Tag::Int(v) => out.extend_from_slice(&v.to_be_bytes()),
        Tag::Long(v) => out.extend_from_slice(&v.to_be_bytes()),
        Tag::Float(v) => out.extend_from_slice(&v.to_bits().to_be_bytes()),
        Tag::Double(v) => out.extend_from_slice(&v.to_bits().to_be_bytes()),
        Tag::ByteArray(items) => {
            out.extend_from_slice(&(items.len() as i32).to_be_bytes());
            out.extend(items.iter().map(|b| *b as u8));
        }
        Tag::IntArray(items) => {
            out.extend_from_slice(&(items.len() as i32).to_be_bytes());
            items.iter().for_each(|v| out.extend_from_slice(&v.to_be_bytes()));
        }
        Tag::LongArray(items) => {
            out.extend_from_slice(&(items.len() as i32).to_be_bytes());
            items.iter().for_each(|v| out.extend_from_slice(&v.to_be_bytes()));
        }
        Tag::String(s) => write_name(out, s.as_bytes()),
        Tag::List(list) => {
            out.push(list.element_kind.as_byte());
            out.extend_from_slice(&(list.items.len() as i32).to_be_bytes());
            list.items.iter().for_each(|item| write_payload(out, item));
        }
        Tag::Compound(c) => write_compound(out, c),
    }
}

/// A root holding `depth - 1` Compounds nested inside each other, so the
/// innermost one sits at `depth` counting the root.
pub fn nested_compounds(depth: usize) -> Vec<u8> {
    let mut out = vec![TagKind::Compound.as_byte(), 0, 0];
    for _ in 1..depth {
        out.push(TagKind::Compound.as_byte());
        write_name(&mut out, b"n");
    }
    out.extend(std::iter::repeat(TagKind::End.as_byte()).take(depth));
    out
}

// ── compression ───────────────────────────────────────────────────────────

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

// ── region builder ────────────────────────────────────────────────────────

struct PendingCell {
    x: usize,
    z: usize,
    scheme: u8,
    payload: Vec<u8>,
    timestamp: u32,
}

/// Lays cells out back to back from sector 2, each padded to a sector boundary.
#[derive(Default)]
pub struct RegionBuilder {
    cells: Vec<PendingCell>,
}

impl RegionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a cell whose payload is already compressed with `scheme`.
    pub fn raw_cell(mut self, x: usize, z: usize, scheme: u8, payload: Vec<u8>) -> Self {
        self.cells.push(PendingCell {
            x,
            z,
            scheme,
            payload,
            timestamp: 1_700_000_000 + cell_index(x, z) as u32,
        });
        self
    }

    /// Add a zlib-compressed cell holding `root`.
    pub fn cell(self, x: usize, z: usize, root: &Compound) -> Self {
        self.raw_cell(x, z, 2, zlib(&encode_root(root)))
    }

    pub fn build(self) -> Vec<u8> {
        let mut data = vec![0u8; HEADER_SIZE];
        for cell in self.cells {
            let sector = (data.len() as u64 / SECTOR_SIZE) as u32;
            let mut record = Vec::with_capacity(cell.payload.len() + 5);
            record.extend_from_slice(&(cell.payload.len() as u32 + 1).to_be_bytes());
            record.push(cell.scheme);
            record.extend_from_slice(&cell.payload);
            let sectors = record.len().div_ceil(SECTOR_SIZE as usize);
            record.resize(sectors * SECTOR_SIZE as usize, 0);
            data.extend_from_slice(&record);

            let index = cell_index(cell.x, cell.z);
            let packed = (sector << 8) | sectors as u32;
            data[index * 4..index * 4 + 4].copy_from_slice(&packed.to_be_bytes());
            let ts = (CELLS_PER_REGION + index) * 4;
            data[ts..ts + 4].copy_from_slice(&cell.timestamp.to_be_bytes());
        }
        data
    }
}

/// Byte offset of cell `(x, z)`'s record according to the location table.
pub fn record_offset(data: &[u8], x: usize, z: usize) -> usize {
    let index = cell_index(x, z);
    let packed = u32::from_be_bytes(data[index * 4..index * 4 + 4].try_into().unwrap());
    (packed >> 8) as usize * SECTOR_SIZE as usize
}

/// A small but representative chunk-like tree.
pub fn sample_tree(seed: i32) -> Compound {
    let mut section = Compound::new();
    section.push("Y", Tag::Byte(seed as i8));
    section.push("BlockStates", Tag::LongArray(vec![seed as i64, -1, 1 << 40]));

    let mut level = Compound::new();
    level.push("xPos", Tag::Int(seed));
    level.push("LastUpdate", Tag::Long(1_234_567_890_123));
    level.push("Status", Tag::String("full".into()));
    level.push(
        "Sections",
        Tag::List(anvil_core::List {
            element_kind: TagKind::Compound,
            items: vec![Tag::Compound(section.clone()), Tag::Compound(section)],
        }),
    );

    let mut root = Compound::new();
    root.push("DataVersion", Tag::Int(3465));
    root.push("Level", Tag::Compound(level));
    root.push("Heights", Tag::IntArray((0..16).map(|i| i * seed).collect()));
    root.push("Biomes", Tag::ByteArray(vec![1, -2, 3]));
    root.push("Temperature", Tag::Float(0.8));
    root.push("Scale", Tag::Double(-1.5e300));
    root.push("Light", Tag::Short(15));
    root
}
