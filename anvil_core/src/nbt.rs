use crate::error::{DecodeError, Result};
use crate::source::ByteSource;
use crate::tag::{Compound, List, NbtString, Tag, TagKind};

/// Default bound on Compound/List nesting.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Upper bound on elements reserved ahead of reading them. Counts come from
/// the input, so storage grows with the bytes actually decoded instead.
const MAX_PREALLOC: usize = 4096;

/// Scratch size for bulk array reads. A multiple of every element width.
const ARRAY_CHUNK: usize = 4096;

/// Recursive-descent reader for one tag tree.
///
/// # Wire layout
/// ```text
/// named entry  : [kind:u8][name_len:u16 BE][name bytes][payload]
/// Compound     : named entry* [End:u8 = 0]
/// List         : [element kind:u8][count:i32 BE][payload × count]
/// *Array       : [count:i32 BE][element × count]
/// String       : [len:u16 BE][bytes]
/// scalars      : fixed-width big-endian
/// ```
///
/// The root must be a named Compound. Every Compound or List payload entered
/// counts one level of depth, the root included; going past `max_depth` fails
/// with [`DecodeError::NestingTooDeep`].
pub struct TagReader<S> {
    source: S,
    max_depth: usize,
    /// Bulk-read buffer for arrays. Heap-allocated so recursive frames stay small.
    scratch: Vec<u8>,
}

impl<S: ByteSource> TagReader<S> {
    pub fn new(source: S, max_depth: usize) -> Self {
        Self {
            source,
            max_depth,
            scratch: Vec::new(),
        }
    }

    /// Decode the root Compound, discarding its name.
    pub fn read_root(&mut self) -> Result<Tag> {
        self.read_named_root().map(|(_, root)| root)
    }

    /// Decode the root Compound together with its (usually empty) name.
    pub fn read_named_root(&mut self) -> Result<(NbtString, Tag)> {
        let kind = self.read_u8()?;
        if kind != TagKind::Compound.as_byte() {
            return Err(DecodeError::InvalidRoot { kind });
        }
        let name = self.read_string()?;
        let root = self.read_payload(TagKind::Compound, 0)?;
        Ok((name, root))
    }

    // ── Payloads ───────────────────────────────────────────────────────────

    /// `depth` is the number of Compound/List payloads already open around
    /// this one.
    fn read_payload(&mut self, kind: TagKind, depth: usize) -> Result<Tag> {
        Ok(match kind {
            TagKind::End => Tag::End,
            TagKind::Byte => Tag::Byte(self.read_u8()? as i8),
            TagKind::Short => Tag::Short(i16::from_be_bytes(self.read_array_of()?)),
            TagKind::Int => Tag::Int(self.read_i32()?),
            TagKind::Long => Tag::Long(i64::from_be_bytes(self.read_array_of()?)),
            TagKind::Float => {
                Tag::Float(f32::from_bits(u32::from_be_bytes(self.read_array_of()?)))
            }
            TagKind::Double => {
                Tag::Double(f64::from_bits(u64::from_be_bytes(self.read_array_of()?)))
            }
            TagKind::ByteArray => Tag::ByteArray(self.read_array(kind, |b: [u8; 1]| b[0] as i8)?),
            TagKind::IntArray => Tag::IntArray(self.read_array(kind, i32::from_be_bytes)?),
            TagKind::LongArray => Tag::LongArray(self.read_array(kind, i64::from_be_bytes)?),
            TagKind::String => Tag::String(self.read_string()?),
            TagKind::List => {
                let depth = self.enter(depth)?;
                Tag::List(self.read_list(depth)?)
            }
            TagKind::Compound => {
                let depth = self.enter(depth)?;
                Tag::Compound(self.read_compound(depth)?)
            }
        })
    }

    fn enter(&self, depth: usize) -> Result<usize> {
        let depth = depth + 1;
        if depth > self.max_depth {
            return Err(DecodeError::NestingTooDeep {
                limit: self.max_depth,
            });
        }
        Ok(depth)
    }

    fn read_compound(&mut self, depth: usize) -> Result<Compound> {
        let mut compound = Compound::new();
        loop {
            let kind = TagKind::from_byte(self.read_u8()?)?;
            if kind == TagKind::End {
                return Ok(compound);
            }
            let name = self.read_string()?;
            let tag = self.read_payload(kind, depth)?;
            compound.push(name, tag);
        }
    }

    fn read_list(&mut self, depth: usize) -> Result<List> {
        let raw_kind = self.read_u8()?;
        let count = self.read_i32()?;
        if count <= 0 {
            // An empty list's element kind is not checked.
            let element_kind = TagKind::from_byte(raw_kind).unwrap_or(TagKind::End);
            return Ok(List::empty(element_kind));
        }

        let element_kind = TagKind::from_byte(raw_kind)?;
        if element_kind == TagKind::End {
            // End payloads are zero bytes wide, so nothing would bound the count.
            return Err(DecodeError::InvalidLength {
                kind: "List",
                length: count,
            });
        }

        let count = count as usize;
        let mut items = Vec::with_capacity(count.min(MAX_PREALLOC));
        for _ in 0..count {
            items.push(self.read_payload(element_kind, depth)?);
        }
        Ok(List {
            element_kind,
            items,
        })
    }

    fn read_array<T, const N: usize>(
        &mut self,
        kind: TagKind,
        decode: impl Fn([u8; N]) -> T,
    ) -> Result<Vec<T>> {
        let count = self.read_i32()?;
        if count < 0 {
            return Err(DecodeError::InvalidLength {
                kind: kind.name(),
                length: count,
            });
        }

        let mut remaining = count as usize;
        let mut items = Vec::with_capacity(remaining.min(MAX_PREALLOC));
        if remaining > 0 && self.scratch.is_empty() {
            self.scratch = vec![0u8; ARRAY_CHUNK];
        }
        while remaining > 0 {
            let take = remaining.min(ARRAY_CHUNK / N);
            let want = take * N;
            let chunk = &mut self.scratch[..want];
            fill(&mut self.source, chunk)?;
            items.extend(chunk.chunks_exact(N).map(|raw| {
                let mut element = [0u8; N];
                element.copy_from_slice(raw);
                decode(element)
            }));
            remaining -= take;
        }
        Ok(items)
    }

    fn read_string(&mut self) -> Result<NbtString> {
        let len = u16::from_be_bytes(self.read_array_of()?) as usize;
        let mut bytes = vec![0u8; len];
        self.fill(&mut bytes)?;
        Ok(NbtString::from_bytes(bytes))
    }

    // ── Primitive reads ────────────────────────────────────────────────────

    fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        fill(&mut self.source, buf)
    }

    fn read_array_of<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.fill(&mut buf)?;
        Ok(buf)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array_of::<1>()?[0])
    }

    fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.read_array_of()?))
    }
}

/// Read exactly `buf.len()` bytes or fail with [`DecodeError::TruncatedInput`].
fn fill<S: ByteSource>(source: &mut S, buf: &mut [u8]) -> Result<()> {
    let got = source.read(buf)?;
    if got < buf.len() {
        return Err(DecodeError::TruncatedInput {
            needed: buf.len(),
            got,
        });
    }
    Ok(())
}

/// Decode a root Compound from `source` with the given nesting bound.
pub fn read_root<S: ByteSource>(source: S, max_depth: usize) -> Result<Tag> {
    TagReader::new(source, max_depth).read_root()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SliceSource;

    fn decode(bytes: &[u8]) -> Result<Tag> {
        read_root(SliceSource::new(bytes), DEFAULT_MAX_DEPTH)
    }

    /// Root Compound with an empty name wrapping `body`, terminated by End.
    fn root(body: &[u8]) -> Vec<u8> {
        let mut out = vec![10, 0, 0];
        out.extend_from_slice(body);
        out.push(0);
        out
    }

    fn named(kind: u8, name: &str) -> Vec<u8> {
        let mut out = vec![kind];
        out.extend_from_slice(&(name.len() as u16).to_be_bytes());
        out.extend_from_slice(name.as_bytes());
        out
    }

    #[test]
    fn decodes_scalars() {
        let mut body = named(1, "b");
        body.push(0xFF);
        body.extend(named(2, "s"));
        body.extend_from_slice(&(-2i16).to_be_bytes());
        body.extend(named(4, "l"));
        body.extend_from_slice(&i64::MIN.to_be_bytes());
        body.extend(named(5, "f"));
        body.extend_from_slice(&1.5f32.to_bits().to_be_bytes());
        body.extend(named(6, "d"));
        body.extend_from_slice(&(-0.25f64).to_bits().to_be_bytes());

        let tag = decode(&root(&body)).unwrap();
        let c = tag.as_compound().unwrap();
        assert_eq!(c.get("b"), Some(&Tag::Byte(-1)));
        assert_eq!(c.get("s"), Some(&Tag::Short(-2)));
        assert_eq!(c.get("l"), Some(&Tag::Long(i64::MIN)));
        assert_eq!(c.get("f"), Some(&Tag::Float(1.5)));
        assert_eq!(c.get("d"), Some(&Tag::Double(-0.25)));
    }

    #[test]
    fn root_name_is_read_and_returned_separately() {
        let bytes = [10, 0, 5, b'L', b'e', b'v', b'e', b'l', 0];
        let (name, tag) = TagReader::new(SliceSource::new(&bytes), 8)
            .read_named_root()
            .unwrap();
        assert_eq!(name, "Level");
        assert_eq!(tag, Tag::Compound(Compound::new()));
    }

    #[test]
    fn non_compound_root_is_invalid() {
        assert!(matches!(
            decode(&[3, 0, 0, 0, 0, 0, 1]),
            Err(DecodeError::InvalidRoot { kind: 3 })
        ));
        assert!(matches!(decode(&[0]), Err(DecodeError::InvalidRoot { kind: 0 })));
    }

    #[test]
    fn empty_input_is_truncated() {
        assert!(matches!(decode(&[]), Err(DecodeError::TruncatedInput { .. })));
    }

    #[test]
    fn missing_end_marker_is_truncated() {
        let mut bytes = vec![10, 0, 0];
        bytes.extend(named(1, "x"));
        bytes.push(9);
        assert!(matches!(decode(&bytes), Err(DecodeError::TruncatedInput { .. })));
    }

    #[test]
    fn string_payload_and_opaque_names() {
        let mut body = vec![8, 0, 2, 0xC0, 0x80];
        body.extend_from_slice(&3u16.to_be_bytes());
        body.extend_from_slice(b"abc");
        let tag = decode(&root(&body)).unwrap();
        let (name, value) = tag.as_compound().unwrap().iter().next().unwrap();
        assert_eq!(name.as_bytes(), &[0xC0, 0x80]);
        assert_eq!(value.as_str(), Some("abc"));
    }

    #[test]
    fn list_with_zero_or_negative_count_is_empty() {
        for count in [0i32, -1, i32::MIN] {
            let mut body = named(9, "l");
            body.push(3);
            body.extend_from_slice(&count.to_be_bytes());
            let tag = decode(&root(&body)).unwrap();
            let list = tag.as_compound().unwrap().get("l").unwrap().as_list().unwrap();
            assert!(list.is_empty());
            assert_eq!(list.element_kind, TagKind::Int);
        }
    }

    #[test]
    fn list_of_end_with_items_is_invalid() {
        let mut body = named(9, "l");
        body.push(0);
        body.extend_from_slice(&i32::MAX.to_be_bytes());
        assert!(matches!(
            decode(&root(&body)),
            Err(DecodeError::InvalidLength { kind: "List", .. })
        ));
    }

    #[test]
    fn list_elements_carry_no_kind_or_name() {
        let mut body = named(9, "l");
        body.push(2);
        body.extend_from_slice(&3i32.to_be_bytes());
        for v in [1i16, 2, 3] {
            body.extend_from_slice(&v.to_be_bytes());
        }
        let tag = decode(&root(&body)).unwrap();
        let list = tag.as_compound().unwrap().get("l").unwrap().as_list().unwrap();
        assert_eq!(list.items, vec![Tag::Short(1), Tag::Short(2), Tag::Short(3)]);
    }

    #[test]
    fn negative_array_count_is_invalid_length() {
        for kind in [7u8, 11, 12] {
            let mut body = named(kind, "a");
            body.extend_from_slice(&(-1i32).to_be_bytes());
            assert!(matches!(
                decode(&root(&body)),
                Err(DecodeError::InvalidLength { length: -1, .. })
            ));
        }
    }

    #[test]
    fn oversized_array_count_fails_as_truncated() {
        let mut body = named(12, "a");
        body.extend_from_slice(&i32::MAX.to_be_bytes());
        body.extend_from_slice(&7i64.to_be_bytes());
        assert!(matches!(
            decode(&root(&body)),
            Err(DecodeError::TruncatedInput { .. })
        ));
    }

    #[test]
    fn arrays_larger_than_one_chunk() {
        let values: Vec<i32> = (0..3000).collect();
        let mut body = named(11, "a");
        body.extend_from_slice(&(values.len() as i32).to_be_bytes());
        for v in &values {
            body.extend_from_slice(&v.to_be_bytes());
        }
        let tag = decode(&root(&body)).unwrap();
        assert_eq!(tag.as_compound().unwrap().get("a"), Some(&Tag::IntArray(values)));
    }

    #[test]
    fn unknown_kind_fails() {
        let body = named(42, "?");
        assert!(matches!(
            decode(&root(&body)),
            Err(DecodeError::UnknownTagKind { kind: 42 })
        ));
    }

    #[test]
    fn depth_bound_counts_root_and_lists() {
        // root -> list of lists -> one inner list of bytes: depth 3.
        let mut body = named(9, "outer");
        body.push(9);
        body.extend_from_slice(&1i32.to_be_bytes());
        body.push(1);
        body.extend_from_slice(&1i32.to_be_bytes());
        body.push(5);
        let bytes = root(&body);

        assert!(read_root(SliceSource::new(&bytes), 3).is_ok());
        assert!(matches!(
            read_root(SliceSource::new(&bytes), 2),
            Err(DecodeError::NestingTooDeep { limit: 2 })
        ));
    }
}
