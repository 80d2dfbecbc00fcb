use crate::error::Result;

/// Pull-based supplier of raw bytes.
///
/// `read` fills as much of `buf` as it can and returns the number of bytes
/// produced. Returning fewer than `buf.len()` means the source is exhausted;
/// it is not an error by itself. Calling with an empty `buf` is always safe and
/// produces nothing.
///
/// Implementations must stay within their upper bound no matter how much the
/// caller asks for, and advance their cursor by exactly the bytes produced.
pub trait ByteSource {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }
}

/// Byte source over a bounded in-memory region.
///
/// Holds the unread remainder as a slice, so the cursor and the remaining
/// length move together and there is no end pointer to get off by one.
#[derive(Debug, Clone)]
pub struct SliceSource<'a> {
    remaining: &'a [u8],
}

impl<'a> SliceSource<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { remaining: data }
    }

    /// Bytes left before the bound.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }

    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.remaining.is_empty()
    }
}

impl ByteSource for SliceSource<'_> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = buf.len().min(self.remaining.len());
        let (head, tail) = self.remaining.split_at(n);
        buf[..n].copy_from_slice(head);
        self.remaining = tail;
        Ok(n)
    }
}
