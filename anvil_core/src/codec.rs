use std::io::{self, Read};

use flate2::read::{GzDecoder, ZlibDecoder};

use crate::error::{DecodeError, Result};
use crate::format::CompressionScheme;
use crate::source::ByteSource;

/// Adapts a [`ByteSource`] to `io::Read` so flate2 can pull compressed input
/// from it on demand.
struct SourceReader<S> {
    source: S,
}

impl<S: ByteSource> Read for SourceReader<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.source.read(buf).map_err(io::Error::other)
    }
}

enum Inflater<S> {
    Gzip(GzDecoder<SourceReader<S>>),
    Zlib(ZlibDecoder<SourceReader<S>>),
}

impl<S: ByteSource> Read for Inflater<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Gzip(d) => d.read(buf),
            Self::Zlib(d) => d.read(buf),
        }
    }
}

/// Byte source yielding the inflated form of an underlying compressed source.
///
/// Compressed input is pulled from the underlying source only as the consumer
/// asks for more output. The inflate window and checksum state live inside this
/// value and are freed when it is dropped, whichever way the cell decode ends.
pub struct DecompressedSource<S> {
    inner: Inflater<S>,
}

/// Open a decompressing source for `scheme` over `source`.
///
/// `source` should be bounded to exactly the compressed payload. Framing and
/// checksum errors surface from later reads, not from `open`. A stream whose
/// input runs out before its end marker and trailer fails with
/// [`DecodeError::TruncatedInput`].
///
/// # Errors
///
/// [`DecodeError::UnsupportedScheme`] for anything but gzip or zlib.
pub fn open<S: ByteSource>(
    scheme: CompressionScheme,
    source: S,
) -> Result<DecompressedSource<S>> {
    let reader = SourceReader { source };
    let inner = match scheme {
        CompressionScheme::Gzip => Inflater::Gzip(GzDecoder::new(reader)),
        CompressionScheme::Zlib => Inflater::Zlib(ZlibDecoder::new(reader)),
        CompressionScheme::Unsupported(tag) => return Err(DecodeError::UnsupportedScheme(tag)),
    };
    Ok(DecompressedSource { inner })
}

impl<S: ByteSource> ByteSource for DecompressedSource<S> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        // flate2 may hand back partial output mid-stream; keep pulling so a
        // short return only ever means end of stream.
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(stream_error(e, buf.len(), filled)),
            }
        }
        Ok(filled)
    }
}

impl<S: ByteSource> DecompressedSource<S> {
    /// Inflate through to the end of the stream, discarding the output.
    ///
    /// The gzip CRC-32/ISIZE and zlib Adler-32 trailers are only checked once
    /// the decoder reaches them, so a consumer that stops early must call this
    /// to learn whether the stream was intact.
    pub fn finish(&mut self) -> Result<()> {
        let mut sink = [0u8; 512];
        while self.read(&mut sink)? > 0 {}
        Ok(())
    }
}

fn stream_error(err: io::Error, needed: usize, got: usize) -> DecodeError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        return DecodeError::TruncatedInput { needed, got };
    }
    // Errors raised by the underlying source come back boxed inside io::Error.
    if err.get_ref().is_some_and(|inner| inner.is::<DecodeError>()) {
        if let Some(inner) = err.into_inner() {
            if let Ok(decode) = inner.downcast::<DecodeError>() {
                return *decode;
            }
        }
        return DecodeError::CorruptStream("underlying source failed".to_string());
    }
    DecodeError::CorruptStream(err.to_string())
}
