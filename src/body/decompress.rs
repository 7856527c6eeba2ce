//! Bounded, cancellable decompression of `Content-Encoding` stacks.
//!
//! The codec itself sits behind the [`Decompressor`] trait so that a build or
//! caller without one is a constructor-time fact ([`StreamDecompressor::unavailable`]),
//! and so tests can plug in fakes. Output is pulled chunk by chunk through a
//! [`ChunkSource`]; [`read_stream_with_limit`] stops and cancels the source the
//! moment the byte cap is crossed, whatever the true decompressed size is.

use std::borrow::Cow;
use std::fmt;
use std::io::{self, Read};
use std::sync::Arc;

use flate2::read::{DeflateDecoder, MultiGzDecoder, ZlibDecoder};

use super::error::DecodeError;

/// Internal buffer size handed to the Brotli decoder.
const BROTLI_BUFFER_SIZE: usize = 4096;

/// Supported content encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentCoding {
    /// gzip (RFC 1952).
    Gzip,
    /// deflate, zlib-wrapped (RFC 1950) or raw (RFC 1951).
    Deflate,
    /// Brotli (RFC 7932).
    Brotli,
}

impl ContentCoding {
    /// Parse from the token used in `Content-Encoding`.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "gzip" => Some(Self::Gzip),
            "deflate" => Some(Self::Deflate),
            "br" => Some(Self::Brotli),
            _ => None,
        }
    }

    pub const fn as_token(&self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Deflate => "deflate",
            Self::Brotli => "br",
        }
    }
}

impl fmt::Display for ContentCoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

/// Split a `Content-Encoding` value into lowercase tokens in application
/// order, dropping `identity` and empty entries.
pub fn parse_content_encoding(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(|token| token.trim().to_ascii_lowercase())
        .filter(|token| !token.is_empty() && token != "identity")
        .collect()
}

/// Pull-based source of decompressed chunks.
///
/// `cancel` releases the underlying decoder; after it, the source yields
/// nothing more.
pub trait ChunkSource: Iterator<Item = io::Result<Vec<u8>>> {
    fn cancel(&mut self);
}

/// [`ChunkSource`] over any [`Read`] implementation.
pub struct ReaderChunks<R> {
    reader: Option<R>,
    chunk_size: usize,
}

impl<R: Read> ReaderChunks<R> {
    pub fn new(reader: R, chunk_size: usize) -> Self {
        Self {
            reader: Some(reader),
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.reader.is_none()
    }
}

impl<R: Read> Iterator for ReaderChunks<R> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        let reader = self.reader.as_mut()?;
        let mut chunk = vec![0u8; self.chunk_size];
        loop {
            match reader.read(&mut chunk) {
                Ok(0) => {
                    self.reader = None;
                    return None;
                }
                Ok(n) => {
                    chunk.truncate(n);
                    return Some(Ok(chunk));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.reader = None;
                    return Some(Err(e));
                }
            }
        }
    }
}

impl<R: Read> ChunkSource for ReaderChunks<R> {
    fn cancel(&mut self) {
        if self.reader.take().is_some() {
            tracing::trace!("decoder released before end of stream");
        }
    }
}

/// Platform decompression capability.
pub trait Decompressor: Send + Sync {
    /// Open a decoding stream for one layer over `input`.
    fn open<'a>(&self, coding: ContentCoding, input: &'a [u8]) -> Box<dyn ChunkSource + 'a>;
}

/// flate2 + brotli backed [`Decompressor`].
#[derive(Debug, Clone)]
pub struct NativeDecompressor {
    chunk_size: usize,
}

impl NativeDecompressor {
    pub fn new(chunk_size: usize) -> Self {
        Self { chunk_size }
    }
}

impl Decompressor for NativeDecompressor {
    fn open<'a>(&self, coding: ContentCoding, input: &'a [u8]) -> Box<dyn ChunkSource + 'a> {
        match coding {
            ContentCoding::Gzip => Box::new(ReaderChunks::new(
                MultiGzDecoder::new(input),
                self.chunk_size,
            )),
            ContentCoding::Deflate if has_zlib_header(input) => {
                Box::new(ReaderChunks::new(ZlibDecoder::new(input), self.chunk_size))
            }
            ContentCoding::Deflate => Box::new(ReaderChunks::new(
                DeflateDecoder::new(input),
                self.chunk_size,
            )),
            ContentCoding::Brotli => Box::new(ReaderChunks::new(
                brotli::Decompressor::new(input, BROTLI_BUFFER_SIZE),
                self.chunk_size,
            )),
        }
    }
}

/// RFC 1950 header check: deflate method and a valid FCHECK.
fn has_zlib_header(input: &[u8]) -> bool {
    match input {
        [cmf, flg, ..] => cmf & 0x0F == 8 && u16::from_be_bytes([*cmf, *flg]) % 31 == 0,
        _ => false,
    }
}

/// Bytes read from a [`ChunkSource`] under a cap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LimitedBytes {
    pub bytes: Vec<u8>,
    /// Set when the source had more to give than the cap allowed.
    pub truncated: bool,
}

/// A source that failed mid-stream, with what it produced before failing.
#[derive(Debug)]
pub struct PartialRead {
    pub bytes: Vec<u8>,
    pub error: io::Error,
}

/// Drain `source` into memory, never holding more than `max_bytes`.
///
/// The chunk that crosses the cap is cut to the remaining allowance and the
/// source is cancelled. The source is also cancelled on error.
pub fn read_stream_with_limit<S>(source: &mut S, max_bytes: usize) -> Result<LimitedBytes, PartialRead>
where
    S: ChunkSource + ?Sized,
{
    let mut bytes = Vec::new();
    while let Some(chunk) = source.next() {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(error) => {
                source.cancel();
                return Err(PartialRead { bytes, error });
            }
        };

        if bytes.len() + chunk.len() > max_bytes {
            let remaining = max_bytes - bytes.len();
            bytes.extend_from_slice(&chunk[..remaining]);
            source.cancel();
            tracing::trace!(max_bytes, "stream cut at byte limit");
            return Ok(LimitedBytes {
                bytes,
                truncated: true,
            });
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(LimitedBytes {
        bytes,
        truncated: false,
    })
}

/// Unwinds a `Content-Encoding` stack through an optional [`Decompressor`].
#[derive(Clone)]
pub struct StreamDecompressor {
    backend: Option<Arc<dyn Decompressor>>,
}

impl StreamDecompressor {
    pub fn new(backend: Arc<dyn Decompressor>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    /// Backed by flate2 and brotli.
    pub fn native(chunk_size: usize) -> Self {
        Self::new(Arc::new(NativeDecompressor::new(chunk_size)))
    }

    /// Without any codec; every call fails with `DecompressionUnavailable`.
    pub fn unavailable() -> Self {
        Self { backend: None }
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    /// Undo `encodings` (listed in the order they were applied) over `bytes`.
    ///
    /// Layers are unwound last-applied first, each one capped at `max_bytes`.
    /// If an inner layer was already cut short, a later layer failing on the
    /// truncated stream keeps what it produced instead of erroring.
    pub fn decompress_bytes(
        &self,
        bytes: &[u8],
        encodings: &[String],
        max_bytes: usize,
    ) -> Result<LimitedBytes, DecodeError> {
        let Some(backend) = self.backend.as_deref() else {
            return Err(DecodeError::DecompressionUnavailable {
                encoding: encodings.join(", "),
                original_size: bytes.len(),
            });
        };

        let mut current: Cow<'_, [u8]> = Cow::Borrowed(bytes);
        let mut truncated = false;

        for encoding in encodings.iter().rev() {
            let original_size = current.len();
            let coding = ContentCoding::from_token(encoding).ok_or_else(|| {
                DecodeError::UnsupportedEncoding {
                    encoding: encoding.clone(),
                    original_size,
                }
            })?;

            let output = {
                let mut source = backend.open(coding, &current);
                match read_stream_with_limit(source.as_mut(), max_bytes) {
                    Ok(output) => output,
                    Err(partial) if truncated && !partial.bytes.is_empty() => {
                        tracing::debug!(
                            encoding = %coding,
                            error = %partial.error,
                            "layer failed on truncated input, keeping partial output"
                        );
                        LimitedBytes {
                            bytes: partial.bytes,
                            truncated: true,
                        }
                    }
                    Err(partial) => {
                        return Err(DecodeError::DecompressionFailed {
                            encoding: encoding.clone(),
                            original_size,
                            decompressed_so_far: partial.bytes.len(),
                            source: partial.error,
                        });
                    }
                }
            };

            if output.bytes.is_empty() && original_size > 0 {
                return Err(DecodeError::EmptyAfterDecompress {
                    encoding: encoding.clone(),
                    original_size,
                });
            }

            tracing::debug!(
                encoding = %coding,
                input = original_size,
                output = output.bytes.len(),
                truncated = output.truncated,
                "decoded layer"
            );
            truncated |= output.truncated;
            current = Cow::Owned(output.bytes);
        }

        Ok(LimitedBytes {
            bytes: current.into_owned(),
            truncated,
        })
    }
}

impl fmt::Debug for StreamDecompressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamDecompressor")
            .field("available", &self.is_available())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::*;
    use crate::body::fixtures;

    /// Endless source of `x` chunks that records cancellation.
    struct Bomb {
        cancelled: Arc<AtomicBool>,
        produced: Arc<AtomicUsize>,
    }

    impl Iterator for Bomb {
        type Item = io::Result<Vec<u8>>;

        fn next(&mut self) -> Option<Self::Item> {
            if self.cancelled.load(Ordering::SeqCst) {
                return None;
            }
            self.produced.fetch_add(1, Ordering::SeqCst);
            Some(Ok(vec![b'x'; 1000]))
        }
    }

    impl ChunkSource for Bomb {
        fn cancel(&mut self) {
            self.cancelled.store(true, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct BombDecompressor {
        cancelled: Arc<AtomicBool>,
        produced: Arc<AtomicUsize>,
    }

    impl Decompressor for BombDecompressor {
        fn open<'a>(&self, _coding: ContentCoding, _input: &'a [u8]) -> Box<dyn ChunkSource + 'a> {
            Box::new(Bomb {
                cancelled: self.cancelled.clone(),
                produced: self.produced.clone(),
            })
        }
    }

    /// Produces nothing at all.
    struct SilentDecompressor;

    impl Decompressor for SilentDecompressor {
        fn open<'a>(&self, _coding: ContentCoding, _input: &'a [u8]) -> Box<dyn ChunkSource + 'a> {
            Box::new(ReaderChunks::new(io::empty(), 16))
        }
    }

    fn encodings(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn content_encoding_header_is_normalized() {
        assert_eq!(
            parse_content_encoding(Some(" GZIP , identity,, br")),
            vec!["gzip".to_string(), "br".to_string()]
        );
        assert!(parse_content_encoding(Some("identity")).is_empty());
        assert!(parse_content_encoding(None).is_empty());
    }

    #[test]
    fn coding_tokens() {
        assert_eq!(ContentCoding::from_token("GZip"), Some(ContentCoding::Gzip));
        assert_eq!(ContentCoding::from_token("br"), Some(ContentCoding::Brotli));
        assert_eq!(ContentCoding::from_token("zstd"), None);
        assert_eq!(ContentCoding::Deflate.to_string(), "deflate");
    }

    #[test]
    fn limit_cuts_final_chunk_and_cancels() {
        let mut source = ReaderChunks::new(&b"0123456789abcdef"[..], 4);
        let out = read_stream_with_limit(&mut source, 10).unwrap();
        assert_eq!(out.bytes, b"0123456789");
        assert!(out.truncated);
        assert!(source.is_cancelled());
    }

    #[test]
    fn limit_equal_to_length_is_not_truncated() {
        let mut source = ReaderChunks::new(&b"0123456789"[..], 3);
        let out = read_stream_with_limit(&mut source, 10).unwrap();
        assert_eq!(out.bytes, b"0123456789");
        assert!(!out.truncated);
    }

    #[test]
    fn bomb_is_cancelled_at_the_cap() {
        let backend = Arc::new(BombDecompressor::default());
        let decompressor = StreamDecompressor::new(backend.clone());
        let out = decompressor
            .decompress_bytes(b"whatever", &encodings(&["gzip"]), 2500)
            .unwrap();
        assert_eq!(out.bytes.len(), 2500);
        assert!(out.truncated);
        assert!(backend.cancelled.load(Ordering::SeqCst));
        assert_eq!(backend.produced.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn unwinds_layers_in_reverse() {
        let original = b"layered body ".repeat(20);
        // gzip applied first, then br
        let encoded = fixtures::brotli(&fixtures::gzip(&original));
        let out = StreamDecompressor::native(1024)
            .decompress_bytes(&encoded, &encodings(&["gzip", "br"]), 1 << 20)
            .unwrap();
        assert_eq!(out.bytes, original);
        assert!(!out.truncated);
    }

    #[test]
    fn deflate_accepts_zlib_and_raw() {
        let original = b"deflate me please".repeat(8);
        let decompressor = StreamDecompressor::native(64);
        for encoded in [fixtures::zlib(&original), fixtures::raw_deflate(&original)] {
            let out = decompressor
                .decompress_bytes(&encoded, &encodings(&["deflate"]), 1 << 20)
                .unwrap();
            assert_eq!(out.bytes, original);
        }
    }

    #[test]
    fn unavailable_fails_before_any_layer() {
        let err = StreamDecompressor::unavailable()
            .decompress_bytes(b"abc", &encodings(&["zstd", "gzip"]), 100)
            .unwrap_err();
        assert!(matches!(err, DecodeError::DecompressionUnavailable { .. }));
        assert_eq!(err.original_size(), 3);
    }

    #[test]
    fn unknown_encoding_is_unsupported() {
        let err = StreamDecompressor::native(64)
            .decompress_bytes(b"abc", &encodings(&["zstd"]), 100)
            .unwrap_err();
        match err {
            DecodeError::UnsupportedEncoding { encoding, .. } => assert_eq!(encoding, "zstd"),
            other => panic!("expected UnsupportedEncoding, got: {:?}", other),
        }
    }

    #[test]
    fn corrupt_gzip_fails_with_cause() {
        let mut encoded = fixtures::gzip(&b"some text that will be corrupted".repeat(4));
        let len = encoded.len();
        for b in &mut encoded[10..len - 8] {
            *b = 0xFF;
        }
        let err = StreamDecompressor::native(64)
            .decompress_bytes(&encoded, &encodings(&["gzip"]), 1 << 20)
            .unwrap_err();
        assert!(matches!(err, DecodeError::DecompressionFailed { .. }));
        assert_eq!(err.encoding(), "gzip");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn empty_output_from_non_empty_input_is_an_error() {
        let err = StreamDecompressor::new(Arc::new(SilentDecompressor))
            .decompress_bytes(b"not empty", &encodings(&["br"]), 100)
            .unwrap_err();
        assert!(matches!(err, DecodeError::EmptyAfterDecompress { .. }));
    }

    #[test]
    fn truncated_inner_layer_keeps_partial_output() {
        let original: Vec<u8> = (0..50_000u32).flat_map(|i| i.to_le_bytes()).collect();
        // gzip(gzip(original)): the outer layer is cut, the inner one sees a short stream
        let encoded = fixtures::gzip(&fixtures::gzip(&original));
        let inner_len = fixtures::gzip(&original).len();
        let cap = inner_len / 2;
        let out = StreamDecompressor::native(512)
            .decompress_bytes(&encoded, &encodings(&["gzip", "gzip"]), cap)
            .unwrap();
        assert!(out.truncated);
        assert!(!out.bytes.is_empty());
        assert!(out.bytes.len() <= cap);
        assert_eq!(&original[..out.bytes.len()], &out.bytes[..]);
    }
}
