//! Content sniffing: compression signatures and text-vs-binary scoring.
//!
//! Headers lie. Everything in here looks only at the bytes.

use super::decompress::ContentCoding;

/// Verdict of [`sniff_text`] together with the ratios that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SniffResult {
    pub looks_like_text: bool,
    pub control_ratio: f64,
    pub invalid_utf8_ratio: f64,
    pub printable_ratio: f64,
}

impl SniffResult {
    fn text() -> Self {
        Self {
            looks_like_text: true,
            control_ratio: 0.0,
            invalid_utf8_ratio: 0.0,
            printable_ratio: 1.0,
        }
    }
}

/// gzip magic: `1F 8B`
pub fn is_gzip_bytes(buffer: &[u8]) -> bool {
    buffer.starts_with(&[0x1F, 0x8B])
}

/// zlib header with no/default/best compression level
pub fn is_zlib_bytes(buffer: &[u8]) -> bool {
    matches!(buffer, [0x78, 0x01 | 0x9C | 0xDA, ..])
}

/// Best-effort Brotli detection.
///
/// Brotli has no magic bytes, so this reads the window size out of the first
/// byte and refuses the guess when the leading bytes look like plain ASCII.
/// Short Brotli streams that start with printable bytes are reported as
/// plaintext; ambiguity resolves towards text.
pub fn is_brotli_bytes(buffer: &[u8]) -> bool {
    let Some(&first) = buffer.first() else {
        return false;
    };

    let head = &buffer[..buffer.len().min(4)];
    if head.iter().all(|&b| is_printable_ascii(b)) {
        return false;
    }

    let wbits = (first >> 1) & 0x7F;
    if (10..=24).contains(&wbits) {
        return true;
    }

    // Empty and tiny streams.
    matches!(first, 0x1B | 0x0B | 0x81)
}

/// Which codec, if any, the leading bytes look like.
pub fn sniff_compression(prefix: &[u8]) -> Option<ContentCoding> {
    if is_gzip_bytes(prefix) {
        Some(ContentCoding::Gzip)
    } else if is_zlib_bytes(prefix) {
        Some(ContentCoding::Deflate)
    } else if is_brotli_bytes(prefix) {
        Some(ContentCoding::Brotli)
    } else {
        None
    }
}

/// Decide whether a body labelled with `encoding` is worth decompressing.
///
/// A prefix that already reads as text is only decompressed when the claimed
/// codec's magic bytes are really there. Brotli can't be verified that way, so
/// a text-looking `br` body is never attempted. Unknown encodings are always
/// attempted and fail later with a proper error.
pub fn should_attempt_decompress(encoding: &str, prefix: &[u8], sniffed_as_text: bool) -> bool {
    if !sniffed_as_text {
        return true;
    }
    match ContentCoding::from_token(encoding) {
        Some(ContentCoding::Gzip) => is_gzip_bytes(prefix),
        Some(ContentCoding::Deflate) => is_zlib_bytes(prefix),
        Some(ContentCoding::Brotli) => false,
        None => true,
    }
}

/// Heuristic for deciding if a buffer is "text enough" to render.
pub fn is_probably_text(buffer: &[u8]) -> bool {
    sniff_text(buffer).looks_like_text
}

/// [`is_probably_text`] for a buffer cut out of a longer body.
///
/// When `cut` is set, a multi-byte character split by the cut is dropped
/// before scoring.
pub fn is_probably_text_prefix(buffer: &[u8], cut: bool) -> bool {
    if cut {
        is_probably_text(trim_partial_utf8(buffer))
    } else {
        is_probably_text(buffer)
    }
}

/// Drop a trailing UTF-8 sequence that is well formed so far but incomplete.
pub fn trim_partial_utf8(buffer: &[u8]) -> &[u8] {
    let len = buffer.len();
    for start in (len.saturating_sub(3)..len).rev() {
        let lead = buffer[start];
        if lead & 0xC0 == 0x80 {
            continue;
        }
        let needed = match lead {
            0xC2..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF4 => 4,
            _ => return buffer,
        };
        let tail = &buffer[start + 1..];
        if tail.len() + 1 >= needed {
            return buffer;
        }
        let second_ok = match (lead, tail.first()) {
            (_, None) => true,
            (0xE0, Some(&b)) => (0xA0..=0xBF).contains(&b),
            (0xED, Some(&b)) => (0x80..=0x9F).contains(&b),
            (0xF0, Some(&b)) => (0x90..=0xBF).contains(&b),
            (0xF4, Some(&b)) => (0x80..=0x8F).contains(&b),
            _ => true,
        };
        return if second_ok { &buffer[..start] } else { buffer };
    }
    buffer
}

/// Score a buffer in one forward pass.
///
/// Tab/LF/CR, printable ASCII and every byte of a well-formed UTF-8 sequence
/// count as printable. Overlong forms, surrogates and stray continuation
/// bytes each count as one invalid unit. Any NUL byte means binary.
pub fn sniff_text(buffer: &[u8]) -> SniffResult {
    if buffer.is_empty() {
        return SniffResult::text();
    }

    let mut printable = 0usize;
    let mut control = 0usize;
    let mut invalid = 0usize;
    let mut i = 0usize;

    while i < buffer.len() {
        let b = buffer[i];
        if b == 0 {
            return SniffResult {
                looks_like_text: false,
                ..ratios(buffer.len(), printable, control, invalid)
            };
        }

        if b < 0x80 {
            if is_printable_ascii(b) {
                printable += 1;
            } else {
                control += 1;
            }
            i += 1;
            continue;
        }

        match utf8_sequence_len(&buffer[i..]) {
            Some(len) => {
                printable += len;
                i += len;
            }
            None => {
                invalid += 1;
                i += 1;
            }
        }
    }

    let len = buffer.len();
    let looks_like_text = if invalid * 20 > len {
        false
    } else {
        control * 10 < len && printable * 10 > len * 7
    };

    SniffResult {
        looks_like_text,
        ..ratios(len, printable, control, invalid)
    }
}

fn ratios(len: usize, printable: usize, control: usize, invalid: usize) -> SniffResult {
    let len = len as f64;
    SniffResult {
        looks_like_text: false,
        control_ratio: control as f64 / len,
        invalid_utf8_ratio: invalid as f64 / len,
        printable_ratio: printable as f64 / len,
    }
}

fn is_printable_ascii(b: u8) -> bool {
    matches!(b, b'\t' | b'\n' | b'\r' | 0x20..=0x7E)
}

/// Length of the well-formed multi-byte UTF-8 sequence at the start of `bytes`.
fn utf8_sequence_len(bytes: &[u8]) -> Option<usize> {
    let lead = bytes[0];
    let (len, min, initial) = match lead {
        0xC2..=0xDF => (2, 0x80, u32::from(lead & 0x1F)),
        0xE0..=0xEF => (3, 0x800, u32::from(lead & 0x0F)),
        0xF0..=0xF4 => (4, 0x1_0000, u32::from(lead & 0x07)),
        _ => return None,
    };

    let tail = bytes.get(1..len)?;
    let mut code_point = initial;
    for &b in tail {
        if b & 0xC0 != 0x80 {
            return None;
        }
        code_point = (code_point << 6) | u32::from(b & 0x3F);
    }

    if code_point < min || code_point > 0x10_FFFF || (0xD800..=0xDFFF).contains(&code_point) {
        return None;
    }
    Some(len)
}
