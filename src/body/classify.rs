//! Turns a captured payload plus (possibly lying) headers into a
//! [`DisplayResult`].
//!
//! Header claims are hints; the bytes decide. Decompression is bounded by
//! the preview cap, skipped for oversized bodies and for bodies that are
//! plainly not compressed, and every failure degrades to a result with a
//! warning rather than an error.

use std::sync::Arc;

use crate::protocol::{BodyKind, DisplayResult};

use super::config::{DecodeOptions, InspectorConfig};
use super::decompress::{parse_content_encoding, StreamDecompressor};
use super::error::{DecodeError, InspectError};
use super::headers::{base64_byte_length, decode_base64, decode_base64_prefix, HeaderSet};
use super::mime::{decode_text, detect_format, is_binary_mime, is_text_mime, parse_content_type};
use super::sniff::{is_probably_text_prefix, should_attempt_decompress, sniff_compression};

#[derive(Debug, Clone)]
pub struct BodyClassifier {
    config: Arc<InspectorConfig>,
    decompressor: StreamDecompressor,
}

/// Fields every result of one decode call shares.
struct Frame {
    size: u64,
    content_type: Option<String>,
    content_encoding: Option<String>,
    charset: Option<String>,
    text_by_type: bool,
    binary_by_type: bool,
}

impl Frame {
    fn binary(&self, warning: Option<String>, prefix: &[u8]) -> DisplayResult {
        DisplayResult {
            kind: BodyKind::Binary,
            size: self.size,
            content_type: self.content_type.clone(),
            content_encoding: self.content_encoding.clone(),
            text: None,
            charset: None,
            truncated: false,
            warning,
            detected_type: detect_format(prefix),
        }
    }

    /// `cut` says whether `bytes` stops short of the real content.
    fn text(&self, bytes: &[u8], warning: Option<String>, cut: bool) -> DisplayResult {
        let (text, charset) = decode_text(bytes, self.charset.as_deref());
        let mut result = DisplayResult {
            kind: BodyKind::Text,
            size: self.size,
            content_type: self.content_type.clone(),
            content_encoding: self.content_encoding.clone(),
            text: Some(text),
            charset: Some(charset),
            truncated: cut && (bytes.len() as u64) < self.size,
            warning,
            detected_type: None,
        };
        if cut {
            result.push_warning(format!(
                "Body truncated for display: showing first {}",
                format_size(bytes.len() as u64)
            ));
        }
        result
    }

    fn mime(&self) -> &str {
        self.content_type.as_deref().unwrap_or("unknown")
    }

    /// Header-vs-sniff decision on the bytes that will be shown.
    fn classify(&self, bytes: &[u8], prefix: &[u8], sniffed_text: bool, cut: bool) -> DisplayResult {
        if !sniffed_text {
            if self.binary_by_type && !self.text_by_type {
                tracing::debug!(mime = self.mime(), "binary by type and by content");
                return self.binary(None, prefix);
            }
            if self.text_by_type {
                tracing::debug!(mime = self.mime(), "text content type over binary content");
                return self.binary(
                    Some(format!(
                        "Content-Type says {} but the content looks binary",
                        self.mime()
                    )),
                    prefix,
                );
            }
            return self.binary(
                Some("Unknown content type; treated as binary".to_string()),
                prefix,
            );
        }

        let warning = (self.binary_by_type && !self.text_by_type).then(|| {
            format!(
                "Content-Type says {} but the content looks like text",
                self.mime()
            )
        });
        self.text(bytes, warning, cut)
    }
}

impl BodyClassifier {
    pub fn new(config: Arc<InspectorConfig>, decompressor: StreamDecompressor) -> Self {
        Self {
            config,
            decompressor,
        }
    }

    pub fn config(&self) -> &InspectorConfig {
        self.config.as_ref()
    }

    /// Classify one captured body.
    ///
    /// Only malformed base64 is reported as an error; everything else,
    /// including decompression failure, yields a result.
    pub fn decode(
        &self,
        body: Option<&str>,
        headers: &HeaderSet,
        options: &DecodeOptions,
    ) -> Result<DisplayResult, InspectError> {
        let type_info =
            parse_content_type(options.content_type.as_deref().or(headers.content_type()));
        let content_encoding = headers.content_encoding().map(str::to_string);

        let body = match body {
            Some(body) if !body.trim().is_empty() => body,
            _ => return Ok(DisplayResult::empty(type_info.mime_type, content_encoding)),
        };

        let max_preview = options
            .max_preview_bytes
            .unwrap_or(self.config.max_preview_bytes)
            .max(1);
        let sniff_len = self.config.sniff_prefix_bytes.min(max_preview);
        let wire_size = base64_byte_length(body);

        let preview = decode_base64_prefix(body, max_preview)?;
        if preview.is_empty() {
            return Ok(DisplayResult::empty(type_info.mime_type, content_encoding));
        }
        let prefix = &preview[..preview.len().min(sniff_len)];
        let sniffed_text = is_probably_text_prefix(prefix, (prefix.len() as u64) < wire_size);

        let mime = type_info.mime_type.as_deref();
        let frame = Frame {
            size: headers.content_length().unwrap_or(wire_size),
            text_by_type: mime.is_some_and(is_text_mime),
            binary_by_type: mime.is_some_and(is_binary_mime),
            content_type: type_info.mime_type.clone(),
            content_encoding,
            charset: type_info.charset,
        };

        let encodings = parse_content_encoding(frame.content_encoding.as_deref());
        let Some(outermost) = encodings.last() else {
            let cut = (preview.len() as u64) < frame.size;
            return Ok(frame.classify(&preview, prefix, sniffed_text, cut));
        };
        let label = encodings.join(", ");

        let compressed_size = frame.size.max(wire_size);
        if compressed_size > self.config.max_compressed_bytes {
            tracing::debug!(compressed_size, encoding = %label, "too large to decompress");
            return Ok(frame.binary(
                Some(format!(
                    "Compressed body ({}) is too large to decompress here ({}); download to inspect",
                    label,
                    format_size(compressed_size)
                )),
                prefix,
            ));
        }

        if !should_attempt_decompress(outermost, prefix, sniffed_text) {
            tracing::debug!(encoding = %label, "body is not actually compressed");
            let cut = (preview.len() as u64) < frame.size;
            return Ok(frame.text(
                &preview,
                Some(format!(
                    "Content-Encoding says {} but the body is not compressed; showing as-is",
                    label
                )),
                cut,
            ));
        }

        let raw = decode_base64(body)?;
        match self.decompressor.decompress_bytes(&raw, &encodings, max_preview) {
            Ok(output) => {
                let prefix = &output.bytes[..output.bytes.len().min(sniff_len)];
                let cut = output.truncated || prefix.len() < output.bytes.len();
                let sniffed_text = is_probably_text_prefix(prefix, cut);
                Ok(frame.classify(&output.bytes, prefix, sniffed_text, output.truncated))
            }
            Err(err) => Ok(self.recover(&frame, &raw, max_preview, sniffed_text, &label, &err)),
        }
    }

    /// Best available result after decompression failed.
    fn recover(
        &self,
        frame: &Frame,
        raw: &[u8],
        max_preview: usize,
        sniffed_text: bool,
        label: &str,
        err: &DecodeError,
    ) -> DisplayResult {
        tracing::warn!(
            encoding = err.encoding(),
            original_size = err.original_size(),
            decompressed_so_far = err.decompressed_so_far(),
            "decompression failed: {}",
            err
        );

        let prefix = &raw[..raw.len().min(self.config.sniff_prefix_bytes)];
        if sniffed_text {
            let shown = &raw[..raw.len().min(max_preview)];
            let cut = (shown.len() as u64) < frame.size;
            return frame.text(
                shown,
                Some(format!(
                    "Body is marked {} but decompression failed; showing raw bytes",
                    label
                )),
                cut,
            );
        }

        let mut warning = format!("Body is {}-compressed and cannot be decompressed here", label);
        if let Some(sniffed) = sniff_compression(prefix) {
            if sniffed.as_token() != err.encoding() {
                warning.push_str(&format!(" (bytes look like {})", sniffed));
            }
        }
        frame.binary(Some(warning), prefix)
    }
}

/// Human-readable size: KiB or MiB with one decimal. Below 1 KiB the exact
/// byte count is shown instead of a fractional KB.
pub(crate) fn format_size(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    if bytes < 1024 {
        format!("{} bytes", bytes)
    } else if (bytes as f64) < KIB * KIB {
        format!("{:.1} KB", bytes as f64 / KIB)
    } else {
        format!("{:.1} MB", bytes as f64 / (KIB * KIB))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_sizes() {
        assert_eq!(format_size(10), "10 bytes");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }
}
