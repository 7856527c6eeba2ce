//! One-line body summaries for side-by-side diff views.
//!
//! Nothing is decompressed here; compressed and binary bodies collapse into a
//! placeholder so two captures can still be compared cheaply.

use super::config::SNIFF_PREFIX_BYTES;
use super::decompress::parse_content_encoding;
use super::headers::{base64_byte_length, decode_base64, HeaderSet};
use super::mime::{decode_text, detect_format, is_binary_mime, is_text_mime, parse_content_type};
use super::sniff::is_probably_text_prefix;

/// Summarize a body for diffing; `None` when there is no body.
pub fn summarize_body_for_diff(body: Option<&str>, headers: &HeaderSet) -> Option<String> {
    summarize_with_prefix(body, headers, SNIFF_PREFIX_BYTES)
}

pub(crate) fn summarize_with_prefix(
    body: Option<&str>,
    headers: &HeaderSet,
    sniff_prefix_bytes: usize,
) -> Option<String> {
    let body = body.filter(|b| !b.trim().is_empty())?;
    let size = base64_byte_length(body);

    let encodings = parse_content_encoding(headers.content_encoding());
    if !encodings.is_empty() {
        return Some(format!(
            "[{}-encoded body, {} bytes; not decompressed for diff]",
            encodings.join(", "),
            size
        ));
    }

    let info = parse_content_type(headers.content_type());
    let mime = info.mime_type.as_deref();
    let text_by_type = mime.is_some_and(is_text_mime);
    if mime.is_some_and(is_binary_mime) && !text_by_type {
        return Some(binary_placeholder(mime, size));
    }

    let bytes = match decode_base64(body) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!("Body is not valid base64: {}", e);
            return Some(format!("[unparseable content, {} bytes]", size));
        }
    };

    if !text_by_type {
        let prefix = &bytes[..bytes.len().min(sniff_prefix_bytes)];
        if !is_probably_text_prefix(prefix, prefix.len() < bytes.len()) {
            let detected = detect_format(prefix);
            return Some(binary_placeholder(
                mime.or(detected.as_deref()),
                bytes.len() as u64,
            ));
        }
    }

    let (text, _) = decode_text(&bytes, info.charset.as_deref());
    Some(text)
}

fn binary_placeholder(mime: Option<&str>, size: u64) -> String {
    format!(
        "[binary content: {}, {} bytes]",
        mime.unwrap_or("unknown type"),
        size
    )
}

#[cfg(test)]
mod tests {
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

    use super::*;

    #[test]
    fn no_body_has_no_summary() {
        let headers = HeaderSet::new();
        assert_eq!(summarize_body_for_diff(None, &headers), None);
        assert_eq!(summarize_body_for_diff(Some(""), &headers), None);
    }

    #[test]
    fn encoded_body_is_not_decompressed() {
        let headers = HeaderSet::from([("Content-Encoding", "gzip")]);
        let summary = summarize_body_for_diff(Some("H4sIAAAAAAAA"), &headers).unwrap();
        assert_eq!(summary, "[gzip-encoded body, 9 bytes; not decompressed for diff]");
    }

    #[test]
    fn binary_type_reports_exact_length() {
        let headers = HeaderSet::from([("Content-Type", "image/png")]);
        let body = BASE64.encode([1u8, 2, 3, 4, 5]);
        assert_eq!(
            summarize_body_for_diff(Some(&body), &headers).unwrap(),
            "[binary content: image/png, 5 bytes]"
        );
    }

    #[test]
    fn ambiguous_type_is_sniffed() {
        let headers = HeaderSet::new();
        let text = BASE64.encode("{\"a\": 1}");
        assert_eq!(summarize_body_for_diff(Some(&text), &headers).unwrap(), "{\"a\": 1}");

        let binary = BASE64.encode([0u8, 159, 146, 150]);
        assert_eq!(
            summarize_body_for_diff(Some(&binary), &headers).unwrap(),
            "[binary content: unknown type, 4 bytes]"
        );
    }

    #[test]
    fn text_type_uses_charset() {
        let headers = HeaderSet::from([("Content-Type", "text/plain; charset=iso-8859-1")]);
        let body = BASE64.encode([b'c', b'a', b'f', 0xE9]);
        assert_eq!(summarize_body_for_diff(Some(&body), &headers).unwrap(), "café");
    }

    #[test]
    fn malformed_base64_degrades_to_placeholder() {
        let headers = HeaderSet::from([("Content-Type", "text/plain")]);
        let summary = summarize_body_for_diff(Some("%%%%"), &headers).unwrap();
        assert!(summary.starts_with("[unparseable content"));
    }
}
