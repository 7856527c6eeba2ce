use encoding_rs::{Encoding, UTF_8};

use crate::protocol::ContentTypeInfo;

/// Non-`text/*` MIME types that are safe to render as text
const TEXT_MIME_TYPES: &[&str] = &[
    "application/json",
    "application/ld+json",
    "application/problem+json",
    "application/x-ndjson",
    "application/ndjson",
    "application/json-seq",
    "application/javascript",
    "application/x-javascript",
    "application/ecmascript",
    "application/xml",
    "application/xhtml+xml",
    "application/rss+xml",
    "application/atom+xml",
    "application/soap+xml",
    "application/x-www-form-urlencoded",
    "application/graphql",
    "application/x-yaml",
    "application/yaml",
    "application/toml",
    "application/sql",
    "image/svg+xml",
];

/// MIME types whose payload is never meant to be read as text
const BINARY_MIME_TYPES: &[&str] = &[
    "application/octet-stream",
    "application/pdf",
    "application/zip",
    "application/gzip",
    "application/x-gzip",
    "application/x-tar",
    "application/x-7z-compressed",
    "application/x-rar-compressed",
    "application/vnd.rar",
    "application/x-bzip2",
    "application/x-xz",
    "application/zstd",
    "application/msword",
    "application/vnd.ms-excel",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "application/vnd.oasis.opendocument.text",
    "application/vnd.oasis.opendocument.spreadsheet",
    "application/font-woff",
    "application/font-woff2",
    "application/x-font-ttf",
    "application/x-font-otf",
    "application/vnd.ms-fontobject",
    "font/woff",
    "font/woff2",
    "font/ttf",
    "font/otf",
    "application/protobuf",
    "application/x-protobuf",
    "application/vnd.google.protobuf",
    "application/grpc",
    "application/grpc+proto",
    "application/grpc-web",
    "application/grpc-web+proto",
    "application/msgpack",
    "application/x-msgpack",
    "application/vnd.msgpack",
    "application/cbor",
    "application/x-thrift",
    "application/vnd.apache.thrift.binary",
    "application/vnd.apache.thrift.compact",
    "application/avro",
    "application/vnd.apache.avro+binary",
    "application/x-flatbuffers",
    "application/vnd.sqlite3",
    "application/x-sqlite3",
    "application/wasm",
    "application/java-archive",
    "application/x-java-archive",
    "application/x-shockwave-flash",
];

/// Parse a `Content-Type` header value into its MIME type and charset.
///
/// Both parts come back lowercased; the charset loses surrounding quotes.
pub fn parse_content_type(raw: Option<&str>) -> ContentTypeInfo {
    let Some(raw) = raw else {
        return ContentTypeInfo::default();
    };

    let mut parts = raw.split(';');
    let mime_type = parts
        .next()
        .map(|m| m.trim().to_ascii_lowercase())
        .filter(|m| !m.is_empty());

    let charset = parts.find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        let value = value.trim().trim_matches(|c| c == '"' || c == '\'').trim();
        (!value.is_empty()).then(|| value.to_ascii_lowercase())
    });

    ContentTypeInfo { mime_type, charset }
}

/// Check if a content type is text-based (safe to display as text)
pub fn is_text_content_type(raw: Option<&str>) -> bool {
    parse_content_type(raw)
        .mime_type
        .as_deref()
        .is_some_and(is_text_mime)
}

/// Check if a content type names a binary format
pub fn is_binary_content_type(raw: Option<&str>) -> bool {
    parse_content_type(raw)
        .mime_type
        .as_deref()
        .is_some_and(is_binary_mime)
}

/// Text check on an already-normalized MIME type.
pub fn is_text_mime(mime: &str) -> bool {
    mime.starts_with("text/")
        || mime.ends_with("+json")
        || mime.ends_with("+xml")
        || TEXT_MIME_TYPES.contains(&mime)
}

/// Binary check on an already-normalized MIME type.
pub fn is_binary_mime(mime: &str) -> bool {
    if mime == "image/svg+xml" {
        return false;
    }
    mime.starts_with("image/")
        || mime.starts_with("audio/")
        || mime.starts_with("video/")
        || BINARY_MIME_TYPES.contains(&mime)
}

/// Decode bytes as text in the named charset.
///
/// Unknown labels fall back to UTF-8 and a BOM overrides the label. Returns
/// the text and the lowercase name of the charset actually used.
pub fn decode_text(buffer: &[u8], charset: Option<&str>) -> (String, String) {
    let encoding = charset
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8);
    let (text, used, _) = encoding.decode(buffer);
    (text.into_owned(), used.name().to_ascii_lowercase())
}

/// Detect a binary format from magic bytes.
pub fn detect_format(buffer: &[u8]) -> Option<String> {
    infer::get(buffer).map(|kind| kind.mime_type().to_string())
}
