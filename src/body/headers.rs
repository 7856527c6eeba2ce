use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

/// Standard alphabet, accepts padded and unpadded input alike.
const BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

pub const CONTENT_TYPE: &str = "content-type";
pub const CONTENT_ENCODING: &str = "content-encoding";
pub const CONTENT_LENGTH: &str = "content-length";

/// Response headers as captured, in arrival order.
///
/// Lookups ignore ASCII case and return the first matching entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(into = "BTreeMap<String, String>")]
pub struct HeaderSet {
    entries: Vec<(String, String)>,
}

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.get(CONTENT_TYPE)
    }

    pub fn content_encoding(&self) -> Option<&str> {
        self.get(CONTENT_ENCODING)
    }

    /// `Content-Length`, when it is a valid non-negative integer.
    pub fn content_length(&self) -> Option<u64> {
        self.get(CONTENT_LENGTH)?.trim().parse().ok()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<'de> Deserialize<'de> for HeaderSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HeaderVisitor;

        impl<'de> Visitor<'de> for HeaderVisitor {
            type Value = HeaderSet;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a map of header names to string values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<HeaderSet, A::Error> {
                let mut headers = HeaderSet::new();
                while let Some((name, value)) = access.next_entry::<String, String>()? {
                    headers.insert(name, value);
                }
                Ok(headers)
            }
        }

        deserializer.deserialize_map(HeaderVisitor)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for HeaderSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for HeaderSet {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl From<Vec<(String, String)>> for HeaderSet {
    fn from(entries: Vec<(String, String)>) -> Self {
        Self { entries }
    }
}

impl From<BTreeMap<String, String>> for HeaderSet {
    fn from(map: BTreeMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

impl<S: BuildHasher> From<HashMap<String, String, S>> for HeaderSet {
    fn from(map: HashMap<String, String, S>) -> Self {
        map.into_iter().collect()
    }
}

impl From<HeaderSet> for BTreeMap<String, String> {
    fn from(headers: HeaderSet) -> Self {
        let mut map = BTreeMap::new();
        for (name, value) in headers.entries {
            map.entry(name).or_insert(value);
        }
        map
    }
}

/// Exact decoded length of a base64 string, without decoding it.
pub fn base64_byte_length(encoded: &str) -> u64 {
    let chars = encoded
        .bytes()
        .filter(|&b| b != b'=' && !b.is_ascii_whitespace())
        .count() as u64;
    chars * 3 / 4
}

/// Decode the whole payload.
pub fn decode_base64(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    BASE64.decode(strip_whitespace(encoded).as_bytes())
}

/// Decode just enough of the payload to produce its first `max_bytes` bytes.
pub fn decode_base64_prefix(encoded: &str, max_bytes: usize) -> Result<Vec<u8>, base64::DecodeError> {
    let cleaned = strip_whitespace(encoded);
    let needed = (max_bytes / 3 + usize::from(max_bytes % 3 != 0)).saturating_mul(4);
    if needed >= cleaned.len() {
        return BASE64.decode(cleaned.as_bytes());
    }
    let mut bytes = BASE64.decode(&cleaned.as_bytes()[..needed])?;
    bytes.truncate(max_bytes);
    Ok(bytes)
}

fn strip_whitespace(encoded: &str) -> Cow<'_, str> {
    if encoded.bytes().any(|b| b.is_ascii_whitespace()) {
        Cow::Owned(encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect())
    } else {
        Cow::Borrowed(encoded)
    }
}

#[cfg(test)]
mod tests {
    use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};

    use super::*;

    #[test]
    fn lookup_is_case_insensitive_first_match() {
        let headers = HeaderSet::from([
            ("Content-Type", "text/html"),
            ("content-type", "application/json"),
            ("X-Other", "1"),
        ]);
        assert_eq!(headers.content_type(), Some("text/html"));
        assert_eq!(headers.get("x-other"), Some("1"));
        assert_eq!(headers.get("missing"), None);
    }

    #[test]
    fn content_length_must_be_an_integer() {
        assert_eq!(HeaderSet::from([("Content-Length", " 42 ")]).content_length(), Some(42));
        assert_eq!(HeaderSet::from([("Content-Length", "-1")]).content_length(), None);
        assert_eq!(HeaderSet::from([("Content-Length", "lots")]).content_length(), None);
    }

    #[test]
    fn deserializes_from_json_object() {
        let headers: HeaderSet =
            serde_json::from_str(r#"{"Content-Encoding": "gzip", "Content-Length": "10"}"#).unwrap();
        assert_eq!(headers.content_encoding(), Some("gzip"));
        assert_eq!(headers.content_length(), Some(10));
    }

    #[test]
    fn deserialized_headers_keep_arrival_order() {
        let headers: HeaderSet =
            serde_json::from_str(r#"{"content-type": "text/plain", "Content-Type": "image/png"}"#)
                .unwrap();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.content_type(), Some("text/plain"));
        let names: Vec<&str> = headers.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["content-type", "Content-Type"]);
    }

    #[test]
    fn byte_length_matches_padded_and_unpadded() {
        for len in 0..=9usize {
            let data: Vec<u8> = (0..len as u8).collect();
            assert_eq!(base64_byte_length(&STANDARD.encode(&data)), len as u64);
            assert_eq!(base64_byte_length(&STANDARD_NO_PAD.encode(&data)), len as u64);
        }
        assert_eq!(base64_byte_length("aGVs\nbG8="), 5);
    }

    #[test]
    fn decodes_unpadded_input() {
        assert_eq!(decode_base64("aGVsbG8").unwrap(), b"hello");
        assert_eq!(decode_base64("aGVsbG8=").unwrap(), b"hello");
        assert!(decode_base64("not base64!").is_err());
    }

    #[test]
    fn prefix_decoding_stops_early() {
        let data = b"0123456789abcdefghij";
        let encoded = STANDARD.encode(data);
        assert_eq!(decode_base64_prefix(&encoded, 7).unwrap(), b"0123456");
        assert_eq!(decode_base64_prefix(&encoded, 6).unwrap(), b"012345");
        assert_eq!(decode_base64_prefix(&encoded, 100).unwrap(), data);
        assert_eq!(decode_base64_prefix(&encoded, 0).unwrap(), b"");
    }
}
