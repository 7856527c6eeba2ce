//! Captured body input
//!
//! Loads captures from JSON capture files, raw body files or stdin.

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use crate::body::headers::HeaderSet;
use crate::protocol::CapturedBody;

/// Read a path, with `-` meaning stdin
fn read_input(path: &Path) -> io::Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut data = Vec::new();
        io::stdin().lock().read_to_end(&mut data)?;
        return Ok(data);
    }
    fs::read(path)
}

/// Load a JSON capture (`{"body": "<base64>", "headers": {...}}`)
pub fn load_capture(path: &Path) -> io::Result<CapturedBody> {
    let data = read_input(path)?;
    parse_capture(&data)
}

pub fn parse_capture(data: &[u8]) -> io::Result<CapturedBody> {
    serde_json::from_slice(data).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Wrap a raw body file as a capture
pub fn load_raw(path: &Path, headers: HeaderSet) -> io::Result<CapturedBody> {
    let data = read_input(path)?;
    Ok(CapturedBody {
        body: (!data.is_empty()).then(|| BASE64.encode(&data)),
        headers,
    })
}

/// Parse `Name: value` header arguments
pub fn parse_header_arg(arg: &str) -> Result<(String, String), String> {
    let (name, value) = arg
        .split_once(':')
        .ok_or_else(|| format!("expected `Name: value`, got `{}`", arg))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty header name in `{}`", arg));
    }
    Ok((name.to_string(), value.trim().to_string()))
}
