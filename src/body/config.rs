/// Default cap on bytes materialized for display (1 MiB)
pub const DEFAULT_MAX_PREVIEW_BYTES: usize = 1024 * 1024;

/// Bytes inspected when sniffing a body
pub const SNIFF_PREFIX_BYTES: usize = 4096;

/// Bodies declared larger than this are never decompressed (5 MiB)
pub const MAX_COMPRESSED_BYTES: u64 = 5 * 1024 * 1024;

/// Limits for body decoding
#[derive(Debug, Clone)]
pub struct InspectorConfig {
    /// Maximum bytes materialized per decode unless overridden per call
    pub max_preview_bytes: usize,

    /// Prefix size used for text and compression sniffing
    pub sniff_prefix_bytes: usize,

    /// Declared or wire size above which decompression is skipped
    pub max_compressed_bytes: u64,

    /// Size of the chunks pulled from a decompression stream
    pub chunk_size: usize,
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            max_preview_bytes: DEFAULT_MAX_PREVIEW_BYTES,
            sniff_prefix_bytes: SNIFF_PREFIX_BYTES,
            max_compressed_bytes: MAX_COMPRESSED_BYTES,
            chunk_size: 64 * 1024,
        }
    }
}

/// Per-call overrides
#[derive(Debug, Clone, Default)]
pub struct DecodeOptions {
    /// Used instead of the `Content-Type` header
    pub content_type: Option<String>,

    /// Used instead of [`InspectorConfig::max_preview_bytes`]
    pub max_preview_bytes: Option<usize>,
}

impl DecodeOptions {
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_max_preview_bytes(mut self, max_preview_bytes: usize) -> Self {
        self.max_preview_bytes = Some(max_preview_bytes);
        self
    }
}
