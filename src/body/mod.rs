//! Response body decoding and classification

pub mod classify;
pub mod config;
pub mod decompress;
pub mod diff;
pub mod error;
pub mod headers;
pub mod mime;
pub mod sniff;

#[cfg(test)]
pub(crate) mod fixtures;

use std::sync::Arc;

use crate::protocol::DisplayResult;

use classify::BodyClassifier;
use config::{DecodeOptions, InspectorConfig};
use decompress::StreamDecompressor;
use error::InspectError;
use headers::HeaderSet;

pub struct BodyInspector {
    config: Arc<InspectorConfig>,
    classifier: BodyClassifier,
}

impl BodyInspector {
    pub fn new(config: InspectorConfig) -> Self {
        let decompressor = StreamDecompressor::native(config.chunk_size);
        Self::with_decompressor(config, decompressor)
    }

    pub fn with_decompressor(config: InspectorConfig, decompressor: StreamDecompressor) -> Self {
        let config = Arc::new(config);
        let classifier = BodyClassifier::new(config.clone(), decompressor);
        Self { config, classifier }
    }

    pub fn config(&self) -> &InspectorConfig {
        self.config.as_ref()
    }

    pub fn classifier(&self) -> &BodyClassifier {
        &self.classifier
    }

    /// Decode a captured body on the current thread.
    pub fn decode(
        &self,
        body: Option<&str>,
        headers: &HeaderSet,
        options: &DecodeOptions,
    ) -> Result<DisplayResult, InspectError> {
        self.classifier.decode(body, headers, options)
    }

    /// Decode a captured body on the blocking pool.
    pub async fn decode_body_for_display(
        &self,
        body: Option<String>,
        headers: HeaderSet,
        options: DecodeOptions,
    ) -> Result<DisplayResult, InspectError> {
        let classifier = self.classifier.clone();
        tokio::task::spawn_blocking(move || classifier.decode(body.as_deref(), &headers, &options))
            .await?
    }

    /// One-line summary for diff views.
    pub fn summarize_body_for_diff(&self, body: Option<&str>, headers: &HeaderSet) -> Option<String> {
        diff::summarize_with_prefix(body, headers, self.config.sniff_prefix_bytes)
    }
}

impl Default for BodyInspector {
    fn default() -> Self {
        Self::new(InspectorConfig::default())
    }
}
