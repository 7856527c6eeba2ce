use thiserror::Error;

/// Failure inside the decompression pipeline.
///
/// Never leaves the classifier: every variant ends up as a warning on a
/// [`DisplayResult`](crate::protocol::DisplayResult).
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unsupported content encoding `{encoding}`")]
    UnsupportedEncoding { encoding: String, original_size: usize },

    #[error("no decompressor available for `{encoding}`")]
    DecompressionUnavailable { encoding: String, original_size: usize },

    #[error("{encoding} decompression failed after {decompressed_so_far} bytes: {source}")]
    DecompressionFailed {
        encoding: String,
        original_size: usize,
        decompressed_so_far: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("{encoding} stream of {original_size} bytes decompressed to nothing")]
    EmptyAfterDecompress { encoding: String, original_size: usize },
}

impl DecodeError {
    pub fn encoding(&self) -> &str {
        match self {
            DecodeError::UnsupportedEncoding { encoding, .. }
            | DecodeError::DecompressionUnavailable { encoding, .. }
            | DecodeError::DecompressionFailed { encoding, .. }
            | DecodeError::EmptyAfterDecompress { encoding, .. } => encoding,
        }
    }

    /// Size of the input handed to the failing layer.
    pub fn original_size(&self) -> usize {
        match self {
            DecodeError::UnsupportedEncoding { original_size, .. }
            | DecodeError::DecompressionUnavailable { original_size, .. }
            | DecodeError::DecompressionFailed { original_size, .. }
            | DecodeError::EmptyAfterDecompress { original_size, .. } => *original_size,
        }
    }

    pub fn decompressed_so_far(&self) -> usize {
        match self {
            DecodeError::DecompressionFailed {
                decompressed_so_far,
                ..
            } => *decompressed_so_far,
            _ => 0,
        }
    }
}

/// Errors that reach callers of [`BodyInspector`](super::BodyInspector).
#[derive(Debug, Error)]
pub enum InspectError {
    #[error("body is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("decode worker did not finish: {0}")]
    Worker(#[from] tokio::task::JoinError),
}
