//! Decode and classify captured HTTP response bodies for display.

pub mod body;
pub mod capture;
pub mod protocol;

pub use body::config::{DecodeOptions, InspectorConfig};
pub use body::diff::summarize_body_for_diff;
pub use body::error::{DecodeError, InspectError};
pub use body::headers::HeaderSet;
pub use body::BodyInspector;
pub use protocol::{BodyKind, CapturedBody, ContentTypeInfo, DisplayResult};
