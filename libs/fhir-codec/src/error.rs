//! Fatal codec errors
//!
//! Only conditions that make the whole decode/encode call meaningless are
//! errors. Recoverable problems (shape mismatches, ambiguous choice keys,
//! bad date lexicals) become [`crate::Diagnostic`]s on the decoded instance
//! instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a JSON object at {path}")]
    ExpectedObject { path: String },

    #[error("missing resourceType property")]
    MissingResourceType,

    #[error("unknown resource type: {0}")]
    UnknownResourceType(String),
}

pub type Result<T> = std::result::Result<T, CodecError>;
