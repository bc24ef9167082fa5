//! Error types for the type registry

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("duplicate type in registry: {0}")]
    DuplicateType(String),

    #[error("invalid descriptor table: {0}")]
    InvalidTable(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RegistryError>;
