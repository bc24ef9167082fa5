//! Non-fatal decode diagnostics
//!
//! Decoding is best-effort: data errors are recorded against the offending
//! element path and the raw JSON is preserved so the round-trip still holds.

use std::fmt;

use crate::path::JsonPath;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A field's JSON shape disagrees with its descriptor; the raw value was
    /// kept in the unmodeled side-table.
    FieldTypeMismatch,
    /// More than one key of a `[x]` choice group was present; the first by
    /// declaration order won, the rest were kept raw.
    AmbiguousChoice,
    /// A primitive had the right JSON shape but an invalid lexical form
    /// (e.g. a malformed date). The value was kept as-is.
    InvalidPrimitive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, path: &JsonPath, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.as_str().to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}
