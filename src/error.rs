//! Error types for the form state engine.

use std::path::PathBuf;
use thiserror::Error;

use crate::path::FieldPath;
use crate::template::TemplateError;

/// Errors while parsing a field path.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("empty segment in path \"{path}\"")]
    EmptySegment { path: String },

    #[error("unterminated index bracket in path \"{path}\"")]
    UnterminatedIndex { path: String },

    #[error("invalid array index \"{segment}\" in path \"{path}\"")]
    InvalidIndex { path: String, segment: String },
}

/// Errors while loading or parsing a form model.
#[derive(Debug, Error)]
pub enum ModelError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    // Model errors (exit code 2)
    #[error("invalid template at {path}: {source}")]
    InvalidTemplate {
        path: String,
        #[source]
        source: TemplateError,
    },

    #[error("invalid {key} at {path}: expected {expected}, got {actual}")]
    InvalidExtension {
        key: String,
        path: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("invalid recordsPath at {path}: {source}")]
    InvalidRecordsPath {
        path: String,
        #[source]
        source: PathError,
    },

    #[error("invalid schema: {message}")]
    InvalidSchema { message: String },
}

impl ModelError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::FileNotFound { .. } | Self::ReadError { .. } => 3,
            _ => 2,
        }
    }
}

/// Protocol violations at the reducer entry point.
///
/// A dispatch with an unrecognized or malformed transition returns one of
/// these; the caller keeps the previous state rather than corrupting it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("unrecognized transition kind \"{kind}\"")]
    UnknownTransition { kind: String },

    #[error("transition has no \"type\" field")]
    MissingKind,

    #[error("malformed {kind} transition: {message}")]
    MalformedTransition { kind: String, message: String },
}

/// Single resolution error with field context.
///
/// Delivered on the per-field error channel, independent of the
/// validation-result channel.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FieldError {
    /// Field the error belongs to.
    pub path: FieldPath,
    /// Human-readable error message.
    pub message: String,
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_error_exit_codes() {
        let err = ModelError::FileNotFound {
            path: PathBuf::from("model.json"),
        };
        assert_eq!(err.exit_code(), 3);

        let err = ModelError::InvalidSchema {
            message: "bad schema".into(),
        };
        assert_eq!(err.exit_code(), 2);

        let err = ModelError::InvalidExtension {
            key: "endpoint".into(),
            path: "/properties/foo/endpoint".into(),
            expected: "string",
            actual: "number",
        };
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn field_error_display() {
        let err = FieldError {
            path: "foo.bar".parse().unwrap(),
            message: "fetch failed".into(),
        };
        assert_eq!(err.to_string(), "foo.bar: fetch failed");
    }

    #[test]
    fn store_error_display() {
        let err = StoreError::UnknownTransition {
            kind: "NOPE".into(),
        };
        assert_eq!(err.to_string(), "unrecognized transition kind \"NOPE\"");
    }
}
