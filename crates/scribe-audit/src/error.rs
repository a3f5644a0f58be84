//! Error types for the audit engine.

use scribe_core::AttributeError;
use thiserror::Error;

/// Errors that can occur during audit operations.
#[derive(Debug, Error)]
pub enum AuditError {
    /// A type declares more than one identity attribute.
    #[error("ambiguous identity on '{type_path}': both '{first}' and '{second}' are marked as identity")]
    AmbiguousIdentity {
        type_path: String,
        first: String,
        second: String,
    },

    /// A type that must be audited by identity declares none.
    #[error("no identity attribute declared for '{0}'")]
    MissingIdentity(String),

    /// A required attribute (identity) could not be read.
    #[error("failed to read required attribute: {0}")]
    Attribute(#[from] AttributeError),

    /// The storage sink could not persist or read records.
    #[error("storage error: {0}")]
    Storage(String),

    /// The intercepted repository operation failed.
    #[error("repository error: {0}")]
    Repository(#[from] anyhow::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuditError {
    /// Whether this error is an annotation/declaration mistake rather than
    /// a runtime condition.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::AmbiguousIdentity { .. } | Self::MissingIdentity(_)
        )
    }
}
