//! Domain error types.

use std::io;

use thiserror::Error;

/// Top-level domain error type for raid orchestration.
#[derive(Debug, Error)]
pub enum RaidsError {
    /// A definitions document or one of its entries is malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// A value did not match its textual format (points, locations).
    #[error("format error: {0}")]
    Format(String),

    /// An unknown raid, template, world, or player was referenced.
    #[error("{0} not found")]
    NotFound(String),

    /// The requested change collides with existing state.
    #[error("{0}")]
    Conflict(String),

    /// Filesystem or archive failure.
    #[error("{context}: {source}")]
    Io {
        /// What was being attempted.
        context: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The caller lacks the permission required for an operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
}

impl RaidsError {
    /// Builds an `Io` error with a description of the failed operation.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}
