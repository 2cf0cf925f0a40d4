//! Error taxonomy.

use thiserror::Error;

/// Failure taxonomy shared by the aggregator and the classifier.
///
/// Only `InvalidInput` is ever returned to a caller. The other variants are
/// recovered where they occur and exist so that recovery sites can log a
/// typed reason.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    /// Malformed request (missing, non-string or empty text, bad payload).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A dependency probe failed at the transport level.
    #[error("probe failed for {target}: {reason}")]
    ProbeFailure {
        /// Probe target name.
        target: String,
        /// Human readable cause.
        reason: String,
    },

    /// Remote classification backend unreachable, failing or timed out.
    #[error("classification backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A start/stop/submit command could not be carried out.
    #[error("action failed: {0}")]
    ActionFailure(String),
}

impl Error {
    /// Shorthand for [`Error::InvalidInput`].
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Shorthand for [`Error::BackendUnavailable`].
    pub fn backend<E: std::fmt::Display>(e: E) -> Self {
        Self::BackendUnavailable(e.to_string())
    }

    /// Shorthand for [`Error::ActionFailure`].
    pub fn action<E: std::fmt::Display>(e: E) -> Self {
        Self::ActionFailure(e.to_string())
    }
}

/// Result alias over [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
