//! Error types for the playlist-dl library.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that abort a whole operation before or outside per-item processing.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed input rejected before any scheduling happens.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The source collection could not be listed at all.
    #[error("Collection {source_id} is unavailable: {reason}")]
    Collection {
        /// Identity of the collection that failed.
        source_id: String,
        /// Underlying retrieval error.
        reason: RetrievalError,
    },

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A configuration file could not be parsed.
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

/// Input validation failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Range spec without the `start:end` separator.
    #[error("index range '{0}' must contain a colon")]
    MissingColon(String),

    /// One side of a range spec is not a positive integer.
    #[error("index range bound '{0}' is not a positive integer")]
    InvalidBound(String),

    /// Both bounds present and the end precedes the start.
    #[error("index range end {end} is before start {start}")]
    EndBeforeStart {
        /// Inclusive lower bound.
        start: usize,
        /// Inclusive upper bound.
        end: usize,
    },

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Classified failure kinds reported by the retrieval and transcript services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    Gone,
    Private,
    Deleted,
    Network,
    RateLimited,
    Timeout,
    /// The whole source stopped answering, not just one item.
    SourceUnavailable,
    Other,
}

impl ErrorKind {
    /// Returns true for 4xx-style failures that no amount of retrying fixes.
    #[must_use]
    pub const fn is_permanent(self) -> bool {
        matches!(
            self,
            Self::NotFound | Self::Forbidden | Self::Gone | Self::Private | Self::Deleted
        )
    }

    /// Short machine-friendly label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Forbidden => "forbidden",
            Self::Gone => "gone",
            Self::Private => "private",
            Self::Deleted => "deleted",
            Self::Network => "network",
            Self::RateLimited => "rate_limited",
            Self::Timeout => "timeout",
            Self::SourceUnavailable => "source_unavailable",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error raised by the media retrieval service for a single call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct RetrievalError {
    /// Classification used by the retry policy.
    pub kind: ErrorKind,
    /// Human-readable description.
    pub message: String,
}

impl RetrievalError {
    /// Creates a new retrieval error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Whether this error should short-circuit remaining attempts.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        self.kind.is_permanent()
    }
}

/// Structured reason recorded on an item that ended in `failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReason {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<RetrievalError> for FailureReason {
    fn from(err: RetrievalError) -> Self {
        Self {
            kind: err.kind,
            message: err.message,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// A specialized `Result` type for playlist-dl operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permanent_kinds() {
        for kind in [
            ErrorKind::NotFound,
            ErrorKind::Forbidden,
            ErrorKind::Gone,
            ErrorKind::Private,
            ErrorKind::Deleted,
        ] {
            assert!(kind.is_permanent(), "{kind} should be permanent");
        }
    }

    #[test]
    fn transient_kinds() {
        for kind in [
            ErrorKind::Network,
            ErrorKind::RateLimited,
            ErrorKind::Timeout,
            ErrorKind::SourceUnavailable,
            ErrorKind::Other,
        ] {
            assert!(!kind.is_permanent(), "{kind} should be transient");
        }
    }

    #[test]
    fn failure_reason_display() {
        let reason = FailureReason::from(RetrievalError::new(ErrorKind::Private, "video is private"));
        assert_eq!(reason.to_string(), "private: video is private");
    }

    #[test]
    fn validation_error_wraps() {
        let err: Error = ValidationError::EndBeforeStart { start: 5, end: 2 }.into();
        assert!(err.to_string().contains("end 2 is before start 5"));
    }
}
