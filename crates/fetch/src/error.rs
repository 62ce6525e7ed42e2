//! Fetch Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A fetch error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for fetch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The attempt did not complete within its time budget.
    #[display("request timed out")]
    Timeout,
    /// The source answered with a non-success status.
    #[display("unexpected status {_0}")]
    Status(#[error(not(source))] u16),
    /// The source does not hold this content.
    #[display("content not found")]
    NotFound,
    /// Connection, TLS or body transfer failure.
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    /// Object-storage specific failure.
    #[display("backend error: {_0}")]
    Backend(#[error(not(source))] String),
    /// The content hash cannot be used to address a source.
    #[display("invalid content hash")]
    InvalidHash,
    /// A source was configured with an unusable endpoint.
    #[display("invalid source configuration: {_0}")]
    InvalidConfig(#[error(not(source))] String),
    /// Every gateway and the fallback failed.
    #[display("all {attempts} sources failed for {hash}: {errors}")]
    Exhausted {
        hash: String,
        attempts: usize,
        /// One `source: error` line per failed attempt, in order.
        errors: String,
    },
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::Network(_) | Self::Backend(_) | Self::Exhausted { .. }
        ) || matches!(self, Self::Status(code) if *code >= 500 || *code == 429)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::Status(502).to_string(), "unexpected status 502");
        let exhausted = ErrorKind::Exhausted {
            hash: "bafy".to_string(),
            attempts: 2,
            errors: "a: request timed out; b: content not found".to_string(),
        };
        assert_eq!(
            exhausted.to_string(),
            "all 2 sources failed for bafy: a: request timed out; b: content not found"
        );
    }

    #[test]
    fn error_kind_retryable() {
        assert!(ErrorKind::Timeout.is_retryable());
        assert!(ErrorKind::Status(503).is_retryable());
        assert!(!ErrorKind::Status(404).is_retryable());
        assert!(!ErrorKind::NotFound.is_retryable());
        assert!(!ErrorKind::InvalidHash.is_retryable());
    }
}
