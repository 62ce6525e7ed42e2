//! Gateway Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Every failure of a request ends up
//! as one of these kinds, and each kind maps to exactly one HTTP status.

use axum::http::StatusCode;
use derive_more::{Display, Error};
use docgate_security::error::{Error as ValidationError, ErrorKind as ValidationErrorKind};
use std::time::Duration;

/// A gateway error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for gateway operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Request input failed validation; nothing was fetched.
    #[display("{_0}")]
    InvalidInput(ValidationErrorKind),
    /// Unknown package or version, or no such file in the bundle.
    #[display("not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// The client is over its request allowance.
    #[display("rate limit exceeded")]
    RateLimited { retry_after: Duration },
    /// No source could provide the bundle.
    #[display("bundle could not be fetched")]
    Fetch,
    /// The fetched bundle is not a readable archive.
    #[display("bundle could not be decompressed")]
    Decompression,
    /// The fetched bundle holds no files.
    #[display("bundle contains no files")]
    EmptyBundle,
    /// The package registry failed to answer.
    #[display("package registry error: {_0}")]
    Registry(#[error(not(source))] String),
    /// Anything else: join failures, response construction.
    #[display("unexpected error")]
    Unexpected,
}

impl ErrorKind {
    /// Convert a validation error into a gateway error, preserving the
    /// security crate's `Exn` frame as a child in its own error tree.
    #[track_caller]
    pub fn invalid(err: ValidationError) -> Error {
        let inner = (*err).clone();
        err.raise(ErrorKind::InvalidInput(inner))
    }

    pub fn not_found(what: impl Into<String>) -> Error {
        exn::Exn::from(ErrorKind::NotFound(what.into()))
    }

    /// The HTTP status a request failing with this error gets.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Fetch | Self::Decompression | Self::EmptyBundle | Self::Registry(_) | Self::Unexpected => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
        }
    }

    /// Message safe to show to the client. Server-side failures don't leak
    /// any detail.
    pub fn public_message(&self) -> String {
        match self {
            Self::InvalidInput(kind) => format!("invalid {}: {kind}", kind.field()),
            Self::NotFound(what) => format!("not found: {what}"),
            Self::RateLimited { .. } => "too many requests".to_string(),
            _ => "internal server error".to_string(),
        }
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Fetch | Self::Registry(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docgate_security::error::Field;
    use rstest::rstest;

    #[rstest]
    #[case(ErrorKind::InvalidInput(ValidationErrorKind::Empty(Field::Version)), StatusCode::BAD_REQUEST)]
    #[case(ErrorKind::NotFound("std@9.9.9".to_string()), StatusCode::NOT_FOUND)]
    #[case(ErrorKind::RateLimited { retry_after: Duration::from_secs(3) }, StatusCode::TOO_MANY_REQUESTS)]
    #[case(ErrorKind::Fetch, StatusCode::INTERNAL_SERVER_ERROR)]
    #[case(ErrorKind::Decompression, StatusCode::INTERNAL_SERVER_ERROR)]
    #[case(ErrorKind::EmptyBundle, StatusCode::INTERNAL_SERVER_ERROR)]
    #[case(ErrorKind::Registry("timeout".to_string()), StatusCode::INTERNAL_SERVER_ERROR)]
    #[case(ErrorKind::Unexpected, StatusCode::INTERNAL_SERVER_ERROR)]
    fn test_status(#[case] kind: ErrorKind, #[case] expected: StatusCode) {
        assert_eq!(kind.status(), expected);
    }

    #[test]
    fn test_public_messages() {
        let invalid = ErrorKind::InvalidInput(ValidationErrorKind::Traversal(Field::FilePath));
        assert_eq!(invalid.public_message(), "invalid file path: file path must not contain '..'");
        assert_eq!(ErrorKind::Registry("secret upstream".to_string()).public_message(), "internal server error");
    }
}
