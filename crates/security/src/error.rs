//! Validation Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A validation error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for validation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The untrusted input that failed validation.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    #[display("package name")]
    PackageName,
    #[display("version")]
    Version,
    #[display("file path")]
    FilePath,
    #[display("content hash")]
    ContentHash,
}

/// Why an input was rejected.
///
/// Every variant names the offending [`Field`] so it can be reported back to
/// the client without echoing the input itself.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("{_0} must not be empty")]
    Empty(#[error(not(source))] Field),
    #[display("{_0} must not contain '/'")]
    Separator(#[error(not(source))] Field),
    #[display("{_0} must not contain '..'")]
    Traversal(#[error(not(source))] Field),
    #[display("{_0} must be relative")]
    Absolute(#[error(not(source))] Field),
}

impl ErrorKind {
    /// The input this error is about.
    pub fn field(&self) -> Field {
        match self {
            Self::Empty(field) | Self::Separator(field) | Self::Traversal(field) | Self::Absolute(field) => *field,
        }
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
