//! Extraction Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// An extraction error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The bytes are not a recognizable archive, or the compressed stream is
    /// corrupt or truncated.
    #[display("bundle could not be decompressed")]
    Decompression,
    /// The archive was readable but contained no file entries.
    #[display("bundle contains no files")]
    EmptyBundle,
    /// An archive entry path could not be canonicalized.
    #[display("invalid entry path: {_0}")]
    InvalidPath(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Content-addressed bytes never change; the archive is either
        // valid or it's not.
        false
    }
}
