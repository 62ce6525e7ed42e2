//! Validators for attacker-controlled request input.
//!
//! Each validator trims its input and returns the value to use from then on.
//! They run before any I/O so a rejected request never touches the caches or
//! the network.

use crate::error::{ErrorKind, Field, Result};
use regex::Regex;
use std::sync::LazyLock;

/// File served when a request names no path.
pub const DEFAULT_FILE: &str = "index.html";
/// Version sentinel resolved through the package registry.
pub const LATEST: &str = "latest";

static VERSION_LIKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(\.\d+)*([-+][0-9A-Za-z.+-]*)?$").expect("version regex should compile"));

fn non_empty(value: &str, field: Field) -> Result<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        exn::bail!(ErrorKind::Empty(field));
    }
    Ok(trimmed)
}

/// Validates a package name: non-empty, no `/` and no `..`.
pub fn validate_package_name(name: &str) -> Result<&str> {
    let name = non_empty(name, Field::PackageName)?;
    if name.contains('/') {
        exn::bail!(ErrorKind::Separator(Field::PackageName));
    }
    if name.contains("..") {
        exn::bail!(ErrorKind::Traversal(Field::PackageName));
    }
    Ok(name)
}

/// Validates a version. Any non-empty value is accepted; [`LATEST`] is
/// resolved elsewhere.
pub fn validate_version(version: &str) -> Result<&str> {
    non_empty(version, Field::Version)
}

/// Validates a file path within a bundle.
///
/// Empty input means [`DEFAULT_FILE`]. Absolute paths and anything containing
/// `..` are rejected; everything else is returned unchanged (after trimming).
///
/// # Examples
///
/// ```
/// use docgate_security::validate_file_path;
///
/// assert_eq!(validate_file_path("").unwrap(), "index.html");
/// assert_eq!(validate_file_path("a/b/c.html").unwrap(), "a/b/c.html");
/// assert!(validate_file_path("../../etc/passwd").is_err());
/// ```
pub fn validate_file_path(path: &str) -> Result<&str> {
    let path = path.trim();
    if path.is_empty() {
        return Ok(DEFAULT_FILE);
    }
    if path.starts_with('/') {
        exn::bail!(ErrorKind::Absolute(Field::FilePath));
    }
    if path.contains("..") {
        exn::bail!(ErrorKind::Traversal(Field::FilePath));
    }
    Ok(path)
}

/// Validates an opaque content hash.
pub fn validate_content_hash(hash: &str) -> Result<&str> {
    non_empty(hash, Field::ContentHash)
}

/// Returns `true` for a URL segment that should be read as a version rather
/// than the first segment of a file path: numeric-dotted versions with an
/// optional pre-release/build suffix, or [`LATEST`].
pub fn looks_like_version(segment: &str) -> bool {
    segment == LATEST || VERSION_LIKE.is_match(segment)
}
