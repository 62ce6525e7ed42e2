//! Defences for untrusted request input: validators for names, versions,
//! paths and content hashes, per-client rate limiting, and CSP nonces.

pub mod error;
mod nonce;
mod rate_limit;
mod validate;

pub use crate::nonce::generate_nonce;
pub use crate::rate_limit::{DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW, Decision, RateLimiter};
pub use crate::validate::{
    DEFAULT_FILE, LATEST, looks_like_version, validate_content_hash, validate_file_path, validate_package_name,
    validate_version,
};
