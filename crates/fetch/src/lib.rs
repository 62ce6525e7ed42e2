//! Bundle retrieval.
//!
//! Bundles live on a content-addressed store reachable through several
//! interchangeable HTTP gateways, with an object-storage bucket as the last
//! resort. [`Fetcher`] walks those [`Source`]s in order until one of them
//! returns the archive.

pub mod error;
mod fetcher;
pub mod source;

pub use crate::fetcher::{DEFAULT_TIMEOUT, Fetcher, SourceHandle};
#[cfg(any(test, feature = "mock"))]
pub use crate::source::MockSource;
#[cfg(feature = "s3")]
pub use crate::source::ObjectStoreSource;
pub use crate::source::{GatewaySource, Source, http_client};
