//! Bundle sources and their implementations.
//!
//! A [`Source`] is anything that can turn a content hash into the bytes of a
//! bundle archive: an HTTP gateway onto the content-addressed store, an
//! S3-compatible bucket holding copies of the same bundles, or (in tests) an
//! in-memory map.

mod gateway;
#[cfg(any(test, feature = "mock"))]
mod mock;
#[cfg(feature = "s3")]
mod s3;

pub use self::gateway::{GatewaySource, http_client};
#[cfg(any(test, feature = "mock"))]
pub use self::mock::MockSource;
#[cfg(feature = "s3")]
pub use self::s3::ObjectStoreSource;
use crate::error::Result;
use async_trait::async_trait;

/// Unified interface for bundle sources.
///
/// Implementations don't apply their own overall deadline; the
/// [`Fetcher`](crate::Fetcher) bounds every attempt.
#[async_trait]
pub trait Source: Send + Sync {
    /// Name of the source, used for logging and error reports only.
    fn name(&self) -> &str;

    /// Retrieve the complete archive for a content hash.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the source
    /// definitively doesn't hold the content.
    async fn fetch(&self, hash: &str) -> Result<Vec<u8>>;
}
