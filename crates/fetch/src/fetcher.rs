//! Ordered multi-source retrieval.

use crate::error::{ErrorKind, Result};
use crate::source::Source;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Default time budget for a single attempt.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

pub type SourceHandle = Arc<dyn Source>;

/// Fetches bundle archives by content hash.
///
/// Gateways are tried in order, each attempt bounded by the same timeout;
/// the first successful body wins. When every gateway has failed, the
/// fallback (if any) gets one attempt under the same bound. Nothing is
/// retained between calls.
#[derive(Clone)]
pub struct Fetcher {
    gateways: Vec<SourceHandle>,
    fallback: Option<SourceHandle>,
    timeout: Duration,
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("gateways", &self.gateways.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("fallback", &self.fallback.as_ref().map(|s| s.name()))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Fetcher {
    pub fn new(gateways: Vec<SourceHandle>) -> Self {
        Self {
            gateways,
            fallback: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_fallback(mut self, fallback: SourceHandle) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Total number of sources, fallback included.
    pub fn len(&self) -> usize {
        self.gateways.len() + usize::from(self.fallback.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Retrieve the archive bytes for `hash`.
    ///
    /// Every failed attempt is logged with the hash and the source's name.
    /// If all of them fail, the error is [`Exhausted`](ErrorKind::Exhausted),
    /// listing each attempt's failure in order.
    #[instrument(skip(self), fields(attempts))]
    pub async fn fetch(&self, hash: &str) -> Result<Vec<u8>> {
        if hash.is_empty() || !hash.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_') {
            exn::bail!(ErrorKind::InvalidHash);
        }
        let mut failures = Vec::with_capacity(self.len());
        let mut last = None;
        for source in self.gateways.iter().chain(self.fallback.iter()) {
            match self.attempt(source.as_ref(), hash).await {
                Ok(bytes) => {
                    tracing::Span::current().record("attempts", failures.len() + 1);
                    tracing::info!(source = source.name(), size = bytes.len(), "Fetched bundle");
                    return Ok(bytes);
                },
                Err(err) => {
                    tracing::warn!(source = source.name(), hash, error = %*err, "Fetch attempt failed");
                    failures.push(format!("{}: {}", source.name(), *err));
                    last = Some(err);
                },
            }
        }
        tracing::Span::current().record("attempts", failures.len());
        let kind = ErrorKind::Exhausted {
            hash: hash.to_string(),
            attempts: failures.len(),
            errors: failures.join("; "),
        };
        tracing::error!(hash, error = %kind, "No source could provide bundle");
        Err(match last {
            Some(err) => err.raise(kind),
            None => exn::Exn::from(kind),
        })
    }

    async fn attempt(&self, source: &dyn Source, hash: &str) -> Result<Vec<u8>> {
        match tokio::time::timeout(self.timeout, source.fetch(hash)).await {
            Ok(result) => result,
            Err(_elapsed) => exn::bail!(ErrorKind::Timeout),
        }
    }
}
