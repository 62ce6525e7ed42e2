//! In-memory bundle source for testing.

use super::Source;
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
enum Behaviour {
    Serve,
    Fail(ErrorKind),
    Stall,
}

/// In-memory source for testing.
///
/// Serves bundles from a `HashMap` and counts every call to
/// [`fetch`](Source::fetch), so tests can assert how often the network would
/// have been hit. It can also be told to fail or to never answer, to exercise
/// timeouts and fallbacks.
///
/// # Examples
///
/// ```
/// use docgate_fetch::{MockSource, Source};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let source = MockSource::with_bundles([("bafyabc", b"archive".to_vec())]);
/// assert_eq!(source.fetch("bafyabc").await?, b"archive");
/// assert_eq!(source.calls(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MockSource {
    name: String,
    bundles: RwLock<HashMap<String, Vec<u8>>>,
    behaviour: RwLock<Behaviour>,
    calls: AtomicUsize,
}

impl MockSource {
    /// Create a mock source pre-populated with bundles.
    pub fn with_bundles(bundles: impl IntoIterator<Item = (impl Into<String>, impl Into<Vec<u8>>)>) -> Self {
        let bundles = bundles.into_iter().map(|(hash, bytes)| (hash.into(), bytes.into())).collect();
        Self {
            name: "mock".to_string(),
            bundles: RwLock::new(bundles),
            behaviour: RwLock::new(Behaviour::Serve),
            calls: AtomicUsize::new(0),
        }
    }

    /// Change the name of the mock source.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Every fetch fails with `kind`.
    pub fn failing(mut self, kind: ErrorKind) -> Self {
        *self.behaviour.get_mut() = Behaviour::Fail(kind);
        self
    }

    /// Every fetch hangs forever.
    pub fn stalled(mut self) -> Self {
        *self.behaviour.get_mut() = Behaviour::Stall;
        self
    }

    /// Switch between failing with `kind` and serving normally.
    pub async fn set_failure(&self, kind: Option<ErrorKind>) {
        *self.behaviour.write().await = kind.map_or(Behaviour::Serve, Behaviour::Fail);
    }

    pub async fn insert(&self, hash: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.bundles.write().await.insert(hash.into(), bytes.into());
    }

    /// Number of fetches so far, successful or not.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockSource {
    fn default() -> Self {
        let bundles: [(&str, Vec<u8>); 0] = [];
        Self::with_bundles(bundles)
    }
}

#[async_trait]
impl Source for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, hash: &str) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let behaviour = self.behaviour.read().await.clone();
        match behaviour {
            Behaviour::Serve => {},
            Behaviour::Fail(kind) => exn::bail!(kind),
            Behaviour::Stall => std::future::pending::<()>().await,
        }
        self.bundles.read().await.get(hash).cloned().ok_or_else(|| exn::Exn::from(ErrorKind::NotFound))
    }
}
