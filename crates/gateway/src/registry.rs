//! Package metadata lookup.
//!
//! A registry resolves `(package, version)` to a [`Release`], whose
//! documentation URL carries the content hash of the bundle. "Latest" is
//! resolved by passing no version.

use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::{OptionExt, ResultExt};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::instrument;

/// Registry metadata of one published package version.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Release {
    pub version: String,
    /// Location of the documentation bundle; the content hash is part of it.
    pub docs_url: String,
}

impl Release {
    pub fn new(version: impl Into<String>, docs_url: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            docs_url: docs_url.into(),
        }
    }

    /// Extracts the content hash from the documentation URL.
    ///
    /// Accepts `ipfs://<hash>`, any URL with an `/ipfs/<hash>` segment, and
    /// otherwise takes the last path segment.
    ///
    /// # Examples
    ///
    /// ```
    /// use docgate_gateway::Release;
    /// assert_eq!(Release::new("1.0.0", "https://ipfs.io/ipfs/bafyabc/docs.tar.gz").content_hash(), Some("bafyabc"));
    /// assert_eq!(Release::new("1.0.0", "ipfs://bafyabc").content_hash(), Some("bafyabc"));
    /// assert_eq!(Release::new("1.0.0", "https://cdn.example/bafyabc").content_hash(), Some("bafyabc"));
    /// ```
    pub fn content_hash(&self) -> Option<&str> {
        let url = self.docs_url.split(['?', '#']).next().unwrap_or_default();
        let hash = if let Some(rest) = url.strip_prefix("ipfs://") {
            rest.split('/').next()
        } else if let Some((_, rest)) = url.split_once("/ipfs/") {
            rest.split('/').next()
        } else {
            url.trim_end_matches('/').rsplit('/').next()
        };
        hash.filter(|hash| !hash.is_empty())
    }
}

/// Source of package metadata.
#[async_trait]
pub trait PackageRegistry: Send + Sync {
    /// Looks up a release. `None` for the version means the latest one.
    ///
    /// Returns `Ok(None)` when the package or version is unknown.
    async fn resolve(&self, package: &str, version: Option<&str>) -> Result<Option<Release>>;
}

/// Registry answering `GET {base}/packages/{package}/{version|latest}` with a
/// JSON [`Release`].
#[derive(Debug, Clone)]
pub struct HttpRegistry {
    base: Url,
    client: Client,
}

impl HttpRegistry {
    pub fn new(base: &str, client: Client) -> Result<Self> {
        let base = Url::parse(base).or_raise(|| ErrorKind::Registry(format!("invalid registry URL: {base}")))?;
        if base.cannot_be_a_base() {
            exn::bail!(ErrorKind::Registry(format!("invalid registry URL: {base}")));
        }
        Ok(Self { base, client })
    }

    /// Request URL for a lookup. Segments are percent-encoded, so neither
    /// name nor version can alter the query.
    pub fn url_for(&self, package: &str, version: Option<&str>) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .ok()
            .ok_or_raise(|| ErrorKind::Registry("registry URL cannot hold a path".to_string()))?
            .pop_if_empty()
            .extend(["packages", package, version.unwrap_or(docgate_security::LATEST)]);
        Ok(url)
    }
}

#[async_trait]
impl PackageRegistry for HttpRegistry {
    #[instrument(skip(self), fields(status))]
    async fn resolve(&self, package: &str, version: Option<&str>) -> Result<Option<Release>> {
        let url = self.url_for(package, version)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .or_raise(|| ErrorKind::Registry("request failed".to_string()))?;
        let status = response.status();
        tracing::Span::current().record("status", status.as_u16());
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            exn::bail!(ErrorKind::Registry(format!("unexpected status {status}")));
        }
        let release = response
            .json::<Release>()
            .await
            .or_raise(|| ErrorKind::Registry("malformed release metadata".to_string()))?;
        Ok(Some(release))
    }
}

/// Registry backed by a fixed list of pinned releases.
///
/// The latest version of a package is the one listed last.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    packages: HashMap<String, Vec<Release>>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, package: impl Into<String>, release: Release) -> Self {
        self.packages.entry(package.into()).or_default().push(release);
        self
    }

    pub fn len(&self) -> usize {
        self.packages.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

impl<P: Into<String>> FromIterator<(P, Release)> for StaticRegistry {
    fn from_iter<T: IntoIterator<Item = (P, Release)>>(iter: T) -> Self {
        iter.into_iter().fold(Self::new(), |registry, (package, release)| registry.with(package, release))
    }
}

#[async_trait]
impl PackageRegistry for StaticRegistry {
    async fn resolve(&self, package: &str, version: Option<&str>) -> Result<Option<Release>> {
        let Some(releases) = self.packages.get(package) else {
            return Ok(None);
        };
        let release = match version {
            Some(version) => releases.iter().rev().find(|release| release.version == version),
            None => releases.last(),
        };
        Ok(release.cloned())
    }
}
