//! Request orchestration.
//!
//! [`DocsService`] owns every stateful component (caches, fetcher, registry,
//! rate limiter) and runs the GET pipeline: validate, resolve, serve from
//! cache or fetch and extract, then rewrite HTML. HTTP concerns live in
//! [`routes`](crate::routes).

use crate::error::{ErrorKind, Result};
use crate::registry::{PackageRegistry, Release};
use docgate_cache::{CacheStats, ContentCache, FileKey, bundle_key};
use docgate_extract::{Bundle, SearchIndex, canonicalize, content_type, extract_one, is_html};
use docgate_fetch::Fetcher;
use docgate_rewrite::{Context, rewrite};
use docgate_security::{
    DEFAULT_FILE, Decision, LATEST, RateLimiter, generate_nonce, looks_like_version, validate_content_hash,
    validate_file_path, validate_package_name, validate_version,
};
use exn::ResultExt;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::instrument;

/// A file ready to be served.
#[derive(Debug, Clone)]
pub struct Document {
    /// Resolved version, never `latest`.
    pub version: String,
    /// Requested path, relative to the version root.
    pub path: String,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    /// Set for rewritten HTML; the response's CSP must allow exactly this
    /// nonce.
    pub nonce: Option<String>,
}

impl Document {
    pub fn is_html(&self) -> bool {
        self.nonce.is_some()
    }
}

/// What a DELETE removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eviction {
    Version { package: String, version: String },
    Package { package: String, versions: usize },
    All,
}

impl fmt::Display for Eviction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Version { package, version } => write!(f, "evicted {package}@{version}"),
            Self::Package { package, versions } => write!(f, "evicted {versions} version(s) of {package}"),
            Self::All => write!(f, "flushed all caches"),
        }
    }
}

/// Snapshot for the stats endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStats {
    pub cache: CacheStats,
    pub rate_limited_clients: usize,
    pub sources: usize,
}

/// Splits the route remainder after the package name into an optional
/// version segment and the file path.
///
/// The first segment is a version only if it looks like one, so
/// `/docs/std/index.html` means the latest version's `index.html`.
pub fn split_version(rest: &str) -> (Option<&str>, &str) {
    let rest = rest.trim_start_matches('/');
    let (first, remainder) = rest.split_once('/').unwrap_or((rest, ""));
    match looks_like_version(first) {
        true => (Some(first), remainder),
        false => (None, rest),
    }
}

/// Orchestrates the documentation pipeline for all requests.
pub struct DocsService {
    cache: ContentCache,
    fetcher: Fetcher,
    registry: Arc<dyn PackageRegistry>,
    limiter: RateLimiter,
}

impl fmt::Debug for DocsService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocsService")
            .field("fetcher", &self.fetcher)
            .field("bundle_mode", &self.cache.bundles().is_enabled())
            .field("window", &self.limiter.window())
            .field("max_requests", &self.limiter.max_requests())
            .finish_non_exhaustive()
    }
}

impl DocsService {
    pub fn new(
        cache: ContentCache,
        fetcher: Fetcher,
        registry: Arc<dyn PackageRegistry>,
        limiter: RateLimiter,
    ) -> Self {
        Self {
            cache,
            fetcher,
            registry,
            limiter,
        }
    }

    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            cache: self.cache.stats(),
            rate_limited_clients: self.limiter.tracked_clients(),
            sources: self.fetcher.len(),
        }
    }

    /// Counts one request against the client's allowance.
    pub fn admit(&self, client: &str) -> Result<()> {
        match self.limiter.check(client) {
            Decision::Allowed { .. } => Ok(()),
            Decision::Limited { retry_after } => {
                tracing::debug!(client, ?retry_after, "Rate limited");
                exn::bail!(ErrorKind::RateLimited { retry_after })
            },
        }
    }

    /// Serves `GET /docs/{package}/{rest}`.
    #[instrument(skip(self), fields(version, path))]
    pub async fn get(&self, package: &str, rest: &str) -> Result<Document> {
        let package = validate_package_name(package).map_err(ErrorKind::invalid)?;
        let (version, path) = split_version(rest);
        let path = request_path(path)?;
        let (version, release) = match version {
            Some(version) if version != LATEST => {
                let version = validate_version(version).map_err(ErrorKind::invalid)?;
                (version.to_string(), None)
            },
            _ => {
                let release = self.release(package, None).await?;
                (release.version.clone(), Some(release))
            },
        };
        tracing::Span::current().record("version", version.as_str()).record("path", path.as_str());

        let (content, bundle) = match self.cache.bundles().is_enabled() {
            true => {
                let bundle = self.bundle(package, &version, release).await?;
                let Some((_, content)) = bundle.resolve(&path) else {
                    return Err(ErrorKind::not_found(format!("{package}@{version}/{path}")));
                };
                (content.to_vec(), Some(bundle))
            },
            false => (self.file(package, &version, release, &path).await?.to_vec(), None),
        };

        if !is_html(&path) {
            return Ok(Document {
                content_type: content_type(&path),
                body: content,
                nonce: None,
                version,
                path,
            });
        }
        // File-only mode has no bundle to take an index from.
        let empty = SearchIndex::default();
        let index = bundle.as_deref().map_or(&empty, Bundle::search_index);
        let nonce = generate_nonce();
        let ctx = Context::new(package, &version, &path);
        let html = String::from_utf8_lossy(&content);
        let page = rewrite(&html, index, &ctx, &nonce).or_raise(|| ErrorKind::Unexpected)?;
        let document = Document {
            content_type: content_type(&path),
            body: page.into_bytes(),
            nonce: Some(nonce),
            version,
            path,
        };
        Ok(document)
    }

    /// Serves DELETE. With a version, evicts that version; with only a
    /// package, every cached version of it; with neither, everything.
    #[instrument(skip(self))]
    pub async fn evict(&self, package: Option<&str>, version: Option<&str>) -> Result<Eviction> {
        let Some(package) = package else {
            self.cache.clear().await;
            return Ok(Eviction::All);
        };
        let package = validate_package_name(package).map_err(ErrorKind::invalid)?;
        match version {
            Some(version) => {
                let version = validate_version(version).map_err(ErrorKind::invalid)?;
                if !self.cache.evict_version(package, version).await {
                    return Err(ErrorKind::not_found(format!("{package}@{version} is not cached")));
                }
                Ok(Eviction::Version {
                    package: package.to_string(),
                    version: version.to_string(),
                })
            },
            None => match self.cache.evict_package(package).await {
                0 => Err(ErrorKind::not_found(format!("{package} is not cached"))),
                versions => Ok(Eviction::Package {
                    package: package.to_string(),
                    versions,
                }),
            },
        }
    }

    async fn release(&self, package: &str, version: Option<&str>) -> Result<Release> {
        let release = self.registry.resolve(package, version).await?;
        release.ok_or_else(|| {
            let version = version.unwrap_or(LATEST);
            ErrorKind::not_found(format!("{package}@{version}"))
        })
    }

    /// Content hash of a release, as found in its documentation URL.
    fn hash_of(package: &str, release: &Release) -> Result<String> {
        let Some(hash) = release.content_hash() else {
            tracing::warn!(package, version = %release.version, docs_url = %release.docs_url, "Release has no content hash");
            return Err(ErrorKind::not_found(format!("documentation for {package}@{}", release.version)));
        };
        Ok(validate_content_hash(hash).map_err(ErrorKind::invalid)?.to_string())
    }

    async fn download(&self, hash: &str) -> Result<Vec<u8>> {
        self.fetcher.fetch(hash).await.or_raise(|| ErrorKind::Fetch)
    }

    /// Cached bundle of a version, fetched and extracted on a miss. Nothing
    /// is cached unless extraction succeeds.
    async fn bundle(&self, package: &str, version: &str, release: Option<Release>) -> Result<Arc<Bundle>> {
        let key = bundle_key(package, version);
        if let Some(bundle) = self.cache.bundles().get(&key).await {
            return Ok(bundle);
        }
        let release = match release {
            Some(release) => release,
            None => self.release(package, Some(version)).await?,
        };
        let hash = Self::hash_of(package, &release)?;
        let bytes = self.download(&hash).await?;
        let bundle = tokio::task::spawn_blocking({
            let hash = hash.clone();
            move || Bundle::from_archive(hash, &bytes)
        })
        .await
        .or_raise(|| ErrorKind::Unexpected)?
        .map_err(extraction_failed)?;
        let bundle = Arc::new(bundle);
        tracing::info!(%key, %hash, files = bundle.len(), "Materialized bundle");
        self.cache.bundles().set(key, Arc::clone(&bundle)).await;
        self.cache.record_hash(package, version, &hash).await;
        Ok(bundle)
    }

    /// File-only mode: one file of a version, read straight out of the
    /// archive on a miss.
    async fn file(&self, package: &str, version: &str, release: Option<Release>, path: &str) -> Result<Arc<[u8]>> {
        let hash = match self.cache.hash_of(package, version).await {
            Some(hash) => hash,
            None => {
                let release = match release {
                    Some(release) => release,
                    None => self.release(package, Some(version)).await?,
                };
                Self::hash_of(package, &release)?
            },
        };
        let key = FileKey::new(&hash, path);
        if let Some(content) = self.cache.files().get(&key).await {
            return Ok(content);
        }
        let bytes = self.download(&hash).await?;
        let content = tokio::task::spawn_blocking({
            let target = path.to_string();
            move || extract_one(&bytes, &target)
        })
        .await
        .or_raise(|| ErrorKind::Unexpected)?
        .map_err(extraction_failed)?;
        self.cache.record_hash(package, version, &hash).await;
        let Some(content) = content else {
            return Err(ErrorKind::not_found(format!("{package}@{version}/{path}")));
        };
        let content: Arc<[u8]> = Arc::from(content);
        self.cache.files().set(key, Arc::clone(&content)).await;
        Ok(content)
    }
}

/// Validated, canonical file path of a request. Directory requests get
/// their index page.
fn request_path(raw: &str) -> Result<String> {
    let path = validate_file_path(raw).map_err(ErrorKind::invalid)?;
    if path == DEFAULT_FILE {
        return Ok(path.to_string());
    }
    let path = match path.ends_with('/') {
        true => format!("{path}{DEFAULT_FILE}"),
        false => path.to_string(),
    };
    match canonicalize(&path) {
        Ok(path) => Ok(path),
        // Only `.` segments and separators left.
        Err(_) if path.split('/').all(|s| s.is_empty() || s == ".") => Ok(DEFAULT_FILE.to_string()),
        Err(e) => Err(e.raise(ErrorKind::NotFound(path))),
    }
}

fn extraction_failed(err: docgate_extract::error::Error) -> crate::error::Error {
    let kind = match &*err {
        docgate_extract::error::ErrorKind::EmptyBundle => ErrorKind::EmptyBundle,
        _ => ErrorKind::Decompression,
    };
    err.raise(kind)
}
