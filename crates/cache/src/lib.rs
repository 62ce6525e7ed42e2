//! In-memory caching for documentation bundles.
//!
//! Two independently sized tiers sit in front of the fetcher:
//!
//! - the **bundle** tier maps `name@version` to a whole extracted [`Bundle`];
//! - the **file** tier maps `(content hash, path)` to a single file, for
//!   lookups that don't need (or can't afford) a whole bundle in memory.
//!
//! Content is addressed by hash and never changes, so entries only leave by
//! capacity, TTL or an explicit eviction.

mod tier;

pub use crate::tier::{Settings, Tier, TierStats};
use docgate_extract::Bundle;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default bundle tier sizing: 100 bundles for 24 hours.
pub const DEFAULT_BUNDLE_SETTINGS: Settings = Settings {
    capacity: 100,
    ttl: Duration::from_secs(24 * 60 * 60),
};
/// Default file tier sizing: 1000 files for 1 hour.
pub const DEFAULT_FILE_SETTINGS: Settings = Settings {
    capacity: 1000,
    ttl: Duration::from_secs(60 * 60),
};

/// Key of the file tier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileKey {
    pub hash: String,
    pub path: String,
}

impl FileKey {
    pub fn new(hash: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            path: path.into(),
        }
    }
}

impl fmt::Display for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.hash, self.path)
    }
}

/// Bundle tier key for a package version.
pub fn bundle_key(name: &str, version: &str) -> String {
    format!("{name}@{version}")
}

fn is_version_of(key: &str, name: &str) -> bool {
    key.rsplit_once('@').is_some_and(|(key_name, _)| key_name == name)
}

/// Whole bundles keyed by `name@version`.
pub type BundleStore = Tier<String, Arc<Bundle>>;
/// Single files keyed by content hash and path.
pub type FileStore = Tier<FileKey, Arc<[u8]>>;

impl Tier<String, Arc<Bundle>> {
    /// Evicts every version of a package, returning the evicted bundles.
    ///
    /// Only keys of the exact form `name@<version>` match, so evicting `foo`
    /// leaves `foo-bar@1.0` alone.
    pub async fn delete_by_prefix(&self, name: &str) -> Vec<Arc<Bundle>> {
        self.delete_where(|key| is_version_of(key, name)).await
    }
}

impl Tier<FileKey, Arc<[u8]>> {
    /// Evicts every file of one content hash, returning how many there were.
    pub async fn delete_by_hash(&self, hash: &str) -> usize {
        self.delete_where(|key| key.hash == hash).await.len()
    }
}

/// Statistics for both tiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub bundles: TierStats,
    pub files: TierStats,
}

/// Both cache tiers, constructed once and shared by reference.
///
/// Alongside the tiers it remembers which content hash each materialized
/// version resolved to, so a version can be evicted from the file tier even
/// when its bundle was never (or is no longer) held whole.
#[derive(Clone)]
pub struct ContentCache {
    bundles: BundleStore,
    files: FileStore,
    hashes: Tier<String, String>,
}

impl Default for ContentCache {
    fn default() -> Self {
        Self::new(DEFAULT_BUNDLE_SETTINGS, DEFAULT_FILE_SETTINGS)
    }
}

impl ContentCache {
    pub fn new(bundles: Settings, files: Settings) -> Self {
        let hashes = Settings {
            capacity: bundles.capacity.max(files.capacity),
            ttl: bundles.ttl.max(files.ttl),
        };
        Self {
            bundles: Tier::new("bundles", bundles),
            files: Tier::new("files", files),
            hashes: Tier::new("hashes", hashes),
        }
    }

    pub fn bundles(&self) -> &BundleStore {
        &self.bundles
    }

    pub fn files(&self) -> &FileStore {
        &self.files
    }

    /// Records the content hash a package version resolved to.
    pub async fn record_hash(&self, name: &str, version: &str, hash: &str) {
        self.hashes.set(bundle_key(name, version), hash.to_string()).await;
    }

    /// The content hash a package version last resolved to, if still known.
    pub async fn hash_of(&self, name: &str, version: &str) -> Option<String> {
        self.hashes.get(&bundle_key(name, version)).await
    }

    /// Evicts one package version from both tiers. Returns `false` if
    /// nothing was cached for it.
    ///
    /// The file tier is keyed by hash, so the version's hash is looked up
    /// (from the bundle, or the recorded resolution) to find its files.
    pub async fn evict_version(&self, name: &str, version: &str) -> bool {
        let key = bundle_key(name, version);
        let bundle = self.bundles.remove(&key).await;
        let recorded = self.hashes.remove(&key).await;
        let Some(hash) = bundle.map(|b| b.hash().to_string()).or(recorded) else {
            return false;
        };
        let files = self.files.delete_by_hash(&hash).await;
        tracing::info!(%key, %hash, files, "Evicted package version");
        true
    }

    /// Evicts every cached version of a package. Returns how many versions
    /// were evicted.
    pub async fn evict_package(&self, name: &str) -> usize {
        let bundles = self.bundles.delete_by_prefix(name).await;
        let recorded = self.hashes.delete_where(|key| is_version_of(key, name)).await;
        // Every materialized version has a recorded hash, unless that record
        // was itself evicted first.
        let versions = bundles.len().max(recorded.len());
        let mut hashes: Vec<String> = bundles.iter().map(|b| b.hash().to_string()).chain(recorded).collect();
        hashes.sort_unstable();
        hashes.dedup();
        for hash in &hashes {
            self.files.delete_by_hash(hash).await;
        }
        tracing::info!(package = name, versions, "Evicted package");
        versions
    }

    /// Flushes both tiers.
    pub async fn clear(&self) {
        self.bundles.clear().await;
        self.files.clear().await;
        self.hashes.clear().await;
        tracing::info!("Flushed all caches");
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            bundles: self.bundles.stats(),
            files: self.files.stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docgate_extract::FileMap;

    fn bundle(hash: &str) -> Arc<Bundle> {
        let mut files = FileMap::new();
        files.insert("index.html".to_string(), b"<p>hi</p>".to_vec());
        Arc::new(Bundle::new(hash, files))
    }

    fn file(content: &str) -> Arc<[u8]> {
        Arc::from(content.as_bytes())
    }

    #[tokio::test]
    async fn test_delete_by_prefix_matches_whole_names() {
        let cache = ContentCache::default();
        for (name, version) in [("foo", "1.0"), ("foo", "2.0"), ("foo-bar", "1.0"), ("bar", "1.0")] {
            cache.bundles().set(bundle_key(name, version), bundle("h")).await;
        }
        assert_eq!(cache.bundles().delete_by_prefix("foo").await.len(), 2);
        assert!(cache.bundles().get(&bundle_key("foo-bar", "1.0")).await.is_some());
        assert!(cache.bundles().get(&bundle_key("bar", "1.0")).await.is_some());
    }

    #[tokio::test]
    async fn test_evict_version_purges_its_files() {
        let cache = ContentCache::default();
        cache.bundles().set(bundle_key("std", "0.69.1"), bundle("new")).await;
        cache.bundles().set(bundle_key("std", "0.68.0"), bundle("old")).await;
        cache.files().set(FileKey::new("new", "index.html"), file("new")).await;
        cache.files().set(FileKey::new("old", "index.html"), file("old")).await;

        assert!(cache.evict_version("std", "0.69.1").await);
        assert!(!cache.evict_version("std", "0.69.1").await);
        assert!(cache.files().get(&FileKey::new("new", "index.html")).await.is_none());
        assert!(cache.files().get(&FileKey::new("old", "index.html")).await.is_some());
        assert!(cache.bundles().get(&bundle_key("std", "0.68.0")).await.is_some());
    }

    #[tokio::test]
    async fn test_evict_package_and_clear() {
        let cache = ContentCache::default();
        cache.bundles().set(bundle_key("std", "1"), bundle("a")).await;
        cache.bundles().set(bundle_key("std", "2"), bundle("b")).await;
        cache.files().set(FileKey::new("a", "x.css"), file("x")).await;
        assert_eq!(cache.evict_package("std").await, 2);
        assert_eq!(cache.evict_package("std").await, 0);
        assert!(cache.files().get(&FileKey::new("a", "x.css")).await.is_none());

        cache.files().set(FileKey::new("c", "y.css"), file("y")).await;
        cache.clear().await;
        assert_eq!(cache.stats().files.size, 0);
        assert_eq!(cache.stats().bundles.hits, 0);
    }

    #[tokio::test]
    async fn test_evict_version_without_bundle_tier() {
        let cache = ContentCache::new(
            Settings {
                capacity: 0,
                ttl: Duration::from_secs(60),
            },
            DEFAULT_FILE_SETTINGS,
        );
        cache.record_hash("std", "1.0", "a").await;
        cache.files().set(FileKey::new("a", "index.html"), file("a")).await;
        assert_eq!(cache.hash_of("std", "1.0").await.as_deref(), Some("a"));
        assert!(cache.evict_version("std", "1.0").await);
        assert!(cache.files().get(&FileKey::new("a", "index.html")).await.is_none());
        assert!(!cache.evict_version("std", "1.0").await);
    }

    #[test]
    fn test_file_key_display() {
        assert_eq!(FileKey::new("bafy", "a/b.html").to_string(), "bafy:a/b.html");
    }
}
