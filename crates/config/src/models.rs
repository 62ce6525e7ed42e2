use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Complete gateway configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub log: LogConfig,
    pub fetch: FetchConfig,
    pub cache: CacheConfig,
    pub rate_limit: RateLimitConfig,
    pub registry: RegistryConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Reverse proxies whose `X-Forwarded-For` and `X-Real-IP` headers are
    /// believed. Clients are otherwise identified by their peer address.
    pub trusted_proxies: Vec<IpAddr>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            trusted_proxies: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub format: LogFormat,
    /// `tracing` filter directives; `RUST_LOG` takes precedence.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Gateway URL templates, tried in order. `{hash}` is substituted,
    /// otherwise the hash is appended as a path segment.
    pub gateways: Vec<String>,
    /// Time budget of each attempt, in seconds.
    pub timeout_secs: u64,
    /// Object-storage bucket tried after every gateway failed.
    pub fallback: Option<BucketConfig>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            gateways: vec![
                "https://ipfs.io/ipfs/".to_string(),
                "https://dweb.link/ipfs/".to_string(),
                "https://cloudflare-ipfs.com/ipfs/".to_string(),
            ],
            timeout_secs: 20,
            fallback: None,
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// S3-compatible bucket credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketConfig {
    pub bucket: String,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    pub key_id: String,
    pub key_secret: String,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierConfig {
    /// Maximum number of entries; zero disables the tier.
    pub capacity: u64,
    pub ttl_secs: u64,
}

impl TierConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub bundles: TierConfig,
    pub files: TierConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            bundles: TierConfig {
                capacity: 100,
                ttl_secs: 24 * 60 * 60,
            },
            files: TierConfig {
                capacity: 1000,
                ttl_secs: 60 * 60,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub window_secs: u64,
    pub max_requests: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: 60,
            max_requests: 100,
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Where package versions and their bundle locations come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RegistryConfig {
    /// A registry API answering `GET {url}/packages/{name}/{version}`.
    Http { url: String },
    /// A fixed list of packages.
    Static {
        #[serde(default)]
        packages: Vec<PinnedPackage>,
    },
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self::Static { packages: Vec::new() }
    }
}

/// One package version served by a static registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinnedPackage {
    pub name: String,
    pub version: String,
    /// URL embedding the bundle's content hash, e.g. `ipfs://bafy...`.
    pub docs_url: String,
}
