//! Configuration for the documentation gateway.
//!
//! Values are layered with [`figment`]: built-in defaults, then an optional
//! TOML/YAML/JSON file, then `DOCGATE_`-prefixed environment variables.

pub mod error;
mod loader;
mod models;

pub use crate::loader::ENV_PREFIX;
pub use crate::models::{
    BucketConfig, CacheConfig, Config, FetchConfig, LogConfig, LogFormat, PinnedPackage, RateLimitConfig,
    RegistryConfig, ServerConfig, TierConfig,
};
