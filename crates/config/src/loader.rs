use crate::error::{ErrorKind, Result};
use crate::{Config, RegistryConfig};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use std::path::{Path, PathBuf};

/// Prefix of environment variable overrides; `__` separates nesting levels,
/// as in `DOCGATE_CACHE__BUNDLES__CAPACITY=50`.
pub const ENV_PREFIX: &str = "DOCGATE_";
const DEFAULT_FILE_NAME: &str = "docgate.toml";

impl Config {
    /// Platform configuration file location, e.g.
    /// `~/.config/docgate/docgate.toml` on Linux.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "docgate").map(|dirs| dirs.config_dir().join(DEFAULT_FILE_NAME))
    }

    /// Builds the layered provider: defaults, then the file, then the
    /// environment.
    ///
    /// An explicit `path` must exist; without one, the platform default is
    /// used if present.
    pub fn figment(path: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        let file = match path {
            Some(path) if !path.exists() => exn::bail!(ErrorKind::NotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_path().filter(|path| path.exists()),
        };
        if let Some(file) = file {
            tracing::debug!(path = %file.display(), "Loading configuration file");
            let extension = file.extension().and_then(|e| e.to_str()).unwrap_or_default().to_ascii_lowercase();
            figment = match extension.as_str() {
                "toml" => figment.merge(Toml::file_exact(&file)),
                "yaml" | "yml" => figment.merge(Yaml::file_exact(&file)),
                "json" => figment.merge(Json::file_exact(&file)),
                other => exn::bail!(ErrorKind::UnsupportedFormat(other.to_string())),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Loads and validates the configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config: Config = Self::figment(path)?.extract().or_raise(|| ErrorKind::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations that would leave the gateway unable to work.
    pub fn validate(&self) -> Result<()> {
        if self.fetch.gateways.is_empty() && self.fetch.fallback.is_none() {
            exn::bail!(ErrorKind::Invalid("no gateways and no fallback configured".to_string()));
        }
        if let Some(gateway) = self.fetch.gateways.iter().find(|g| !is_http_url(g)) {
            exn::bail!(ErrorKind::Invalid(format!("gateway {gateway:?} is not an http(s) URL")));
        }
        if self.fetch.timeout_secs == 0 {
            exn::bail!(ErrorKind::Invalid("fetch.timeout_secs must be positive".to_string()));
        }
        if self.rate_limit.max_requests == 0 || self.rate_limit.window_secs == 0 {
            exn::bail!(ErrorKind::Invalid("rate limit window and threshold must be positive".to_string()));
        }
        for (tier, settings) in [("bundles", self.cache.bundles), ("files", self.cache.files)] {
            if settings.capacity > 0 && settings.ttl_secs == 0 {
                exn::bail!(ErrorKind::Invalid(format!("cache.{tier}.ttl_secs must be positive")));
            }
        }
        if let RegistryConfig::Http { url } = &self.registry
            && !is_http_url(url)
        {
            exn::bail!(ErrorKind::Invalid(format!("registry {url:?} is not an http(s) URL")));
        }
        Ok(())
    }
}

fn is_http_url(url: &str) -> bool {
    url.strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .is_some_and(|rest| !rest.is_empty() && !rest.starts_with('/'))
}
