//! `docgate`: serves content-addressed documentation bundles over HTTP.

use clap::Parser;
use derive_more::{Display, Error};
use docgate_cache::{ContentCache, Settings};
use docgate_config::{Config, LogFormat, RegistryConfig, TierConfig};
use docgate_fetch::{Fetcher, GatewaySource, SourceHandle, http_client};
use docgate_gateway::{DocsService, HttpRegistry, PackageRegistry, Release, StaticRegistry, TrustedProxies};
use docgate_security::RateLimiter;
use exn::{Exn, ResultExt};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, Display, Error)]
enum StartupError {
    #[display("could not load configuration")]
    Config,
    #[display("could not initialize logging")]
    Logging,
    #[display("could not set up bundle sources")]
    Sources,
    #[display("could not set up the package registry")]
    Registry,
    #[display("server failed")]
    Server,
}

#[derive(Debug, Parser)]
#[command(name = "docgate", version, about)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON). Defaults to the platform
    /// configuration directory.
    #[arg(short, long, env = "DOCGATE_CONFIG")]
    config: Option<PathBuf>,
    /// Address to listen on, overriding the configuration.
    #[arg(short, long)]
    bind: Option<SocketAddr>,
}

fn init_logging(config: &Config) -> Result<(), Exn<StartupError>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log.filter))
        .or_raise(|| StartupError::Logging)?;
    let registry = tracing_subscriber::registry().with(filter);
    let initialized = match config.log.format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).try_init(),
    };
    initialized.or_raise(|| StartupError::Logging)
}

fn settings(tier: &TierConfig) -> Settings {
    Settings {
        capacity: tier.capacity,
        ttl: tier.ttl(),
    }
}

fn fetcher(config: &Config) -> Result<Fetcher, Exn<StartupError>> {
    let client = http_client().or_raise(|| StartupError::Sources)?;
    let gateways = config
        .fetch
        .gateways
        .iter()
        .map(|template| -> docgate_fetch::error::Result<SourceHandle> {
            let source = GatewaySource::new(template.as_str(), client.clone())?;
            Ok(Arc::new(source) as SourceHandle)
        })
        .collect::<docgate_fetch::error::Result<Vec<_>>>()
        .or_raise(|| StartupError::Sources)?;
    let fetcher = Fetcher::new(gateways).with_timeout(config.fetch.timeout());
    match &config.fetch.fallback {
        #[cfg(feature = "s3")]
        Some(bucket) => {
            let source = docgate_fetch::ObjectStoreSource::new(
                &bucket.bucket,
                bucket.prefix.clone(),
                &bucket.region,
                bucket.endpoint.clone(),
                &bucket.key_id,
                &bucket.key_secret,
            );
            Ok(fetcher.with_fallback(Arc::new(source)))
        },
        #[cfg(not(feature = "s3"))]
        Some(bucket) => {
            tracing::warn!(bucket = %bucket.bucket, "Object-storage fallback configured, but built without S3 support");
            Ok(fetcher)
        },
        None => Ok(fetcher),
    }
}

fn registry(config: &RegistryConfig) -> Result<Arc<dyn PackageRegistry>, Exn<StartupError>> {
    match config {
        RegistryConfig::Http { url } => {
            let client = http_client().or_raise(|| StartupError::Registry)?;
            let registry = HttpRegistry::new(url, client).or_raise(|| StartupError::Registry)?;
            Ok(Arc::new(registry))
        },
        RegistryConfig::Static { packages } => {
            let registry: StaticRegistry = packages
                .iter()
                .map(|pinned| (pinned.name.clone(), Release::new(&pinned.version, &pinned.docs_url)))
                .collect();
            if registry.is_empty() {
                tracing::warn!("Static registry has no packages; every request will be answered with 404");
            }
            Ok(Arc::new(registry))
        },
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Could not listen for the shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Exn<StartupError>> {
    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref()).or_raise(|| StartupError::Config)?;
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }
    init_logging(&config)?;

    let cache = ContentCache::new(settings(&config.cache.bundles), settings(&config.cache.files));
    let fetcher = fetcher(&config)?;
    let limiter = RateLimiter::new(config.rate_limit.window(), config.rate_limit.max_requests);
    let service = DocsService::new(cache, fetcher, registry(&config.registry)?, limiter);
    tracing::info!(?service, "Gateway configured");

    let listener = tokio::net::TcpListener::bind(config.server.bind).await.or_raise(|| StartupError::Server)?;
    tracing::info!(address = %config.server.bind, trusted_proxies = ?config.server.trusted_proxies, "Listening");
    let proxies: TrustedProxies = config.server.trusted_proxies.iter().copied().collect();
    docgate_gateway::serve(listener, Arc::new(service), proxies, shutdown_signal())
        .await
        .or_raise(|| StartupError::Server)
}
