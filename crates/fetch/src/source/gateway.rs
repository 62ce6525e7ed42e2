//! HTTP gateways onto the content-addressed store.

use super::Source;
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::{OptionExt, ResultExt};
use reqwest::{Client, StatusCode, Url};

/// Placeholder substituted with the content hash in gateway templates.
const HASH_PLACEHOLDER: &str = "{hash}";

/// Builds the HTTP client shared by all gateways.
pub fn http_client() -> Result<Client> {
    Client::builder()
        .user_agent(concat!("docgate/", env!("CARGO_PKG_VERSION")))
        .build()
        .or_raise(|| ErrorKind::InvalidConfig("could not build HTTP client".to_string()))
}

/// A gateway reached over HTTP(S).
///
/// The endpoint is a URL template: `{hash}` is replaced by the content hash
/// if present, otherwise the hash is appended as the last path segment, so
/// both `https://ipfs.io/ipfs/` and `https://{hash}.ipfs.dweb.link/` work.
///
/// # Examples
///
/// ```
/// use docgate_fetch::{GatewaySource, Source, http_client};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let gateway = GatewaySource::new("https://ipfs.io/ipfs", http_client()?)?;
/// assert_eq!(gateway.name(), "ipfs.io");
/// assert_eq!(gateway.url_for("bafyabc"), "https://ipfs.io/ipfs/bafyabc");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct GatewaySource {
    name: String,
    template: String,
    client: Client,
}

impl GatewaySource {
    /// Create a gateway from its URL template.
    ///
    /// Fails with [`InvalidConfig`](ErrorKind::InvalidConfig) unless the
    /// template is an absolute `http` or `https` URL.
    pub fn new(template: impl Into<String>, client: Client) -> Result<Self> {
        let template = template.into();
        let invalid = || ErrorKind::InvalidConfig(format!("gateway URL {template:?}"));
        let url = Url::parse(&template.replace(HASH_PLACEHOLDER, "hash")).or_raise(invalid)?;
        if !matches!(url.scheme(), "http" | "https") {
            exn::bail!(invalid());
        }
        let name = url.host_str().ok_or_raise(invalid)?.to_string();
        Ok(Self { name, template, client })
    }

    /// Use a different name than the gateway's host in logs.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The URL a hash is fetched from.
    pub fn url_for(&self, hash: &str) -> String {
        if self.template.contains(HASH_PLACEHOLDER) {
            self.template.replace(HASH_PLACEHOLDER, hash)
        } else {
            format!("{}/{hash}", self.template.trim_end_matches('/'))
        }
    }
}

fn transport_error(err: &reqwest::Error) -> ErrorKind {
    if err.is_timeout() {
        ErrorKind::Timeout
    } else {
        ErrorKind::Network(err.to_string())
    }
}

#[async_trait]
impl Source for GatewaySource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, hash: &str) -> Result<Vec<u8>> {
        let url = self.url_for(hash);
        tracing::debug!(gateway = %self.name, %url, "Requesting bundle from gateway");
        let response = self.client.get(&url).send().await.map_err(|e| exn::Exn::from(transport_error(&e)))?;
        match response.status() {
            status if status.is_success() => {},
            StatusCode::NOT_FOUND | StatusCode::GONE => exn::bail!(ErrorKind::NotFound),
            status => exn::bail!(ErrorKind::Status(status.as_u16())),
        }
        let body = response.bytes().await.map_err(|e| exn::Exn::from(transport_error(&e)))?;
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway(template: &str) -> Result<GatewaySource> {
        GatewaySource::new(template, Client::new())
    }

    #[test]
    fn test_url_appends_hash() {
        assert_eq!(gateway("https://ipfs.io/ipfs/").unwrap().url_for("bafy"), "https://ipfs.io/ipfs/bafy");
        assert_eq!(gateway("https://ipfs.io/ipfs").unwrap().url_for("bafy"), "https://ipfs.io/ipfs/bafy");
    }

    #[test]
    fn test_url_substitutes_placeholder() {
        let gateway = gateway("https://{hash}.ipfs.dweb.link/").unwrap();
        assert_eq!(gateway.url_for("bafy"), "https://bafy.ipfs.dweb.link/");
        assert_eq!(gateway.name(), "hash.ipfs.dweb.link");
    }

    #[test]
    fn test_rejects_bad_templates() {
        for template in ["", "ipfs.io/ipfs", "ftp://ipfs.io/ipfs", "file:///tmp"] {
            let err = gateway(template).unwrap_err();
            assert!(matches!(&*err, ErrorKind::InvalidConfig(_)), "{template}");
        }
    }

    #[test]
    fn test_with_name() {
        let gateway = gateway("https://ipfs.io/ipfs").unwrap().with_name("primary");
        assert_eq!(gateway.name(), "primary");
    }
}
