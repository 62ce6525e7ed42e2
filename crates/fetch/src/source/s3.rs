//! S3-compatible object storage fallback.
//!
//! Bundles are mirrored into a bucket under their content hash, optionally
//! below a key prefix. Works with AWS S3 and S3-compatible services
//! (Backblaze B2, Tigris, MinIO, ...).
//!
//! # Credentials
//!
//! Credentials are provided explicitly via the configuration file.

use super::Source;
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Credentials, Region, retry::RetryConfig},
};
use exn::ResultExt;

/// Object-storage fallback source.
///
/// # Examples
///
/// ```no_run
/// use docgate_fetch::ObjectStoreSource;
///
/// let fallback = ObjectStoreSource::new(
///     "docs-mirror",
///     Some("bundles/".to_string()),
///     "us-west-004",
///     Some("https://s3.us-west-004.backblazeb2.com".to_string()),
///     "access_key_id",
///     "secret_access_key",
/// );
/// ```
#[derive(Debug, Clone)]
pub struct ObjectStoreSource {
    name: String,
    client: Client,
    bucket: String,
    prefix: Option<String>,
}

impl ObjectStoreSource {
    /// Create a new object-storage source.
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name (also the source name in logs)
    /// * `prefix` - Optional key prefix (acts as virtual directory)
    /// * `region` - AWS region or provider-specific region (e.g., "us-west-004" for Backblaze)
    /// * `endpoint` - Custom endpoint URL for S3-compatible services
    /// * `key_id` - AWS/provider access key ID
    /// * `key_secret` - AWS/provider secret access key
    pub fn new(
        bucket: impl Into<String>,
        prefix: Option<String>,
        region: impl Into<String>,
        endpoint: Option<impl Into<String>>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
    ) -> Self {
        let bucket = bucket.into();
        let credentials = Credentials::new(key_id, key_secret, None, None, "docgate-config");
        let mut config_builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(region.into()))
            // The fetcher already bounds the attempt; keep SDK retries short.
            .retry_config(RetryConfig::standard().with_max_attempts(2))
            // Path-style addressing for S3-compatible services.
            .force_path_style(true);
        if let Some(endpoint_url) = endpoint {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }
        Self {
            name: format!("s3:{bucket}"),
            client: Client::from_conf(config_builder.build()),
            bucket,
            prefix: prefix.map(|p| p.trim_matches('/').to_string()).filter(|p| !p.is_empty()),
        }
    }

    /// Object key for a content hash.
    fn key(&self, hash: &str) -> String {
        full_key(self.prefix.as_deref(), hash)
    }
}

fn full_key(prefix: Option<&str>, hash: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}/{hash}"),
        None => hash.to_string(),
    }
}

#[async_trait]
impl Source for ObjectStoreSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, hash: &str) -> Result<Vec<u8>> {
        let key = self.key(hash);
        tracing::debug!(bucket = %self.bucket, %key, "Requesting bundle from object storage");
        let output = self.client.get_object().bucket(&self.bucket).key(&key).send().await.map_err(|e| {
            let kind = if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                ErrorKind::NotFound
            } else {
                ErrorKind::Backend(e.to_string())
            };
            exn::Exn::from(kind)
        })?;
        let body = output
            .body
            .collect()
            .await
            .or_raise(|| ErrorKind::Network(format!("reading s3://{}/{key}", self.bucket)))?;
        Ok(body.into_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_key() {
        assert_eq!(full_key(None, "bafy"), "bafy");
        assert_eq!(full_key(Some("bundles"), "bafy"), "bundles/bafy");
    }

    #[test]
    fn test_prefix_is_trimmed() {
        let source = ObjectStoreSource::new("docs", Some("/bundles/".to_string()), "auto", None::<String>, "id", "secret");
        assert_eq!(source.key("bafy"), "bundles/bafy");
        assert_eq!(source.name(), "s3:docs");
        let source = ObjectStoreSource::new("docs", Some("/".to_string()), "auto", None::<String>, "id", "secret");
        assert_eq!(source.key("bafy"), "bafy");
    }
}
