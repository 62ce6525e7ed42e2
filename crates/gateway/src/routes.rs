//! HTTP surface.
//!
//! | Route                          | Method | Effect                           |
//! |--------------------------------|--------|----------------------------------|
//! | `/docs/{package}[/{rest}]`     | GET    | serve a documentation file       |
//! | `/docs/{package}[/{version}]`  | DELETE | evict a version or a package     |
//! | `/docs`                        | DELETE | flush every cache                |
//! | `/healthz`                     | GET    | liveness                         |
//! | `/stats`                       | GET    | cache and limiter counters       |

use crate::error::{Error, ErrorKind};
use crate::service::{DocsService, Document};
use axum::Router;
use axum::extract::{ConnectInfo, Extension, FromRequestParts, Path, State};
use axum::http::header::{
    CACHE_CONTROL, CONTENT_SECURITY_POLICY, CONTENT_TYPE, RETRY_AFTER, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{delete, get};
use docgate_security::error::{ErrorKind as ValidationErrorKind, Field};
use exn::ResultExt;
use std::convert::Infallible;
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;

/// `max-age` for rewritten pages; they embed a per-response nonce.
const HTML_MAX_AGE: u64 = 3600;
/// `max-age` for everything else.
const ASSET_MAX_AGE: u64 = 86400;
/// Content-Security-Policy of everything but rewritten pages. Assets opened
/// directly (SVG in particular) must not run script on this origin.
const ASSET_CONTENT_SECURITY_POLICY: &str = "default-src 'none'; style-src 'unsafe-inline'; sandbox";

type AppState = Arc<DocsService>;

/// Builds the router over a shared service. Forwarding headers are only
/// read from `proxies`.
pub fn router(service: Arc<DocsService>, proxies: TrustedProxies) -> Router {
    Router::new()
        .route("/docs", delete(flush))
        .route("/docs/:package", get(get_latest).delete(evict_package))
        .route("/docs/:package/*rest", get(get_document).delete(evict_version))
        .route("/healthz", get(healthz))
        .route("/stats", get(stats))
        .layer(Extension(proxies))
        .with_state(service)
}

/// Serves the router until `shutdown` resolves. Peer addresses are made
/// available for rate limiting.
pub async fn serve(
    listener: TcpListener,
    service: Arc<DocsService>,
    proxies: TrustedProxies,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let app = router(service, proxies).into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await
}

/// Reverse proxies allowed to report the address of the client behind them.
#[derive(Debug, Clone, Default)]
pub struct TrustedProxies(Arc<[IpAddr]>);

impl TrustedProxies {
    pub fn contains(&self, ip: IpAddr) -> bool {
        self.0.contains(&ip)
    }
}

impl FromIterator<IpAddr> for TrustedProxies {
    fn from_iter<I: IntoIterator<Item = IpAddr>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Identity a client's requests are counted under: the peer address, or
/// for a trusted proxy the client it forwards for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientKey(pub String);

impl ClientKey {
    fn resolve(peer: Option<IpAddr>, headers: &HeaderMap, proxies: &TrustedProxies) -> Self {
        let key = match peer {
            Some(peer) if proxies.contains(peer) => forwarded(headers, proxies).unwrap_or_else(|| peer.to_string()),
            Some(peer) => peer.to_string(),
            None => "unknown".to_string(),
        };
        Self(key)
    }
}

/// The nearest `X-Forwarded-For` hop that isn't a trusted proxy, then
/// `X-Real-IP`.
fn forwarded(headers: &HeaderMap, proxies: &TrustedProxies) -> Option<String> {
    let header = |name: &str| headers.get(name).and_then(|value| value.to_str().ok());
    let hops: Vec<&str> = header("x-forwarded-for")
        .map(|chain| chain.split(',').map(str::trim).filter(|hop| !hop.is_empty()).collect())
        .unwrap_or_default();
    let is_proxy = |hop: &str| hop.parse::<IpAddr>().is_ok_and(|ip| proxies.contains(ip));
    hops.iter()
        .rev()
        .find(|hop| !is_proxy(**hop))
        .or(hops.first())
        .copied()
        .or_else(|| header("x-real-ip").map(str::trim).filter(|value| !value.is_empty()))
        .map(str::to_string)
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for ClientKey
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts.extensions.get::<ConnectInfo<SocketAddr>>().map(|ConnectInfo(addr)| addr.ip());
        let proxies = parts.extensions.get::<TrustedProxies>().cloned().unwrap_or_default();
        Ok(Self::resolve(peer, &parts.headers, &proxies))
    }
}

/// Error response. Bodies are short plain text; internal detail is only
/// logged.
#[derive(Debug)]
pub struct HttpError(Error);

impl From<Error> for HttpError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let kind: &ErrorKind = &self.0;
        let status = kind.status();
        match status.is_server_error() {
            true => tracing::error!(error = ?self.0, "Request failed"),
            false => tracing::debug!(error = %kind, "Request rejected"),
        }
        let mut response = (status, kind.public_message()).into_response();
        if let ErrorKind::RateLimited { retry_after } = kind {
            // Rounded up so clients never retry early.
            let seconds = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            response.headers_mut().insert(RETRY_AFTER, HeaderValue::from(seconds.max(1)));
        }
        response
    }
}

type HandlerResult = Result<Response, HttpError>;

/// Content-Security-Policy of a rewritten page: only the injected script,
/// identified by its nonce, may run.
pub fn content_security_policy(nonce: &str) -> String {
    format!(
        "default-src 'self'; script-src 'nonce-{nonce}'; style-src 'self' 'unsafe-inline'; img-src 'self' data:; \
         font-src 'self' data:; object-src 'none'; base-uri 'none'; frame-ancestors 'none'"
    )
}

fn document_response(document: Document) -> Result<Response, Error> {
    let max_age = match document.is_html() {
        true => HTML_MAX_AGE,
        false => ASSET_MAX_AGE,
    };
    let mut response = (StatusCode::OK, document.body).into_response();
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(document.content_type));
    let cache_control = format!("public, max-age={max_age}");
    headers.insert(CACHE_CONTROL, HeaderValue::from_str(&cache_control).or_raise(|| ErrorKind::Unexpected)?);
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    match &document.nonce {
        Some(nonce) => {
            let csp = HeaderValue::from_str(&content_security_policy(nonce)).or_raise(|| ErrorKind::Unexpected)?;
            headers.insert(CONTENT_SECURITY_POLICY, csp);
            headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
        },
        None => {
            headers.insert(CONTENT_SECURITY_POLICY, HeaderValue::from_static(ASSET_CONTENT_SECURITY_POLICY));
        },
    }
    Ok(response)
}

async fn get_latest(State(service): State<AppState>, client: ClientKey, Path(package): Path<String>) -> HandlerResult {
    service.admit(&client.0)?;
    let document = service.get(&package, "").await?;
    Ok(document_response(document)?)
}

async fn get_document(
    State(service): State<AppState>,
    client: ClientKey,
    Path((package, rest)): Path<(String, String)>,
) -> HandlerResult {
    service.admit(&client.0)?;
    let document = service.get(&package, &rest).await?;
    Ok(document_response(document)?)
}

async fn evict_version(
    State(service): State<AppState>,
    client: ClientKey,
    Path((package, rest)): Path<(String, String)>,
) -> HandlerResult {
    service.admit(&client.0)?;
    let version = rest.trim_matches('/');
    if version.contains('/') {
        let err = exn::Exn::from(ValidationErrorKind::Separator(Field::Version));
        return Err(ErrorKind::invalid(err).into());
    }
    let version = Some(version).filter(|version| !version.is_empty());
    let eviction = service.evict(Some(&package), version).await?;
    Ok((StatusCode::OK, eviction.to_string()).into_response())
}

async fn evict_package(State(service): State<AppState>, client: ClientKey, Path(package): Path<String>) -> HandlerResult {
    service.admit(&client.0)?;
    let eviction = service.evict(Some(&package), None).await?;
    Ok((StatusCode::OK, eviction.to_string()).into_response())
}

async fn flush(State(service): State<AppState>, client: ClientKey) -> HandlerResult {
    service.admit(&client.0)?;
    let eviction = service.evict(None, None).await?;
    Ok((StatusCode::OK, eviction.to_string()).into_response())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn stats(State(service): State<AppState>) -> Response {
    Json(service.stats()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::time::Duration;

    const PEER: &str = "10.0.0.1";
    const PROXY: &str = "10.0.0.2";

    fn proxies() -> TrustedProxies {
        [PEER, PROXY].into_iter().map(|ip| ip.parse::<IpAddr>().unwrap()).collect()
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(*value));
        }
        map
    }

    #[rstest]
    #[case(&[("x-forwarded-for", "203.0.113.7, 10.0.0.2")], "203.0.113.7")]
    #[case(&[("x-forwarded-for", "198.51.100.1, 203.0.113.7")], "203.0.113.7")]
    #[case(&[("x-forwarded-for", "10.0.0.2, 10.0.0.1")], "10.0.0.2")]
    #[case(&[("x-real-ip", " 198.51.100.2 ")], "198.51.100.2")]
    #[case(&[("x-forwarded-for", "203.0.113.7"), ("x-real-ip", "198.51.100.2")], "203.0.113.7")]
    #[case(&[("x-forwarded-for", " , ")], PEER)]
    #[case(&[], PEER)]
    fn test_client_behind_trusted_proxy(#[case] pairs: &[(&'static str, &'static str)], #[case] expected: &str) {
        let key = ClientKey::resolve(PEER.parse().ok(), &headers(pairs), &proxies());
        assert_eq!(key.0, expected);
    }

    #[rstest]
    #[case(&[("x-forwarded-for", "203.0.113.7")])]
    #[case(&[("x-real-ip", "203.0.113.7")])]
    #[case(&[])]
    fn test_forwarding_headers_ignored_from_untrusted_peers(#[case] pairs: &[(&'static str, &'static str)]) {
        let peer = "192.0.2.50".parse().ok();
        assert_eq!(ClientKey::resolve(peer, &headers(pairs), &proxies()).0, "192.0.2.50");
        assert_eq!(ClientKey::resolve(peer, &headers(pairs), &TrustedProxies::default()).0, "192.0.2.50");
    }

    #[test]
    fn test_unknown_peer() {
        let key = ClientKey::resolve(None, &headers(&[("x-forwarded-for", "203.0.113.7")]), &proxies());
        assert_eq!(key.0, "unknown");
    }

    #[test]
    fn test_rate_limited_response() {
        let err = exn::Exn::from(ErrorKind::RateLimited {
            retry_after: Duration::from_millis(2500),
        });
        let response = HttpError(err).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[RETRY_AFTER], "3");
    }

    #[test]
    fn test_html_response_headers() {
        let document = Document {
            version: "0.69.1".to_string(),
            path: "index.html".to_string(),
            content_type: "text/html; charset=utf-8",
            body: b"<html></html>".to_vec(),
            nonce: Some("abc".to_string()),
        };
        let response = document_response(document).unwrap();
        let headers = response.headers();
        assert_eq!(headers[CACHE_CONTROL], "public, max-age=3600");
        assert_eq!(headers[X_FRAME_OPTIONS], "DENY");
        assert!(headers[CONTENT_SECURITY_POLICY].to_str().unwrap().contains("script-src 'nonce-abc'"));
    }

    #[test]
    fn test_asset_response_headers() {
        let document = Document {
            version: "0.69.1".to_string(),
            path: "static.files/x.css".to_string(),
            content_type: "text/css",
            body: b"body{}".to_vec(),
            nonce: None,
        };
        let response = document_response(document).unwrap();
        let headers = response.headers();
        assert_eq!(headers[CACHE_CONTROL], "public, max-age=86400");
        assert_eq!(headers[X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(headers[CONTENT_SECURITY_POLICY], "default-src 'none'; style-src 'unsafe-inline'; sandbox");
        assert!(headers.get(X_FRAME_OPTIONS).is_none());
    }

    #[test]
    fn test_svg_cannot_script() {
        let document = Document {
            version: "0.69.1".to_string(),
            path: "static.files/logo.svg".to_string(),
            content_type: "image/svg+xml",
            body: br#"<svg xmlns="http://www.w3.org/2000/svg"><script>alert(1)</script></svg>"#.to_vec(),
            nonce: None,
        };
        let response = document_response(document).unwrap();
        let csp = response.headers()[CONTENT_SECURITY_POLICY].to_str().unwrap();
        assert!(csp.contains("default-src 'none'"));
        assert!(!csp.contains("script-src"));
        assert!(csp.ends_with("sandbox"));
    }
}
