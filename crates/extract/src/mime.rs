use std::path::Path;

/// Infers a `Content-Type` from the path suffix alone.
///
/// Unknown or missing extensions fall back to `application/octet-stream`,
/// which browsers won't sniff into something executable when served with
/// `X-Content-Type-Options: nosniff`.
#[must_use]
pub fn content_type(path: impl AsRef<Path>) -> &'static str {
    let Some(extension) = path.as_ref().extension().and_then(|ext| ext.to_str()) else {
        return "application/octet-stream";
    };
    match extension.to_ascii_lowercase().as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css",
        "js" | "mjs" => "text/javascript",
        "json" | "map" => "application/json",
        "txt" | "md" => "text/plain; charset=utf-8",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "wasm" => "application/wasm",
        _ => "application/octet-stream",
    }
}

/// Returns `true` if the path will be served as HTML (and therefore needs
/// rewriting and sanitization).
#[must_use]
pub fn is_html(path: impl AsRef<Path>) -> bool {
    content_type(path).starts_with("text/html")
}
