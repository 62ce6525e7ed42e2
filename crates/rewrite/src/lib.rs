//! Page rewriting for served documentation.
//!
//! Bundled HTML was generated to be browsed from its own root, and it is
//! untrusted. Before a page is served it is rewritten so that:
//!
//! - asset references (`../static.files/...`) and relative page links point
//!   at the gateway's routes for the same package version;
//! - scripts, inline event handlers and `javascript:` URIs are gone;
//! - exactly one script, the client-side search, is present, carrying the
//!   response's CSP nonce.
//!
//! Rewriting a rewritten page with the same nonce changes nothing.

mod assets;
mod consts;
mod context;
pub mod error;
mod inject;
mod links;
mod sanitize;
mod scan;
mod tags;

pub use crate::context::Context;
use crate::error::Result;
use docgate_extract::SearchIndex;
use tracing::instrument;

/// Rewrites one HTML page.
///
/// `index` is the search index of the page's bundle (it is embedded in the
/// injected script). Pages without a `</head>` are still sanitized and
/// rewritten, but get no search script.
///
/// # Examples
///
/// ```
/// use docgate_extract::SearchIndex;
/// use docgate_rewrite::{Context, rewrite};
///
/// let ctx = Context::new("std", "0.69.1", "std/index.html");
/// let html = r#"<head></head><a href="vec/index.html" onclick="steal()">vec</a>"#;
/// let page = rewrite(html, &SearchIndex::default(), &ctx, "nonce").unwrap();
/// assert!(page.contains(r#"<a href="/docs/std/0.69.1/std/vec/index.html">vec</a>"#));
/// assert!(page.contains(r#"<script nonce="nonce">"#));
/// ```
#[instrument(skip_all, fields(package = ctx.package(), version = ctx.version(), path = ctx.path()))]
pub fn rewrite(html: &str, index: &SearchIndex, ctx: &Context, nonce: &str) -> Result<String> {
    let markup = tags::rewrite_markup(html, ctx);
    let Some(head_end) = markup.head_end else {
        tracing::warn!("Search script not injected; closing head tag not found");
        return Ok(markup.html);
    };
    let script = inject::search_script(index, ctx, nonce)?;
    Ok(inject::inject(&markup.html, head_end, &script))
}

#[cfg(test)]
mod tests {
    use super::*;
    use docgate_extract::{Bundle, FileMap};

    const PAGE: &str = r##"<!DOCTYPE html>
<html><head>
<meta charset="utf-8">
<meta name="rustdoc-vars" data-static-root-path="../static.files/">
<link rel="stylesheet" href="../static.files/rustdoc-1234.css">
<script src="../static.files/main-5678.js"></script>
<title>fs - Rust</title></head>
<body onload="init()">
<a href="struct.File.html#method.open">File</a>
<a href="../index.html">std</a>
<a href="https://doc.rust-lang.org/">upstream</a>
<a href="#implementations">jump</a>
<a href="javascript:void(0)">nothing</a>
<img src="./static.files/logo.svg" onerror="alert(1)">
<script>alert(document.cookie)</script>
</body></html>"##;

    fn index() -> SearchIndex {
        let mut files = FileMap::new();
        files.insert("std/fs/struct.File.html".to_string(), b"<title>File in std::fs - Rust</title>".to_vec());
        Bundle::new("bafy", files).search_index().clone()
    }

    fn ctx() -> Context {
        Context::new("std", "0.69.1", "std/fs/index.html")
    }

    #[test]
    fn test_rewrites_full_page() {
        let page = rewrite(PAGE, &index(), &ctx(), "n0nce").unwrap();
        assert!(page.contains(r#"data-static-root-path="/docs/std/0.69.1/static.files/""#));
        assert!(page.contains(r#"href="/docs/std/0.69.1/static.files/rustdoc-1234.css""#));
        assert!(page.contains(r#"<a href="/docs/std/0.69.1/std/fs/struct.File.html#method.open">"#));
        assert!(page.contains(r#"<a href="/docs/std/0.69.1/std/index.html">"#));
        assert!(page.contains(r#"<a href="https://doc.rust-lang.org/">"#));
        assert!(page.contains(r##"<a href="#implementations">"##));
        assert!(page.contains(r##"<a href="#">nothing</a>"##));
        assert!(page.contains(r#"<img src="/docs/std/0.69.1/static.files/logo.svg">"#));
        assert!(page.contains("<body>"));
        assert!(!page.contains("alert("));
        assert!(!page.contains("main-5678.js"));
        assert_eq!(page.matches("<script").count(), 1);
        assert!(page.contains(r#"<script nonce="n0nce">"#));
        assert!(page.contains(r#""name":"File""#));
        let script_at = page.find("<script").unwrap();
        assert!(script_at < page.find("</head>").unwrap());
    }

    #[test]
    fn test_idempotent() {
        let once = rewrite(PAGE, &index(), &ctx(), "n0nce").unwrap();
        let twice = rewrite(&once, &index(), &ctx(), "n0nce").unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_hostile_names_are_escaped() {
        let ctx = Context::new("x\"><script>", "1.0", "index.html");
        let page = rewrite(r#"<head></head><a href="a.html">a</a>"#, &SearchIndex::default(), &ctx, "n").unwrap();
        assert!(page.contains(r#"<a href="/docs/x&quot;&gt;&lt;script&gt;/1.0/a.html">"#));
        assert_eq!(page.matches("<script").count(), 1);
    }

    #[test]
    fn test_script_lands_before_real_head_close() {
        let html = r#"<head><meta name="x" content="</head>"><!-- </head> --></head><body></body>"#;
        let page = rewrite(html, &SearchIndex::default(), &ctx(), "n").unwrap();
        assert!(page.starts_with(r#"<head><meta name="x" content="</head>"><!-- </head> --><script nonce="n">"#));
        assert!(page.ends_with("</script></head><body></body>"));
    }

    #[test]
    fn test_page_without_head() {
        let page = rewrite(r#"<a href="a.html" onclick="x()">a</a>"#, &SearchIndex::default(), &ctx(), "n").unwrap();
        assert_eq!(page, r#"<a href="/docs/std/0.69.1/std/fs/a.html">a</a>"#);
    }
}
