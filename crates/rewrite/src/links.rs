//! Rewriting of asset references and navigation links into gateway routes.

use crate::Context;
use crate::consts::{ASSET_PREFIX, SCHEME};

/// Rewrites a legacy relative asset reference (`../static.files/x.css`) to
/// the version's absolute asset route.
pub(crate) fn rewrite_asset(raw: &str, ctx: &Context) -> Option<String> {
    let prefix = ASSET_PREFIX.find(raw)?;
    Some(format!("{}static.files/{}", ctx.base_attribute(), &raw[prefix.end()..]))
}

/// Rewrites a relative link to an HTML page into its gateway route.
///
/// Links with a scheme, absolute links and same-page fragments are left
/// alone, as is anything that isn't an `.html` page. `..` segments are
/// resolved against the page's directory and can't climb above the version
/// root. Query strings and fragments are carried over.
pub(crate) fn rewrite_link(raw: &str, ctx: &Context) -> Option<String> {
    if raw.is_empty() || raw.starts_with('#') || raw.starts_with('/') || SCHEME.is_match(raw) {
        return None;
    }
    let split = raw.find(['?', '#']).unwrap_or(raw.len());
    let (path, suffix) = raw.split_at(split);
    if !path.ends_with(".html") {
        return None;
    }
    let mut segments = ctx.directory();
    for segment in path.split('/') {
        match segment {
            "" | "." => {},
            ".." => {
                segments.pop();
            },
            segment => segments.push(segment),
        }
    }
    Some(format!("{}{}{suffix}", ctx.base_attribute(), segments.join("/")))
}
