//! Embedded client-side assets.
//!
//! The search script is embedded into the binary at compile time using
//! [`rust-embed`](rust_embed) and inlined into every served page.

use crate::error::{ErrorKind, Result};
use exn::OptionExt;
use rust_embed::Embed;
use std::borrow::Cow;

/// File name of the search script.
pub(crate) const SEARCH_SCRIPT: &str = "search.js";
/// Replaced with the page's search index (a JSON array).
pub(crate) const INDEX_PLACEHOLDER: &str = "__DOCGATE_INDEX__";
/// Replaced with the route prefix of the package version (a JSON string).
pub(crate) const BASE_PLACEHOLDER: &str = "__DOCGATE_BASE__";

#[derive(Embed)]
#[folder = "assets/"]
pub(crate) struct Builtins;

impl Builtins {
    pub(crate) fn load(name: &str) -> Result<Cow<'static, [u8]>> {
        Self::get(name).map(|f| f.data).ok_or_raise(|| ErrorKind::AssetNotFound(name.to_string()))
    }

    /// The search script template as text.
    pub(crate) fn search_script() -> Result<String> {
        let data = Self::load(SEARCH_SCRIPT)?;
        Ok(String::from_utf8_lossy(&data).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_script_has_placeholders() {
        let script = Builtins::search_script().unwrap();
        assert!(script.contains(INDEX_PLACEHOLDER));
        assert!(script.contains(BASE_PLACEHOLDER));
        assert!(!script.to_ascii_lowercase().contains("</script"));
    }

    #[test]
    fn missing_asset() {
        let err = Builtins::load("missing.js").unwrap_err();
        assert_eq!(*err, ErrorKind::AssetNotFound("missing.js".to_string()));
    }
}
