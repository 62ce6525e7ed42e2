//! Documentation bundle extraction.
//!
//! A bundle is a (usually gzipped) tar archive holding every documentation file
//! of one package version. This crate turns those bytes into a [`Bundle`]: an
//! immutable map of canonical relative paths to file contents, plus the
//! [`SearchIndex`] derived from its HTML pages.

mod archive;
mod consts;
pub mod error;
mod index;
mod mime;
mod normalize;
mod path;

use std::collections::HashMap;

pub use crate::archive::{extract, extract_one};
pub use crate::index::{SearchEntry, SearchIndex};
pub use crate::mime::{content_type, is_html};
pub use crate::normalize::normalize;
pub use crate::path::canonicalize;
use crate::archive::match_target;

/// Canonical relative path -> raw file content.
pub type FileMap = HashMap<String, Vec<u8>>;

/// The extracted contents of one documentation bundle.
///
/// A given content hash always produces the same bundle, so once constructed
/// it is never mutated; the cache shares it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Bundle {
    hash: String,
    files: FileMap,
    index: SearchIndex,
}

impl Bundle {
    /// Wraps an extracted file map, computing its search index.
    pub fn new(hash: impl Into<String>, files: FileMap) -> Self {
        let index = SearchIndex::build(&files);
        Self { hash: hash.into(), files, index }
    }

    /// Decompresses, unpacks and indexes a bundle archive in one go.
    ///
    /// This is CPU-bound; async callers should run it on a blocking thread.
    pub fn from_archive(hash: impl Into<String>, bytes: &[u8]) -> error::Result<Self> {
        Ok(Self::new(hash, extract(bytes)?))
    }

    /// Content hash the bundle was fetched by.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn files(&self) -> &FileMap {
        &self.files
    }

    pub fn search_index(&self) -> &SearchIndex {
        &self.index
    }

    /// Number of files in the bundle.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Exact lookup by canonical path.
    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(Vec::as_slice)
    }

    /// Looks up a request path, tolerating enclosing directories.
    ///
    /// An exact match wins; otherwise the entry ending in `/<path>` with the
    /// fewest enclosing directories (ties broken by name, so the result does
    /// not depend on map iteration order). Returns the matched key too, which
    /// is the file's real location inside the bundle.
    pub fn resolve(&self, path: &str) -> Option<(&str, &[u8])> {
        if let Some((key, content)) = self.files.get_key_value(path) {
            return Some((key.as_str(), content.as_slice()));
        }
        self.files
            .iter()
            .filter_map(|(key, content)| match_target(key, path).map(|found| (found, key, content)))
            .min_by(|(a, a_key, _), (b, b_key, _)| a.cmp(b).then_with(|| a_key.cmp(b_key)))
            .map(|(_, key, content)| (key.as_str(), content.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle(entries: &[(&str, &str)]) -> Bundle {
        let files = entries.iter().map(|(path, content)| (path.to_string(), content.as_bytes().to_vec())).collect();
        Bundle::new("bafyhash", files)
    }

    #[test]
    fn test_resolve_exact_then_nested() {
        let bundle = bundle(&[
            ("std/index.html", "<p>std</p>"),
            ("std/fs/index.html", "<p>fs</p>"),
            ("static.files/x.css", "body{}"),
        ]);
        assert_eq!(bundle.resolve("static.files/x.css").unwrap().1, b"body{}");
        assert_eq!(bundle.resolve("index.html").unwrap(), ("std/index.html", b"<p>std</p>".as_slice()));
        assert_eq!(bundle.resolve("fs/index.html").unwrap().0, "std/fs/index.html");
        assert!(bundle.resolve("missing.html").is_none());
        assert!(bundle.resolve("x.css").is_some());
    }

    #[test]
    fn test_bundle_indexes_on_construction() {
        let bundle = bundle(&[("std/index.html", "<p>std</p>"), ("static.files/x.css", "body{}")]);
        assert_eq!(bundle.hash(), "bafyhash");
        assert_eq!(bundle.len(), 2);
        assert_eq!(bundle.search_index().len(), 1);
        assert_eq!(bundle.get("std/index.html"), Some(b"<p>std</p>".as_slice()));
    }
}
