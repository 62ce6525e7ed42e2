//! Archive entry path canonicalization.
//!
//! Every key in a [`FileMap`](crate::FileMap) passes through [`canonicalize`],
//! so lookups never have to care about leading slashes, `./` segments or
//! parent references hidden inside the archive.

use crate::error::{ErrorKind, Result};
use std::path::{Component, Path};

/// Canonicalizes an archive entry path into a map key.
///
/// Parent references are resolved, but may never leave the archive root.
/// Null bytes, non-UTF-8 names and platform prefixes are rejected.
///
/// # Examples
///
/// ```
/// use docgate_extract::canonicalize;
/// assert_eq!(canonicalize("./std/index.html").unwrap(), "std/index.html");
/// assert_eq!(canonicalize("/static.files/x.css").unwrap(), "static.files/x.css");
/// assert_eq!(canonicalize("std/../core/index.html").unwrap(), "core/index.html");
/// assert!(canonicalize("../etc/passwd").is_err());
/// ```
pub fn canonicalize(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let invalid = || ErrorKind::InvalidPath(path.to_string_lossy().into_owned());
    let mut segments: Vec<&str> = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(s) => {
                if s.as_encoded_bytes().contains(&0) {
                    exn::bail!(invalid());
                }
                match s.to_str() {
                    Some(segment) => segments.push(segment),
                    None => exn::bail!(invalid()),
                }
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(invalid()),
            Component::ParentDir => {
                if segments.pop().is_none() {
                    exn::bail!(invalid());
                }
            },
        }
    }
    match segments.is_empty() {
        true => exn::bail!(invalid()),
        false => Ok(segments.join("/")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("std/index.html", "std/index.html")]
    #[case("./std/index.html", "std/index.html")]
    #[case("/static.files/x.css", "static.files/x.css")]
    #[case("a//b//c.html", "a/b/c.html")]
    #[case("a/./b/c.html", "a/b/c.html")]
    #[case("a/b/../c.html", "a/c.html")]
    #[case("docs/", "docs")]
    fn test_canonical_paths(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(canonicalize(input).unwrap(), expected);
    }

    #[rstest]
    #[case("../etc/passwd")]
    #[case("a/../../b")]
    #[case("..")]
    #[case("")]
    #[case("./")]
    #[case("a\0b")]
    fn test_rejected_paths(#[case] input: &str) {
        assert!(canonicalize(input).is_err());
    }
}
