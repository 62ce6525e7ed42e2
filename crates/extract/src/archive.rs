//! Tar archive extraction.

use crate::error::{ErrorKind, Result};
use crate::{FileMap, canonicalize, normalize};
use docgate_compress::sniff;
use exn::ResultExt;
use std::io::Read;
use tar::{Archive, Entry};
use tracing::instrument;

/// How well an archive entry matches a requested path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Match {
    /// Entry name equals the target.
    Exact,
    /// Entry name ends with `/<target>`; the number of enclosing directories.
    Nested(usize),
}

/// Match an entry path against a requested path.
///
/// Archives frequently wrap their content in a single top-level directory
/// (`std/index.html` for a request of `index.html`), so suffix matches on a
/// segment boundary are accepted. Fewer enclosing directories win.
pub(crate) fn match_target(entry: &str, target: &str) -> Option<Match> {
    if entry == target {
        return Some(Match::Exact);
    }
    let prefix = entry.strip_suffix(target)?.strip_suffix('/')?;
    Some(Match::Nested(prefix.split('/').count()))
}

fn open(bytes: &[u8]) -> Result<Archive<Box<dyn Read + '_>>> {
    let compression = sniff(bytes).or_raise(|| ErrorKind::Decompression)?;
    tracing::trace!(%compression, "Opening bundle archive");
    Ok(Archive::new(compression.wrap_reader(bytes)))
}

/// Returns the canonical path of a regular-file entry, or `None` if the entry
/// should be skipped (directories, links, unusable names).
fn file_path<R: Read>(entry: &Entry<'_, R>) -> Result<Option<String>> {
    if !entry.header().entry_type().is_file() {
        return Ok(None);
    }
    let raw = entry.path().or_raise(|| ErrorKind::Decompression)?;
    match canonicalize(&raw) {
        Ok(path) => Ok(Some(path)),
        Err(e) => {
            tracing::warn!(path = %raw.display(), error = %*e, "Skipping archive entry with unusable path");
            Ok(None)
        },
    }
}

fn read_content<R: Read>(entry: &mut Entry<'_, R>) -> Result<Vec<u8>> {
    let mut content = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or_default());
    entry.read_to_end(&mut content).or_raise(|| ErrorKind::Decompression)?;
    Ok(normalize(content))
}

/// Decompresses and unpacks every file in a bundle archive.
///
/// Directory entries are skipped; file contents pass through
/// [`normalize`](crate::normalize). Fails with
/// [`Decompression`](ErrorKind::Decompression) when the bytes are not a
/// (gzipped) tar archive, and with [`EmptyBundle`](ErrorKind::EmptyBundle)
/// when no file entries were found.
#[instrument(skip(bytes), fields(bundle_size = bytes.len(), files))]
pub fn extract(bytes: &[u8]) -> Result<FileMap> {
    let mut archive = open(bytes)?;
    let mut files = FileMap::new();
    for entry in archive.entries().or_raise(|| ErrorKind::Decompression)? {
        let mut entry = entry.or_raise(|| ErrorKind::Decompression)?;
        let Some(path) = file_path(&entry)? else {
            continue;
        };
        let content = read_content(&mut entry)?;
        files.insert(path, content);
    }
    if files.is_empty() {
        exn::bail!(ErrorKind::EmptyBundle);
    }
    tracing::Span::current().record("files", files.len());
    Ok(files)
}

/// Decompresses a bundle archive just far enough to find one file.
///
/// The target matches entries whose canonical name equals it or ends with
/// `/<target>`. Scanning stops at the first exact match or the first match
/// nested under a single top-level directory; deeper matches are remembered
/// and the shallowest one is returned once the archive is exhausted.
#[instrument(skip(bytes), fields(bundle_size = bytes.len()))]
pub fn extract_one(bytes: &[u8], target: &str) -> Result<Option<Vec<u8>>> {
    let mut archive = open(bytes)?;
    let mut best: Option<(Match, Vec<u8>)> = None;
    for entry in archive.entries().or_raise(|| ErrorKind::Decompression)? {
        let mut entry = entry.or_raise(|| ErrorKind::Decompression)?;
        let Some(path) = file_path(&entry)? else {
            continue;
        };
        let Some(found) = match_target(&path, target) else {
            continue;
        };
        if best.as_ref().is_some_and(|(current, _)| *current <= found) {
            continue;
        }
        let content = read_content(&mut entry)?;
        if found <= Match::Nested(1) {
            return Ok(Some(content));
        }
        best = Some((found, content));
    }
    Ok(best.map(|(_, content)| content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use docgate_compress::Compression;
    use rstest::rstest;

    fn tarball(files: &[(&str, &str)], compression: Compression) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (path, content) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, path, content.as_bytes()).unwrap();
        }
        let tar = builder.into_inner().unwrap();
        compression.compress(&tar).unwrap()
    }

    fn with_directory(files: &[(&str, &str)]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Directory);
        header.set_size(0);
        header.set_mode(0o755);
        header.set_cksum();
        builder.append_data(&mut header, "std/", std::io::empty()).unwrap();
        for (path, content) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, path, content.as_bytes()).unwrap();
        }
        Compression::Gzip.compress(&builder.into_inner().unwrap()).unwrap()
    }

    #[rstest]
    #[case("index.html", "index.html", Some(Match::Exact))]
    #[case("std/index.html", "index.html", Some(Match::Nested(1)))]
    #[case("std/fs/index.html", "index.html", Some(Match::Nested(2)))]
    #[case("std/fs/index.html", "fs/index.html", Some(Match::Nested(1)))]
    #[case("std/myindex.html", "index.html", None)]
    #[case("index.html", "std/index.html", None)]
    fn test_match_target(#[case] entry: &str, #[case] target: &str, #[case] expected: Option<Match>) {
        assert_eq!(match_target(entry, target), expected);
    }

    #[rstest]
    #[case(Compression::Gzip)]
    #[case(Compression::None)]
    fn test_extract_all_files(#[case] compression: Compression) {
        let bytes = tarball(
            &[("std/index.html", "<html></html>"), ("static.files/x.css", "body{}")],
            compression,
        );
        let files = extract(&bytes).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files["std/index.html"], b"<html></html>");
        assert_eq!(files["static.files/x.css"], b"body{}");
    }

    #[test]
    fn test_extract_skips_directories_and_normalizes() {
        let bytes = with_directory(&[("std/index.html", "104,105"), ("./std/all.html", "<p>all</p>")]);
        let files = extract(&bytes).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files["std/index.html"], b"hi");
        assert!(files.contains_key("std/all.html"));
    }

    #[test]
    fn test_extract_rejects_garbage() {
        let err = extract(b"definitely not an archive").unwrap_err();
        assert_eq!(*err, ErrorKind::Decompression);
    }

    #[test]
    fn test_extract_rejects_truncated_gzip() {
        let bytes = tarball(&[("index.html", "<html></html>")], Compression::Gzip);
        let err = extract(&bytes[..bytes.len() / 2]).unwrap_err();
        assert_eq!(*err, ErrorKind::Decompression);
    }

    #[test]
    fn test_extract_empty_archive() {
        let bytes = with_directory(&[]);
        let err = extract(&bytes).unwrap_err();
        assert_eq!(*err, ErrorKind::EmptyBundle);
    }

    #[test]
    fn test_extract_one_tolerates_enclosing_directory() {
        let bytes = tarball(
            &[
                ("std/fs/index.html", "fs"),
                ("std/index.html", "root"),
                ("static.files/x.css", "css"),
            ],
            Compression::Gzip,
        );
        assert_eq!(extract_one(&bytes, "index.html").unwrap().unwrap(), b"root");
        assert_eq!(extract_one(&bytes, "fs/index.html").unwrap().unwrap(), b"fs");
        assert_eq!(extract_one(&bytes, "static.files/x.css").unwrap().unwrap(), b"css");
        assert_eq!(extract_one(&bytes, "missing.html").unwrap(), None);
    }

    #[test]
    fn test_extract_one_prefers_shallowest_deep_match() {
        let bytes = tarball(&[("a/b/c/page.html", "deep"), ("a/b/page.html", "shallow")], Compression::Gzip);
        assert_eq!(extract_one(&bytes, "page.html").unwrap().unwrap(), b"shallow");
    }
}
