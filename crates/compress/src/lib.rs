//! Bundle archive sniffing and decompression.
//!
//! Bundles arrive from content-addressed storage as opaque bytes with no
//! name or content type. [`sniff`] decides from the leading bytes whether
//! they hold a gzipped tar archive or a bare one, and
//! [`Compression::wrap_reader`] gives the tar parser a stream of the
//! decompressed bytes.

pub mod error;

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use flate2::{Compression as GzLevel, read::GzDecoder, write::GzEncoder};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::io::{Read, Write};

const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];
/// POSIX (`ustar\0`) and GNU (`ustar `) tar headers both carry this at byte
/// offset 257.
const USTAR_MAGIC: &[u8; 5] = b"ustar";
const USTAR_OFFSET: usize = 257;

/// How a bundle archive is wrapped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Compression {
    /// A bare tar archive.
    #[default]
    None,
    /// A gzipped tar archive (`.tar.gz`, `.tgz`).
    Gzip,
}

impl Display for Compression {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match self {
            Compression::None => "none",
            Compression::Gzip => "gzip",
        })
    }
}

/// Returns `true` if the bytes start with an uncompressed tar header.
#[must_use]
pub fn is_tar(bytes: &[u8]) -> bool {
    bytes.get(USTAR_OFFSET..USTAR_OFFSET + USTAR_MAGIC.len()) == Some(USTAR_MAGIC.as_slice())
}

/// Identifies the wrapping of a bundle archive from its leading bytes.
///
/// Gzip is recognized by its magic number alone; whether the compressed
/// stream really holds a tar archive only shows once it is read.
///
/// # Examples
///
/// ```
/// use docgate_compress::{Compression, sniff};
///
/// let gzipped = Compression::Gzip.compress(b"anything").unwrap();
/// assert_eq!(sniff(&gzipped).unwrap(), Compression::Gzip);
/// assert!(sniff(b"<!DOCTYPE html>").is_err());
/// ```
pub fn sniff(bytes: &[u8]) -> Result<Compression> {
    if bytes.starts_with(&GZIP_MAGIC) {
        return Ok(Compression::Gzip);
    }
    if is_tar(bytes) {
        return Ok(Compression::None);
    }
    exn::bail!(ErrorKind::Unrecognized)
}

impl Compression {
    /// Wraps a reader with the matching decompression layer.
    ///
    /// Decompression is lazy; corrupt input surfaces as an
    /// [`std::io::Error`] from the first failing `read`.
    pub fn wrap_reader<'a, R: Read + 'a>(&self, reader: R) -> Box<dyn Read + 'a> {
        match self {
            Compression::None => Box::new(reader),
            Compression::Gzip => Box::new(GzDecoder::new(reader)),
        }
    }

    /// Compresses a byte slice in memory, for producing bundles.
    pub fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        match self {
            Compression::None => Ok(input.to_vec()),
            Compression::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), GzLevel::default());
                encoder.write_all(input).or_raise(|| ErrorKind::Io)?;
                encoder.finish().or_raise(|| ErrorKind::Io)
            },
        }
    }
}
