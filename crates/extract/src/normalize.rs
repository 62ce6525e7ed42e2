//! Byte-code normalization.
//!
//! Some bundle producers write file bodies as the textual form of a byte array
//! (`"104,101,108,108,111"` instead of `"hello"`). Detection starts with a
//! cheap prefix check (`digits,digits`), but content is only converted when
//! the *entire* body parses as a comma-separated list of codes. Anything else,
//! CSS such as `10,20px{...}` included, is returned untouched.

use crate::consts::BYTE_CODES_PREFIX;

/// Normalizes a file body, decoding it if it is a serialized byte array.
///
/// When every code fits in a byte, the codes are the raw (UTF-8) bytes of the
/// original file. Otherwise each code is read as a Unicode scalar value. If
/// any code fails to parse or convert, the content is left unchanged.
///
/// # Examples
///
/// ```
/// use docgate_extract::normalize;
/// assert_eq!(normalize(b"104,101,108,108,111".to_vec()), b"hello");
/// assert_eq!(normalize(b"<html></html>".to_vec()), b"<html></html>");
/// ```
pub fn normalize(content: Vec<u8>) -> Vec<u8> {
    match decode(&content) {
        Some(decoded) => decoded,
        None => content,
    }
}

fn decode(content: &[u8]) -> Option<Vec<u8>> {
    let text = std::str::from_utf8(content).ok()?.trim();
    if !BYTE_CODES_PREFIX.is_match(text) {
        return None;
    }
    let codes = text.split(',').map(|code| code.trim().parse::<u32>().ok()).collect::<Option<Vec<u32>>>()?;
    if codes.iter().all(|code| *code <= u32::from(u8::MAX)) {
        // Lossless: every code is <= 255.
        return Some(codes.into_iter().map(|code| code as u8).collect());
    }
    let decoded = codes.into_iter().map(char::from_u32).collect::<Option<String>>()?;
    Some(decoded.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("104,101,108,108,111", "hello")]
    #[case("104, 105", "hi")]
    #[case("104,105\n", "hi")]
    // Multi-byte UTF-8 encoded as bytes.
    #[case("226,156,147", "\u{2713}")]
    // Codes above a byte are Unicode scalar values.
    #[case("10003,32,111,107", "\u{2713} ok")]
    fn test_decodes_byte_arrays(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize(input.as_bytes().to_vec()), expected.as_bytes());
    }

    #[rstest]
    #[case("<!DOCTYPE html><html></html>")]
    #[case("body { margin: 0 }")]
    #[case("")]
    #[case("42")]
    #[case(",104,105")]
    #[case("1, 2 and more")]
    fn test_ordinary_content_unchanged(#[case] input: &str) {
        assert_eq!(normalize(input.as_bytes().to_vec()), input.as_bytes());
    }

    #[test]
    fn test_css_with_numeric_prefix_is_not_decoded() {
        // Matches the `digits,digits` prefix but is not a byte array.
        let css = "10,20px{color:red}";
        assert_eq!(normalize(css.as_bytes().to_vec()), css.as_bytes());
    }

    #[test]
    fn test_invalid_scalar_values_unchanged() {
        // 0xD800 is a lone surrogate, 0x110000 is out of range.
        for input in ["55296,104", "1114112,104"] {
            assert_eq!(normalize(input.as_bytes().to_vec()), input.as_bytes());
        }
    }

    #[test]
    fn test_binary_content_unchanged() {
        let png = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0xFF];
        assert_eq!(normalize(png.clone()), png);
    }
}
