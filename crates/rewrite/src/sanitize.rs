//! Removal of active content from untrusted pages.

use crate::consts::NUMERIC_ENTITY;

/// URI schemes that execute code when followed.
const SCRIPT_SCHEMES: [&str; 2] = ["javascript:", "vbscript:"];
/// Replacement for neutralized URIs.
pub(crate) const NEUTRAL_URI: &str = "#";

/// `onclick`, `onload`, `onerror`, ...
fn is_event_handler(attribute: &str) -> bool {
    attribute.len() > 2 && attribute.get(..2).is_some_and(|prefix| prefix.eq_ignore_ascii_case("on"))
}

/// Attributes that carry code or markup of their own: event handlers and
/// `srcdoc`.
pub(crate) fn is_active_attribute(attribute: &str) -> bool {
    is_event_handler(attribute) || attribute.eq_ignore_ascii_case("srcdoc")
}

/// Returns `true` if a raw attribute value is a `javascript:` (or similar)
/// URI, looking through character references and the whitespace and control
/// characters browsers ignore.
pub(crate) fn is_script_uri(raw: &str) -> bool {
    let decoded = NUMERIC_ENTITY.replace_all(raw, |caps: &regex::Captures<'_>| {
        let code = match (caps.get(1), caps.get(2)) {
            (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
            (_, Some(decimal)) => decimal.as_str().parse().ok(),
            _ => None,
        };
        code.and_then(char::from_u32).map(String::from).unwrap_or_default()
    });
    let compact: String = decoded
        .replace("&colon;", ":")
        .replace("&Tab;", "")
        .replace("&NewLine;", "")
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    SCRIPT_SCHEMES.iter().any(|scheme| compact.starts_with(scheme))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("onclick", true)]
    #[case("ONLOAD", true)]
    #[case("on", false)]
    #[case("one", true)]
    #[case("class", false)]
    #[case("data-onclick", false)]
    #[case("SrcDoc", true)]
    #[case("src", false)]
    fn test_is_active_attribute(#[case] attribute: &str, #[case] expected: bool) {
        assert_eq!(is_active_attribute(attribute), expected);
    }

    #[rstest]
    #[case("javascript:alert(1)", true)]
    #[case("  JavaScript:alert(1)", true)]
    #[case("java\tscript:alert(1)", true)]
    #[case("&#106;avascript:alert(1)", true)]
    #[case("&#x6A;avascript&colon;alert(1)", true)]
    #[case("vbscript:msgbox", true)]
    #[case("https://example.com/javascript:", false)]
    #[case("struct.Vec.html", false)]
    #[case("#javascript:", false)]
    fn test_is_script_uri(#[case] value: &str, #[case] expected: bool) {
        assert_eq!(is_script_uri(value), expected);
    }
}
