//! Token-level pass over a page.

use crate::Context;
use crate::links::{rewrite_asset, rewrite_link};
use crate::sanitize::{NEUTRAL_URI, is_active_attribute, is_script_uri};
use crate::scan::{Tag, Token, Tokens};

/// A rewritten page.
pub(crate) struct Markup {
    pub(crate) html: String,
    /// Byte offset of the first closing head tag in `html`.
    pub(crate) head_end: Option<usize>,
}

/// Drops script elements and active attributes, neutralizes script URIs and
/// rewrites asset references and page links. Text, comments and attributes
/// that don't change keep their original text.
pub(crate) fn rewrite_markup(html: &str, ctx: &Context) -> Markup {
    let mut output = String::with_capacity(html.len());
    let mut head_end = None;
    let mut in_script = false;
    for token in Tokens::new(html) {
        match token {
            Token::Text(text) | Token::Comment(text) => output.push_str(text),
            Token::StartTag(tag) if tag.is("script") => in_script = true,
            Token::StartTag(tag) => rewrite_tag(&tag, ctx, &mut output),
            Token::RawText(_) if in_script => {},
            // Without `<`, raw text reads the same in foreign (SVG, MathML) content.
            Token::RawText(text) => output.push_str(&text.replace('<', "&lt;")),
            Token::EndTag(tag) if tag.is("script") => in_script = false,
            Token::EndTag(tag) => {
                if tag.is("head") && head_end.is_none() {
                    head_end = Some(output.len());
                }
                if tag.attributes.is_empty() {
                    output.push_str(tag.raw);
                } else {
                    // Attributes on closing tags are ignored by browsers.
                    output.push_str("</");
                    output.push_str(tag.name);
                    output.push('>');
                }
            },
        }
    }
    Markup { html: output, head_end }
}

fn rewrite_tag(tag: &Tag<'_>, ctx: &Context, output: &mut String) {
    output.push('<');
    output.push_str(tag.name);
    for attribute in &tag.attributes {
        if is_active_attribute(attribute.name) {
            continue;
        }
        match attribute.value.and_then(|value| rewrite_value(attribute.name, value, ctx)) {
            Some(value) => {
                output.push_str(attribute.leading);
                output.push_str(attribute.name);
                output.push_str("=\"");
                // Everything but `"` in the raw value is already attribute-encoded.
                output.push_str(&value.replace('"', "&quot;"));
                output.push('"');
            },
            None => output.push_str(attribute.raw),
        }
    }
    output.push_str(tag.tail);
}

fn rewrite_value(name: &str, value: &str, ctx: &Context) -> Option<String> {
    if is_script_uri(value) {
        return Some(NEUTRAL_URI.to_string());
    }
    if let Some(asset) = rewrite_asset(value, ctx) {
        return Some(asset);
    }
    if name.eq_ignore_ascii_case("href") {
        return rewrite_link(value, ctx);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn rewrite(html: &str) -> String {
        rewrite_markup(html, &Context::new("std", "1.0", "std/index.html")).html
    }

    #[rstest]
    #[case(r#"<a href="struct.A.html" onclick="x()">A</a>"#, r#"<a href="/docs/std/1.0/std/struct.A.html">A</a>"#)]
    #[case(r#"<img src=x onerror=alert(1)>"#, r#"<img src=x>"#)]
    #[case(r#"<body onload='x()' class="rustdoc">"#, r#"<body class="rustdoc">"#)]
    #[case(r#"<a href="x"onmouseover="y()">"#, r#"<a href="x">"#)]
    #[case(r#"<a/onclick="y()"/href="x">"#, r#"<a/href="x">"#)]
    #[case(r#"<a href="javascript:alert(1)">x</a>"#, r##"<a href="#">x</a>"##)]
    #[case(r#"<a href=JAVASCRIPT:alert(1)>x</a>"#, r##"<a href="#">x</a>"##)]
    #[case(r#"<iframe srcdoc="&lt;b&gt;" src="a.html"></iframe>"#, r#"<iframe src="a.html"></iframe>"#)]
    #[case(
        r#"<link rel="stylesheet" href="../static.files/rustdoc.css">"#,
        r#"<link rel="stylesheet" href="/docs/std/1.0/static.files/rustdoc.css">"#
    )]
    #[case(
        r#"<meta name="rustdoc-vars" data-static-root-path="../static.files/">"#,
        r#"<meta name="rustdoc-vars" data-static-root-path="/docs/std/1.0/static.files/">"#
    )]
    #[case(r#"<a title="a > b" href='../index.html'>"#, r#"<a title="a > b" href="/docs/std/1.0/index.html">"#)]
    #[case(r#"<input disabled value="x">"#, r#"<input disabled value="x">"#)]
    #[case(r#"<br/>"#, r#"<br/>"#)]
    #[case(r#"</p onclick="x()">"#, r#"</p>"#)]
    fn test_rewrite_tags(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(rewrite(input), expected);
    }

    #[rstest]
    #[case("<p>a</p><script>alert(1)</script><p>b</p>", "<p>a</p><p>b</p>")]
    #[case("<SCRIPT type=\"module\" src=\"x.js\"></SCRIPT >", "")]
    #[case("<script>\nlet a = '</p>';\n</script>x", "x")]
    #[case("<script>if (a <script) {}</script>x", "x")]
    #[case("<p>unterminated<script src=x>", "<p>unterminated")]
    #[case("<p>stray</script>", "<p>stray")]
    fn test_scripts_removed(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(rewrite(input), expected);
    }

    #[rstest]
    // The comment closes at the first `-->`; what follows is a real tag.
    #[case(r#"<!--<a title="--><img src=x onerror=alert(1)>">"#, r#"<!--<a title="--><img src=x>">"#)]
    // Raw text closes at its own end tag, whatever quotes it holds.
    #[case(r#"<style><a title="</style><img src=x onerror=alert(1)>">"#, r#"<style>&lt;a title="</style><img src=x>">"#)]
    #[case(r#"<textarea><a title="</textarea><img src=x onerror=alert(1)>">"#, r#"<textarea>&lt;a title="</textarea><img src=x>">"#)]
    #[case(r#"<title><a title="</title><img src=x onerror=alert(1)>">"#, r#"<title>&lt;a title="</title><img src=x>">"#)]
    // An unquoted value runs to whitespace, quotes included.
    #[case(r#"<img src=x onerror=alert(1)//">"#, r#"<img src=x>"#)]
    #[case(r#"<svg><style><img src=x onerror=alert(1)></style></svg>"#, r#"<svg><style>&lt;img src=x onerror=alert(1)></style></svg>"#)]
    #[case(r#"<noscript><p title="</noscript><img src=x onerror=alert(1)>">"#, r#"<noscript>&lt;p title="</noscript><img src=x>">"#)]
    #[case(r#"<p>ok</p><img src=x onerror="alert(1)"#, "<p>ok</p>")]
    fn test_markup_breakouts(#[case] input: &str, #[case] expected: &str) {
        let output = rewrite(input);
        assert_eq!(output, expected);
        assert_eq!(rewrite(&output), output);
    }

    #[test]
    fn test_text_and_comments_untouched() {
        let html = "<!-- ../static.files/x.css --><p>turn on=off</p>";
        assert_eq!(rewrite(html), html);
    }

    #[test]
    fn test_head_end_skips_lookalikes() {
        let html = r#"<head><!-- </head> --><meta content="</head>"><title></head></title></head><body>"#;
        let markup = rewrite_markup(html, &Context::new("std", "1.0", "index.html"));
        assert_eq!(&markup.html[markup.head_end.unwrap()..], "</head><body>");
        assert_eq!(rewrite_markup("<p>no head</p>", &Context::new("std", "1.0", "index.html")).head_end, None);
    }
}
