//! Markup tokenizer.
//!
//! Splits a page where a browser's tokenizer would: comments end at the
//! first `-->`, raw-text elements end at their own closing tag, unquoted
//! attribute values end at whitespace, and a tag cut off by the end of the
//! input is no tag at all. Tokens borrow from the input, so anything passed
//! through unchanged keeps its original text.

/// Elements whose content is not markup.
const RAW_TEXT: [&str; 10] = ["iframe", "noembed", "noframes", "noscript", "plaintext", "script", "style", "textarea", "title", "xmp"];

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Token<'a> {
    Text(&'a str),
    /// Comments, doctypes and anything else browsers read as a comment.
    Comment(&'a str),
    StartTag(Tag<'a>),
    EndTag(Tag<'a>),
    /// Content of a raw-text element, up to its closing tag.
    RawText(&'a str),
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Tag<'a> {
    pub(crate) name: &'a str,
    pub(crate) attributes: Vec<Attribute<'a>>,
    /// Separators between the last attribute and the closing `>`, inclusive.
    pub(crate) tail: &'a str,
    pub(crate) raw: &'a str,
}

impl Tag<'_> {
    pub(crate) fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Attribute<'a> {
    /// Whitespace and slashes before the name.
    pub(crate) leading: &'a str,
    pub(crate) name: &'a str,
    /// Undecoded value, without quotes.
    pub(crate) value: Option<&'a str>,
    pub(crate) raw: &'a str,
}

pub(crate) struct Tokens<'a> {
    html: &'a str,
    position: usize,
    raw_text: Option<&'a str>,
}

impl<'a> Tokens<'a> {
    pub(crate) fn new(html: &'a str) -> Self {
        Self { html, position: 0, raw_text: None }
    }

    fn advance(&mut self, length: usize, token: Token<'a>) -> Option<Token<'a>> {
        self.position += length;
        Some(token)
    }

    /// Browsers drop a tag the input ends inside of.
    fn finish(&mut self) -> Option<Token<'a>> {
        self.position = self.html.len();
        None
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        let rest = &self.html[self.position..];
        if rest.is_empty() {
            return None;
        }
        if let Some(element) = self.raw_text.take() {
            let end = raw_text_end(rest, element);
            if end > 0 {
                return self.advance(end, Token::RawText(&rest[..end]));
            }
        }
        let bytes = rest.as_bytes();
        if bytes[0] == b'<' {
            match bytes.get(1) {
                Some(b'!') => {
                    let end = comment_end(rest);
                    return self.advance(end, Token::Comment(&rest[..end]));
                },
                Some(b'?') => {
                    let end = bogus_comment_end(rest);
                    return self.advance(end, Token::Comment(&rest[..end]));
                },
                Some(b'/') => match bytes.get(2) {
                    Some(byte) if byte.is_ascii_alphabetic() => {
                        return match parse_tag(rest, 2) {
                            Some(tag) => self.advance(tag.raw.len(), Token::EndTag(tag)),
                            None => self.finish(),
                        };
                    },
                    Some(_) => {
                        let end = bogus_comment_end(rest);
                        return self.advance(end, Token::Comment(&rest[..end]));
                    },
                    None => {},
                },
                Some(byte) if byte.is_ascii_alphabetic() => {
                    return match parse_tag(rest, 1) {
                        Some(tag) => {
                            self.raw_text = RAW_TEXT.iter().any(|element| tag.is(element)).then_some(tag.name);
                            self.advance(tag.raw.len(), Token::StartTag(tag))
                        },
                        None => self.finish(),
                    };
                },
                _ => {},
            }
        }
        let from = usize::from(bytes[0] == b'<');
        let end = rest[from..].find('<').map_or(rest.len(), |i| i + from);
        self.advance(end, Token::Text(&rest[..end]))
    }
}

fn is_space(byte: u8) -> bool {
    matches!(byte, b'\t' | b'\n' | b'\x0c' | b'\r' | b' ')
}

fn bogus_comment_end(rest: &str) -> usize {
    rest.find('>').map_or(rest.len(), |i| i + 1)
}

/// `rest` starts with `<!`.
fn comment_end(rest: &str) -> usize {
    let Some(body) = rest.strip_prefix("<!--") else {
        return bogus_comment_end(rest);
    };
    // `<!-->` and `<!--->` are complete, empty comments.
    if body.starts_with('>') {
        return 5;
    }
    if body.starts_with("->") {
        return 6;
    }
    ["-->", "--!>"]
        .iter()
        .filter_map(|close| body.find(close).map(|i| i + close.len()))
        .min()
        .map_or(rest.len(), |end| end + 4)
}

/// Length of raw text before the element's closing tag.
fn raw_text_end(rest: &str, element: &str) -> usize {
    if element.eq_ignore_ascii_case("plaintext") {
        return rest.len();
    }
    // ASCII lowercasing keeps byte offsets intact.
    let lower = rest.to_ascii_lowercase();
    let needle = format!("</{}", element.to_ascii_lowercase());
    let mut from = 0;
    while let Some(i) = lower[from..].find(&needle) {
        let at = from + i;
        match lower.as_bytes().get(at + needle.len()) {
            Some(&byte) if is_space(byte) || byte == b'/' || byte == b'>' => return at,
            _ => from = at + 1,
        }
    }
    rest.len()
}

/// Parses the tag at the start of `rest`, whose name begins at `name_start`.
/// Returns `None` if the input ends before the tag does.
fn parse_tag(rest: &str, name_start: usize) -> Option<Tag<'_>> {
    let bytes = rest.as_bytes();
    let stops_name = |byte: u8| is_space(byte) || byte == b'/' || byte == b'>';
    let mut i = name_start;
    while i < bytes.len() && !stops_name(bytes[i]) {
        i += 1;
    }
    let name = &rest[name_start..i];
    let mut attributes = Vec::new();
    loop {
        let start = i;
        while i < bytes.len() && (is_space(bytes[i]) || bytes[i] == b'/') {
            i += 1;
        }
        if *bytes.get(i)? == b'>' {
            return Some(Tag { name, attributes, tail: &rest[start..=i], raw: &rest[..=i] });
        }
        let name_from = i;
        // A leading `=` belongs to the name.
        i += 1;
        while i < bytes.len() && !stops_name(bytes[i]) && bytes[i] != b'=' {
            i += 1;
        }
        let attribute_name = &rest[name_from..i];
        let mut value = None;
        let mut j = i;
        while j < bytes.len() && is_space(bytes[j]) {
            j += 1;
        }
        if bytes.get(j) == Some(&b'=') {
            j += 1;
            while j < bytes.len() && is_space(bytes[j]) {
                j += 1;
            }
            match *bytes.get(j)? {
                quote @ (b'"' | b'\'') => {
                    let close = j + 1 + rest[j + 1..].find(char::from(quote))?;
                    value = Some(&rest[j + 1..close]);
                    i = close + 1;
                },
                b'>' => {
                    value = Some("");
                    i = j;
                },
                _ => {
                    let from = j;
                    while j < bytes.len() && !is_space(bytes[j]) && bytes[j] != b'>' {
                        j += 1;
                    }
                    value = Some(&rest[from..j]);
                    i = j;
                },
            }
        }
        attributes.push(Attribute { leading: &rest[start..name_from], name: attribute_name, value, raw: &rest[start..i] });
    }
}
