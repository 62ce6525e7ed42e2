use regex::Regex;
use scraper::Selector;
use std::sync::LazyLock;

macro_rules! selector {
    ($name:ident, $css:expr) => {
        pub(crate) static $name: LazyLock<Selector> = LazyLock::new(|| Selector::parse($css).unwrap());
    };
}

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

// Upstream quirk: some bundle producers serialize file bodies as the string
// form of a byte array ("60,104,116,109,108,...").
regex!(BYTE_CODES_PREFIX, r"^\d+\s*,\s*\d+");

selector!(TITLE_SELECTOR, "title");
selector!(HEADING_SELECTOR, "h1");
// rustdoc puts the item summary in the first paragraph of the top docblock.
selector!(DOCBLOCK_PARAGRAPH_SELECTOR, ".docblock p");
selector!(PARAGRAPH_SELECTOR, "p");
