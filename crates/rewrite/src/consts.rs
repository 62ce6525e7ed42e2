use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

// Legacy relative asset references: `static.files/`, `./static.files/`, `../../static.files/`.
regex!(ASSET_PREFIX, r"^(?:\./|(?:\.\./)+)?static\.files/");
regex!(SCHEME, r"^[a-zA-Z][a-zA-Z0-9+.-]*:");
regex!(NUMERIC_ENTITY, r"&#(?:[xX]([0-9a-fA-F]+)|([0-9]+));?");
