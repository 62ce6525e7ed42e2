/// Where a page is being served from.
///
/// Links inside the page are resolved against the directory of `path` and
/// prefixed with the version's route, `/docs/{package}/{version}/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    package: String,
    version: String,
    path: String,
}

impl Context {
    pub fn new(package: impl Into<String>, version: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            version: version.into(),
            path: path.into(),
        }
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Requested path of the page, relative to the version root.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Route prefix of the package version, with a trailing slash.
    pub fn base(&self) -> String {
        format!("/docs/{}/{}/", self.package, self.version)
    }

    /// [`base`](Self::base), safe to write into an attribute value.
    pub(crate) fn base_attribute(&self) -> String {
        format!("/docs/{}/{}/", escape_attribute(&self.package), escape_attribute(&self.version))
    }

    /// Segments of the directory holding the page.
    pub(crate) fn directory(&self) -> Vec<&str> {
        let mut segments: Vec<&str> = self.path.split('/').filter(|s| !s.is_empty() && *s != ".").collect();
        segments.pop();
        segments
    }
}

pub(crate) fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory() {
        assert!(Context::new("std", "1.0", "index.html").directory().is_empty());
        assert_eq!(Context::new("std", "1.0", "std/fs/index.html").directory(), ["std", "fs"]);
        assert_eq!(Context::new("std", "1.0", "./std/struct.A.html").directory(), ["std"]);
    }

    #[test]
    fn test_base_is_escaped_for_attributes() {
        let ctx = Context::new("a\"b", "<1>", "index.html");
        assert_eq!(ctx.base(), "/docs/a\"b/<1>/");
        assert_eq!(ctx.base_attribute(), "/docs/a&quot;b/&lt;1&gt;/");
    }
}
