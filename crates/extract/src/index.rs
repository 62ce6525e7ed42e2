//! Search index extraction from documentation pages.
//!
//! The index is computed once per bundle from its HTML files and embedded into
//! every served page, so the client can search without further requests.

use crate::consts::{DOCBLOCK_PARAGRAPH_SELECTOR, HEADING_SELECTOR, PARAGRAPH_SELECTOR, TITLE_SELECTOR};
use crate::{FileMap, is_html};
use scraper::{Html, Selector};
use serde::Serialize;
use tracing::instrument;

/// Maximum length of a preview, in characters.
const PREVIEW_LENGTH: usize = 160;
/// Directories whose HTML is never worth indexing (rustdoc assets and
/// rendered source listings).
const SKIPPED_DIRECTORIES: [&str; 2] = ["static.files", "src"];

/// A single searchable documentation page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchEntry {
    /// Item name, e.g. `Vec` for `std/vec/struct.Vec.html`.
    pub name: String,
    /// Item kind from the rustdoc file naming convention (`struct`, `fn`,
    /// `mod` for index pages), or `page` when unknown.
    pub kind: String,
    /// Module path, e.g. `std::vec`.
    pub module: String,
    /// First sentence-ish of the page's documentation.
    pub preview: String,
    /// Relative path of the page inside the bundle.
    pub path: String,
}

/// All searchable pages of one bundle, ordered by path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SearchIndex {
    entries: Vec<SearchEntry>,
}

impl SearchIndex {
    /// Builds the index from every indexable HTML file in the map.
    #[instrument(skip_all, fields(files = files.len(), entries))]
    pub fn build(files: &FileMap) -> Self {
        let mut entries: Vec<SearchEntry> = files
            .iter()
            .filter(|(path, _)| is_indexable(path))
            .map(|(path, content)| Page::parse(content).entry(path))
            .collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        tracing::Span::current().record("entries", entries.len());
        Self { entries }
    }

    pub fn entries(&self) -> &[SearchEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn is_indexable(path: &str) -> bool {
    is_html(path) && !path.split('/').any(|segment| SKIPPED_DIRECTORIES.contains(&segment))
}

/// A parsed documentation page.
struct Page {
    document: Html,
}

impl Page {
    fn parse(content: &[u8]) -> Self {
        Self { document: Html::parse_document(&String::from_utf8_lossy(content)) }
    }

    fn first_text(&self, selector: &Selector) -> Option<String> {
        self.document
            .select(selector)
            .map(|el| collapse_whitespace(&el.text().collect::<String>()))
            .find(|text| !text.is_empty())
    }

    fn title(&self) -> Option<String> {
        // rustdoc titles look like "Vec in std::vec - Rust".
        let title = self.first_text(&TITLE_SELECTOR)?;
        let name = title.split(" - ").next().unwrap_or(&title);
        let name = name.split(" in ").next().unwrap_or(name).trim();
        (!name.is_empty()).then(|| name.to_string())
    }

    fn preview(&self) -> String {
        let text = self
            .first_text(&DOCBLOCK_PARAGRAPH_SELECTOR)
            .or_else(|| self.first_text(&PARAGRAPH_SELECTOR))
            .unwrap_or_default();
        truncate_chars(&text, PREVIEW_LENGTH)
    }

    fn entry(&self, path: &str) -> SearchEntry {
        let (directory, file) = path.rsplit_once('/').unwrap_or(("", path));
        let stem = file.rsplit_once('.').map_or(file, |(stem, _)| stem);
        let (kind, name) = match stem.split_once('.') {
            Some((kind, name)) if !name.is_empty() => (kind.to_string(), name.to_string()),
            _ if stem == "index" => {
                let module = directory.rsplit('/').next().filter(|m| !m.is_empty());
                let name = module.map(str::to_string).or_else(|| self.title()).unwrap_or_else(|| stem.to_string());
                ("mod".to_string(), name)
            },
            _ => {
                let name = self
                    .title()
                    .or_else(|| self.first_text(&HEADING_SELECTOR))
                    .unwrap_or_else(|| stem.to_string());
                ("page".to_string(), name)
            },
        };
        SearchEntry {
            name,
            kind,
            module: directory.replace('/', "::"),
            preview: self.preview(),
            path: path.to_string(),
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => format!("{}…", text[..end].trim_end()),
        None => text.to_string(),
    }
}
