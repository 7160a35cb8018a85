use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Pdf,
    Text,
}

impl DocumentKind {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "txt" => Some(DocumentKind::Text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageText {
    // 1-based; None for sources without pagination.
    pub page: Option<u32>,
    pub text: String,
}

/// A source file of the corpus with its extracted text, page by page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    pub name: String,
    pub rel_path: String,
    pub kind: DocumentKind,
    pub pages: Vec<PageText>,
}

impl Document {
    /// Unpaginated text document.
    pub fn from_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            rel_path: name.clone(),
            name,
            kind: DocumentKind::Text,
            pages: vec![PageText {
                page: None,
                text: text.into(),
            }],
        }
    }

    /// Paginated document; pages are `(page_number, text)` in reading order.
    pub fn from_pages<I, S>(name: impl Into<String>, pages: I) -> Self
    where
        I: IntoIterator<Item = (u32, S)>,
        S: Into<String>,
    {
        let name = name.into();
        Self {
            rel_path: name.clone(),
            name,
            kind: DocumentKind::Pdf,
            pages: pages
                .into_iter()
                .map(|(page, text)| PageText {
                    page: Some(page),
                    text: text.into(),
                })
                .collect(),
        }
    }

    pub fn with_rel_path(mut self, rel_path: impl Into<String>) -> Self {
        self.rel_path = rel_path.into();
        self
    }

    pub fn has_text(&self) -> bool {
        self.pages.iter().any(|p| !p.text.trim().is_empty())
    }
}

/// Unit of retrieval. Created at index-build time and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    pub chunk_id: String,
    pub source: String,
    pub rel_path: String,
    pub page: Option<u32>,
    pub sequence_index: u32,
    pub text: String,
    pub text_sha256: String,
    /// `[start, end)` in characters of the document's joined text.
    pub char_range: [u32; 2],
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CitationLocator {
    pub source: String,
    pub page: Option<u32>,
    pub sequence_index: u32,
    pub char_range: [u32; 2],
}

impl Chunk {
    pub fn locator(&self) -> CitationLocator {
        CitationLocator {
            source: self.source.clone(),
            page: self.page,
            sequence_index: self.sequence_index,
            char_range: self.char_range,
        }
    }
}
