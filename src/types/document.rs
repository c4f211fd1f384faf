//! Block-structured documents produced by the generation pipeline.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::article::Article;

/// Recognized block kinds in a generated document.
///
/// The content schema varies per kind and is carried opaquely in
/// [`Block::content`]; unrecognized kinds deserialize to [`Unknown`]
/// rather than failing the whole document.
///
/// [`Unknown`]: BlockKind::Unknown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Header,
    MainStory,
    DeepDive,
    QuickHits,
    ToolSpotlight,
    Quote,
    StatBox,
    Insight,
    Text,
    #[serde(other)]
    Unknown,
}

/// One structured unit of a generated document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    /// Identifier, assigned during reconciliation when the model omits it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Declared block kind.
    #[serde(rename = "type")]
    pub kind: BlockKind,

    /// Kind-specific content. Expected to be a JSON object; anything else
    /// is tolerated at parse time and surfaces as a per-block repair error.
    #[serde(default)]
    pub content: Value,
}

impl Block {
    /// Create a block with no id.
    pub fn new(kind: BlockKind, content: Value) -> Self {
        Self {
            id: None,
            kind,
            content,
        }
    }

    /// Read a string field from the block content, if present.
    pub fn content_str(&self, field: &str) -> Option<&str> {
        self.content.get(field).and_then(Value::as_str)
    }
}

/// Deduplicated, insertion-ordered collection of validated image URLs.
///
/// Order is first-seen order across all articles; exact-duplicate URLs
/// are dropped on insert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImagePool {
    urls: IndexSet<String>,
}

impl ImagePool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a URL, returning whether it was new.
    pub fn insert(&mut self, url: impl Into<String>) -> bool {
        self.urls.insert(url.into())
    }

    /// Insert every URL in order.
    pub fn extend(&mut self, urls: impl IntoIterator<Item = impl Into<String>>) {
        for url in urls {
            self.insert(url);
        }
    }

    /// Whether the pool already holds this exact URL.
    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    /// URL at the given insertion position.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.urls.get_index(index).map(String::as_str)
    }

    /// Number of distinct URLs.
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Iterate URLs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.urls.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for ImagePool {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut pool = Self::new();
        pool.extend(iter);
        pool
    }
}

/// The finished unit returned to the caller.
///
/// Constructed fresh per request and never mutated after return; any
/// persistence is the email provider's concern, not this crate's.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    /// Management title for the newsletter.
    pub title: String,

    /// Reconciled blocks in generation order.
    pub blocks: Vec<Block>,

    /// Validated, deduplicated image pool.
    pub images: ImagePool,

    /// Raw articles the collection produced, valid or not.
    pub sources: Vec<Article>,
}
