//! Search-result articles enriched with validated images.

use serde::{Deserialize, Serialize};

/// Sentinel recorded when a search hit carries no publication date.
pub const DATE_UNKNOWN: &str = "date unknown";

/// A single search result enriched with validated associated images.
///
/// Immutable after the collector assembles it; owned by one pipeline
/// invocation and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// Title of the page as reported by the search provider.
    pub title: String,

    /// Absolute URL of the article.
    pub url: String,

    /// Content excerpt from the search hit.
    pub content: String,

    /// Publication date string, or [`DATE_UNKNOWN`] when absent.
    pub published_date: String,

    /// Validated images discovered for this article (at most a few).
    #[serde(default)]
    pub associated_images: Vec<String>,
}

impl Article {
    /// Create a new article with an unknown publication date and no images.
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            content: content.into(),
            published_date: DATE_UNKNOWN.to_string(),
            associated_images: Vec::new(),
        }
    }

    /// Set the publication date.
    pub fn with_published_date(mut self, date: impl Into<String>) -> Self {
        self.published_date = date.into();
        self
    }

    /// Attach associated images.
    pub fn with_images(mut self, images: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.associated_images = images.into_iter().map(|i| i.into()).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_unknown_date() {
        let article = Article::new("Title", "https://a.com/post", "excerpt");
        assert_eq!(article.published_date, DATE_UNKNOWN);
        assert!(article.associated_images.is_empty());
    }

    #[test]
    fn test_builders() {
        let article = Article::new("Title", "https://a.com/post", "excerpt")
            .with_published_date("2026-08-01")
            .with_images(["https://a.com/img.jpg"]);

        assert_eq!(article.published_date, "2026-08-01");
        assert_eq!(article.associated_images, vec!["https://a.com/img.jpg"]);
    }
}
