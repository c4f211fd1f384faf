//! Web searcher trait for article discovery.
//!
//! The collector needs candidate articles for a topic. This trait
//! abstracts over search providers (Tavily, SerpAPI, Google Custom
//! Search, etc.); the pipeline treats a provider failure as "no results"
//! rather than a fatal error.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{NewsletterError, Result};

/// A candidate article returned by web search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// Title of the page.
    pub title: String,

    /// Absolute URL of the page.
    pub url: String,

    /// Content excerpt prepared by the provider.
    pub content: String,

    /// Full page content, when the provider was asked for it.
    #[serde(default)]
    pub raw_content: Option<String>,

    /// Publication date, when the provider knows it.
    #[serde(default)]
    pub published_date: Option<String>,
}

impl SearchHit {
    /// Create a new hit with no raw content or date.
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            content: content.into(),
            raw_content: None,
            published_date: None,
        }
    }

    /// Attach the full page content.
    pub fn with_raw_content(mut self, raw: impl Into<String>) -> Self {
        self.raw_content = Some(raw.into());
        self
    }

    /// Attach a publication date.
    pub fn with_published_date(mut self, date: impl Into<String>) -> Self {
        self.published_date = Some(date.into());
        self
    }
}

/// Web search trait for article discovery.
///
/// # Implementations
///
/// - [`TavilySearcher`] - Tavily API
/// - [`MockWebSearcher`] - For testing
#[async_trait]
pub trait WebSearcher: Send + Sync {
    /// Search the web for articles about the query.
    ///
    /// `include_raw_content` asks the provider for full page text, which
    /// the collector scans for inline image references.
    async fn search(
        &self,
        query: &str,
        max_results: usize,
        include_raw_content: bool,
    ) -> Result<Vec<SearchHit>>;
}

/// Mock web searcher for testing.
#[derive(Default)]
pub struct MockWebSearcher {
    hits: std::sync::RwLock<std::collections::HashMap<String, Vec<SearchHit>>>,
}

impl MockWebSearcher {
    /// Create a new mock searcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add hits for a query.
    pub fn with_hits(self, query: &str, hits: Vec<SearchHit>) -> Self {
        self.hits.write().unwrap().insert(query.to_string(), hits);
        self
    }
}

#[async_trait]
impl WebSearcher for MockWebSearcher {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
        _include_raw_content: bool,
    ) -> Result<Vec<SearchHit>> {
        let mut hits = self
            .hits
            .read()
            .unwrap()
            .get(query)
            .cloned()
            .unwrap_or_default();
        hits.truncate(max_results);
        Ok(hits)
    }
}

/// Tavily search depth.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
enum SearchDepth {
    Basic,
    Advanced,
}

/// Tavily-backed web searcher.
pub struct TavilySearcher {
    api_key: String,
    client: reqwest::Client,
    advanced_depth: bool,
}

impl TavilySearcher {
    /// Create a new Tavily searcher.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
            advanced_depth: true,
        }
    }

    /// Create from the `TAVILY_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("TAVILY_API_KEY")
            .map_err(|_| NewsletterError::Config("TAVILY_API_KEY not set".to_string()))?;
        Ok(Self::new(api_key))
    }

    /// Use basic search depth instead of advanced.
    pub fn with_basic_depth(mut self) -> Self {
        self.advanced_depth = false;
        self
    }
}

#[async_trait]
impl WebSearcher for TavilySearcher {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
        include_raw_content: bool,
    ) -> Result<Vec<SearchHit>> {
        #[derive(Serialize)]
        struct Request {
            api_key: String,
            query: String,
            search_depth: SearchDepth,
            max_results: usize,
            include_raw_content: bool,
        }

        #[derive(Deserialize)]
        struct Response {
            results: Vec<TavilyResult>,
        }

        #[derive(Deserialize)]
        struct TavilyResult {
            title: String,
            url: String,
            content: String,
            #[serde(default)]
            raw_content: Option<String>,
            #[serde(default)]
            published_date: Option<String>,
        }

        let request = Request {
            api_key: self.api_key.clone(),
            query: query.to_string(),
            search_depth: if self.advanced_depth {
                SearchDepth::Advanced
            } else {
                SearchDepth::Basic
            },
            max_results,
            include_raw_content,
        };

        let response = self
            .client
            .post("https://api.tavily.com/search")
            .json(&request)
            .send()
            .await
            .map_err(|e| NewsletterError::Search(Box::new(e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(NewsletterError::Search(Box::new(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Tavily API error {}: {}", status, body),
            ))));
        }

        let tavily_response: Response = response
            .json()
            .await
            .map_err(|e| NewsletterError::Search(Box::new(e)))?;

        let hits = tavily_response
            .results
            .into_iter()
            .map(|r| SearchHit {
                title: r.title,
                url: r.url,
                content: r.content,
                raw_content: r.raw_content,
                published_date: r.published_date,
            })
            .collect();

        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_searcher_returns_canned_hits() {
        let searcher = MockWebSearcher::new().with_hits(
            "rust async",
            vec![
                SearchHit::new("Post A", "https://a.com/1", "excerpt a"),
                SearchHit::new("Post B", "https://b.com/2", "excerpt b"),
            ],
        );

        let hits = searcher.search("rust async", 5, false).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].url, "https://a.com/1");
    }

    #[tokio::test]
    async fn test_mock_searcher_truncates_to_max_results() {
        let searcher = MockWebSearcher::new().with_hits(
            "q",
            vec![
                SearchHit::new("A", "https://a.com", "a"),
                SearchHit::new("B", "https://b.com", "b"),
                SearchHit::new("C", "https://c.com", "c"),
            ],
        );

        let hits = searcher.search("q", 2, false).await.unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn test_mock_searcher_unknown_query_is_empty() {
        let searcher = MockWebSearcher::new();
        let hits = searcher.search("nothing", 5, false).await.unwrap();
        assert!(hits.is_empty());
    }
}
