//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that use the newsletter
//! library without making real network or LLM calls. Mocks for the
//! collaborator traits live beside their traits; this module holds the
//! probe mock and always-failing collaborators.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{NewsletterError, Result};
use crate::traits::generator::Generator;
use crate::traits::searcher::{SearchHit, WebSearcher};
use crate::validator::{ProbeStatus, UrlProbe};

/// A mock URL probe with canned statuses per URL.
///
/// URLs with no canned status probe as unreachable. Call counts are
/// tracked for asserting that pre-filters short-circuit the network.
#[derive(Default)]
pub struct MockProbe {
    statuses: Arc<RwLock<HashMap<String, ProbeStatus>>>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockProbe {
    /// Create a probe that knows no URLs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a URL as reachable with no declared size.
    pub fn with_ok(self, url: &str) -> Self {
        self.with_status(url, ProbeStatus::ok_without_length())
    }

    /// Set the full probe status for a URL.
    pub fn with_status(self, url: &str, status: ProbeStatus) -> Self {
        self.statuses
            .write()
            .unwrap()
            .insert(url.to_string(), status);
        self
    }

    /// Number of probes performed.
    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }

    /// URLs probed, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }
}

impl Clone for MockProbe {
    fn clone(&self) -> Self {
        Self {
            statuses: Arc::clone(&self.statuses),
            calls: Arc::clone(&self.calls),
        }
    }
}

#[async_trait]
impl UrlProbe for MockProbe {
    async fn probe(&self, url: &str, _timeout: Duration) -> Option<ProbeStatus> {
        self.calls.write().unwrap().push(url.to_string());
        self.statuses.read().unwrap().get(url).copied()
    }
}

/// A web searcher that always fails.
#[derive(Default)]
pub struct FailingSearcher;

#[async_trait]
impl WebSearcher for FailingSearcher {
    async fn search(
        &self,
        _query: &str,
        _max_results: usize,
        _include_raw_content: bool,
    ) -> Result<Vec<SearchHit>> {
        Err(NewsletterError::Search(Box::new(std::io::Error::new(
            std::io::ErrorKind::Other,
            "search provider down",
        ))))
    }
}

/// A generator that always fails.
#[derive(Default)]
pub struct FailingGenerator;

#[async_trait]
impl Generator for FailingGenerator {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        Err(NewsletterError::Generation(Box::new(std::io::Error::new(
            std::io::ErrorKind::Other,
            "model unavailable",
        ))))
    }
}
