//! Configuration for validation, collection, and page rendering.
//!
//! The byte-size floor for "real" images and the renderer delays are
//! empirically chosen; they are knobs here, not invariants.

use std::time::Duration;

/// Configuration for URL validity checks.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Budget for a single existence probe (HEAD, then streamed GET).
    pub probe_timeout: Duration,

    /// Quality mode rejects responses declaring fewer bytes than this.
    pub min_content_bytes: u64,

    /// Concurrent checks allowed in a batch validation.
    pub max_concurrent_checks: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(3),
            min_content_bytes: 5 * 1024,
            max_concurrent_checks: 10,
        }
    }
}

impl ValidatorConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-probe timeout.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Set the minimum declared size for quality-checked URLs.
    pub fn with_min_content_bytes(mut self, bytes: u64) -> Self {
        self.min_content_bytes = bytes;
        self
    }

    /// Set the batch concurrency cap.
    pub fn with_max_concurrent_checks(mut self, cap: usize) -> Self {
        self.max_concurrent_checks = cap;
        self
    }
}

/// Configuration for resource collection.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Candidate image URLs considered per article before validation.
    pub max_candidate_images: usize,

    /// Validated images kept per article.
    pub max_images_per_article: usize,

    /// Concurrent per-article image discovery tasks.
    pub max_concurrent_articles: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            max_candidate_images: 10,
            max_images_per_article: 3,
            max_concurrent_articles: 8,
        }
    }
}

impl CollectorConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pre-validation candidate cap.
    pub fn with_max_candidate_images(mut self, max: usize) -> Self {
        self.max_candidate_images = max;
        self
    }

    /// Set the per-article image cap.
    pub fn with_max_images_per_article(mut self, max: usize) -> Self {
        self.max_images_per_article = max;
        self
    }

    /// Set the per-article fan-out bound.
    pub fn with_max_concurrent_articles(mut self, cap: usize) -> Self {
        self.max_concurrent_articles = cap;
        self
    }
}

/// Configuration for the page renderer.
///
/// Render budgets are independent of the validator's probe timeout; the
/// two operations have different cost profiles and never share one.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Budget for fetching the page itself.
    pub navigation_timeout: Duration,

    /// Pause after navigation before the markup is inspected.
    pub settle_delay: Duration,

    /// User agent presented to the target site.
    pub user_agent: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(10),
            settle_delay: Duration::from_millis(500),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
        }
    }
}

impl RendererConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the navigation timeout.
    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    /// Set the post-navigation settle delay.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Set the user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}
