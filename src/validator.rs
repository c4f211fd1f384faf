//! URL liveness and content-quality validation.
//!
//! Validation never errors: any timeout, transport failure, or
//! non-success status makes a URL invalid. The network probe sits
//! behind [`UrlProbe`] so validity logic can be tested against a mock.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;

use crate::types::config::ValidatorConfig;

/// Substrings marking decorative, non-content imagery.
///
/// Matched case-insensitively against the whole URL as a cheap
/// pre-filter before any network cost.
const LOW_QUALITY_MARKERS: &[&str] = &[
    "avatar",
    "icon",
    "favicon",
    "logo",
    "placeholder",
    "pixel",
    "1x1",
    "spacer",
    "blank.",
    "sprite",
    "banner",
    "/ads/",
    "ad-banner",
    "tracking",
    "badge",
];

/// Outcome of probing a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeStatus {
    /// Whether the response status was in the success class.
    pub ok: bool,

    /// Declared content size, when the server reported one.
    pub content_length: Option<u64>,
}

impl ProbeStatus {
    /// A successful probe with a declared size.
    pub fn ok_with_length(length: u64) -> Self {
        Self {
            ok: true,
            content_length: Some(length),
        }
    }

    /// A successful probe with no declared size.
    pub fn ok_without_length() -> Self {
        Self {
            ok: true,
            content_length: None,
        }
    }
}

/// Existence probe for a URL.
///
/// Implementations must not raise: a `None` return means the URL could
/// not be reached within the timeout.
#[async_trait]
pub trait UrlProbe: Send + Sync {
    /// Check whether the URL answers, without downloading the body.
    async fn probe(&self, url: &str, timeout: Duration) -> Option<ProbeStatus>;
}

/// HTTP probe: header-only request first, streamed full request as a
/// fallback for servers that reject HEAD. The body is never read.
pub struct HttpProbe {
    client: reqwest::Client,
    user_agent: String,
}

impl Default for HttpProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpProbe {
    /// Create a probe with a browser-like user agent.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .redirect(reqwest::redirect::Policy::limited(10))
                .build()
                .expect("Failed to create HTTP client"),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
        }
    }
}

#[async_trait]
impl UrlProbe for HttpProbe {
    async fn probe(&self, url: &str, timeout: Duration) -> Option<ProbeStatus> {
        // HEAD first
        let head = self
            .client
            .head(url)
            .header("User-Agent", &self.user_agent)
            .timeout(timeout)
            .send()
            .await;

        if let Ok(response) = head {
            if response.status().is_success() {
                return Some(ProbeStatus {
                    ok: true,
                    content_length: response.content_length(),
                });
            }
        }

        // Some servers reject HEAD; retry with GET without reading the body
        let get = self
            .client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .timeout(timeout)
            .send()
            .await;

        match get {
            Ok(response) => Some(ProbeStatus {
                ok: response.status().is_success(),
                content_length: response.content_length(),
            }),
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "probe failed");
                None
            }
        }
    }
}

/// URL validator with optional content-quality checking.
#[derive(Clone)]
pub struct UrlValidator {
    probe: Arc<dyn UrlProbe>,
    config: ValidatorConfig,
}

impl Default for UrlValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlValidator {
    /// Create a validator backed by [`HttpProbe`].
    pub fn new() -> Self {
        Self::with_probe(Arc::new(HttpProbe::new()))
    }

    /// Create a validator with a custom probe.
    pub fn with_probe(probe: Arc<dyn UrlProbe>) -> Self {
        Self {
            probe,
            config: ValidatorConfig::default(),
        }
    }

    /// Set the config.
    pub fn with_config(mut self, config: ValidatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Check whether a URL is live and, optionally, whether it looks
    /// like real content rather than a decorative asset.
    ///
    /// Never raises; any failure yields `false`.
    pub async fn is_valid(&self, url: &str, check_quality: bool) -> bool {
        if url.is_empty() || !url.starts_with("http") {
            return false;
        }

        if check_quality {
            let lowered = url.to_lowercase();
            if LOW_QUALITY_MARKERS.iter().any(|m| lowered.contains(m)) {
                return false;
            }
        }

        let Some(status) = self.probe.probe(url, self.config.probe_timeout).await else {
            return false;
        };
        if !status.ok {
            return false;
        }

        if check_quality {
            // A tiny declared size is a strong decorative-asset signal
            if let Some(length) = status.content_length {
                if length < self.config.min_content_bytes {
                    return false;
                }
            }
        }

        true
    }

    /// Validate a batch concurrently, preserving input order.
    ///
    /// Runs at most [`ValidatorConfig::max_concurrent_checks`] probes at
    /// once; the returned subset keeps the relative order of `urls`, not
    /// completion order.
    pub async fn filter_valid(&self, urls: &[String], check_quality: bool) -> Vec<String> {
        let checks: Vec<(String, bool)> = stream::iter(urls)
            .map(|url| async move { (url.clone(), self.is_valid(url, check_quality).await) })
            .buffered(self.config.max_concurrent_checks.max(1))
            .collect()
            .await;

        checks
            .into_iter()
            .filter_map(|(url, valid)| valid.then_some(url))
            .collect()
    }
}
