//! Page renderer trait for image discovery.
//!
//! Given a page URL, a renderer returns candidate image URLs: meta-tag
//! images (Open Graph, Twitter cards) plus inline `<img>` sources. The
//! collector treats a renderer failure as "no images from this page".
//!
//! [`HttpPageRenderer`] fetches and scans the raw markup; a
//! browser-backed renderer can implement the same trait externally for
//! script-heavy sites.

use async_trait::async_trait;
use std::collections::HashSet;
use url::Url;

use crate::error::{NewsletterError, Result};
use crate::types::config::RendererConfig;

/// Page renderer trait for collecting candidate images from a URL.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Collect candidate image URLs from the rendered page.
    async fn render_images(&self, url: &str) -> Result<Vec<String>>;
}

/// Mock page renderer for testing.
#[derive(Default)]
pub struct MockPageRenderer {
    images: std::sync::RwLock<std::collections::HashMap<String, Vec<String>>>,
    failures: std::sync::RwLock<HashSet<String>>,
    calls: std::sync::RwLock<Vec<String>>,
}

impl MockPageRenderer {
    /// Create a new mock renderer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add images for a URL.
    pub fn with_images(self, url: &str, images: &[&str]) -> Self {
        self.images
            .write()
            .unwrap()
            .insert(url.to_string(), images.iter().map(|i| i.to_string()).collect());
        self
    }

    /// Make rendering this URL fail.
    pub fn with_failure(self, url: &str) -> Self {
        self.failures.write().unwrap().insert(url.to_string());
        self
    }

    /// URLs that were rendered, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl PageRenderer for MockPageRenderer {
    async fn render_images(&self, url: &str) -> Result<Vec<String>> {
        self.calls.write().unwrap().push(url.to_string());

        if self.failures.read().unwrap().contains(url) {
            return Err(NewsletterError::Render(Box::new(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("render failed for {}", url),
            ))));
        }

        Ok(self
            .images
            .read()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_default())
    }
}

/// HTTP-backed page renderer.
///
/// Fetches the page markup and extracts meta-tag images and inline
/// image sources with regex scanning. Relative sources are resolved
/// against the final URL after redirects; `data:` URIs are skipped.
pub struct HttpPageRenderer {
    client: reqwest::Client,
    config: RendererConfig,
}

impl Default for HttpPageRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpPageRenderer {
    /// Create a renderer with default settings.
    pub fn new() -> Self {
        Self::with_config(RendererConfig::default())
    }

    /// Create a renderer with a custom config.
    pub fn with_config(config: RendererConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(config.navigation_timeout)
                .build()
                .expect("Failed to create HTTP client"),
            config,
        }
    }

    /// Extract candidate image URLs from page markup.
    fn extract_images(&self, base_url: &Url, html: &str) -> Vec<String> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut images = Vec::new();

        // og:image / twitter:image meta tags, attribute order either way
        let meta_first = regex::Regex::new(
            r#"<meta[^>]+(?:property|name)\s*=\s*["'](?:og:image|twitter:image)["'][^>]*content\s*=\s*["']([^"']+)["']"#,
        )
        .unwrap();
        let content_first = regex::Regex::new(
            r#"<meta[^>]+content\s*=\s*["']([^"']+)["'][^>]*(?:property|name)\s*=\s*["'](?:og:image|twitter:image)["']"#,
        )
        .unwrap();
        let img_src = regex::Regex::new(r#"<img[^>]+src\s*=\s*["']([^"']+)["']"#).unwrap();

        for pattern in [&meta_first, &content_first, &img_src] {
            for cap in pattern.captures_iter(html) {
                if let Some(src) = cap.get(1) {
                    let src = src.as_str();
                    if src.starts_with("data:") {
                        continue;
                    }
                    if let Ok(resolved) = base_url.join(src) {
                        let resolved = resolved.to_string();
                        if seen.insert(resolved.clone()) {
                            images.push(resolved);
                        }
                    }
                }
            }
        }

        images
    }
}

#[async_trait]
impl PageRenderer for HttpPageRenderer {
    async fn render_images(&self, url: &str) -> Result<Vec<String>> {
        tracing::debug!(url = %url, "rendering page for images");

        let response = self
            .client
            .get(url)
            .header("User-Agent", &self.config.user_agent)
            .send()
            .await
            .map_err(|e| NewsletterError::Render(Box::new(e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NewsletterError::Render(Box::new(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("HTTP {}", status),
            ))));
        }

        // Only markup is worth scanning
        let html_content = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("text/html"))
            .unwrap_or(true);
        if !html_content {
            return Ok(Vec::new());
        }

        let final_url = response.url().clone();
        let html = response
            .text()
            .await
            .map_err(|e| NewsletterError::Render(Box::new(e)))?;

        if !self.config.settle_delay.is_zero() {
            tokio::time::sleep(self.config.settle_delay).await;
        }

        let images = self.extract_images(&final_url, &html);
        tracing::debug!(url = %url, image_count = images.len(), "page rendered");
        Ok(images)
    }
}
