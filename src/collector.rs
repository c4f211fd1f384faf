//! Resource collection: search, image discovery, and context assembly.
//!
//! One collection call fans out per-hit image discovery concurrently
//! and fans back in before assembling the article list, image pool, and
//! generator context. Per-hit failures degrade to "no images from this
//! hit"; a search failure degrades to an empty collection. Collection
//! never raises.

use chrono::Local;
use futures::future::join_all;
use indexmap::IndexSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};
use url::Url;

use crate::traits::renderer::PageRenderer;
use crate::traits::searcher::{SearchHit, WebSearcher};
use crate::types::article::{Article, DATE_UNKNOWN};
use crate::types::config::CollectorConfig;
use crate::types::document::ImagePool;
use crate::validator::UrlValidator;

/// File extensions the renderer cannot usefully inspect.
const NON_HTML_EXTENSIONS: &[&str] = &[
    "pdf", "zip", "gz", "tar", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "mp3", "mp4", "avi",
    "mov", "exe", "dmg",
];

/// Everything one collection call produces.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    /// Articles in search-hit order, each with validated images.
    pub articles: Vec<Article>,

    /// Deduplicated pool of all validated images, first-seen order.
    pub images: ImagePool,

    /// Textual context blob handed to the generator.
    pub context: String,
}

impl Collection {
    /// The shape returned when collection fails entirely.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Collects articles, images, and generator context for a topic.
pub struct ResourceCollector {
    searcher: Arc<dyn WebSearcher>,
    renderer: Arc<dyn PageRenderer>,
    validator: UrlValidator,
    config: CollectorConfig,
}

impl ResourceCollector {
    /// Create a collector with a default validator and config.
    pub fn new(searcher: Arc<dyn WebSearcher>, renderer: Arc<dyn PageRenderer>) -> Self {
        Self {
            searcher,
            renderer,
            validator: UrlValidator::new(),
            config: CollectorConfig::default(),
        }
    }

    /// Set the validator.
    pub fn with_validator(mut self, validator: UrlValidator) -> Self {
        self.validator = validator;
        self
    }

    /// Set the config.
    pub fn with_config(mut self, config: CollectorConfig) -> Self {
        self.config = config;
        self
    }

    /// Search for a topic and assemble the validated resource pool.
    pub async fn collect(&self, topic: &str, max_results: usize) -> Collection {
        let hits = match self.searcher.search(topic, max_results, true).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(topic = %topic, error = %e, "search failed; returning empty collection");
                return Collection::empty();
            }
        };

        debug!(topic = %topic, hit_count = hits.len(), "search returned hits");

        // Fan out image discovery per hit, fan back in before assembly
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_articles.max(1)));
        let discoveries = join_all(hits.iter().map(|hit| {
            let semaphore = Arc::clone(&semaphore);
            async move {
                let _permit = semaphore.acquire().await.unwrap();
                self.discover_article_images(hit).await
            }
        }))
        .await;

        let mut articles = Vec::with_capacity(hits.len());
        let mut pool = ImagePool::new();
        for (hit, images) in hits.into_iter().zip(discoveries) {
            pool.extend(images.iter().cloned());

            let published_date = hit
                .published_date
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| DATE_UNKNOWN.to_string());

            articles.push(
                Article::new(hit.title, hit.url, hit.content)
                    .with_published_date(published_date)
                    .with_images(images),
            );
        }

        let context = build_context(&articles, &pool);

        debug!(
            topic = %topic,
            article_count = articles.len(),
            image_count = pool.len(),
            "collection assembled"
        );

        Collection {
            articles,
            images: pool,
            context,
        }
    }

    /// Discover and validate images for one search hit.
    ///
    /// Merges rendered-page images with a text scan of the hit's raw
    /// content, validates with quality checking on, and keeps at most
    /// [`CollectorConfig::max_images_per_article`]. Failures degrade to
    /// an empty list.
    async fn discover_article_images(&self, hit: &SearchHit) -> Vec<String> {
        let mut candidates: IndexSet<String> = IndexSet::new();

        if is_renderable(&hit.url) {
            match self.renderer.render_images(&hit.url).await {
                Ok(images) => candidates.extend(images),
                Err(e) => {
                    warn!(url = %hit.url, error = %e, "page render failed; skipping its images");
                }
            }
        }

        let markup = hit.raw_content.as_deref().unwrap_or(&hit.content);
        candidates.extend(scan_markup_images(markup));

        // Bound validation cost before spending network on candidates
        let candidates: Vec<String> = candidates
            .into_iter()
            .take(self.config.max_candidate_images)
            .collect();

        let mut validated = self.validator.filter_valid(&candidates, true).await;
        validated.truncate(self.config.max_images_per_article);
        validated
    }
}

/// Whether the renderer should be pointed at this URL at all.
///
/// PDFs, archives, and other direct-download resources carry no markup.
fn is_renderable(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };

    let path = parsed.path().to_lowercase();
    if let Some(extension) = path.rsplit('.').next() {
        if path.contains('.') && NON_HTML_EXTENSIONS.contains(&extension) {
            return false;
        }
    }

    !path.contains("/download")
}

/// Scan raw page text for inline image references.
///
/// Picks up HTML `<img>` sources and markdown image targets, in
/// document order, skipping `data:` URIs and relative paths.
fn scan_markup_images(text: &str) -> Vec<String> {
    let img_tag = regex::Regex::new(r#"<img[^>]+src\s*=\s*["']([^"']+)["']"#).unwrap();
    let markdown = regex::Regex::new(r"!\[[^\]]*\]\(([^)\s]+)").unwrap();

    let mut images = Vec::new();
    for pattern in [&img_tag, &markdown] {
        for cap in pattern.captures_iter(text) {
            if let Some(src) = cap.get(1) {
                let src = src.as_str();
                if src.starts_with("http") {
                    images.push(src.to_string());
                }
            }
        }
    }
    images
}

/// Concatenate the textual context blob for the generator.
fn build_context(articles: &[Article], pool: &ImagePool) -> String {
    let mut context = format!("Today's date: {}\n\n", Local::now().format("%Y-%m-%d"));

    for (i, article) in articles.iter().enumerate() {
        context.push_str(&format!(
            "Article {}:\nTitle: {}\nPublished Date: {}\nURL: {}\nContent: {}\n\n",
            i + 1,
            article.title,
            article.published_date,
            article.url,
            article.content,
        ));
    }

    if !pool.is_empty() {
        context.push_str("[Available Images from Search]\n");
        for url in pool.iter() {
            context.push_str(url);
            context.push('\n');
        }
    }

    context
}
