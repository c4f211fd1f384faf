//! The end-to-end generation pipeline.
//!
//! One call runs collect → generate → normalize → reconcile and returns
//! a finished [`Document`]. Collaborators are injected at construction,
//! never referenced as ambient singletons, so the whole pipeline runs
//! against mocks in tests.

use chrono::Local;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::collector::ResourceCollector;
use crate::error::{NewsletterError, Result};
use crate::normalizer;
use crate::prompts::{format_expand_prompt, format_newsletter_prompt, format_refine_prompt, Tone};
use crate::reconciler;
use crate::traits::generator::Generator;
use crate::types::article::Article;
use crate::types::document::{Document, ImagePool};
use crate::validator::UrlValidator;

/// Which registered generative model to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Gemini,
    Gpt,
}

/// One newsletter generation request.
#[derive(Debug, Clone)]
pub struct NewsletterRequest {
    pub topic: String,
    pub tone: Tone,
    pub model: ModelKind,
    pub max_results: usize,
}

impl NewsletterRequest {
    /// Create a request with default tone, model, and result count.
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            tone: Tone::default(),
            model: ModelKind::Gemini,
            max_results: 5,
        }
    }

    /// Set the tone.
    pub fn with_tone(mut self, tone: Tone) -> Self {
        self.tone = tone;
        self
    }

    /// Set the model.
    pub fn with_model(mut self, model: ModelKind) -> Self {
        self.model = model;
        self
    }

    /// Set the per-query search result count.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }
}

/// Orchestrates collection, generation, and reconciliation.
pub struct NewsletterPipeline {
    collector: ResourceCollector,
    generators: HashMap<ModelKind, Arc<dyn Generator>>,
    validator: UrlValidator,
    expand_topic: bool,
    refine_context: bool,
}

impl NewsletterPipeline {
    /// Create a pipeline with no generators registered.
    pub fn new(collector: ResourceCollector) -> Self {
        Self {
            collector,
            generators: HashMap::new(),
            validator: UrlValidator::new(),
            expand_topic: true,
            refine_context: true,
        }
    }

    /// Register a generator for a model kind.
    pub fn with_generator(mut self, kind: ModelKind, generator: Arc<dyn Generator>) -> Self {
        self.generators.insert(kind, generator);
        self
    }

    /// Set the validator used for last-chance source checking.
    pub fn with_validator(mut self, validator: UrlValidator) -> Self {
        self.validator = validator;
        self
    }

    /// Enable or disable topic expansion.
    pub fn with_topic_expansion(mut self, enabled: bool) -> Self {
        self.expand_topic = enabled;
        self
    }

    /// Enable or disable context refinement.
    pub fn with_context_refinement(mut self, enabled: bool) -> Self {
        self.refine_context = enabled;
        self
    }

    /// Generate a newsletter document for a topic.
    ///
    /// Blocks until the full document is assembled; there is no partial
    /// or streaming result. Collection problems degrade to fewer
    /// resources; generation or parse failure is a request-level error.
    pub async fn generate(&self, request: &NewsletterRequest) -> Result<Document> {
        let generator = self.generators.get(&request.model).ok_or_else(|| {
            NewsletterError::Config(format!(
                "no generator registered for model {:?}",
                request.model
            ))
        })?;

        // 1. Expand the topic into refined queries
        let queries = if self.expand_topic {
            self.expand_queries(generator.as_ref(), &request.topic).await
        } else {
            vec![request.topic.clone()]
        };

        // 2. Collect per query, aggregate in query order
        let collections = join_all(
            queries
                .iter()
                .map(|query| self.collector.collect(query, request.max_results)),
        )
        .await;

        let mut articles: Vec<Article> = Vec::new();
        let mut pool = ImagePool::new();
        let mut combined_context = String::new();
        for (query, collection) in queries.iter().zip(collections) {
            articles.extend(collection.articles);
            pool.extend(collection.images.iter().map(str::to_string));
            combined_context.push_str(&format!(
                "--- Query: {} ---\n{}\n\n",
                query, collection.context
            ));
        }

        info!(
            topic = %request.topic,
            query_count = queries.len(),
            article_count = articles.len(),
            image_count = pool.len(),
            "collection complete"
        );

        // 3. Last-chance source check: dead articles stay out of the prompt
        let article_urls: Vec<String> = articles.iter().map(|a| a.url.clone()).collect();
        let valid_urls = self.validator.filter_valid(&article_urls, false).await;
        let valid_sources: Vec<Article> = articles
            .iter()
            .filter(|a| valid_urls.contains(&a.url))
            .cloned()
            .collect();

        // 4. Refine the combined context
        let context = if self.refine_context {
            self.refined_context(generator.as_ref(), &request.topic, &combined_context)
                .await
        } else {
            combined_context
        };

        // 5. Generate
        let today = Local::now().format("%Y-%m-%d").to_string();
        let prompt = format_newsletter_prompt(
            &request.topic,
            request.tone,
            &today,
            &context,
            &valid_sources,
            &pool,
        );
        let raw = generator.complete_json(&prompt).await?;

        // 6. Normalize
        let generated = normalizer::parse(&raw)?;

        // 7. Reconcile against validated resources
        let mut blocks = generated.blocks;
        let valid_source_urls: Vec<String> =
            valid_sources.iter().map(|a| a.url.clone()).collect();
        reconciler::reconcile(&mut blocks, &valid_sources, &valid_source_urls, &pool);

        let title = if generated.title.is_empty() {
            format!("{} newsletter", request.topic)
        } else {
            generated.title
        };

        Ok(Document {
            title,
            blocks,
            images: pool,
            sources: articles,
        })
    }

    /// Expand a topic into refined search queries, degrading to the
    /// bare topic on any failure.
    async fn expand_queries(&self, generator: &dyn Generator, topic: &str) -> Vec<String> {
        let prompt = format_expand_prompt(topic);
        match generator.complete_json(&prompt).await {
            Ok(raw) => {
                let cleaned = normalizer::clean_text(&raw);
                match serde_json::from_str::<Vec<String>>(&cleaned) {
                    Ok(queries) if !queries.is_empty() => {
                        debug!(topic = %topic, ?queries, "topic expanded");
                        queries
                    }
                    _ => {
                        warn!(topic = %topic, "topic expansion returned no usable queries");
                        vec![topic.to_string()]
                    }
                }
            }
            Err(e) => {
                warn!(topic = %topic, error = %e, "topic expansion failed");
                vec![topic.to_string()]
            }
        }
    }

    /// Distill the combined context, degrading to the raw context on
    /// any failure.
    async fn refined_context(
        &self,
        generator: &dyn Generator,
        topic: &str,
        raw_context: &str,
    ) -> String {
        let prompt = format_refine_prompt(topic, raw_context);
        match generator.complete(&prompt).await {
            Ok(refined) if !refined.trim().is_empty() => refined,
            Ok(_) => raw_context.to_string(),
            Err(e) => {
                warn!(topic = %topic, error = %e, "context refinement failed; using raw context");
                raw_context.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingGenerator, MockProbe};
    use crate::traits::generator::MockGenerator;
    use crate::traits::renderer::MockPageRenderer;
    use crate::traits::searcher::{MockWebSearcher, SearchHit};

    fn bare_pipeline(searcher: MockWebSearcher, probe: MockProbe) -> NewsletterPipeline {
        let validator = UrlValidator::with_probe(Arc::new(probe.clone()));
        let collector =
            ResourceCollector::new(Arc::new(searcher), Arc::new(MockPageRenderer::new()))
                .with_validator(validator.clone());
        NewsletterPipeline::new(collector)
            .with_validator(validator)
            .with_topic_expansion(false)
            .with_context_refinement(false)
    }

    #[tokio::test]
    async fn test_unregistered_model_is_a_config_error() {
        let pipeline = bare_pipeline(MockWebSearcher::new(), MockProbe::new());
        let err = pipeline
            .generate(&NewsletterRequest::new("topic"))
            .await
            .unwrap_err();
        assert!(matches!(err, NewsletterError::Config(_)));
    }

    #[tokio::test]
    async fn test_generation_failure_is_request_level() {
        let pipeline = bare_pipeline(MockWebSearcher::new(), MockProbe::new())
            .with_generator(ModelKind::Gemini, Arc::new(FailingGenerator));

        let err = pipeline
            .generate(&NewsletterRequest::new("topic"))
            .await
            .unwrap_err();
        assert!(matches!(err, NewsletterError::Generation(_)));
    }

    #[tokio::test]
    async fn test_unparseable_output_is_request_level() {
        let generator = MockGenerator::new().with_response("sorry, no newsletter today");
        let pipeline = bare_pipeline(MockWebSearcher::new(), MockProbe::new())
            .with_generator(ModelKind::Gemini, Arc::new(generator));

        let err = pipeline
            .generate(&NewsletterRequest::new("topic"))
            .await
            .unwrap_err();
        assert!(matches!(err, NewsletterError::Parse(_)));
    }

    #[tokio::test]
    async fn test_empty_title_gets_a_default() {
        let generator = MockGenerator::new().with_response(r#"{"title": "", "blocks": []}"#);
        let pipeline = bare_pipeline(MockWebSearcher::new(), MockProbe::new())
            .with_generator(ModelKind::Gemini, Arc::new(generator));

        let document = pipeline
            .generate(&NewsletterRequest::new("rust"))
            .await
            .unwrap();
        assert_eq!(document.title, "rust newsletter");
    }

    #[tokio::test]
    async fn test_expansion_failure_degrades_to_bare_topic() {
        // First response (expansion) is prose, second is the document
        let generator = MockGenerator::new()
            .with_response("not a json array")
            .with_response(r#"{"title": "T", "blocks": []}"#);

        let searcher = MockWebSearcher::new()
            .with_hits("rust", vec![SearchHit::new("A", "https://a.com/1", "a")]);
        let probe = MockProbe::new().with_ok("https://a.com/1");

        let pipeline = bare_pipeline(searcher, probe)
            .with_topic_expansion(true)
            .with_generator(ModelKind::Gemini, Arc::new(generator.clone()));

        let document = pipeline
            .generate(&NewsletterRequest::new("rust"))
            .await
            .unwrap();

        // The bare topic was searched and its article kept as a raw source
        assert_eq!(document.sources.len(), 1);
        assert_eq!(generator.prompts().len(), 2);
    }

    #[tokio::test]
    async fn test_expanded_queries_aggregate_collections() {
        let generator = MockGenerator::new()
            .with_response(r#"["q1", "q2"]"#)
            .with_response(r#"{"title": "T", "blocks": []}"#);

        let searcher = MockWebSearcher::new()
            .with_hits("q1", vec![SearchHit::new("A", "https://a.com/1", "a")])
            .with_hits("q2", vec![SearchHit::new("B", "https://b.com/2", "b")]);
        let probe = MockProbe::new()
            .with_ok("https://a.com/1")
            .with_ok("https://b.com/2");

        let pipeline = bare_pipeline(searcher, probe)
            .with_topic_expansion(true)
            .with_generator(ModelKind::Gemini, Arc::new(generator));

        let document = pipeline
            .generate(&NewsletterRequest::new("rust"))
            .await
            .unwrap();

        let urls: Vec<_> = document.sources.iter().map(|a| a.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.com/1", "https://b.com/2"]);
    }

    #[tokio::test]
    async fn test_dead_sources_stay_out_of_the_prompt() {
        let generator =
            MockGenerator::new().with_response(r#"{"title": "T", "blocks": []}"#);

        let searcher = MockWebSearcher::new().with_hits(
            "rust",
            vec![
                SearchHit::new("Live", "https://live.com/1", "a"),
                SearchHit::new("Dead", "https://dead.com/2", "b"),
            ],
        );
        let probe = MockProbe::new().with_ok("https://live.com/1");

        let pipeline = bare_pipeline(searcher, probe)
            .with_generator(ModelKind::Gemini, Arc::new(generator.clone()));

        let document = pipeline
            .generate(&NewsletterRequest::new("rust"))
            .await
            .unwrap();

        // Raw sources keep both; the prompt only saw the live one
        assert_eq!(document.sources.len(), 2);
        let prompt = generator.prompts().pop().unwrap();
        assert!(prompt.contains("https://live.com/1"));
        assert!(!prompt.contains("https://dead.com/2"));
    }
}
