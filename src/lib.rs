//! Topic-to-Newsletter Generation Library
//!
//! Turns a topic string into a block-structured newsletter document:
//! search the web for related articles and images, validate every URL,
//! prompt a generative model, then repair the model's output against
//! the validated resource pool before returning it.
//!
//! # Design Philosophy
//!
//! **"Trust nothing you did not validate"**
//!
//! - Model output is untrusted text: strict-parse, one bounded repair, then fail
//! - Web resources are untrusted links: probed before they may appear in a document
//! - Per-item failures degrade; whole-stage failures surface as typed errors
//! - Collaborators are injected traits, so everything runs against mocks in tests
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use newsletter::{
//!     GeminiGenerator, HttpPageRenderer, ModelKind, NewsletterPipeline,
//!     NewsletterRequest, ResourceCollector, TavilySearcher,
//! };
//!
//! let collector = ResourceCollector::new(
//!     Arc::new(TavilySearcher::from_env()?),
//!     Arc::new(HttpPageRenderer::new()),
//! );
//! let pipeline = NewsletterPipeline::new(collector)
//!     .with_generator(ModelKind::Gemini, Arc::new(GeminiGenerator::from_env()?));
//!
//! let document = pipeline.generate(&NewsletterRequest::new("rust async")).await?;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Collaborator abstractions (search, render, generate, deliver)
//! - [`types`] - Articles, blocks, documents, configuration
//! - [`validator`] - URL liveness and content-quality checks
//! - [`collector`] - Search + image discovery + context assembly
//! - [`normalizer`] - Model-output parsing and repair
//! - [`reconciler`] - Block repair against validated resources
//! - [`pipeline`] - End-to-end orchestration
//! - [`gateway`] - Email publication boundary
//! - [`testing`] - Mock implementations for testing

pub mod collector;
pub mod error;
pub mod gateway;
pub mod normalizer;
pub mod pipeline;
pub mod prompts;
pub mod reconciler;
pub mod testing;
pub mod traits;
pub mod types;
pub mod validator;

// Re-export core types at crate root
pub use error::{NewsletterError, ParseError, Result};
pub use traits::{
    delivery::{EmailDelivery, MockEmailDelivery, StibeeClient},
    generator::{GeminiGenerator, Generator, MockGenerator, OpenAiGenerator},
    renderer::{HttpPageRenderer, MockPageRenderer, PageRenderer},
    searcher::{MockWebSearcher, SearchHit, TavilySearcher, WebSearcher},
};
pub use types::{
    article::{Article, DATE_UNKNOWN},
    config::{CollectorConfig, RendererConfig, ValidatorConfig},
    document::{Block, BlockKind, Document, ImagePool},
};

// Re-export pipeline components
pub use collector::{Collection, ResourceCollector};
pub use gateway::{PublicationGateway, PublishOutcome, PublishStatus};
pub use normalizer::GeneratedNewsletter;
pub use pipeline::{ModelKind, NewsletterPipeline, NewsletterRequest};
pub use prompts::Tone;
pub use validator::{HttpProbe, ProbeStatus, UrlProbe, UrlValidator};
