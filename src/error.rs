//! Typed errors for the newsletter pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.

use thiserror::Error;

/// Errors that can occur while generating a newsletter.
#[derive(Debug, Error)]
pub enum NewsletterError {
    /// Search provider failed
    #[error("search provider error: {0}")]
    Search(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Page renderer failed
    #[error("page render error: {0}")]
    Render(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Generative model unavailable or failed
    #[error("generation failed: {0}")]
    Generation(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Model output could not be normalized into a document
    #[error("unusable model output: {0}")]
    Parse(#[from] ParseError),

    /// JSON (de)serialization failed outside the normalizer
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),
}

/// Errors from normalizing raw model output into a structured document.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The model returned nothing but whitespace
    #[error("model returned empty output")]
    EmptyOutput,

    /// Strict parsing failed and the single repair retry failed too
    #[error("output is not valid JSON (strict: {strict}; after repair: {repaired})")]
    Malformed {
        strict: serde_json::Error,
        #[source]
        repaired: serde_json::Error,
    },
}

/// Result type alias for newsletter operations.
pub type Result<T> = std::result::Result<T, NewsletterError>;
