//! Generator trait for LLM completions.
//!
//! The generative model is untrusted external input: given a prompt it
//! returns free text that may or may not be well-formed JSON. Response
//! shape enforcement lives in the normalizer, not here.

use async_trait::async_trait;
use rig::completion::Prompt;
use rig::providers::openai;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

use crate::error::{NewsletterError, Result};

/// Generator trait for LLM completions.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Run a completion and return the raw model text.
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Completion expected to yield a JSON document.
    ///
    /// Providers with a JSON response mode use it; the default falls
    /// back to a plain completion.
    async fn complete_json(&self, prompt: &str) -> Result<String> {
        self.complete(prompt).await
    }
}

/// Mock generator for testing.
///
/// Returns canned responses in order, then a minimal empty document.
/// Records every prompt for assertions.
#[derive(Default, Clone)]
pub struct MockGenerator {
    responses: Arc<RwLock<VecDeque<String>>>,
    prompts: Arc<RwLock<Vec<String>>>,
}

impl MockGenerator {
    /// Create a new mock generator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a canned response.
    pub fn with_response(self, response: impl Into<String>) -> Self {
        self.responses.write().unwrap().push_back(response.into());
        self
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.read().unwrap().clone()
    }
}

#[async_trait]
impl Generator for MockGenerator {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.write().unwrap().push(prompt.to_string());

        Ok(self
            .responses
            .write()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| r#"{"title": "", "blocks": []}"#.to_string()))
    }
}

/// OpenAI-backed generator.
pub struct OpenAiGenerator {
    client: openai::Client,
    model: String,
}

impl OpenAiGenerator {
    /// Create a generator with the default chat model.
    pub fn new(api_key: impl AsRef<str>) -> Self {
        Self {
            client: openai::Client::new(api_key.as_ref()),
            model: openai::GPT_4O.to_string(),
        }
    }

    /// Create from the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| NewsletterError::Config("OPENAI_API_KEY not set".to_string()))?;
        Ok(Self::new(api_key))
    }

    /// Set the chat model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn complete(&self, prompt: &str) -> Result<String> {
        tracing::debug!(
            prompt_length = prompt.len(),
            model = %self.model,
            "calling OpenAI"
        );

        let agent = self
            .client
            .agent(&self.model)
            .preamble("You are a helpful assistant designed to output JSON.")
            .max_tokens(4096)
            .build();

        let response = agent.prompt(prompt).await.map_err(|e| {
            tracing::error!(error = %e, model = %self.model, "OpenAI call failed");
            NewsletterError::Generation(Box::new(e))
        })?;

        tracing::debug!(
            response_length = response.len(),
            model = %self.model,
            "OpenAI response received"
        );

        Ok(response)
    }
}

/// Gemini-backed generator over the REST API.
pub struct GeminiGenerator {
    api_key: String,
    client: reqwest::Client,
    model: String,
    base_url: String,
}

impl GeminiGenerator {
    /// Create a generator with the default model.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .expect("Failed to create HTTP client"),
            model: "gemini-2.0-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        }
    }

    /// Create from the `GEMINI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| NewsletterError::Config("GEMINI_API_KEY not set".to_string()))?;
        Ok(Self::new(api_key))
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set a custom base URL (for proxies).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    async fn generate(&self, prompt: &str, json_output: bool) -> Result<String> {
        #[derive(Serialize)]
        struct Request {
            contents: Vec<Content>,
            #[serde(skip_serializing_if = "Option::is_none", rename = "generationConfig")]
            generation_config: Option<GenerationConfig>,
        }

        #[derive(Serialize, Deserialize)]
        struct Content {
            parts: Vec<Part>,
        }

        #[derive(Serialize, Deserialize)]
        struct Part {
            text: String,
        }

        #[derive(Serialize)]
        struct GenerationConfig {
            #[serde(rename = "responseMimeType")]
            response_mime_type: String,
        }

        #[derive(Deserialize)]
        struct Response {
            #[serde(default)]
            candidates: Vec<Candidate>,
        }

        #[derive(Deserialize)]
        struct Candidate {
            content: Content,
        }

        let request = Request {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: json_output.then(|| GenerationConfig {
                response_mime_type: "application/json".to_string(),
            }),
        };

        tracing::debug!(
            prompt_length = prompt.len(),
            model = %self.model,
            "calling Gemini"
        );

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| NewsletterError::Generation(Box::new(e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, model = %self.model, "Gemini call failed");
            return Err(NewsletterError::Generation(Box::new(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Gemini API error {}: {}", status, body),
            ))));
        }

        let parsed: Response = response
            .json()
            .await
            .map_err(|e| NewsletterError::Generation(Box::new(e)))?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| {
                NewsletterError::Generation(Box::new(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "Gemini returned no candidates",
                )))
            })?;

        Ok(text)
    }
}

#[async_trait]
impl Generator for GeminiGenerator {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.generate(prompt, false).await
    }

    async fn complete_json(&self, prompt: &str) -> Result<String> {
        self.generate(prompt, true).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_generator_pops_responses_in_order() {
        let generator = MockGenerator::new()
            .with_response("first")
            .with_response("second");

        assert_eq!(generator.complete("a").await.unwrap(), "first");
        assert_eq!(generator.complete("b").await.unwrap(), "second");
        // Exhausted: falls back to an empty document
        assert!(generator.complete("c").await.unwrap().contains("blocks"));
        assert_eq!(generator.prompts(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_mock_generator_json_defaults_to_complete() {
        let generator = MockGenerator::new().with_response("{}");
        assert_eq!(generator.complete_json("p").await.unwrap(), "{}");
    }
}
