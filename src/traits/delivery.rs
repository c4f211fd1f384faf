//! Email delivery trait and the Stibee client.
//!
//! Delivery is a two-step protocol: create a draft, then trigger the
//! send. Neither step is retried; email send is not safe to blindly
//! retry.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, RwLock};

use crate::error::{NewsletterError, Result};

/// Email delivery trait.
#[async_trait]
pub trait EmailDelivery: Send + Sync {
    /// Create a draft email, returning the provider's id for it.
    async fn create_draft(&self, title: &str, html: &str) -> Result<String>;

    /// Trigger delivery of a previously created draft.
    async fn send(&self, email_id: &str) -> Result<Value>;
}

/// Mock email delivery for testing.
#[derive(Default)]
pub struct MockEmailDelivery {
    drafts: Arc<RwLock<Vec<(String, String)>>>,
    sent: Arc<RwLock<Vec<String>>>,
    fail_create: std::sync::atomic::AtomicBool,
    fail_send: std::sync::atomic::AtomicBool,
}

impl MockEmailDelivery {
    /// Create a new mock delivery service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make draft creation fail.
    pub fn with_create_failure(self) -> Self {
        self.fail_create
            .store(true, std::sync::atomic::Ordering::SeqCst);
        self
    }

    /// Make sending fail.
    pub fn with_send_failure(self) -> Self {
        self.fail_send
            .store(true, std::sync::atomic::Ordering::SeqCst);
        self
    }

    /// Drafts created so far as (title, html) pairs.
    pub fn drafts(&self) -> Vec<(String, String)> {
        self.drafts.read().unwrap().clone()
    }

    /// Ids of drafts that were sent.
    pub fn sent(&self) -> Vec<String> {
        self.sent.read().unwrap().clone()
    }
}

#[async_trait]
impl EmailDelivery for MockEmailDelivery {
    async fn create_draft(&self, title: &str, html: &str) -> Result<String> {
        if self.fail_create.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(NewsletterError::Http(Box::new(std::io::Error::new(
                std::io::ErrorKind::Other,
                "draft creation rejected",
            ))));
        }

        let mut drafts = self.drafts.write().unwrap();
        drafts.push((title.to_string(), html.to_string()));
        Ok(drafts.len().to_string())
    }

    async fn send(&self, email_id: &str) -> Result<Value> {
        if self.fail_send.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(NewsletterError::Http(Box::new(std::io::Error::new(
                std::io::ErrorKind::Other,
                "send rejected",
            ))));
        }

        self.sent.write().unwrap().push(email_id.to_string());
        Ok(serde_json::json!({ "ok": true }))
    }
}

/// Stibee v2 API client.
///
/// Authenticates with an `AccessToken` header; drafts are created under
/// a subscriber list and sent by id.
pub struct StibeeClient {
    api_key: String,
    list_id: i64,
    sender_email: Option<String>,
    sender_name: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl StibeeClient {
    /// Create a new client for a subscriber list.
    pub fn new(api_key: impl Into<String>, list_id: i64) -> Self {
        Self {
            api_key: api_key.into(),
            list_id,
            sender_email: None,
            sender_name: None,
            base_url: "https://api.stibee.com/v2".to_string(),
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// Create from `STIBEE_API_KEY`, `STIBEE_LIST_ID`, and the optional
    /// `STIBEE_SENDER_EMAIL` / `STIBEE_SENDER_NAME` environment variables.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("STIBEE_API_KEY")
            .map_err(|_| NewsletterError::Config("STIBEE_API_KEY not set".to_string()))?;
        let list_id = std::env::var("STIBEE_LIST_ID")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .ok_or_else(|| {
                NewsletterError::Config("STIBEE_LIST_ID not set or not numeric".to_string())
            })?;

        let mut client = Self::new(api_key, list_id);
        if let Ok(email) = std::env::var("STIBEE_SENDER_EMAIL") {
            client.sender_email = Some(email);
        }
        if let Ok(name) = std::env::var("STIBEE_SENDER_NAME") {
            client.sender_name = Some(name);
        }
        Ok(client)
    }

    /// Set the sender identity.
    pub fn with_sender(mut self, email: impl Into<String>, name: impl Into<String>) -> Self {
        self.sender_email = Some(email.into());
        self.sender_name = Some(name.into());
        self
    }

    /// Set a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[async_trait]
impl EmailDelivery for StibeeClient {
    async fn create_draft(&self, title: &str, html: &str) -> Result<String> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct CreatePayload<'a> {
            list_id: i64,
            #[serde(skip_serializing_if = "Option::is_none")]
            sender_email: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            sender_name: Option<&'a str>,
            subject: &'a str,
            contents: &'a str,
        }

        let payload = CreatePayload {
            list_id: self.list_id,
            sender_email: self.sender_email.as_deref(),
            sender_name: self.sender_name.as_deref(),
            subject: title,
            contents: html,
        };

        tracing::info!(subject = %title, "creating email draft");

        let response = self
            .client
            .post(format!("{}/emails", self.base_url))
            .header("AccessToken", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NewsletterError::Http(Box::new(e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NewsletterError::Http(Box::new(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Stibee create error {}: {}", status, body),
            ))));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| NewsletterError::Http(Box::new(e)))?;

        // Id surfaces either at the top level or under `data`
        let email_id = body
            .get("id")
            .or_else(|| body.get("data").and_then(|d| d.get("id")))
            .map(|id| match id {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .ok_or_else(|| {
                NewsletterError::Http(Box::new(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("Stibee response carried no email id: {}", body),
                )))
            })?;

        Ok(email_id)
    }

    async fn send(&self, email_id: &str) -> Result<Value> {
        tracing::info!(email_id = %email_id, "sending email");

        let response = self
            .client
            .post(format!("{}/emails/{}/send", self.base_url, email_id))
            .header("AccessToken", &self.api_key)
            .send()
            .await
            .map_err(|e| NewsletterError::Http(Box::new(e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NewsletterError::Http(Box::new(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Stibee send error {}: {}", status, body),
            ))));
        }

        let body = response.text().await.unwrap_or_default();
        if body.is_empty() {
            return Ok(Value::Object(serde_json::Map::new()));
        }
        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_delivery_two_step() {
        let delivery = MockEmailDelivery::new();

        let id = delivery.create_draft("Subject", "<p>hi</p>").await.unwrap();
        delivery.send(&id).await.unwrap();

        assert_eq!(
            delivery.drafts(),
            vec![("Subject".to_string(), "<p>hi</p>".to_string())]
        );
        assert_eq!(delivery.sent(), vec![id]);
    }

    #[tokio::test]
    async fn test_mock_delivery_failures() {
        let delivery = MockEmailDelivery::new().with_create_failure();
        assert!(delivery.create_draft("t", "h").await.is_err());

        let delivery = MockEmailDelivery::new().with_send_failure();
        let id = delivery.create_draft("t", "h").await.unwrap();
        assert!(delivery.send(&id).await.is_err());
    }
}
