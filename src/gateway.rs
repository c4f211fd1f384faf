//! Publication gateway over the email-delivery collaborator.
//!
//! Publishing is a side-effecting terminal action: the outcome is a
//! structured result, never a panic or a retry. A send that fails after
//! the draft was created reports the draft id so the caller can decide
//! what to do with it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

use crate::traits::delivery::EmailDelivery;

/// Outcome status of a publish attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStatus {
    Sent,
    Failed,
    NotConfigured,
}

/// Structured result of a publish attempt.
#[derive(Debug, Clone, Serialize)]
pub struct PublishOutcome {
    pub status: PublishStatus,
    pub message: String,

    /// Id of the created draft, when creation succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_id: Option<String>,

    /// Provider response from the send step, verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

impl PublishOutcome {
    fn sent(email_id: String, detail: Value) -> Self {
        Self {
            status: PublishStatus::Sent,
            message: "email created and sent".to_string(),
            email_id: Some(email_id),
            detail: Some(detail),
        }
    }

    fn failed(message: String, email_id: Option<String>) -> Self {
        Self {
            status: PublishStatus::Failed,
            message,
            email_id,
            detail: None,
        }
    }

    fn not_configured() -> Self {
        Self {
            status: PublishStatus::NotConfigured,
            message: "email delivery is not configured".to_string(),
            email_id: None,
            detail: None,
        }
    }
}

/// Hands finished documents to the email-delivery collaborator.
pub struct PublicationGateway {
    delivery: Option<Arc<dyn EmailDelivery>>,
}

impl PublicationGateway {
    /// Create a gateway over a delivery service.
    pub fn new(delivery: Arc<dyn EmailDelivery>) -> Self {
        Self {
            delivery: Some(delivery),
        }
    }

    /// Create a gateway with no delivery service configured.
    pub fn unconfigured() -> Self {
        Self { delivery: None }
    }

    /// Publish a finished newsletter: create the draft, then send it.
    ///
    /// Neither step is retried. Failures surface in the outcome with
    /// the collaborator's message verbatim.
    pub async fn publish(&self, title: &str, html: &str) -> PublishOutcome {
        let Some(delivery) = &self.delivery else {
            warn!("publish called but email delivery is not configured");
            return PublishOutcome::not_configured();
        };

        let email_id = match delivery.create_draft(title, html).await {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "draft creation failed");
                return PublishOutcome::failed(format!("draft creation failed: {}", e), None);
            }
        };

        match delivery.send(&email_id).await {
            Ok(detail) => PublishOutcome::sent(email_id, detail),
            Err(e) => {
                warn!(email_id = %email_id, error = %e, "send failed");
                PublishOutcome::failed(format!("send failed: {}", e), Some(email_id))
            }
        }
    }
}
