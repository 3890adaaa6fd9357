//! Outbound message delivery.
//!
//! The code issuer only needs "deliver this text to this address". Delivery is
//! best effort: callers log failures and carry on.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::models::auth::Target;

/// Delivery errors.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Unsupported target: {0}")]
    Unsupported(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Rejected by provider: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Message delivery capability.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver `body` to `target`.
    async fn send(&self, target: &Target, subject: &str, body: &str) -> Result<(), DeliveryError>;

    /// Transport identifier for logging.
    fn name(&self) -> &str;
}

/// Development transport: writes the message to the log instead of sending it.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, target: &Target, subject: &str, body: &str) -> Result<(), DeliveryError> {
        info!(target = %target, subject, body, "message delivered to log");
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

const BREVO_SEND_URL: &str = "https://api.brevo.com/v3/smtp/email";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BrevoEmailAddress {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BrevoSendEmailBody {
    sender: BrevoEmailAddress,
    to: Vec<BrevoEmailAddress>,
    subject: String,
    text_content: String,
}

/// Transactional e-mail via the Brevo HTTP API. Phone targets are unsupported.
#[derive(Debug, Clone)]
pub struct BrevoMailer {
    client: reqwest::Client,
    api_key: String,
    sender_email: String,
    sender_name: Option<String>,
    endpoint: String,
}

impl BrevoMailer {
    pub fn new(api_key: String, sender_email: String, sender_name: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            sender_email,
            sender_name,
            endpoint: BREVO_SEND_URL.to_string(),
        }
    }

    /// Override the API endpoint (for tests and proxies).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn payload(&self, to: &str, subject: &str, body: &str) -> BrevoSendEmailBody {
        BrevoSendEmailBody {
            sender: BrevoEmailAddress {
                email: self.sender_email.clone(),
                name: self.sender_name.clone(),
            },
            to: vec![BrevoEmailAddress {
                email: to.to_string(),
                name: None,
            }],
            subject: subject.to_string(),
            text_content: body.to_string(),
        }
    }
}

#[async_trait]
impl Mailer for BrevoMailer {
    async fn send(&self, target: &Target, subject: &str, body: &str) -> Result<(), DeliveryError> {
        let Some(to) = target.email() else {
            return Err(DeliveryError::Unsupported(
                "SMS delivery is not configured".into(),
            ));
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .header("api-key", &self.api_key)
            .header("Accept", "application/json")
            .json(&self.payload(to, subject, body))
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(DeliveryError::Rejected {
            status: status.as_u16(),
            body,
        })
    }

    fn name(&self) -> &str {
        "brevo"
    }
}
