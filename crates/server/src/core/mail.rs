//! Reset-code delivery.
//!
//! Notifiers are fire-and-forget from the caller's point of view: the code
//! is already persisted before `send` runs, and a failed send is only
//! logged.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

/// Who the code is for, used to personalise the message.
#[derive(Debug, Clone, Serialize)]
pub struct ResetContext {
    pub firstname: String,
    pub company_name: String,
    pub expires_in_minutes: i64,
}

#[async_trait]
pub trait ResetNotifier: Send + Sync {
    async fn send(&self, recipient: &str, context: &ResetContext, code: &str) -> Result<()>;
}

/// Writes deliveries to the log. The code itself only appears at debug level.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl ResetNotifier for LogNotifier {
    async fn send(&self, recipient: &str, context: &ResetContext, code: &str) -> Result<()> {
        info!(
            "[Mail] Password reset code for {} ({}) ready, expires in {} minutes",
            recipient, context.company_name, context.expires_in_minutes
        );
        debug!("[Mail] Reset code for {}: {}", recipient, code);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    recipient: &'a str,
    subject: &'static str,
    firstname: &'a str,
    company_name: &'a str,
    code: &'a str,
    expires_in_minutes: i64,
}

/// POSTs each delivery as JSON to an outbound mail relay.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build webhook client")?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ResetNotifier for WebhookNotifier {
    async fn send(&self, recipient: &str, context: &ResetContext, code: &str) -> Result<()> {
        let payload = WebhookPayload {
            recipient,
            subject: "Password Reset Code",
            firstname: &context.firstname,
            company_name: &context.company_name,
            code,
            expires_in_minutes: context.expires_in_minutes,
        };

        self.client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .context("Reset webhook unreachable")?
            .error_for_status()
            .context("Reset webhook rejected delivery")?;

        info!("[Mail] Reset code delivered to relay for {}", recipient);
        Ok(())
    }
}
