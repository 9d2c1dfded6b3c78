use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};

use skein_common::SkeinError;

use crate::traits::Mailer;

/// Mailer that posts JSON to an HTTP mail-delivery endpoint.
pub struct WebhookMailer {
    endpoint: String,
    api_key: Option<String>,
    from: String,
    http: reqwest::Client,
}

impl WebhookMailer {
    pub fn new(endpoint: String, api_key: Option<String>, from: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .expect("Failed to build mail HTTP client");
        Self {
            endpoint,
            api_key,
            from,
            http,
        }
    }
}

#[async_trait]
impl Mailer for WebhookMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<()> {
        let payload = json!({
            "from": self.from,
            "to": to,
            "subject": subject,
            "html": html,
        });

        let mut request = self.http.post(&self.endpoint).json(&payload);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| SkeinError::Mail(format!("mail endpoint unreachable: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Mail endpoint returned non-success");
            return Err(SkeinError::Mail(format!("mail endpoint returned {status}")).into());
        }

        Ok(())
    }
}

/// Mailer for environments without a mail endpoint. Logs and succeeds, so
/// digests advance to Sent without delivery.
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send(&self, to: &str, subject: &str, _html: &str) -> Result<()> {
        info!(to, subject, "Mail delivery disabled; dropping message");
        Ok(())
    }
}
