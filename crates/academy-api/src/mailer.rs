//! # SendGrid Notifier
//!
//! Sends the registration welcome email through the SendGrid v3 API.

use academy_core::{AcademyError, AcademyResult, Notifier};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::{error, info, instrument};

pub const SENDGRID_API_BASE: &str = "https://api.sendgrid.com";

pub struct SendGridNotifier {
    client: Client,
    api_key: String,
    from: String,
    api_base_url: String,
}

impl SendGridNotifier {
    pub fn new(api_key: impl Into<String>, from: impl Into<String>) -> AcademyResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AcademyError::Configuration(format!("HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            from: from.into(),
            api_base_url: SENDGRID_API_BASE.to_string(),
        })
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

#[async_trait]
impl Notifier for SendGridNotifier {
    #[instrument(skip(self))]
    async fn send_welcome(&self, email: &str) -> AcademyResult<()> {
        let message = json!({
            "personalizations": [{ "to": [{ "email": email, "name": "Student" }] }],
            "from": { "email": self.from, "name": "Academy" },
            "subject": "Welcome to the Academy!",
            "content": [
                { "type": "text/plain", "value": "Welcome to the Academy." },
                { "type": "text/html", "value": "<strong>Thank you!</strong>" }
            ]
        });

        let response = self
            .client
            .post(format!("{}/v3/mail/send", self.api_base_url))
            .bearer_auth(&self.api_key)
            .json(&message)
            .send()
            .await
            .map_err(|e| AcademyError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, %body, "SendGrid rejected welcome email");
            return Err(AcademyError::Notification(format!(
                "SendGrid answered HTTP {}",
                status
            )));
        }

        info!("welcome email sent");
        Ok(())
    }
}
