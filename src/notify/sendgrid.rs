//! SendGrid email transport

use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::json;
use tracing::{debug, warn};

use super::Notifier;
use crate::config::NotificationConfig;
use crate::error::{BackupError, BackupResult};

const SENDGRID_ENDPOINT: &str = "https://api.sendgrid.com/v3/mail/send";

/// Sends notifications as HTML email through the SendGrid v3 API
pub struct SendGridNotifier {
    config: NotificationConfig,
    endpoint: String,
    client: Client,
}

impl SendGridNotifier {
    pub fn new(config: NotificationConfig) -> BackupResult<Self> {
        Self::with_endpoint(config, SENDGRID_ENDPOINT)
    }

    /// Point the notifier at a different API endpoint
    pub fn with_endpoint(
        config: NotificationConfig,
        endpoint: impl Into<String>,
    ) -> BackupResult<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            config,
            endpoint: endpoint.into(),
            client,
        })
    }

    fn payload(&self, subject: &str, body: &str) -> serde_json::Value {
        json!({
            "personalizations": [{ "to": [{ "email": self.config.to_email }] }],
            "from": { "email": self.config.from_email },
            "subject": subject,
            "content": [{ "type": "text/html", "value": body }],
        })
    }

    fn deliver(&self, subject: &str, body: &str) -> BackupResult<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&self.payload(subject, body))
            .send()?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let detail = response.text().unwrap_or_default();
            Err(BackupError::Http(format!(
                "SendGrid responded with {}: {}",
                status, detail
            )))
        }
    }
}

impl Notifier for SendGridNotifier {
    fn notify(&self, subject: &str, body: &str) {
        match self.deliver(subject, body) {
            Ok(()) => debug!(subject, "Notification sent"),
            Err(e) => warn!(subject, error = %e, "Failed to send notification"),
        }
    }
}
