use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;

use crate::{EmailChannel, EmailMessage, NotificationError};

pub const SENDGRID_URL: &str = "https://api.sendgrid.com/v3/mail/send";

/// SendGrid v3 mail API. Only `202 Accepted` counts as delivered.
pub struct SendGridChannel {
    client: reqwest::Client,
    api_key: String,
    url: String,
    from: String,
}

impl SendGridChannel {
    pub fn new(api_key: String, url: String, from: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key,
            url,
            from,
        }
    }

    fn payload(&self, message: &EmailMessage) -> serde_json::Value {
        serde_json::json!({
            "personalizations": [{ "to": [{ "email": message.to }] }],
            "from": { "email": self.from },
            "subject": message.subject,
            "content": [{ "type": "text/html", "value": message.html }],
        })
    }
}

#[async_trait]
impl EmailChannel for SendGridChannel {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotificationError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&self.payload(message))
            .send()
            .await
            .map_err(|e| NotificationError::SendGrid(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::ACCEPTED {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(NotificationError::SendGrid(format!("status {}: {}", status, body)))
    }

    fn name(&self) -> &str {
        "sendgrid"
    }
}
