mod sendgrid;
mod smtp;
mod templates;

pub use sendgrid::{SendGridChannel, SENDGRID_URL};
pub use smtp::SmtpChannel;
pub use templates::{escape_html, EmailTemplate};

use async_trait::async_trait;
use card_core::AlertDirection;
use serde::{Deserialize, Serialize};

pub const DEFAULT_FROM_EMAIL: &str = "alerts@dimedrop.app";
pub const DEFAULT_APP_URL: &str = "http://localhost:3002";

/// A rendered email ready for delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Data shown in a price alert email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceAlertEmail {
    pub card_name: String,
    pub target_price: f64,
    pub alert_type: AlertDirection,
    pub current_price: f64,
    pub triggered_at: String,
}

/// Trait for email delivery channels.
#[async_trait]
pub trait EmailChannel: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotificationError>;
    fn name(&self) -> &str;
}

/// Errors from the notification system.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("SMTP error: {0}")]
    Smtp(String),
    #[error("SendGrid error: {0}")]
    SendGrid(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Configuration for the notification service.
#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub sendgrid_api_key: Option<String>,
    pub sendgrid_url: String,
    pub from_email: String,
    pub app_url: String,
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_tls: SmtpTls,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SmtpTls {
    #[default]
    StartTls,
    Tls,
    None,
}

impl SmtpTls {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "tls" => SmtpTls::Tls,
            "none" => SmtpTls::None,
            _ => SmtpTls::StartTls,
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            sendgrid_api_key: None,
            sendgrid_url: SENDGRID_URL.to_string(),
            from_email: DEFAULT_FROM_EMAIL.to_string(),
            app_url: DEFAULT_APP_URL.to_string(),
            smtp_host: None,
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            smtp_tls: SmtpTls::StartTls,
        }
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.trim().is_empty())
}

impl NotificationConfig {
    /// Load from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            sendgrid_api_key: env_opt("SENDGRID_API_KEY"),
            sendgrid_url: defaults.sendgrid_url,
            from_email: env_opt("FROM_EMAIL").unwrap_or(defaults.from_email),
            app_url: env_opt("APP_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.app_url),
            smtp_host: env_opt("SMTP_HOST"),
            smtp_port: env_opt("SMTP_PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.smtp_port),
            smtp_username: env_opt("SMTP_USERNAME"),
            smtp_password: env_opt("SMTP_PASSWORD"),
            smtp_tls: SmtpTls::parse(&std::env::var("SMTP_TLS").unwrap_or_default()),
        }
    }
}

/// Sends DimeDrop emails through whichever channel is configured.
pub struct NotificationService {
    channel: Option<Box<dyn EmailChannel>>,
    app_url: String,
}

impl NotificationService {
    /// SendGrid when an API key is set, else SMTP when a host is set.
    pub fn new(config: &NotificationConfig) -> Self {
        let channel: Option<Box<dyn EmailChannel>> = if let Some(key) = &config.sendgrid_api_key {
            tracing::info!("Email notifications enabled (SendGrid)");
            Some(Box::new(SendGridChannel::new(
                key.clone(),
                config.sendgrid_url.clone(),
                config.from_email.clone(),
            )))
        } else if config.smtp_host.is_some() {
            match SmtpChannel::new(config) {
                Ok(channel) => {
                    tracing::info!("Email notifications enabled (SMTP)");
                    Some(Box::new(channel))
                }
                Err(e) => {
                    tracing::warn!("Failed to initialize SMTP channel: {}", e);
                    None
                }
            }
        } else {
            None
        };

        if channel.is_none() {
            tracing::warn!(
                "No email channel configured (set SENDGRID_API_KEY or SMTP_HOST), notifications disabled"
            );
        }

        Self {
            channel,
            app_url: config.app_url.clone(),
        }
    }

    pub fn with_channel(channel: Box<dyn EmailChannel>, app_url: impl Into<String>) -> Self {
        Self {
            channel: Some(channel),
            app_url: app_url.into(),
        }
    }

    pub fn disabled(app_url: impl Into<String>) -> Self {
        Self {
            channel: None,
            app_url: app_url.into(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.channel.is_some()
    }

    pub fn channel_name(&self) -> Option<&str> {
        self.channel.as_ref().map(|c| c.name())
    }

    pub async fn send_price_alert(&self, to: &str, alert: &PriceAlertEmail) -> bool {
        let message = EmailTemplate::price_alert(to, alert, &self.app_url);
        self.deliver(&message).await
    }

    pub async fn send_test(&self, to: &str) -> bool {
        let message = EmailTemplate::test_notification(to, &self.app_url);
        self.deliver(&message).await
    }

    async fn deliver(&self, message: &EmailMessage) -> bool {
        let Some(channel) = &self.channel else {
            tracing::warn!("Email not sent to {}: no channel configured", message.to);
            return false;
        };

        match channel.send(message).await {
            Ok(()) => {
                tracing::info!("Sent '{}' to {} via {}", message.subject, message.to, channel.name());
                true
            }
            Err(e) => {
                tracing::error!("Failed to send email to {} via {}: {}", message.to, channel.name(), e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct RecordingChannel {
        sent: Arc<Mutex<Vec<EmailMessage>>>,
        fail: bool,
    }

    #[async_trait]
    impl EmailChannel for RecordingChannel {
        async fn send(&self, message: &EmailMessage) -> Result<(), NotificationError> {
            if self.fail {
                return Err(NotificationError::SendGrid("status 500".into()));
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    fn alert() -> PriceAlertEmail {
        PriceAlertEmail {
            card_name: "Wemby Prizm".to_string(),
            target_price: 150.0,
            alert_type: AlertDirection::Above,
            current_price: 152.5,
            triggered_at: "2025-10-09T12:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_disabled_service_returns_false() {
        let service = NotificationService::disabled(DEFAULT_APP_URL);
        assert!(!service.is_enabled());
        assert!(!tokio_test::block_on(service.send_test("fan@example.com")));
        assert!(!tokio_test::block_on(
            service.send_price_alert("fan@example.com", &alert())
        ));
    }

    #[test]
    fn test_sends_through_channel() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let service = NotificationService::with_channel(
            Box::new(RecordingChannel {
                sent: sent.clone(),
                fail: false,
            }),
            "https://dimedrop.app",
        );

        assert!(tokio_test::block_on(
            service.send_price_alert("fan@example.com", &alert())
        ));

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "fan@example.com");
        assert!(sent[0].subject.contains("Wemby Prizm"));
        assert!(sent[0].html.contains("https://dimedrop.app/alerts"));
    }

    #[test]
    fn test_channel_failure_returns_false() {
        let service = NotificationService::with_channel(
            Box::new(RecordingChannel {
                sent: Arc::new(Mutex::new(Vec::new())),
                fail: true,
            }),
            DEFAULT_APP_URL,
        );
        assert!(!tokio_test::block_on(service.send_test("fan@example.com")));
    }

    #[test]
    fn test_sendgrid_preferred_over_smtp() {
        let config = NotificationConfig {
            sendgrid_api_key: Some("SG.key".to_string()),
            smtp_host: Some("smtp.example.com".to_string()),
            ..Default::default()
        };
        let service = NotificationService::new(&config);
        assert_eq!(service.channel_name(), Some("sendgrid"));

        let none = NotificationService::new(&NotificationConfig::default());
        assert!(!none.is_enabled());
    }

    #[test]
    fn test_smtp_tls_parse() {
        assert_eq!(SmtpTls::parse("TLS"), SmtpTls::Tls);
        assert_eq!(SmtpTls::parse("none"), SmtpTls::None);
        assert_eq!(SmtpTls::parse(""), SmtpTls::StartTls);
    }
}
