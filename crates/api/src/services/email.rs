//! Email delivery for submission mails.
//!
//! Supports two providers:
//! - `console`: Logs mails (development)
//! - `sendgrid`: Uses the SendGrid v3 API

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use domain::services::{MailDispatcher, MailError, MailMessage};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::EmailConfig;

const SENDGRID_URL: &str = "https://api.sendgrid.com/v3/mail/send";

/// Errors that can occur during email operations.
#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email service not configured")]
    NotConfigured,

    #[error("Mail has no recipients")]
    NoRecipients,

    #[error("Failed to send email: {0}")]
    SendFailed(String),

    #[error("Provider error: {0}")]
    ProviderError(String),
}

impl From<EmailError> for MailError {
    fn from(err: EmailError) -> Self {
        match err {
            EmailError::NoRecipients => MailError::Invalid(err.to_string()),
            other => MailError::Delivery(other.to_string()),
        }
    }
}

/// Email service delivering submission mails through the configured provider.
#[derive(Clone)]
pub struct EmailService {
    config: Arc<EmailConfig>,
    client: reqwest::Client,
}

impl EmailService {
    /// Creates a new EmailService with the given configuration.
    pub fn new(config: EmailConfig) -> Self {
        Self {
            config: Arc::new(config),
            client: reqwest::Client::new(),
        }
    }

    /// Check if email service is enabled.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Send a mail. A disabled service drops it.
    pub async fn deliver(&self, message: &MailMessage) -> Result<(), EmailError> {
        if message.to.is_empty() {
            return Err(EmailError::NoRecipients);
        }

        if !self.config.enabled {
            debug!(
                recipients = message.to.len(),
                subject = %message.subject,
                "Email service disabled, skipping send"
            );
            return Ok(());
        }

        match self.config.provider.as_str() {
            "console" => {
                self.send_console(message);
                Ok(())
            }
            "sendgrid" => self.send_sendgrid(message).await,
            provider => {
                error!(provider = %provider, "Unknown email provider");
                Err(EmailError::NotConfigured)
            }
        }
    }

    fn send_console(&self, message: &MailMessage) {
        info!(
            to = ?message.to,
            from = %message.from,
            from_name = %self.config.sender_name,
            subject = %message.subject,
            attachments = message.attachments.len(),
            "Email (console provider)"
        );
        debug!(body_text = %message.context.render_text(), "Email body");
    }

    async fn send_sendgrid(&self, message: &MailMessage) -> Result<(), EmailError> {
        if self.config.sendgrid_api_key.is_empty() {
            return Err(EmailError::NotConfigured);
        }

        let body = sendgrid_payload(message, &self.config.sender_name);

        let response = self
            .client
            .post(SENDGRID_URL)
            .bearer_auth(&self.config.sendgrid_api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmailError::SendFailed(format!("SendGrid request failed: {}", e)))?;

        if response.status().is_success() {
            info!(
                recipients = message.to.len(),
                subject = %message.subject,
                "Email sent via SendGrid"
            );
            Ok(())
        } else {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            error!(
                status = %status,
                error = %error_body,
                "SendGrid API error"
            );
            Err(EmailError::ProviderError(format!(
                "SendGrid returned {}: {}",
                status, error_body
            )))
        }
    }
}

#[async_trait]
impl MailDispatcher for EmailService {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        self.deliver(message).await.map_err(MailError::from)
    }
}

/// Builds the SendGrid v3 request body. Attachments are base64 encoded.
fn sendgrid_payload(message: &MailMessage, sender_name: &str) -> serde_json::Value {
    let to: Vec<serde_json::Value> = message
        .to
        .iter()
        .map(|address| serde_json::json!({ "email": address }))
        .collect();

    let mut body = serde_json::json!({
        "personalizations": [{ "to": to }],
        "from": {
            "email": message.from,
            "name": sender_name
        },
        "subject": message.subject,
        "content": [{
            "type": "text/plain",
            "value": message.context.render_text()
        }]
    });

    if !message.attachments.is_empty() {
        body["attachments"] = message
            .attachments
            .iter()
            .map(|a| {
                serde_json::json!({
                    "content": STANDARD.encode(&a.content),
                    "filename": a.filename,
                    "type": a.content_type,
                    "disposition": "attachment"
                })
            })
            .collect();
    }

    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::services::{MailAttachment, MailContext};

    fn test_config() -> EmailConfig {
        EmailConfig {
            enabled: true,
            provider: "console".to_string(),
            sendgrid_api_key: String::new(),
            sender_email: "test@example.com".to_string(),
            sender_name: "Test".to_string(),
            fail_silently: true,
        }
    }

    fn message() -> MailMessage {
        MailMessage {
            subject: "Contact Us - 2024-05-01 10:00:00".to_string(),
            from: "forms@example.com".to_string(),
            to: vec!["ada@example.com".to_string(), "bob@example.com".to_string()],
            context: MailContext {
                fields: vec![("Name".to_string(), "Ada".to_string())],
                message: "Thanks".to_string(),
            },
            attachments: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_send_console_email() {
        let service = EmailService::new(test_config());
        assert!(service.is_enabled());
        assert!(service.send(&message()).await.is_ok());
    }

    #[tokio::test]
    async fn test_disabled_service_skips_send() {
        let mut config = test_config();
        config.enabled = false;
        config.provider = "sendgrid".to_string();
        let service = EmailService::new(config);
        assert!(service.send(&message()).await.is_ok());
    }

    #[tokio::test]
    async fn test_no_recipients_is_invalid() {
        let service = EmailService::new(test_config());
        let mut mail = message();
        mail.to.clear();

        assert!(matches!(
            service.send(&mail).await,
            Err(MailError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_sendgrid_without_key_fails() {
        let mut config = test_config();
        config.provider = "sendgrid".to_string();
        let service = EmailService::new(config);

        assert!(matches!(
            service.send(&message()).await,
            Err(MailError::Delivery(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_provider_fails() {
        let mut config = test_config();
        config.provider = "pigeon".to_string();
        let service = EmailService::new(config);
        assert!(service.deliver(&message()).await.is_err());
    }

    #[test]
    fn test_sendgrid_payload() {
        let body = sendgrid_payload(&message(), "Forms");

        assert_eq!(body["from"]["email"], "forms@example.com");
        assert_eq!(body["from"]["name"], "Forms");
        assert_eq!(body["personalizations"][0]["to"][1]["email"], "bob@example.com");
        assert_eq!(body["content"][0]["value"], "Thanks\n\nName: Ada\n");
        assert!(body.get("attachments").is_none());
    }

    #[test]
    fn test_sendgrid_payload_encodes_attachments() {
        let mut mail = message();
        mail.attachments.push(MailAttachment {
            filename: "cv.txt".to_string(),
            content_type: "text/plain".to_string(),
            content: b"hello".to_vec(),
        });

        let body = sendgrid_payload(&mail, "Forms");
        assert_eq!(body["attachments"][0]["content"], "aGVsbG8=");
        assert_eq!(body["attachments"][0]["filename"], "cv.txt");
    }
}
