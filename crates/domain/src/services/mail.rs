//! Submission mail composition and dispatch.
//!
//! Provides the dispatcher abstraction used to deliver submission
//! confirmations and copies.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

use super::submission::{submitter_email, CleanedValue};
use crate::models::form::Form;

/// Error type for mail delivery.
#[derive(Debug, Clone, Error)]
pub enum MailError {
    #[error("Mail delivery failed: {0}")]
    Delivery(String),

    #[error("Invalid mail: {0}")]
    Invalid(String),
}

/// A file attached to a mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailAttachment {
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

/// Body data of a submission mail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct MailContext {
    /// (label, value) pairs in field order.
    pub fields: Vec<(String, String)>,
    pub message: String,
}

impl MailContext {
    /// Plain-text rendering of the context.
    pub fn render_text(&self) -> String {
        let mut body = String::new();
        if !self.message.is_empty() {
            body.push_str(&self.message);
            body.push_str("\n\n");
        }
        for (label, value) in &self.fields {
            body.push_str(label);
            body.push_str(": ");
            body.push_str(value);
            body.push('\n');
        }
        body
    }
}

/// A mail ready to hand to a dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub subject: String,
    pub from: String,
    pub to: Vec<String>,
    pub context: MailContext,
    pub attachments: Vec<MailAttachment>,
}

/// Sender settings that come from configuration.
#[derive(Debug, Clone)]
pub struct MailSettings {
    /// Used when the form has no `email_from`.
    pub default_from: String,
    /// Send copies from the submitter's own address.
    pub send_from_submitter: bool,
}

/// Mail dispatcher trait for delivering submission mails.
#[async_trait::async_trait]
pub trait MailDispatcher: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError>;
}

/// Builds the confirmation and copy mails for a submission.
///
/// The submitter gets a mail when the form sends email and one of its
/// email fields has a value. Addresses in `email_copies` always receive a
/// copy, sent from the submitter when configured to.
pub fn build_submission_mails(
    form: &Form,
    entry_time: DateTime<Utc>,
    cleaned: &[CleanedValue],
    settings: &MailSettings,
) -> Vec<MailMessage> {
    let subject = if form.email.email_subject.trim().is_empty() {
        format!("{} - {}", form.title, entry_time.format("%Y-%m-%d %H:%M:%S"))
    } else {
        form.email.email_subject.clone()
    };

    let context = MailContext {
        fields: cleaned
            .iter()
            .map(|c| (c.label.clone(), c.value.clone().unwrap_or_default()))
            .collect(),
        message: form.email.email_message.clone(),
    };

    let email_from = if form.email.email_from.trim().is_empty() {
        settings.default_from.clone()
    } else {
        form.email.email_from.clone()
    };
    let email_to = submitter_email(cleaned);

    let mut mails = Vec::new();

    if let (Some(to), true) = (email_to, form.email.send_email) {
        mails.push(MailMessage {
            subject: subject.clone(),
            from: email_from.clone(),
            to: vec![to.to_string()],
            context: context.clone(),
            attachments: Vec::new(),
        });
    }

    let copies = split_addresses(&form.email.email_copies);
    if !copies.is_empty() {
        let from = match email_to {
            Some(to) if settings.send_from_submitter => to.to_string(),
            _ => email_from,
        };
        mails.push(MailMessage {
            subject,
            from,
            to: copies,
            context,
            attachments: Vec::new(),
        });
    }

    mails
}

fn split_addresses(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Sends every message, stopping at the first failure unless
/// `fail_silently` is set, in which case failures are logged and skipped.
///
/// Returns the number of messages delivered.
pub async fn dispatch_all(
    dispatcher: &dyn MailDispatcher,
    messages: &[MailMessage],
    fail_silently: bool,
) -> Result<usize, MailError> {
    let mut sent = 0;
    for message in messages {
        match dispatcher.send(message).await {
            Ok(()) => sent += 1,
            Err(e) if fail_silently => {
                tracing::warn!(
                    error = %e,
                    subject = %message.subject,
                    recipients = message.to.len(),
                    "Submission mail failed, continuing"
                );
            }
            Err(e) => return Err(e),
        }
    }
    Ok(sent)
}

/// Mock mail dispatcher for development and testing.
///
/// Records messages instead of sending them.
#[derive(Debug, Clone, Default)]
pub struct MockMailDispatcher {
    /// Whether to simulate failures for testing.
    pub simulate_failure: bool,
    sent: Arc<Mutex<Vec<MailMessage>>>,
}

impl MockMailDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock dispatcher that fails every send.
    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
            ..Self::default()
        }
    }

    /// Messages recorded so far.
    pub async fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl MailDispatcher for MockMailDispatcher {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        if self.simulate_failure {
            tracing::warn!(subject = %message.subject, "Mock mail dispatcher simulating failure");
            return Err(MailError::Delivery("Simulated failure".to_string()));
        }

        tracing::info!(
            subject = %message.subject,
            from = %message.from,
            recipients = message.to.len(),
            "Mock: Would send submission mail"
        );
        self.sent.lock().await.push(message.clone());
        Ok(())
    }
}
