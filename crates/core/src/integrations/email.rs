use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A notification addressed to one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub content: String,
}

impl EmailMessage {
    pub fn new(
        to: impl Into<String>,
        subject: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            content: content.into(),
        }
    }

    /// The message queued after a successful sign-up.
    pub fn registration(to: impl Into<String>) -> Self {
        Self::new(to, "Registration", "Registration was successful")
    }

    /// HTML body with the content escaped.
    pub fn html_body(&self) -> String {
        let escaped = self
            .content
            .replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;");
        format!("<p>{escaped}</p>")
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("Queue is closed")]
    Closed,
    #[error("Queue is full")]
    Full,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
    #[error("Failed to build message: {0}")]
    MessageBuild(String),
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Fire-and-forget outbound queue. A background consumer delivers messages.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), QueueError>;
}

/// Delivers a message to its recipient.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), EmailError>;
}
