//! Email senders.
//!
//! SMTP via lettre when a relay is configured, otherwise a sender that only
//! logs the message.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use secrecy::ExposeSecret;

use shoplist_core::integrations::{EmailError, EmailMessage, EmailSender};

use crate::config::SmtpConfig;

/// Sends email through an SMTP relay using STARTTLS.
#[derive(Clone)]
pub struct SmtpEmailSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpEmailSender {
    /// # Errors
    ///
    /// Returns error if the relay host is invalid.
    pub fn new(config: &SmtpConfig, from_address: &str) -> Result<Self, EmailError> {
        let credentials = Credentials::new(
            config.username.clone(),
            config.password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| EmailError::Transport(e.to_string()))?
            .port(config.port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: from_address.to_string(),
        })
    }
}

/// Builds a multipart message with plain text and HTML versions.
fn build_message(from: &str, message: &EmailMessage) -> Result<Message, EmailError> {
    Message::builder()
        .from(
            from.parse()
                .map_err(|_| EmailError::InvalidAddress(from.to_string()))?,
        )
        .to(message
            .to
            .parse()
            .map_err(|_| EmailError::InvalidAddress(message.to.clone()))?)
        .subject(message.subject.as_str())
        .multipart(
            MultiPart::alternative()
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body(message.content.clone()),
                )
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_HTML)
                        .body(message.html_body()),
                ),
        )
        .map_err(|e| EmailError::MessageBuild(e.to_string()))
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), EmailError> {
        let email = build_message(&self.from_address, message)?;

        self.mailer
            .send(email)
            .await
            .map_err(|e| EmailError::Transport(e.to_string()))?;

        tracing::info!(to = %message.to, subject = %message.subject, "Email sent successfully");
        Ok(())
    }
}

/// Logs outgoing email instead of delivering it.
#[derive(Debug, Clone, Default)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), EmailError> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            content = %message.content,
            "SMTP not configured, email logged only"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    #[test]
    fn test_build_message_sets_headers() {
        let message = EmailMessage::registration("bob@example.com");
        let email = build_message("noreply@shoplist.local", &message).unwrap();

        let raw = String::from_utf8(email.formatted()).unwrap();
        assert!(raw.contains("To: bob@example.com"));
        assert!(raw.contains("From: noreply@shoplist.local"));
        assert!(raw.contains("Subject: Registration"));
        assert!(raw.contains("<p>Registration was successful</p>"));
    }

    #[test]
    fn test_build_message_rejects_bad_recipient() {
        let message = EmailMessage::registration("not an address");
        assert!(matches!(
            build_message("noreply@shoplist.local", &message),
            Err(EmailError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_build_message_rejects_bad_sender() {
        let message = EmailMessage::registration("bob@example.com");
        assert!(matches!(
            build_message("nobody", &message),
            Err(EmailError::InvalidAddress(_))
        ));
    }

    #[tokio::test]
    async fn test_smtp_sender_builds_without_connecting() {
        let config = SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            username: "user".to_string(),
            password: SecretString::from("pass".to_string()),
        };
        assert!(SmtpEmailSender::new(&config, "noreply@shoplist.local").is_ok());
    }

    #[tokio::test]
    async fn test_log_sender_accepts_everything() {
        LogEmailSender
            .send_email(&EmailMessage::registration("bob@example.com"))
            .await
            .unwrap();
    }
}
