//! SMTP email provider using lettre

use super::{EmailProvider, SendResult};
use crate::error::{EmailError, EmailResult};
use crate::models::EmailMessage;
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{
        Mailbox, MultiPart, SinglePart,
        header::{ContentType, Header, HeaderName, HeaderValue},
    },
    transport::smtp::authentication::Credentials,
};
use std::sync::Arc;
use std::time::Duration;

/// SMTP provider configuration
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
    pub use_tls: bool,
    /// Per-send network timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq)]
struct ListUnsubscribe(String);

impl Header for ListUnsubscribe {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("List-Unsubscribe")
    }

    fn parse(s: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Ok(Self(s.to_string()))
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(Self::name(), self.0.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ListUnsubscribePost(String);

impl Header for ListUnsubscribePost {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("List-Unsubscribe-Post")
    }

    fn parse(s: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Ok(Self(s.to_string()))
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(Self::name(), self.0.clone())
    }
}

/// SMTP email provider
pub struct SmtpProvider {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    config: Arc<SmtpConfig>,
}

impl SmtpProvider {
    /// Create a new SMTP provider
    pub fn new(config: SmtpConfig) -> EmailResult<Self> {
        let timeout = Some(Duration::from_secs(config.timeout_secs));

        let transport = if config.use_tls {
            let creds = Credentials::new(config.username.clone(), config.password.clone());
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| EmailError::Config(format!("Failed to create SMTP relay: {}", e)))?
                .credentials(creds)
                .port(config.port)
                .timeout(timeout)
                .build()
        } else if !config.username.is_empty() {
            let creds = Credentials::new(config.username.clone(), config.password.clone());
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
                .credentials(creds)
                .port(config.port)
                .timeout(timeout)
                .build()
        } else {
            // No auth (for Mailpit/Mailhog)
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
                .port(config.port)
                .timeout(timeout)
                .build()
        };

        Ok(Self {
            transport,
            config: Arc::new(config),
        })
    }

    /// Create a provider from environment variables
    ///
    /// Requires `SMTP_HOST` and `EMAIL_FROM_ADDRESS` (or `SMTP_FROM_EMAIL`);
    /// `SMTP_PORT` defaults to 587, `SMTP_USE_TLS` to true.
    pub fn from_env() -> EmailResult<Self> {
        let config = SmtpConfig {
            host: std::env::var("SMTP_HOST")
                .map_err(|_| EmailError::Config("SMTP_HOST not set".into()))?,
            port: std::env::var("SMTP_PORT")
                .unwrap_or_else(|_| "587".to_string())
                .parse()
                .map_err(|_| EmailError::Config("Invalid SMTP_PORT".into()))?,
            username: std::env::var("SMTP_USERNAME").unwrap_or_default(),
            password: std::env::var("SMTP_PASSWORD").unwrap_or_default(),
            from_email: std::env::var("EMAIL_FROM_ADDRESS")
                .or_else(|_| std::env::var("SMTP_FROM_EMAIL"))
                .map_err(|_| EmailError::Config("EMAIL_FROM_ADDRESS not set".into()))?,
            from_name: std::env::var("EMAIL_FROM_NAME")
                .unwrap_or_else(|_| "Campaigns".to_string()),
            use_tls: std::env::var("SMTP_USE_TLS")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
            timeout_secs: 30,
        };

        Self::new(config)
    }

    fn build_message(&self, email: &EmailMessage) -> EmailResult<Message> {
        let from_email = email.from_email.as_deref().unwrap_or(&self.config.from_email);
        let from_name = email.from_name.as_deref().unwrap_or(&self.config.from_name);

        let from: Mailbox = format!("{} <{}>", from_name, from_email)
            .parse()
            .map_err(|e| EmailError::InvalidMessage(format!("Invalid from address: {}", e)))?;

        let to: Mailbox = email
            .to
            .parse()
            .map_err(|e| EmailError::InvalidMessage(format!("Invalid to address: {}", e)))?;

        let mut builder = Message::builder().from(from).to(to).subject(&email.subject);

        if let Some(reply_to) = &email.reply_to {
            let reply_to: Mailbox = reply_to
                .parse()
                .map_err(|e| EmailError::InvalidMessage(format!("Invalid reply-to: {}", e)))?;
            builder = builder.reply_to(reply_to);
        }

        // lettre wants typed headers; the two list-management headers are
        // the only extra ones this system sets
        for (name, value) in &email.headers {
            builder = match name.to_ascii_lowercase().as_str() {
                "list-unsubscribe" => builder.header(ListUnsubscribe(value.clone())),
                "list-unsubscribe-post" => builder.header(ListUnsubscribePost(value.clone())),
                _ => {
                    tracing::debug!(header = %name, "Skipping unsupported SMTP header");
                    builder
                }
            };
        }

        let message = match (&email.text_body, &email.html_body) {
            (Some(text), Some(html)) => builder
                .multipart(
                    MultiPart::alternative()
                        .singlepart(
                            SinglePart::builder()
                                .header(ContentType::TEXT_PLAIN)
                                .body(text.clone()),
                        )
                        .singlepart(
                            SinglePart::builder()
                                .header(ContentType::TEXT_HTML)
                                .body(html.clone()),
                        ),
                )
                .map_err(|e| EmailError::InvalidMessage(e.to_string()))?,
            (Some(text), None) => builder
                .header(ContentType::TEXT_PLAIN)
                .body(text.clone())
                .map_err(|e| EmailError::InvalidMessage(e.to_string()))?,
            (None, Some(html)) => builder
                .header(ContentType::TEXT_HTML)
                .body(html.clone())
                .map_err(|e| EmailError::InvalidMessage(e.to_string()))?,
            (None, None) => {
                return Err(EmailError::InvalidMessage(
                    "Email must have either text or HTML body".into(),
                ));
            }
        };

        Ok(message)
    }
}

#[async_trait]
impl EmailProvider for SmtpProvider {
    async fn send(&self, email: &EmailMessage) -> EmailResult<SendResult> {
        let message = self.build_message(email)?;

        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| EmailError::Provider(e.to_string()))?;

        let message_id = response
            .message()
            .next()
            .map(|s| s.to_string())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            "Email sent via SMTP"
        );

        Ok(SendResult { message_id })
    }

    async fn health_check(&self) -> EmailResult<()> {
        self.transport
            .test_connection()
            .await
            .map_err(|e| EmailError::Provider(format!("SMTP health check failed: {}", e)))?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_provider() -> SmtpProvider {
        SmtpProvider::new(SmtpConfig {
            host: "localhost".to_string(),
            port: 1025,
            username: String::new(),
            password: String::new(),
            from_email: "noreply@acme.io".to_string(),
            from_name: "Acme".to_string(),
            use_tls: false,
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn builds_multipart_message_with_unsubscribe_headers() {
        let provider = test_provider();
        let email = EmailMessage::new("user@example.com", "Hi")
            .with_text("plain")
            .with_html("<p>rich</p>")
            .with_list_unsubscribe("https://app.acme.io/u", "noreply@acme.io");

        let message = provider.build_message(&email).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("List-Unsubscribe"));
        assert!(raw.contains("List-Unsubscribe-Post"));
    }

    #[test]
    fn message_sender_defaults_to_config() {
        let provider = test_provider();
        let email = EmailMessage::new("user@example.com", "Hi").with_text("plain");

        let message = provider.build_message(&email).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("noreply@acme.io"));
    }

    #[test]
    fn rejects_bodyless_message() {
        let provider = test_provider();
        let email = EmailMessage::new("user@example.com", "Hi");

        assert!(provider.build_message(&email).is_err());
    }
}
