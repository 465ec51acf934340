//! SendGrid email provider
//!
//! Sends emails via the SendGrid v3 HTTP API.

use crate::error::{EmailError, EmailResult};
use crate::models::EmailMessage;
use crate::provider::{EmailProvider, SendResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error};

/// SendGrid API endpoint
const SENDGRID_API_URL: &str = "https://api.sendgrid.com/v3/mail/send";

/// Per-request timeout; a hung provider call must only stall one send
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// SendGrid email provider
pub struct SendGridProvider {
    api_key: String,
    from_email: String,
    from_name: String,
    client: Client,
}

impl SendGridProvider {
    /// Create a new SendGridProvider
    pub fn new(
        api_key: impl Into<String>,
        from_email: impl Into<String>,
        from_name: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            from_email: from_email.into(),
            from_name: from_name.into(),
            client: Client::new(),
        }
    }

    /// Create from environment variables
    ///
    /// Expects:
    /// - `SENDGRID_API_KEY`
    /// - `SENDGRID_FROM_EMAIL` or `EMAIL_FROM_ADDRESS`
    /// - `SENDGRID_FROM_NAME` or `EMAIL_FROM_NAME`
    pub fn from_env() -> EmailResult<Self> {
        let api_key = std::env::var("SENDGRID_API_KEY")
            .map_err(|_| EmailError::Config("SENDGRID_API_KEY not set".into()))?;

        let from_email = std::env::var("SENDGRID_FROM_EMAIL")
            .or_else(|_| std::env::var("EMAIL_FROM_ADDRESS"))
            .map_err(|_| {
                EmailError::Config("SENDGRID_FROM_EMAIL or EMAIL_FROM_ADDRESS not set".into())
            })?;

        let from_name = std::env::var("SENDGRID_FROM_NAME")
            .or_else(|_| std::env::var("EMAIL_FROM_NAME"))
            .unwrap_or_else(|_| "Campaigns".to_string());

        Ok(Self::new(api_key, from_email, from_name))
    }
}

/// SendGrid API request payload
#[derive(Debug, Serialize)]
struct SendGridRequest {
    personalizations: Vec<Personalization>,
    from: EmailAddress,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<EmailAddress>,
    subject: String,
    content: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    headers: Option<HashMap<String, String>>,
}

#[derive(Debug, Serialize)]
struct Personalization {
    to: Vec<EmailAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    custom_args: Option<HashMap<String, String>>,
}

#[derive(Debug, Serialize)]
struct EmailAddress {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(rename = "type")]
    content_type: String,
    value: String,
}

#[async_trait]
impl EmailProvider for SendGridProvider {
    async fn send(&self, email: &EmailMessage) -> EmailResult<SendResult> {
        // SendGrid requires text/plain before text/html
        let mut content = Vec::new();

        if let Some(text) = &email.text_body {
            content.push(Content {
                content_type: "text/plain".to_string(),
                value: text.clone(),
            });
        }

        if let Some(html) = &email.html_body {
            content.push(Content {
                content_type: "text/html".to_string(),
                value: html.clone(),
            });
        }

        if content.is_empty() {
            return Err(EmailError::InvalidMessage(
                "Email must have text or HTML content".into(),
            ));
        }

        let personalization = Personalization {
            to: vec![EmailAddress {
                email: email.to.clone(),
                name: None,
            }],
            custom_args: if email.custom_args.is_empty() {
                None
            } else {
                Some(email.custom_args.clone())
            },
        };

        let request = SendGridRequest {
            personalizations: vec![personalization],
            from: EmailAddress {
                email: email
                    .from_email
                    .clone()
                    .unwrap_or_else(|| self.from_email.clone()),
                name: Some(
                    email
                        .from_name
                        .clone()
                        .unwrap_or_else(|| self.from_name.clone()),
                ),
            },
            reply_to: email.reply_to.as_ref().map(|r| EmailAddress {
                email: r.clone(),
                name: None,
            }),
            subject: email.subject.clone(),
            content,
            headers: if email.headers.is_empty() {
                None
            } else {
                Some(email.headers.clone())
            },
        };

        debug!(
            to = %email.to,
            subject = %email.subject,
            "Sending email via SendGrid"
        );

        let response = self
            .client
            .post(SENDGRID_API_URL)
            .timeout(REQUEST_TIMEOUT)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| EmailError::Provider(format!("connection error: {}", e)))?;

        let status = response.status();

        if status.is_success() {
            // SendGrid returns the message ID in the X-Message-Id header
            let message_id = response
                .headers()
                .get("X-Message-Id")
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

            debug!(message_id = %message_id, "Email accepted by SendGrid");

            Ok(SendResult { message_id })
        } else {
            let error_body = response.text().await.unwrap_or_default();
            error!(
                status = %status,
                error = %error_body,
                "SendGrid API error"
            );

            // Map status codes so failure classification can read them
            match status.as_u16() {
                429 => Err(EmailError::Provider("rate limit exceeded".into())),
                400 => Err(EmailError::Provider(format!(
                    "invalid request: {}",
                    error_body
                ))),
                401 | 403 => Err(EmailError::Provider("authentication failed".into())),
                _ => Err(EmailError::Provider(format!(
                    "SendGrid error ({}): {}",
                    status, error_body
                ))),
            }
        }
    }

    async fn health_check(&self) -> EmailResult<()> {
        if self.api_key.is_empty() {
            return Err(EmailError::Config("SendGrid API key not configured".into()));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "sendgrid"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_address_serialization() {
        let addr = EmailAddress {
            email: "test@example.com".to_string(),
            name: Some("Test User".to_string()),
        };

        let json = serde_json::to_string(&addr).unwrap();
        assert!(json.contains("test@example.com"));
        assert!(json.contains("Test User"));
    }

    #[test]
    fn custom_args_and_headers_serialize_when_present() {
        let request = SendGridRequest {
            personalizations: vec![Personalization {
                to: vec![EmailAddress {
                    email: "test@example.com".to_string(),
                    name: None,
                }],
                custom_args: Some(HashMap::from([(
                    "campaign_id".to_string(),
                    "abc".to_string(),
                )])),
            }],
            from: EmailAddress {
                email: "from@example.com".to_string(),
                name: None,
            },
            reply_to: None,
            subject: "Hi".to_string(),
            content: vec![Content {
                content_type: "text/html".to_string(),
                value: "<p>Hi</p>".to_string(),
            }],
            headers: Some(HashMap::from([(
                "List-Unsubscribe-Post".to_string(),
                "List-Unsubscribe=One-Click".to_string(),
            )])),
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("custom_args"));
        assert!(json.contains("campaign_id"));
        assert!(json.contains("List-Unsubscribe-Post"));
        assert!(!json.contains("reply_to"));
    }
}
