use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One outbound email message
///
/// Carries everything a provider needs: addressing, bodies, extra headers
/// (List-Unsubscribe) and provider metadata (custom args). From/reply-to
/// are optional overrides; providers fall back to their configured sender.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailMessage {
    /// Recipient email address
    pub to: String,
    /// Email subject
    pub subject: String,
    /// HTML body
    pub html_body: Option<String>,
    /// Plain text body
    pub text_body: Option<String>,
    /// Sender email (defaults to the provider's configured from address)
    pub from_email: Option<String>,
    /// Sender display name
    pub from_name: Option<String>,
    /// Reply-to address
    pub reply_to: Option<String>,
    /// Extra message headers, e.g. List-Unsubscribe
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Provider metadata echoed back in webhooks (campaign/recipient ids)
    #[serde(default)]
    pub custom_args: HashMap<String, String>,
}

impl EmailMessage {
    /// Create a new message with required fields
    pub fn new(to: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            html_body: None,
            text_body: None,
            from_email: None,
            from_name: None,
            reply_to: None,
            headers: HashMap::new(),
            custom_args: HashMap::new(),
        }
    }

    /// Set HTML body
    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html_body = Some(html.into());
        self
    }

    /// Set plain text body
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text_body = Some(text.into());
        self
    }

    /// Override the sender address and display name
    pub fn with_from(mut self, email: impl Into<String>, name: impl Into<String>) -> Self {
        self.from_email = Some(email.into());
        self.from_name = Some(name.into());
        self
    }

    /// Set reply-to address
    pub fn with_reply_to(mut self, reply_to: impl Into<String>) -> Self {
        self.reply_to = Some(reply_to.into());
        self
    }

    /// Set an extra header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Attach a provider metadata pair
    pub fn with_custom_arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_args.insert(key.into(), value.into());
        self
    }

    /// Add RFC 8058 one-click unsubscribe headers
    ///
    /// `url` is the HTTPS unsubscribe endpoint; `mailto` is the address a
    /// client may mail instead.
    pub fn with_list_unsubscribe(self, url: &str, mailto: &str) -> Self {
        self.with_header(
            "List-Unsubscribe",
            format!("<{}>, <mailto:{}?subject=unsubscribe>", url, mailto),
        )
        .with_header("List-Unsubscribe-Post", "List-Unsubscribe=One-Click")
    }

    /// Whether the message has any body at all
    pub fn has_body(&self) -> bool {
        self.html_body.is_some() || self.text_body.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_bodies_and_sender() {
        let message = EmailMessage::new("user@example.com", "Hello")
            .with_html("<p>Hi</p>")
            .with_text("Hi")
            .with_from("news@acme.io", "Acme News")
            .with_reply_to("support@acme.io");

        assert_eq!(message.to, "user@example.com");
        assert_eq!(message.html_body.as_deref(), Some("<p>Hi</p>"));
        assert_eq!(message.text_body.as_deref(), Some("Hi"));
        assert_eq!(message.from_email.as_deref(), Some("news@acme.io"));
        assert_eq!(message.reply_to.as_deref(), Some("support@acme.io"));
        assert!(message.has_body());
    }

    #[test]
    fn list_unsubscribe_headers() {
        let message = EmailMessage::new("user@example.com", "Hello")
            .with_list_unsubscribe("https://app.acme.io/unsubscribe?email=u", "news@acme.io");

        assert_eq!(
            message.headers.get("List-Unsubscribe").unwrap(),
            "<https://app.acme.io/unsubscribe?email=u>, <mailto:news@acme.io?subject=unsubscribe>"
        );
        assert_eq!(
            message.headers.get("List-Unsubscribe-Post").unwrap(),
            "List-Unsubscribe=One-Click"
        );
    }

    #[test]
    fn empty_message_has_no_body() {
        let message = EmailMessage::new("user@example.com", "Hello");
        assert!(!message.has_body());
    }
}
