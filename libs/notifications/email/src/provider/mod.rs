//! Email provider implementations

pub mod mock;
pub mod sendgrid;
pub mod smtp;

pub use mock::MockProvider;
pub use sendgrid::SendGridProvider;
pub use smtp::{SmtpConfig, SmtpProvider};

use crate::error::EmailResult;
use crate::models::EmailMessage;
use async_trait::async_trait;

/// Result of a successful send
#[derive(Debug)]
pub struct SendResult {
    /// Provider-specific message ID
    pub message_id: String,
}

/// Trait for email providers
#[async_trait]
pub trait EmailProvider: Send + Sync {
    /// Send a single message
    async fn send(&self, message: &EmailMessage) -> EmailResult<SendResult>;

    /// Check if the provider is healthy
    async fn health_check(&self) -> EmailResult<()>;

    /// Get provider name
    fn name(&self) -> &'static str;
}
