//! Mock email provider for testing

use super::{EmailProvider, SendResult};
use crate::error::{EmailError, EmailResult};
use crate::models::EmailMessage;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Mock email provider that captures sent messages
pub struct MockProvider {
    sent_messages: Arc<Mutex<Vec<EmailMessage>>>,
    should_fail: bool,
    failure_message: Option<String>,
}

impl MockProvider {
    /// Create a new mock provider
    pub fn new() -> Self {
        Self {
            sent_messages: Arc::new(Mutex::new(Vec::new())),
            should_fail: false,
            failure_message: None,
        }
    }

    /// Create a mock provider that always fails with the given error message
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            sent_messages: Arc::new(Mutex::new(Vec::new())),
            should_fail: true,
            failure_message: Some(message.into()),
        }
    }

    /// Get all captured messages
    pub async fn sent_messages(&self) -> Vec<EmailMessage> {
        self.sent_messages.lock().await.clone()
    }

    /// Number of captured messages
    pub async fn sent_count(&self) -> usize {
        self.sent_messages.lock().await.len()
    }

    /// True if a message was captured for the given recipient
    pub async fn was_sent_to(&self, email: &str) -> bool {
        self.sent_messages
            .lock()
            .await
            .iter()
            .any(|m| m.to == email)
    }

    /// Clear captured messages
    pub async fn clear(&self) {
        self.sent_messages.lock().await.clear();
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmailProvider for MockProvider {
    async fn send(&self, email: &EmailMessage) -> EmailResult<SendResult> {
        if self.should_fail {
            let message = self
                .failure_message
                .clone()
                .unwrap_or_else(|| "mock send failure".to_string());
            return Err(EmailError::Provider(message));
        }

        self.sent_messages.lock().await.push(email.clone());

        Ok(SendResult {
            message_id: format!("mock-{}", uuid::Uuid::new_v4()),
        })
    }

    async fn health_check(&self) -> EmailResult<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
