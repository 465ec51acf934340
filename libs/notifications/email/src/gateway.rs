//! Delivery gateway
//!
//! Wraps an [`EmailProvider`] with batching and rate limiting. Provider
//! failures are absorbed into [`SendOutcome`] values so a bad address or a
//! provider outage never aborts the batch that contains it.

use crate::models::EmailMessage;
use crate::provider::EmailProvider;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Outcome of a single delivery attempt.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub success: bool,
    pub message_id: Option<String>,
    pub error: Option<String>,
}

impl SendOutcome {
    pub fn delivered(message_id: String) -> Self {
        Self {
            success: true,
            message_id: Some(message_id),
            error: None,
        }
    }

    pub fn failed(error: String) -> Self {
        Self {
            success: false,
            message_id: None,
            error: Some(error),
        }
    }
}

/// Rate-limited sender over a pluggable provider.
pub struct DeliveryGateway {
    provider: Arc<dyn EmailProvider>,
    batch_size: usize,
    rate_limit_per_second: u32,
}

impl DeliveryGateway {
    pub fn new(
        provider: Arc<dyn EmailProvider>,
        batch_size: usize,
        rate_limit_per_second: u32,
    ) -> Self {
        Self {
            provider,
            batch_size: batch_size.max(1),
            rate_limit_per_second: rate_limit_per_second.max(1),
        }
    }

    /// Name of the underlying provider.
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Delay inserted before each individual send.
    fn pacing_delay(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.rate_limit_per_second as f64)
    }

    /// Send a single message, converting provider errors into a failed outcome.
    pub async fn send_one(&self, message: &EmailMessage) -> SendOutcome {
        match self.provider.send(message).await {
            Ok(result) => SendOutcome::delivered(result.message_id),
            Err(e) => {
                warn!(
                    to = %message.to,
                    provider = self.provider.name(),
                    error = %e,
                    "Email delivery failed"
                );
                SendOutcome::failed(e.to_string())
            }
        }
    }

    /// Send messages in batches, pacing individual sends and reporting
    /// progress after each batch.
    ///
    /// Returns one outcome per input message, in input order.
    pub async fn send_batch<F, Fut>(
        &self,
        messages: &[EmailMessage],
        mut on_progress: F,
    ) -> Vec<SendOutcome>
    where
        F: FnMut(usize, usize) -> Fut,
        Fut: Future<Output = ()>,
    {
        let total = messages.len();
        let mut outcomes = Vec::with_capacity(total);
        let delay = self.pacing_delay();

        for chunk in messages.chunks(self.batch_size) {
            for message in chunk {
                sleep(delay).await;
                outcomes.push(self.send_one(message).await);
            }

            debug!(
                processed = outcomes.len(),
                total,
                provider = self.provider.name(),
                "Batch processed"
            );
            on_progress(outcomes.len(), total).await;
        }

        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockProvider;

    fn message(to: &str) -> EmailMessage {
        EmailMessage::new(to, "Hello").with_html("<p>Hello</p>")
    }

    #[tokio::test(start_paused = true)]
    async fn sends_all_messages_in_order() {
        let provider = Arc::new(MockProvider::new());
        let gateway = DeliveryGateway::new(provider.clone(), 2, 10);

        let messages = vec![
            message("a@example.com"),
            message("b@example.com"),
            message("c@example.com"),
        ];

        let outcomes = gateway.send_batch(&messages, |_, _| async {}).await;

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.iter().all(|o| o.success));

        let sent = provider.sent_messages().await;
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0].to, "a@example.com");
        assert_eq!(sent[2].to, "c@example.com");
    }

    #[tokio::test(start_paused = true)]
    async fn reports_progress_after_each_batch() {
        let provider = Arc::new(MockProvider::new());
        let gateway = DeliveryGateway::new(provider, 2, 10);

        let messages = vec![
            message("a@example.com"),
            message("b@example.com"),
            message("c@example.com"),
        ];

        let progress = Arc::new(tokio::sync::Mutex::new(Vec::new()));
        let progress_clone = progress.clone();

        gateway
            .send_batch(&messages, move |sent, total| {
                let progress = progress_clone.clone();
                async move {
                    progress.lock().await.push((sent, total));
                }
            })
            .await;

        assert_eq!(*progress.lock().await, vec![(2, 3), (3, 3)]);
    }

    #[tokio::test(start_paused = true)]
    async fn provider_failure_becomes_failed_outcome() {
        let provider = Arc::new(MockProvider::failing("connection timeout"));
        let gateway = DeliveryGateway::new(provider, 10, 10);

        let messages = vec![message("a@example.com"), message("b@example.com")];

        let outcomes = gateway.send_batch(&messages, |_, _| async {}).await;

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| !o.success));
        assert_eq!(outcomes[0].error.as_deref(), Some("connection timeout"));
        assert!(outcomes[0].message_id.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn paces_sends_by_rate_limit() {
        let provider = Arc::new(MockProvider::new());
        // 2 per second means 500ms before each send
        let gateway = DeliveryGateway::new(provider, 10, 2);

        let messages = vec![message("a@example.com"), message("b@example.com")];

        let start = tokio::time::Instant::now();
        gateway.send_batch(&messages, |_, _| async {}).await;

        assert!(start.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn zero_batch_size_is_clamped() {
        let provider = Arc::new(MockProvider::new());
        let gateway = DeliveryGateway::new(provider, 0, 1000);

        let outcomes = gateway
            .send_batch(&[message("a@example.com")], |_, _| async {})
            .await;

        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].success);
    }
}
