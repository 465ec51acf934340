//! Integration tests for the email library

use email::{DeliveryGateway, EmailMessage, EmailProvider, MockProvider};
use std::sync::Arc;

mod message_tests {
    use super::*;

    #[test]
    fn test_message_builder() {
        let message = EmailMessage::new("recipient@example.com", "Test Subject")
            .with_text("Plain text body")
            .with_html("<p>HTML body</p>")
            .with_from("sender@example.com", "Sender")
            .with_reply_to("replies@example.com")
            .with_custom_arg("campaign_id", "abc-123");

        assert_eq!(message.to, "recipient@example.com");
        assert_eq!(message.subject, "Test Subject");
        assert_eq!(message.text_body, Some("Plain text body".to_string()));
        assert_eq!(message.html_body, Some("<p>HTML body</p>".to_string()));
        assert_eq!(message.from_email, Some("sender@example.com".to_string()));
        assert_eq!(message.reply_to, Some("replies@example.com".to_string()));
        assert_eq!(
            message.custom_args.get("campaign_id"),
            Some(&"abc-123".to_string())
        );
        assert!(message.has_body());
    }

    #[test]
    fn test_list_unsubscribe_headers() {
        let message = EmailMessage::new("recipient@example.com", "Test")
            .with_html("<p>Hi</p>")
            .with_list_unsubscribe(
                "https://app.example.com/unsubscribe?r=1",
                "unsubscribe@example.com",
            );

        let header = message.headers.get("List-Unsubscribe").unwrap();
        assert!(header.contains("<https://app.example.com/unsubscribe?r=1>"));
        assert!(header.contains("<mailto:unsubscribe@example.com?subject=unsubscribe>"));
        assert_eq!(
            message.headers.get("List-Unsubscribe-Post").map(String::as_str),
            Some("List-Unsubscribe=One-Click")
        );
    }

    #[test]
    fn test_message_serialization() {
        let message = EmailMessage::new("test@example.com", "Test Subject")
            .with_text("Body")
            .with_custom_arg("recipient_id", "r-1");

        let json = serde_json::to_string(&message).unwrap();
        let deserialized: EmailMessage = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.to, message.to);
        assert_eq!(deserialized.subject, message.subject);
        assert_eq!(deserialized.custom_args, message.custom_args);
    }
}

mod provider_tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_provider_captures_messages() {
        let provider = MockProvider::new();

        let message1 = EmailMessage::new("user1@example.com", "Subject 1").with_text("Body 1");
        let message2 =
            EmailMessage::new("user2@example.com", "Subject 2").with_html("<p>Body 2</p>");

        provider.send(&message1).await.unwrap();
        provider.send(&message2).await.unwrap();

        assert_eq!(provider.sent_count().await, 2);

        let sent = provider.sent_messages().await;
        assert_eq!(sent[0].to, "user1@example.com");
        assert_eq!(sent[1].to, "user2@example.com");
    }

    #[tokio::test]
    async fn test_provider_as_trait_object() {
        let provider: Arc<dyn EmailProvider> = Arc::new(MockProvider::new());
        assert_eq!(provider.name(), "mock");
        assert!(provider.health_check().await.is_ok());

        let message = EmailMessage::new("test@example.com", "Test").with_text("Body");
        let result = provider.send(&message).await.unwrap();
        assert!(!result.message_id.is_empty());
    }
}

mod gateway_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_gateway_end_to_end() {
        let provider = Arc::new(MockProvider::new());
        let gateway = DeliveryGateway::new(provider.clone(), 2, 100);

        let messages: Vec<EmailMessage> = (0..5)
            .map(|i| {
                EmailMessage::new(format!("user{}@example.com", i), format!("Subject {}", i))
                    .with_html(format!("<p>Body {}</p>", i))
            })
            .collect();

        let progress = Arc::new(tokio::sync::Mutex::new(Vec::new()));
        let progress_clone = progress.clone();

        let outcomes = gateway
            .send_batch(&messages, move |sent, total| {
                let progress = progress_clone.clone();
                async move {
                    progress.lock().await.push((sent, total));
                }
            })
            .await;

        assert_eq!(outcomes.len(), 5);
        assert!(outcomes.iter().all(|o| o.success));
        assert_eq!(provider.sent_count().await, 5);
        assert_eq!(*progress.lock().await, vec![(2, 5), (4, 5), (5, 5)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gateway_mixed_outcomes_never_abort() {
        let provider = Arc::new(MockProvider::failing("service unavailable"));
        let gateway = DeliveryGateway::new(provider, 3, 100);

        let messages: Vec<EmailMessage> = (0..4)
            .map(|i| EmailMessage::new(format!("user{}@example.com", i), "Hi").with_text("Hi"))
            .collect();

        let outcomes = gateway.send_batch(&messages, |_, _| async {}).await;

        // Every failure is reported, none aborts the batch
        assert_eq!(outcomes.len(), 4);
        for outcome in &outcomes {
            assert!(!outcome.success);
            assert_eq!(outcome.error.as_deref(), Some("service unavailable"));
        }
    }
}
