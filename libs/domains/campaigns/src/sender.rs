//! Campaign send orchestrator
//!
//! One pass selects the target recipients, renders and personalizes each
//! message, injects tracking, and hands the batch to the delivery
//! gateway. Outcomes then settle one recipient at a time: sent, re-queued
//! for a later pass, or terminally failed. Campaign counters accumulate
//! across passes, so resuming after a pause keeps the earlier tallies.

use chrono::Utc;
use email::{DeliveryGateway, EmailMessage, EmailProvider};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::error::{CampaignError, CampaignResult};
use crate::models::{Campaign, EmailEventType, NewEmailEvent, Recipient};
use crate::render::TemplateRenderer;
use crate::repository::CampaignRepository;
use crate::retry::{backoff, should_retry};
use crate::tracking::{LinkTracker, TrackingOptions};

/// Drives one campaign send pass end to end
pub struct CampaignSender<R> {
    repository: Arc<R>,
    provider: Arc<dyn EmailProvider>,
    renderer: TemplateRenderer,
    tracker: LinkTracker,
    app_base_url: String,
    max_retries: i32,
}

impl<R: CampaignRepository> CampaignSender<R> {
    pub fn new(
        repository: Arc<R>,
        provider: Arc<dyn EmailProvider>,
        tracker: LinkTracker,
        app_base_url: impl Into<String>,
        max_retries: i32,
    ) -> Self {
        Self {
            repository,
            provider,
            renderer: TemplateRenderer::new(),
            tracker,
            app_base_url: app_base_url.into().trim_end_matches('/').to_string(),
            max_retries,
        }
    }

    /// Launch a pass on the runtime; the task owns its error handling.
    pub fn spawn(
        self: Arc<Self>,
        campaign_id: Uuid,
        test_mode: bool,
        test_emails: Option<Vec<String>>,
    ) where
        R: 'static,
    {
        tokio::spawn(async move {
            self.send_campaign(campaign_id, test_mode, test_emails).await;
        });
    }

    /// Run a full send pass for the campaign.
    ///
    /// Any error escaping the pass marks the campaign `failed`, so a
    /// crash never leaves it stuck in `sending`.
    #[instrument(skip(self, test_emails), fields(campaign_id = %campaign_id, test_mode))]
    pub async fn send_campaign(
        &self,
        campaign_id: Uuid,
        test_mode: bool,
        test_emails: Option<Vec<String>>,
    ) {
        if let Err(e) = self.run_pass(campaign_id, test_mode, test_emails).await {
            error!(campaign_id = %campaign_id, error = %e, "Campaign send failed");
            if let Err(e) = self.repository.mark_failed(campaign_id).await {
                error!(campaign_id = %campaign_id, error = %e, "Could not mark campaign failed");
            }
        }
    }

    async fn run_pass(
        &self,
        campaign_id: Uuid,
        test_mode: bool,
        test_emails: Option<Vec<String>>,
    ) -> CampaignResult<()> {
        let campaign = self
            .repository
            .get_campaign(campaign_id)
            .await?
            .ok_or(CampaignError::NotFound(campaign_id))?;

        let recipients = match (test_mode, test_emails) {
            (true, Some(emails)) if !emails.is_empty() => {
                self.repository
                    .recipients_by_emails(campaign_id, &emails)
                    .await?
            }
            _ => {
                self.repository
                    .pending_recipients(campaign_id, Utc::now())
                    .await?
            }
        };

        if recipients.is_empty() {
            warn!(campaign_id = %campaign_id, "No recipients to send");
            self.repository.mark_completed(campaign_id).await?;
            return Ok(());
        }

        info!(
            campaign_id = %campaign_id,
            recipients = recipients.len(),
            test_mode,
            "Starting campaign send"
        );

        // Counters accumulate across passes; a resume starts from the
        // previous tallies.
        let base_sent = campaign.sent_count;
        let base_failed = campaign.failed_count;

        let mut prepared: Vec<(EmailMessage, Recipient)> = Vec::with_capacity(recipients.len());
        let mut failed_delta = 0;

        for recipient in recipients {
            let unsubscribe_url = self.unsubscribe_url(campaign.id, &recipient.email);
            let data = self.personalization_data(&campaign, &recipient, &unsubscribe_url);

            let html = match self.renderer.render(&campaign.html_content, &data) {
                Ok(html) => html,
                Err(e) => {
                    let detail = match e {
                        CampaignError::Template(detail) => detail,
                        other => other.to_string(),
                    };
                    let reason = format!("Template rendering failed: {}", detail);
                    warn!(
                        campaign_id = %campaign_id,
                        email = %recipient.email,
                        error = %reason,
                        "Skipping recipient"
                    );
                    self.repository
                        .mark_recipient_failed(recipient.id, &reason)
                        .await?;
                    failed_delta += 1;
                    self.record_event(
                        NewEmailEvent::new(
                            campaign_id,
                            recipient.id,
                            &recipient.email,
                            EmailEventType::Failed,
                        )
                        .with_error(reason),
                    )
                    .await;
                    continue;
                }
            };

            let html = self
                .tracker
                .inject(&html, campaign.id, recipient.id, TrackingOptions::default());

            let message = self.build_message(&campaign, &recipient, html, &unsubscribe_url);
            prepared.push((message, recipient));
        }

        let gateway = DeliveryGateway::new(
            self.provider.clone(),
            campaign.batch_size.max(1) as usize,
            campaign.rate_limit_per_second.max(1) as u32,
        );

        let messages: Vec<EmailMessage> = prepared.iter().map(|(m, _)| m.clone()).collect();

        let progress_repo = self.repository.clone();
        let render_failures = failed_delta;
        let outcomes = gateway
            .send_batch(&messages, move |processed, total| {
                let repository = progress_repo.clone();
                async move {
                    // Interim counts reflect attempts; the final write
                    // settles the real outcomes.
                    if let Err(e) = repository
                        .update_progress(
                            campaign_id,
                            base_sent + processed as i32,
                            base_failed + render_failures,
                        )
                        .await
                    {
                        warn!(campaign_id = %campaign_id, error = %e, "Progress update failed");
                    }
                    info!(campaign_id = %campaign_id, processed, total, "Send progress");
                }
            })
            .await;

        let mut sent_delta = 0;

        for ((_, recipient), outcome) in prepared.iter().zip(outcomes) {
            if outcome.success {
                self.repository.mark_recipient_sent(recipient.id).await?;
                sent_delta += 1;

                let mut event = NewEmailEvent::new(
                    campaign_id,
                    recipient.id,
                    &recipient.email,
                    EmailEventType::Sent,
                );
                if let Some(message_id) = outcome.message_id {
                    event = event.with_provider_message_id(message_id);
                }
                self.record_event(event).await;
            } else {
                let error = outcome
                    .error
                    .unwrap_or_else(|| "Unknown error".to_string());
                let attempt = recipient.retry_count + 1;

                if should_retry(&error, attempt, self.max_retries) {
                    let note = format!("Retry {}/{}: {}", attempt, self.max_retries, error);
                    self.repository
                        .requeue_recipient(
                            recipient.id,
                            attempt,
                            &note,
                            Utc::now() + backoff(attempt),
                        )
                        .await?;
                } else {
                    self.repository
                        .mark_recipient_failed(recipient.id, &error)
                        .await?;
                    failed_delta += 1;
                }

                self.record_event(
                    NewEmailEvent::new(
                        campaign_id,
                        recipient.id,
                        &recipient.email,
                        EmailEventType::Failed,
                    )
                    .with_error(error),
                )
                .await;
            }
        }

        self.repository
            .finish_send_pass(campaign_id, base_sent + sent_delta, base_failed + failed_delta)
            .await?;

        info!(
            campaign_id = %campaign_id,
            sent = sent_delta,
            failed = failed_delta,
            "Campaign send pass finished"
        );
        Ok(())
    }

    fn unsubscribe_url(&self, campaign_id: Uuid, email: &str) -> String {
        format!(
            "{}/unsubscribe?email={}&campaign_id={}",
            self.app_base_url,
            urlencoding::encode(email),
            campaign_id
        )
    }

    /// Template data for one recipient; custom data keys override the
    /// built-in fields.
    fn personalization_data(
        &self,
        campaign: &Campaign,
        recipient: &Recipient,
        unsubscribe_url: &str,
    ) -> Value {
        let mut data = serde_json::Map::new();
        data.insert(
            "firstname".to_string(),
            Value::String(recipient.first_name.clone().unwrap_or_default()),
        );
        data.insert(
            "lastname".to_string(),
            Value::String(recipient.last_name.clone().unwrap_or_default()),
        );
        data.insert(
            "company".to_string(),
            Value::String(recipient.company.clone().unwrap_or_default()),
        );
        data.insert(
            "subject".to_string(),
            Value::String(campaign.subject.clone()),
        );
        data.insert(
            "unsubscribe_url".to_string(),
            Value::String(unsubscribe_url.to_string()),
        );

        if let Some(custom) = recipient.custom_data.as_object() {
            for (key, value) in custom {
                data.insert(key.clone(), value.clone());
            }
        }

        Value::Object(data)
    }

    fn build_message(
        &self,
        campaign: &Campaign,
        recipient: &Recipient,
        html: String,
        unsubscribe_url: &str,
    ) -> EmailMessage {
        let mut message = EmailMessage::new(&recipient.email, &campaign.subject)
            .with_html(html)
            .with_from(&campaign.from_email, &campaign.from_name)
            .with_list_unsubscribe(unsubscribe_url, &campaign.from_email)
            .with_custom_arg("campaign_id", campaign.id.to_string())
            .with_custom_arg("recipient_id", recipient.id.to_string());

        if let Some(reply_to) = &campaign.reply_to {
            message = message.with_reply_to(reply_to);
        }
        message
    }

    /// Append an audit event; a log-insert failure never aborts a send.
    async fn record_event(&self, event: NewEmailEvent) {
        if let Err(e) = self.repository.log_event(event).await {
            error!(error = %e, "Failed to log email event");
        }
    }
}
