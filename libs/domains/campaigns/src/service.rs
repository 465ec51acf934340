use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::error::{CampaignError, CampaignResult};
use crate::models::{
    Campaign, CampaignFilter, CampaignProgress, CampaignStatus, CreateCampaign, CreateRecipient,
    DeliveryError, EmailEventType, NewEmailEvent, ProviderEvent, Recipient, RecipientFilter,
    ScheduleRequest, ScheduleResponse, SendAccepted, SendRequest, SuppressionEntry,
    SuppressionSource, UnsubscribeRequest, UpdateCampaign, WebhookAck,
};
use crate::repository::CampaignRepository;
use crate::sender::CampaignSender;
use crate::tracking::LinkTracker;

/// How many recent failures a progress report carries
const RECENT_ERROR_LIMIT: usize = 10;

/// Service layer for campaign business logic
///
/// Owns the precondition checks in front of every state transition; the
/// heavy lifting of a send pass lives in [`CampaignSender`].
pub struct CampaignService<R: CampaignRepository> {
    repository: Arc<R>,
    sender: Arc<CampaignSender<R>>,
    tracker: LinkTracker,
}

impl<R: CampaignRepository> Clone for CampaignService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
            sender: self.sender.clone(),
            tracker: self.tracker.clone(),
        }
    }
}

impl<R: CampaignRepository> CampaignService<R> {
    pub fn new(
        repository: Arc<R>,
        sender: Arc<CampaignSender<R>>,
        tracker: LinkTracker,
    ) -> Self {
        Self {
            repository,
            sender,
            tracker,
        }
    }

    /// Create a new draft campaign with validation
    #[instrument(skip(self, input), fields(campaign_name = %input.name))]
    pub async fn create_campaign(&self, input: CreateCampaign) -> CampaignResult<Campaign> {
        input
            .validate()
            .map_err(|e| CampaignError::Validation(e.to_string()))?;

        self.repository.create_campaign(input).await
    }

    /// Get a campaign by ID
    #[instrument(skip(self), fields(campaign_id = %id))]
    pub async fn get_campaign(&self, id: Uuid) -> CampaignResult<Campaign> {
        self.repository
            .get_campaign(id)
            .await?
            .ok_or(CampaignError::NotFound(id))
    }

    /// List campaigns with filters
    pub async fn list_campaigns(&self, filter: CampaignFilter) -> CampaignResult<Vec<Campaign>> {
        self.repository.list_campaigns(filter).await
    }

    /// Update a campaign's draft-editable fields
    #[instrument(skip(self, input), fields(campaign_id = %id))]
    pub async fn update_campaign(
        &self,
        id: Uuid,
        input: UpdateCampaign,
    ) -> CampaignResult<Campaign> {
        input
            .validate()
            .map_err(|e| CampaignError::Validation(e.to_string()))?;

        let campaign = self.get_campaign(id).await?;
        if campaign.status == CampaignStatus::Sending {
            return Err(CampaignError::Validation(
                "Cannot update a campaign that is currently sending".to_string(),
            ));
        }

        self.repository.update_campaign(id, input).await
    }

    /// Delete a campaign and its recipients
    #[instrument(skip(self), fields(campaign_id = %id))]
    pub async fn delete_campaign(&self, id: Uuid) -> CampaignResult<()> {
        let campaign = self.get_campaign(id).await?;
        if campaign.status == CampaignStatus::Sending {
            return Err(CampaignError::Validation(
                "Cannot delete campaign that is currently sending".to_string(),
            ));
        }

        if !self.repository.delete_campaign(id).await? {
            return Err(CampaignError::NotFound(id));
        }
        Ok(())
    }

    /// Add a recipient to a campaign; suppressed addresses are rejected
    #[instrument(skip(self, input), fields(campaign_id = %campaign_id))]
    pub async fn add_recipient(
        &self,
        campaign_id: Uuid,
        input: CreateRecipient,
    ) -> CampaignResult<Recipient> {
        input
            .validate()
            .map_err(|e| CampaignError::Validation(e.to_string()))?;

        self.get_campaign(campaign_id).await?;

        if self.repository.is_suppressed(&input.email).await? {
            return Err(CampaignError::Validation(
                "This email address has unsubscribed from all communications".to_string(),
            ));
        }

        self.repository.add_recipient(campaign_id, input).await
    }

    /// List a campaign's recipients with filters
    pub async fn list_recipients(
        &self,
        campaign_id: Uuid,
        filter: RecipientFilter,
    ) -> CampaignResult<Vec<Recipient>> {
        self.repository.list_recipients(campaign_id, filter).await
    }

    /// Start an asynchronous send pass for a campaign
    ///
    /// Preconditions are rejected synchronously; the pass itself runs as
    /// a spawned task and settles the campaign to `completed` or
    /// `failed` on its own.
    #[instrument(skip(self, request), fields(campaign_id = %id, test_mode = request.test_mode))]
    pub async fn start_send(&self, id: Uuid, request: SendRequest) -> CampaignResult<SendAccepted>
    where
        R: 'static,
    {
        let campaign = self.get_campaign(id).await?;

        if !campaign.status.can_start_sending() {
            return Err(CampaignError::Validation(format!(
                "Cannot send campaign with status: {}",
                campaign.status
            )));
        }
        if campaign.total_recipients == 0 {
            return Err(CampaignError::Validation(
                "Campaign has no recipients".to_string(),
            ));
        }

        if !self.repository.begin_sending(id).await? {
            return Err(CampaignError::Validation(
                "Campaign is no longer in a sendable state".to_string(),
            ));
        }

        self.sender
            .clone()
            .spawn(id, request.test_mode, request.test_emails);

        info!(campaign_id = %id, test_mode = request.test_mode, "Campaign sending started");
        Ok(SendAccepted {
            message: "Campaign sending started".to_string(),
            campaign_id: id,
            test_mode: request.test_mode,
        })
    }

    /// Pause a sending campaign
    ///
    /// In-flight deliveries are not rolled back; pausing only stops the
    /// next pass. Resume with another send request.
    #[instrument(skip(self), fields(campaign_id = %id))]
    pub async fn pause_campaign(&self, id: Uuid) -> CampaignResult<Campaign> {
        if !self.repository.mark_paused(id).await? {
            return Err(CampaignError::Validation(
                "Campaign not found or not in sending status".to_string(),
            ));
        }

        info!(campaign_id = %id, "Campaign paused");
        self.get_campaign(id).await
    }

    /// Schedule a campaign for a future send
    #[instrument(skip(self, request), fields(campaign_id = %id))]
    pub async fn schedule_campaign(
        &self,
        id: Uuid,
        request: ScheduleRequest,
    ) -> CampaignResult<ScheduleResponse> {
        let campaign = self.get_campaign(id).await?;

        if request.scheduled_at <= Utc::now() {
            return Err(CampaignError::Validation(
                "Scheduled time must be in the future".to_string(),
            ));
        }
        if campaign.total_recipients == 0 {
            return Err(CampaignError::Validation(
                "Campaign has no recipients".to_string(),
            ));
        }

        if !self
            .repository
            .schedule_campaign(id, request.scheduled_at)
            .await?
        {
            return Err(CampaignError::Validation(format!(
                "Cannot schedule campaign with status: {}",
                campaign.status
            )));
        }

        info!(campaign_id = %id, scheduled_at = %request.scheduled_at, "Campaign scheduled");
        Ok(ScheduleResponse {
            campaign_id: id,
            scheduled_at: Some(request.scheduled_at),
            status: CampaignStatus::Scheduled,
            message: "Campaign scheduled".to_string(),
        })
    }

    /// Cancel a schedule, reverting the campaign to draft
    #[instrument(skip(self), fields(campaign_id = %id))]
    pub async fn cancel_schedule(&self, id: Uuid) -> CampaignResult<ScheduleResponse> {
        if !self.repository.cancel_schedule(id).await? {
            let campaign = self.get_campaign(id).await?;
            return Err(CampaignError::Validation(format!(
                "Cannot cancel schedule with status: {}",
                campaign.status
            )));
        }

        info!(campaign_id = %id, "Campaign schedule cancelled");
        Ok(ScheduleResponse {
            campaign_id: id,
            scheduled_at: None,
            status: CampaignStatus::Draft,
            message: "Schedule cancelled".to_string(),
        })
    }

    /// Live progress for a campaign, with the most recent failures
    pub async fn campaign_progress(&self, id: Uuid) -> CampaignResult<CampaignProgress> {
        let campaign = self.get_campaign(id).await?;
        let failures = self
            .repository
            .recent_failures(id, RECENT_ERROR_LIMIT)
            .await?;

        let progress_percentage = if campaign.total_recipients > 0 {
            let pct = campaign.sent_count as f64 / campaign.total_recipients as f64 * 100.0;
            (pct * 100.0).round() / 100.0
        } else {
            0.0
        };

        Ok(CampaignProgress {
            campaign_id: id,
            status: campaign.status,
            total_recipients: campaign.total_recipients,
            sent_count: campaign.sent_count,
            failed_count: campaign.failed_count,
            remaining: campaign.total_recipients - campaign.sent_count - campaign.failed_count,
            progress_percentage,
            recent_errors: failures
                .into_iter()
                .map(|entry| DeliveryError {
                    email: entry.email,
                    error_message: entry.error_message,
                    timestamp: entry.timestamp,
                })
                .collect(),
        })
    }

    /// Process a public unsubscribe request
    ///
    /// Idempotent: an already-suppressed address returns the existing
    /// entry, and recipient re-marking is harmless.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn unsubscribe(
        &self,
        request: UnsubscribeRequest,
    ) -> CampaignResult<SuppressionEntry> {
        request
            .validate()
            .map_err(|e| CampaignError::Validation(e.to_string()))?;

        let entry = self
            .repository
            .insert_suppression(SuppressionEntry::new(
                request.email.clone(),
                SuppressionSource::Unsubscribe,
                request.reason.clone(),
                request.campaign_id,
            ))
            .await?;

        let affected = self
            .repository
            .mark_recipients_unsubscribed(&request.email)
            .await?;
        for recipient in &affected {
            self.record_event(NewEmailEvent::new(
                recipient.campaign_id,
                recipient.id,
                &recipient.email,
                EmailEventType::Unsubscribed,
            ))
            .await;
        }

        info!(email = %entry.email, affected = affected.len(), "Unsubscribe processed");
        Ok(entry)
    }

    /// Ingest provider delivery events (bounces, drops, complaints)
    ///
    /// Other event kinds are acknowledged and ignored; delivery and
    /// engagement state is owned by the pipeline and the tracking
    /// endpoints.
    #[instrument(skip(self, events), fields(count = events.len()))]
    pub async fn process_provider_events(
        &self,
        events: Vec<ProviderEvent>,
    ) -> CampaignResult<WebhookAck> {
        let mut processed = 0;
        let mut ignored = 0;

        for event in events {
            match event.event.as_str() {
                "bounce" | "dropped" | "spam_report" => {
                    let source = if event.event == "spam_report" {
                        SuppressionSource::Complaint
                    } else {
                        SuppressionSource::Bounce
                    };

                    let affected = self
                        .repository
                        .mark_recipients_bounced(
                            &event.email,
                            event.campaign_id,
                            event.reason.clone(),
                        )
                        .await?;

                    self.repository
                        .insert_suppression(SuppressionEntry::new(
                            event.email.clone(),
                            source,
                            event.reason.clone(),
                            event.campaign_id,
                        ))
                        .await?;

                    for recipient in &affected {
                        let mut log = NewEmailEvent::new(
                            recipient.campaign_id,
                            recipient.id,
                            &recipient.email,
                            EmailEventType::Bounced,
                        )
                        .with_data(json!({ "provider_event": event.event }));
                        if let Some(reason) = &event.reason {
                            log = log.with_error(reason.clone());
                        }
                        self.record_event(log).await;
                    }

                    info!(
                        email = %event.email,
                        event = %event.event,
                        affected = affected.len(),
                        "Bounce event processed"
                    );
                    processed += 1;
                }
                _ => ignored += 1,
            }
        }

        Ok(WebhookAck { processed, ignored })
    }

    /// Record an email open; only the first open per recipient counts
    pub async fn track_open(
        &self,
        campaign_id: Uuid,
        recipient_id: Uuid,
        token: &str,
        user_agent: Option<String>,
        ip: Option<String>,
    ) -> CampaignResult<bool> {
        if !self.tracker.verify(campaign_id, recipient_id, token) {
            warn!(
                campaign_id = %campaign_id,
                recipient_id = %recipient_id,
                "Invalid open tracking token"
            );
            return Ok(false);
        }

        let Some(recipient) = self.repository.get_recipient(recipient_id).await? else {
            return Ok(false);
        };

        let first_open = self
            .repository
            .mark_recipient_opened(recipient_id, Utc::now())
            .await?;
        if first_open {
            self.repository.increment_opened(campaign_id).await?;
            self.record_event(
                NewEmailEvent::new(
                    campaign_id,
                    recipient_id,
                    &recipient.email,
                    EmailEventType::Opened,
                )
                .with_data(json!({ "user_agent": user_agent, "ip": ip })),
            )
            .await;
            info!(campaign_id = %campaign_id, recipient_id = %recipient_id, "Email opened");
        }

        Ok(first_open)
    }

    /// Record an email click; every verified click is logged, the first
    /// one mutates counters
    pub async fn track_click(
        &self,
        campaign_id: Uuid,
        recipient_id: Uuid,
        token: &str,
        url: &str,
        user_agent: Option<String>,
        ip: Option<String>,
    ) -> CampaignResult<bool> {
        if !self.tracker.verify(campaign_id, recipient_id, token) {
            warn!(
                campaign_id = %campaign_id,
                recipient_id = %recipient_id,
                "Invalid click tracking token"
            );
            return Ok(false);
        }

        let Some(recipient) = self.repository.get_recipient(recipient_id).await? else {
            return Ok(false);
        };

        let first_click = self
            .repository
            .mark_recipient_clicked(recipient_id, Utc::now())
            .await?;
        if first_click {
            self.repository.increment_clicked(campaign_id).await?;
        }

        self.record_event(
            NewEmailEvent::new(
                campaign_id,
                recipient_id,
                &recipient.email,
                EmailEventType::Clicked,
            )
            .with_data(json!({ "url": url, "user_agent": user_agent, "ip": ip })),
        )
        .await;
        info!(campaign_id = %campaign_id, recipient_id = %recipient_id, url, "Email clicked");

        Ok(first_click)
    }

    /// Append an audit event; a log-insert failure never fails the
    /// operation that produced it.
    async fn record_event(&self, event: NewEmailEvent) {
        if let Err(e) = self.repository.log_event(event).await {
            tracing::error!(error = %e, "Failed to log email event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryCampaignRepository;
    use crate::sender::CampaignSender;
    use email::MockProvider;

    fn service_with(
        repository: Arc<InMemoryCampaignRepository>,
    ) -> CampaignService<InMemoryCampaignRepository> {
        let tracker = LinkTracker::new("https://api.test", "secret");
        let sender = Arc::new(CampaignSender::new(
            repository.clone(),
            Arc::new(MockProvider::new()),
            tracker.clone(),
            "https://app.test",
            3,
        ));
        CampaignService::new(repository, sender, tracker)
    }

    fn campaign_input() -> CreateCampaign {
        CreateCampaign {
            name: "Launch".to_string(),
            subject: "We launched".to_string(),
            from_name: "Acme".to_string(),
            from_email: "news@acme.io".to_string(),
            reply_to: None,
            html_content: "<p>Hi {{firstname}}</p>".to_string(),
            batch_size: 10,
            rate_limit_per_second: 100,
        }
    }

    fn recipient_input(email: &str) -> CreateRecipient {
        CreateRecipient {
            email: email.to_string(),
            first_name: None,
            last_name: None,
            company: None,
            custom_data: serde_json::json!({}),
        }
    }

    async fn wait_for_status(
        repository: &InMemoryCampaignRepository,
        id: Uuid,
        status: CampaignStatus,
    ) {
        for _ in 0..200 {
            if repository.get_campaign(id).await.unwrap().unwrap().status == status {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("campaign never reached {}", status);
    }

    #[tokio::test]
    async fn create_campaign_validates_input() {
        let repository = Arc::new(InMemoryCampaignRepository::new());
        let service = service_with(repository);

        let mut bad = campaign_input();
        bad.from_email = "not-an-email".to_string();
        let err = service.create_campaign(bad).await.unwrap_err();
        assert!(matches!(err, CampaignError::Validation(_)));

        let campaign = service.create_campaign(campaign_input()).await.unwrap();
        assert_eq!(campaign.status, CampaignStatus::Draft);
    }

    #[tokio::test]
    async fn update_and_delete_rejected_while_sending() {
        let repository = Arc::new(InMemoryCampaignRepository::new());
        let service = service_with(repository.clone());

        let campaign = service.create_campaign(campaign_input()).await.unwrap();
        service
            .add_recipient(campaign.id, recipient_input("a@example.com"))
            .await
            .unwrap();
        assert!(repository.begin_sending(campaign.id).await.unwrap());

        let err = service
            .update_campaign(
                campaign.id,
                UpdateCampaign {
                    name: Some("Renamed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CampaignError::Validation(_)));

        let err = service.delete_campaign(campaign.id).await.unwrap_err();
        assert!(matches!(err, CampaignError::Validation(_)));

        // Once paused, edits are allowed again.
        assert!(repository.mark_paused(campaign.id).await.unwrap());
        service
            .update_campaign(
                campaign.id,
                UpdateCampaign {
                    name: Some("Renamed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        service.delete_campaign(campaign.id).await.unwrap();
    }

    #[tokio::test]
    async fn add_recipient_rejects_suppressed_email() {
        let repository = Arc::new(InMemoryCampaignRepository::new());
        let service = service_with(repository.clone());

        let campaign = service.create_campaign(campaign_input()).await.unwrap();
        repository
            .insert_suppression(SuppressionEntry::new(
                "gone@example.com",
                SuppressionSource::Unsubscribe,
                None,
                None,
            ))
            .await
            .unwrap();

        let err = service
            .add_recipient(campaign.id, recipient_input("gone@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, CampaignError::Validation(_)));

        // A missing campaign wins over the suppression check.
        let err = service
            .add_recipient(Uuid::now_v7(), recipient_input("gone@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, CampaignError::NotFound(_)));

        let recipient = service
            .add_recipient(campaign.id, recipient_input("ok@example.com"))
            .await
            .unwrap();
        assert_eq!(recipient.email, "ok@example.com");

        let updated = service.get_campaign(campaign.id).await.unwrap();
        assert_eq!(updated.total_recipients, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn start_send_runs_a_pass_to_completion() {
        let repository = Arc::new(InMemoryCampaignRepository::new());
        let service = service_with(repository.clone());

        let campaign = service.create_campaign(campaign_input()).await.unwrap();

        // No recipients yet.
        let err = service
            .start_send(campaign.id, SendRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CampaignError::Validation(_)));

        service
            .add_recipient(campaign.id, recipient_input("a@example.com"))
            .await
            .unwrap();

        let accepted = service
            .start_send(campaign.id, SendRequest::default())
            .await
            .unwrap();
        assert_eq!(accepted.campaign_id, campaign.id);
        assert!(!accepted.test_mode);

        wait_for_status(&repository, campaign.id, CampaignStatus::Completed).await;

        let finished = repository.get_campaign(campaign.id).await.unwrap().unwrap();
        assert_eq!(finished.sent_count, 1);
        assert!(finished.started_at.is_some());

        // Terminal campaigns cannot be re-sent.
        let err = service
            .start_send(campaign.id, SendRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CampaignError::Validation(_)));
    }

    #[tokio::test]
    async fn pause_requires_sending_status() {
        let repository = Arc::new(InMemoryCampaignRepository::new());
        let service = service_with(repository.clone());

        let campaign = service.create_campaign(campaign_input()).await.unwrap();
        let err = service.pause_campaign(campaign.id).await.unwrap_err();
        assert!(matches!(err, CampaignError::Validation(_)));

        assert!(repository.begin_sending(campaign.id).await.unwrap());
        let paused = service.pause_campaign(campaign.id).await.unwrap();
        assert_eq!(paused.status, CampaignStatus::Paused);
    }

    #[tokio::test]
    async fn schedule_guards_time_and_recipients() {
        let repository = Arc::new(InMemoryCampaignRepository::new());
        let service = service_with(repository.clone());

        let campaign = service.create_campaign(campaign_input()).await.unwrap();
        let future = Utc::now() + chrono::Duration::hours(1);

        let err = service
            .schedule_campaign(
                campaign.id,
                ScheduleRequest {
                    scheduled_at: Utc::now() - chrono::Duration::hours(1),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CampaignError::Validation(_)));

        let err = service
            .schedule_campaign(campaign.id, ScheduleRequest { scheduled_at: future })
            .await
            .unwrap_err();
        assert!(matches!(err, CampaignError::Validation(_)));

        service
            .add_recipient(campaign.id, recipient_input("a@example.com"))
            .await
            .unwrap();
        let scheduled = service
            .schedule_campaign(campaign.id, ScheduleRequest { scheduled_at: future })
            .await
            .unwrap();
        assert_eq!(scheduled.status, CampaignStatus::Scheduled);
        assert_eq!(scheduled.scheduled_at, Some(future));

        let cancelled = service.cancel_schedule(campaign.id).await.unwrap();
        assert_eq!(cancelled.status, CampaignStatus::Draft);
        assert_eq!(cancelled.scheduled_at, None);

        // Not scheduled anymore.
        let err = service.cancel_schedule(campaign.id).await.unwrap_err();
        assert!(matches!(err, CampaignError::Validation(_)));
    }

    #[tokio::test]
    async fn progress_reports_percentage_remaining_and_errors() {
        let repository = Arc::new(InMemoryCampaignRepository::new());
        let service = service_with(repository.clone());

        let campaign = service.create_campaign(campaign_input()).await.unwrap();
        let empty = service.campaign_progress(campaign.id).await.unwrap();
        assert_eq!(empty.progress_percentage, 0.0);
        assert_eq!(empty.remaining, 0);

        for email in ["a@example.com", "b@example.com", "c@example.com"] {
            service
                .add_recipient(campaign.id, recipient_input(email))
                .await
                .unwrap();
        }
        repository.update_progress(campaign.id, 1, 1).await.unwrap();

        let recipient = service
            .list_recipients(campaign.id, RecipientFilter::default())
            .await
            .unwrap()
            .pop()
            .unwrap();
        repository
            .log_event(
                NewEmailEvent::new(
                    campaign.id,
                    recipient.id,
                    &recipient.email,
                    EmailEventType::Failed,
                )
                .with_error("mailbox not found"),
            )
            .await
            .unwrap();

        let progress = service.campaign_progress(campaign.id).await.unwrap();
        assert_eq!(progress.total_recipients, 3);
        assert_eq!(progress.sent_count, 1);
        assert_eq!(progress.failed_count, 1);
        assert_eq!(progress.remaining, 1);
        assert_eq!(progress.progress_percentage, 33.33);
        assert_eq!(progress.recent_errors.len(), 1);
        assert_eq!(
            progress.recent_errors[0].error_message.as_deref(),
            Some("mailbox not found")
        );
    }

    #[tokio::test]
    async fn unsubscribe_suppresses_and_marks_pending_recipients() {
        let repository = Arc::new(InMemoryCampaignRepository::new());
        let service = service_with(repository.clone());

        let first = service.create_campaign(campaign_input()).await.unwrap();
        let second = service.create_campaign(campaign_input()).await.unwrap();
        service
            .add_recipient(first.id, recipient_input("x@example.com"))
            .await
            .unwrap();
        let sent = service
            .add_recipient(second.id, recipient_input("x@example.com"))
            .await
            .unwrap();
        repository.mark_recipient_sent(sent.id).await.unwrap();

        let entry = service
            .unsubscribe(UnsubscribeRequest {
                email: "x@example.com".to_string(),
                reason: Some("no longer interested".to_string()),
                campaign_id: Some(first.id),
            })
            .await
            .unwrap();
        assert_eq!(entry.source, SuppressionSource::Unsubscribe);

        let pending = service
            .list_recipients(first.id, RecipientFilter::default())
            .await
            .unwrap()
            .pop()
            .unwrap();
        assert_eq!(pending.status, crate::models::RecipientStatus::Unsubscribed);
        assert!(pending.unsubscribed_at.is_some());

        // Already-sent recipients keep their delivery record.
        let sent = repository.get_recipient(sent.id).await.unwrap().unwrap();
        assert_eq!(sent.status, crate::models::RecipientStatus::Sent);

        let events = repository.events().await;
        let unsubscribed: Vec<_> = events
            .iter()
            .filter(|e| e.event_type == EmailEventType::Unsubscribed)
            .collect();
        assert_eq!(unsubscribed.len(), 1);

        // Idempotent: the second call returns the existing entry.
        let again = service
            .unsubscribe(UnsubscribeRequest {
                email: "x@example.com".to_string(),
                reason: None,
                campaign_id: None,
            })
            .await
            .unwrap();
        assert_eq!(again.id, entry.id);
    }

    #[tokio::test]
    async fn webhook_bounce_marks_suppresses_and_logs() {
        let repository = Arc::new(InMemoryCampaignRepository::new());
        let service = service_with(repository.clone());

        let campaign = service.create_campaign(campaign_input()).await.unwrap();
        let recipient = service
            .add_recipient(campaign.id, recipient_input("bounce@example.com"))
            .await
            .unwrap();
        repository.mark_recipient_sent(recipient.id).await.unwrap();

        let ack = service
            .process_provider_events(vec![
                ProviderEvent {
                    email: "bounce@example.com".to_string(),
                    event: "bounce".to_string(),
                    campaign_id: Some(campaign.id),
                    reason: Some("550 user unknown".to_string()),
                },
                ProviderEvent {
                    email: "bounce@example.com".to_string(),
                    event: "delivered".to_string(),
                    campaign_id: Some(campaign.id),
                    reason: None,
                },
            ])
            .await
            .unwrap();
        assert_eq!(ack.processed, 1);
        assert_eq!(ack.ignored, 1);

        let bounced = repository.get_recipient(recipient.id).await.unwrap().unwrap();
        assert_eq!(bounced.status, crate::models::RecipientStatus::Bounced);
        assert!(repository.is_suppressed("bounce@example.com").await.unwrap());

        let events = repository.events().await;
        let bounce_event = events
            .iter()
            .find(|e| e.event_type == EmailEventType::Bounced)
            .unwrap();
        assert_eq!(bounce_event.error_message.as_deref(), Some("550 user unknown"));

        // A spam report suppresses as a complaint.
        service
            .process_provider_events(vec![ProviderEvent {
                email: "angry@example.com".to_string(),
                event: "spam_report".to_string(),
                campaign_id: None,
                reason: None,
            }])
            .await
            .unwrap();
        assert!(repository.is_suppressed("angry@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn track_open_counts_first_open_only() {
        let repository = Arc::new(InMemoryCampaignRepository::new());
        let service = service_with(repository.clone());
        let tracker = LinkTracker::new("https://api.test", "secret");

        let campaign = service.create_campaign(campaign_input()).await.unwrap();
        let recipient = service
            .add_recipient(campaign.id, recipient_input("a@example.com"))
            .await
            .unwrap();
        let token = tracker.token(campaign.id, recipient.id);

        assert!(!service
            .track_open(campaign.id, recipient.id, "forged", None, None)
            .await
            .unwrap());

        assert!(service
            .track_open(campaign.id, recipient.id, &token, Some("UA".to_string()), None)
            .await
            .unwrap());
        assert!(!service
            .track_open(campaign.id, recipient.id, &token, None, None)
            .await
            .unwrap());

        let updated = service.get_campaign(campaign.id).await.unwrap();
        assert_eq!(updated.opened_count, 1);

        let events = repository.events().await;
        let opens: Vec<_> = events
            .iter()
            .filter(|e| e.event_type == EmailEventType::Opened)
            .collect();
        assert_eq!(opens.len(), 1);
        assert_eq!(opens[0].event_data["user_agent"], "UA");
    }

    #[tokio::test]
    async fn track_click_logs_every_click_counts_once() {
        let repository = Arc::new(InMemoryCampaignRepository::new());
        let service = service_with(repository.clone());
        let tracker = LinkTracker::new("https://api.test", "secret");

        let campaign = service.create_campaign(campaign_input()).await.unwrap();
        let recipient = service
            .add_recipient(campaign.id, recipient_input("a@example.com"))
            .await
            .unwrap();
        let token = tracker.token(campaign.id, recipient.id);

        assert!(service
            .track_click(
                campaign.id,
                recipient.id,
                &token,
                "https://example.com/offer",
                None,
                None,
            )
            .await
            .unwrap());
        assert!(!service
            .track_click(
                campaign.id,
                recipient.id,
                &token,
                "https://example.com/other",
                None,
                None,
            )
            .await
            .unwrap());

        let updated = service.get_campaign(campaign.id).await.unwrap();
        assert_eq!(updated.clicked_count, 1);

        let events = repository.events().await;
        let clicks: Vec<_> = events
            .iter()
            .filter(|e| e.event_type == EmailEventType::Clicked)
            .collect();
        assert_eq!(clicks.len(), 2);
        assert_eq!(clicks[0].event_data["url"], "https://example.com/offer");
        assert_eq!(clicks[1].event_data["url"], "https://example.com/other");
    }
}
