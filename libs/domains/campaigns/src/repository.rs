use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{CampaignError, CampaignResult};
use crate::models::{
    Campaign, CampaignFilter, CampaignStatus, CreateCampaign, CreateRecipient, EmailEventType,
    EmailLogEntry, NewEmailEvent, Recipient, RecipientFilter, RecipientStatus, SuppressionEntry,
    UpdateCampaign,
};

/// Persistence contract for campaigns, recipients, the email log, and
/// the suppression list
///
/// Conditional transitions return whether the row actually moved, so
/// callers can distinguish "already past that state" from success
/// without a read-modify-write race.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CampaignRepository: Send + Sync {
    /// Create a new draft campaign
    async fn create_campaign(&self, input: CreateCampaign) -> CampaignResult<Campaign>;

    /// Get a campaign by ID
    async fn get_campaign(&self, id: Uuid) -> CampaignResult<Option<Campaign>>;

    /// List campaigns, newest first
    async fn list_campaigns(&self, filter: CampaignFilter) -> CampaignResult<Vec<Campaign>>;

    /// Update editable campaign fields
    async fn update_campaign(&self, id: Uuid, input: UpdateCampaign) -> CampaignResult<Campaign>;

    /// Delete a campaign and its recipients
    async fn delete_campaign(&self, id: Uuid) -> CampaignResult<bool>;

    /// `{draft, scheduled, paused} → sending`, stamping `started_at`
    async fn begin_sending(&self, id: Uuid) -> CampaignResult<bool>;

    /// `sending → paused`
    async fn mark_paused(&self, id: Uuid) -> CampaignResult<bool>;

    /// `{draft, paused} → scheduled` at the given time
    async fn schedule_campaign(&self, id: Uuid, at: DateTime<Utc>) -> CampaignResult<bool>;

    /// `scheduled → draft`, clearing `scheduled_at`
    async fn cancel_schedule(&self, id: Uuid) -> CampaignResult<bool>;

    /// Terminal `completed` without touching counters (empty selection)
    async fn mark_completed(&self, id: Uuid) -> CampaignResult<()>;

    /// Terminal `failed` (orchestrator crash boundary)
    async fn mark_failed(&self, id: Uuid) -> CampaignResult<()>;

    /// Scheduled campaigns whose `scheduled_at` has elapsed
    async fn due_scheduled(&self, now: DateTime<Utc>) -> CampaignResult<Vec<Campaign>>;

    /// Interim counter write while a pass is running
    async fn update_progress(
        &self,
        id: Uuid,
        sent_count: i32,
        failed_count: i32,
    ) -> CampaignResult<()>;

    /// Final counter write for a pass, `completed` + `completed_at`
    async fn finish_send_pass(
        &self,
        id: Uuid,
        sent_count: i32,
        failed_count: i32,
    ) -> CampaignResult<()>;

    /// Bump the campaign open counter
    async fn increment_opened(&self, id: Uuid) -> CampaignResult<()>;

    /// Bump the campaign click counter
    async fn increment_clicked(&self, id: Uuid) -> CampaignResult<()>;

    /// Add a recipient and bump `total_recipients`
    async fn add_recipient(
        &self,
        campaign_id: Uuid,
        input: CreateRecipient,
    ) -> CampaignResult<Recipient>;

    /// Get a recipient by ID
    async fn get_recipient(&self, id: Uuid) -> CampaignResult<Option<Recipient>>;

    /// List a campaign's recipients, newest first
    async fn list_recipients(
        &self,
        campaign_id: Uuid,
        filter: RecipientFilter,
    ) -> CampaignResult<Vec<Recipient>>;

    /// Pending recipients whose retry due-time (if any) has elapsed,
    /// in insertion order
    async fn pending_recipients(
        &self,
        campaign_id: Uuid,
        now: DateTime<Utc>,
    ) -> CampaignResult<Vec<Recipient>>;

    /// Recipients matching the given emails regardless of status
    /// (test-mode selection)
    async fn recipients_by_emails(
        &self,
        campaign_id: Uuid,
        emails: &[String],
    ) -> CampaignResult<Vec<Recipient>>;

    /// `sent` + `sent_at`
    async fn mark_recipient_sent(&self, id: Uuid) -> CampaignResult<()>;

    /// Back to `pending` with the retry bookkeeping for the next pass
    async fn requeue_recipient(
        &self,
        id: Uuid,
        retry_count: i32,
        error_message: &str,
        next_retry_at: DateTime<Utc>,
    ) -> CampaignResult<()>;

    /// Terminal `failed` with the provider error
    async fn mark_recipient_failed(&self, id: Uuid, error_message: &str) -> CampaignResult<()>;

    /// First open only: set `opened_at` if still null
    async fn mark_recipient_opened(&self, id: Uuid, at: DateTime<Utc>) -> CampaignResult<bool>;

    /// First click only: set `clicked_at` if still null
    async fn mark_recipient_clicked(&self, id: Uuid, at: DateTime<Utc>) -> CampaignResult<bool>;

    /// Mark every `pending`/`sending` recipient with this email
    /// `unsubscribed`; returns the affected rows
    async fn mark_recipients_unsubscribed(&self, email: &str) -> CampaignResult<Vec<Recipient>>;

    /// Mark matching `pending`/`sending`/`sent` recipients `bounced`;
    /// scoped to one campaign when given
    async fn mark_recipients_bounced(
        &self,
        email: &str,
        campaign_id: Option<Uuid>,
        reason: Option<String>,
    ) -> CampaignResult<Vec<Recipient>>;

    /// Whether an email is on the global suppression list
    async fn is_suppressed(&self, email: &str) -> CampaignResult<bool>;

    /// Insert a suppression row; returns the existing row when the
    /// email is already suppressed
    async fn insert_suppression(&self, entry: SuppressionEntry)
        -> CampaignResult<SuppressionEntry>;

    /// Append an email event to the audit log
    async fn log_event(&self, event: NewEmailEvent) -> CampaignResult<EmailLogEntry>;

    /// Most recent `failed` log rows for a campaign, newest first
    async fn recent_failures(
        &self,
        campaign_id: Uuid,
        limit: usize,
    ) -> CampaignResult<Vec<EmailLogEntry>>;
}

/// In-memory implementation of CampaignRepository (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryCampaignRepository {
    campaigns: Arc<RwLock<HashMap<Uuid, Campaign>>>,
    recipients: Arc<RwLock<HashMap<Uuid, Recipient>>>,
    logs: Arc<RwLock<Vec<EmailLogEntry>>>,
    suppressions: Arc<RwLock<HashMap<String, SuppressionEntry>>>,
}

impl InMemoryCampaignRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the event log, oldest first
    pub async fn events(&self) -> Vec<EmailLogEntry> {
        self.logs.read().await.clone()
    }
}

#[async_trait]
impl CampaignRepository for InMemoryCampaignRepository {
    async fn create_campaign(&self, input: CreateCampaign) -> CampaignResult<Campaign> {
        let mut campaigns = self.campaigns.write().await;
        let campaign = Campaign::new(input);
        campaigns.insert(campaign.id, campaign.clone());

        tracing::info!(campaign_id = %campaign.id, "Created campaign");
        Ok(campaign)
    }

    async fn get_campaign(&self, id: Uuid) -> CampaignResult<Option<Campaign>> {
        let campaigns = self.campaigns.read().await;
        Ok(campaigns.get(&id).cloned())
    }

    async fn list_campaigns(&self, filter: CampaignFilter) -> CampaignResult<Vec<Campaign>> {
        let campaigns = self.campaigns.read().await;

        let mut result: Vec<Campaign> = campaigns
            .values()
            .filter(|c| match filter.status {
                Some(status) => c.status == status,
                None => true,
            })
            .cloned()
            .collect();

        // Uuid v7 ids break created_at ties deterministically
        result.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        Ok(result
            .into_iter()
            .skip(filter.offset)
            .take(filter.limit)
            .collect())
    }

    async fn update_campaign(&self, id: Uuid, input: UpdateCampaign) -> CampaignResult<Campaign> {
        let mut campaigns = self.campaigns.write().await;
        let campaign = campaigns
            .get_mut(&id)
            .ok_or(CampaignError::NotFound(id))?;

        campaign.apply_update(input);
        Ok(campaign.clone())
    }

    async fn delete_campaign(&self, id: Uuid) -> CampaignResult<bool> {
        let mut campaigns = self.campaigns.write().await;
        if campaigns.remove(&id).is_none() {
            return Ok(false);
        }

        let mut recipients = self.recipients.write().await;
        recipients.retain(|_, r| r.campaign_id != id);

        tracing::info!(campaign_id = %id, "Deleted campaign");
        Ok(true)
    }

    async fn begin_sending(&self, id: Uuid) -> CampaignResult<bool> {
        let mut campaigns = self.campaigns.write().await;
        match campaigns.get_mut(&id) {
            Some(c) if c.status.can_start_sending() => {
                c.status = CampaignStatus::Sending;
                c.started_at = Some(Utc::now());
                c.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_paused(&self, id: Uuid) -> CampaignResult<bool> {
        let mut campaigns = self.campaigns.write().await;
        match campaigns.get_mut(&id) {
            Some(c) if c.status == CampaignStatus::Sending => {
                c.status = CampaignStatus::Paused;
                c.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn schedule_campaign(&self, id: Uuid, at: DateTime<Utc>) -> CampaignResult<bool> {
        let mut campaigns = self.campaigns.write().await;
        match campaigns.get_mut(&id) {
            Some(c)
                if matches!(c.status, CampaignStatus::Draft | CampaignStatus::Paused) =>
            {
                c.status = CampaignStatus::Scheduled;
                c.scheduled_at = Some(at);
                c.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn cancel_schedule(&self, id: Uuid) -> CampaignResult<bool> {
        let mut campaigns = self.campaigns.write().await;
        match campaigns.get_mut(&id) {
            Some(c) if c.status == CampaignStatus::Scheduled => {
                c.status = CampaignStatus::Draft;
                c.scheduled_at = None;
                c.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_completed(&self, id: Uuid) -> CampaignResult<()> {
        let mut campaigns = self.campaigns.write().await;
        let campaign = campaigns
            .get_mut(&id)
            .ok_or(CampaignError::NotFound(id))?;

        campaign.status = CampaignStatus::Completed;
        campaign.completed_at = Some(Utc::now());
        campaign.updated_at = Utc::now();
        Ok(())
    }

    async fn mark_failed(&self, id: Uuid) -> CampaignResult<()> {
        let mut campaigns = self.campaigns.write().await;
        let campaign = campaigns
            .get_mut(&id)
            .ok_or(CampaignError::NotFound(id))?;

        campaign.status = CampaignStatus::Failed;
        campaign.updated_at = Utc::now();
        Ok(())
    }

    async fn due_scheduled(&self, now: DateTime<Utc>) -> CampaignResult<Vec<Campaign>> {
        let campaigns = self.campaigns.read().await;
        Ok(campaigns
            .values()
            .filter(|c| {
                c.status == CampaignStatus::Scheduled
                    && c.scheduled_at.is_some_and(|at| at <= now)
            })
            .cloned()
            .collect())
    }

    async fn update_progress(
        &self,
        id: Uuid,
        sent_count: i32,
        failed_count: i32,
    ) -> CampaignResult<()> {
        let mut campaigns = self.campaigns.write().await;
        let campaign = campaigns
            .get_mut(&id)
            .ok_or(CampaignError::NotFound(id))?;

        campaign.sent_count = sent_count;
        campaign.failed_count = failed_count;
        campaign.updated_at = Utc::now();
        Ok(())
    }

    async fn finish_send_pass(
        &self,
        id: Uuid,
        sent_count: i32,
        failed_count: i32,
    ) -> CampaignResult<()> {
        let mut campaigns = self.campaigns.write().await;
        let campaign = campaigns
            .get_mut(&id)
            .ok_or(CampaignError::NotFound(id))?;

        campaign.sent_count = sent_count;
        campaign.failed_count = failed_count;
        campaign.status = CampaignStatus::Completed;
        campaign.completed_at = Some(Utc::now());
        campaign.updated_at = Utc::now();
        Ok(())
    }

    async fn increment_opened(&self, id: Uuid) -> CampaignResult<()> {
        let mut campaigns = self.campaigns.write().await;
        let campaign = campaigns
            .get_mut(&id)
            .ok_or(CampaignError::NotFound(id))?;

        campaign.opened_count += 1;
        campaign.updated_at = Utc::now();
        Ok(())
    }

    async fn increment_clicked(&self, id: Uuid) -> CampaignResult<()> {
        let mut campaigns = self.campaigns.write().await;
        let campaign = campaigns
            .get_mut(&id)
            .ok_or(CampaignError::NotFound(id))?;

        campaign.clicked_count += 1;
        campaign.updated_at = Utc::now();
        Ok(())
    }

    async fn add_recipient(
        &self,
        campaign_id: Uuid,
        input: CreateRecipient,
    ) -> CampaignResult<Recipient> {
        let mut campaigns = self.campaigns.write().await;
        let campaign = campaigns
            .get_mut(&campaign_id)
            .ok_or(CampaignError::NotFound(campaign_id))?;

        let recipient = Recipient::new(campaign_id, input);
        let mut recipients = self.recipients.write().await;
        recipients.insert(recipient.id, recipient.clone());

        campaign.total_recipients += 1;
        campaign.updated_at = Utc::now();
        Ok(recipient)
    }

    async fn get_recipient(&self, id: Uuid) -> CampaignResult<Option<Recipient>> {
        let recipients = self.recipients.read().await;
        Ok(recipients.get(&id).cloned())
    }

    async fn list_recipients(
        &self,
        campaign_id: Uuid,
        filter: RecipientFilter,
    ) -> CampaignResult<Vec<Recipient>> {
        let recipients = self.recipients.read().await;

        let mut result: Vec<Recipient> = recipients
            .values()
            .filter(|r| r.campaign_id == campaign_id)
            .filter(|r| match filter.status {
                Some(status) => r.status == status,
                None => true,
            })
            .cloned()
            .collect();

        result.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        Ok(result
            .into_iter()
            .skip(filter.offset)
            .take(filter.limit)
            .collect())
    }

    async fn pending_recipients(
        &self,
        campaign_id: Uuid,
        now: DateTime<Utc>,
    ) -> CampaignResult<Vec<Recipient>> {
        let recipients = self.recipients.read().await;

        let mut result: Vec<Recipient> = recipients
            .values()
            .filter(|r| r.campaign_id == campaign_id && r.status == RecipientStatus::Pending)
            .filter(|r| r.next_retry_at.is_none_or(|due| due <= now))
            .cloned()
            .collect();

        result.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        Ok(result)
    }

    async fn recipients_by_emails(
        &self,
        campaign_id: Uuid,
        emails: &[String],
    ) -> CampaignResult<Vec<Recipient>> {
        let wanted: Vec<String> = emails.iter().map(|e| e.to_lowercase()).collect();
        let recipients = self.recipients.read().await;

        let mut result: Vec<Recipient> = recipients
            .values()
            .filter(|r| r.campaign_id == campaign_id && wanted.contains(&r.email))
            .cloned()
            .collect();

        result.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        Ok(result)
    }

    async fn mark_recipient_sent(&self, id: Uuid) -> CampaignResult<()> {
        let mut recipients = self.recipients.write().await;
        let recipient = recipients
            .get_mut(&id)
            .ok_or(CampaignError::RecipientNotFound(id))?;

        recipient.status = RecipientStatus::Sent;
        recipient.sent_at = Some(Utc::now());
        recipient.updated_at = Utc::now();
        Ok(())
    }

    async fn requeue_recipient(
        &self,
        id: Uuid,
        retry_count: i32,
        error_message: &str,
        next_retry_at: DateTime<Utc>,
    ) -> CampaignResult<()> {
        let mut recipients = self.recipients.write().await;
        let recipient = recipients
            .get_mut(&id)
            .ok_or(CampaignError::RecipientNotFound(id))?;

        recipient.status = RecipientStatus::Pending;
        recipient.retry_count = retry_count;
        recipient.error_message = Some(error_message.to_string());
        recipient.next_retry_at = Some(next_retry_at);
        recipient.updated_at = Utc::now();
        Ok(())
    }

    async fn mark_recipient_failed(&self, id: Uuid, error_message: &str) -> CampaignResult<()> {
        let mut recipients = self.recipients.write().await;
        let recipient = recipients
            .get_mut(&id)
            .ok_or(CampaignError::RecipientNotFound(id))?;

        recipient.status = RecipientStatus::Failed;
        recipient.error_message = Some(error_message.to_string());
        recipient.updated_at = Utc::now();
        Ok(())
    }

    async fn mark_recipient_opened(&self, id: Uuid, at: DateTime<Utc>) -> CampaignResult<bool> {
        let mut recipients = self.recipients.write().await;
        match recipients.get_mut(&id) {
            Some(r) if r.opened_at.is_none() => {
                r.opened_at = Some(at);
                r.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_recipient_clicked(&self, id: Uuid, at: DateTime<Utc>) -> CampaignResult<bool> {
        let mut recipients = self.recipients.write().await;
        match recipients.get_mut(&id) {
            Some(r) if r.clicked_at.is_none() => {
                r.clicked_at = Some(at);
                r.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_recipients_unsubscribed(&self, email: &str) -> CampaignResult<Vec<Recipient>> {
        let email = email.to_lowercase();
        let mut recipients = self.recipients.write().await;
        let now = Utc::now();

        let mut affected = Vec::new();
        for recipient in recipients.values_mut() {
            if recipient.email == email
                && matches!(
                    recipient.status,
                    RecipientStatus::Pending | RecipientStatus::Sending
                )
            {
                recipient.status = RecipientStatus::Unsubscribed;
                recipient.unsubscribed_at = Some(now);
                recipient.updated_at = now;
                affected.push(recipient.clone());
            }
        }
        Ok(affected)
    }

    async fn mark_recipients_bounced(
        &self,
        email: &str,
        campaign_id: Option<Uuid>,
        reason: Option<String>,
    ) -> CampaignResult<Vec<Recipient>> {
        let email = email.to_lowercase();
        let mut recipients = self.recipients.write().await;
        let now = Utc::now();

        let mut affected = Vec::new();
        for recipient in recipients.values_mut() {
            if recipient.email == email
                && campaign_id.is_none_or(|id| recipient.campaign_id == id)
                && matches!(
                    recipient.status,
                    RecipientStatus::Pending | RecipientStatus::Sending | RecipientStatus::Sent
                )
            {
                recipient.status = RecipientStatus::Bounced;
                recipient.error_message = reason.clone();
                recipient.updated_at = now;
                affected.push(recipient.clone());
            }
        }
        Ok(affected)
    }

    async fn is_suppressed(&self, email: &str) -> CampaignResult<bool> {
        let suppressions = self.suppressions.read().await;
        Ok(suppressions.contains_key(&email.to_lowercase()))
    }

    async fn insert_suppression(
        &self,
        entry: SuppressionEntry,
    ) -> CampaignResult<SuppressionEntry> {
        let mut suppressions = self.suppressions.write().await;
        if let Some(existing) = suppressions.get(&entry.email) {
            return Ok(existing.clone());
        }

        suppressions.insert(entry.email.clone(), entry.clone());
        Ok(entry)
    }

    async fn log_event(&self, event: NewEmailEvent) -> CampaignResult<EmailLogEntry> {
        let mut logs = self.logs.write().await;
        let entry = EmailLogEntry::from_event(event);
        logs.push(entry.clone());
        Ok(entry)
    }

    async fn recent_failures(
        &self,
        campaign_id: Uuid,
        limit: usize,
    ) -> CampaignResult<Vec<EmailLogEntry>> {
        let logs = self.logs.read().await;

        let mut result: Vec<EmailLogEntry> = logs
            .iter()
            .filter(|l| l.campaign_id == campaign_id && l.event_type == EmailEventType::Failed)
            .cloned()
            .collect();

        result.sort_by(|a, b| (b.timestamp, b.id).cmp(&(a.timestamp, a.id)));
        result.truncate(limit);
        Ok(result)
    }
}
