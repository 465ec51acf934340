use chrono::{DateTime, Utc};
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use strum::Display;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Campaign lifecycle states
///
/// `draft → scheduled → sending → {paused, completed, failed}`; the only
/// backward edges are `paused → sending` (resume) and `paused → draft`
/// (cancelled schedule). `completed` and `failed` are terminal.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    Default,
    DeriveActiveEnum,
    EnumIter,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "campaign_status")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CampaignStatus {
    /// Editable, not yet queued
    #[default]
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "scheduled")]
    Scheduled,
    #[sea_orm(string_value = "sending")]
    Sending,
    #[sea_orm(string_value = "paused")]
    Paused,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "failed")]
    Failed,
}

impl CampaignStatus {
    /// Terminal states cannot be left
    pub fn is_terminal(&self) -> bool {
        matches!(self, CampaignStatus::Completed | CampaignStatus::Failed)
    }

    /// States from which a send pass may start
    pub fn can_start_sending(&self) -> bool {
        matches!(
            self,
            CampaignStatus::Draft | CampaignStatus::Scheduled | CampaignStatus::Paused
        )
    }
}

/// Per-recipient delivery state
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    Default,
    DeriveActiveEnum,
    EnumIter,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "recipient_status")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RecipientStatus {
    /// Waiting for a send pass (or re-queued for retry)
    #[default]
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "sending")]
    Sending,
    #[sea_orm(string_value = "sent")]
    Sent,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "bounced")]
    Bounced,
    #[sea_orm(string_value = "unsubscribed")]
    Unsubscribed,
}

/// Email audit-log event kinds
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    DeriveActiveEnum,
    EnumIter,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "email_event_type")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EmailEventType {
    #[sea_orm(string_value = "sent")]
    Sent,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "opened")]
    Opened,
    #[sea_orm(string_value = "clicked")]
    Clicked,
    #[sea_orm(string_value = "bounced")]
    Bounced,
    #[sea_orm(string_value = "unsubscribed")]
    Unsubscribed,
}

/// How an address ended up on the suppression list
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    DeriveActiveEnum,
    EnumIter,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "suppression_source")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SuppressionSource {
    #[sea_orm(string_value = "unsubscribe")]
    Unsubscribe,
    #[sea_orm(string_value = "bounce")]
    Bounce,
    #[sea_orm(string_value = "complaint")]
    Complaint,
    #[sea_orm(string_value = "manual")]
    Manual,
}

/// Campaign entity - one email blast plus its aggregate send state
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Campaign {
    /// Unique identifier
    pub id: Uuid,
    /// Campaign name
    pub name: String,
    /// Email subject line
    pub subject: String,
    /// Sender display name
    pub from_name: String,
    /// Sender address
    pub from_email: String,
    /// Reply-To address (defaults to from_email)
    pub reply_to: Option<String>,
    /// HTML body with `{{placeholder}}` variables
    pub html_content: String,
    /// Messages per delivery chunk
    pub batch_size: i32,
    /// Paced sends per second
    pub rate_limit_per_second: i32,
    /// Lifecycle state
    pub status: CampaignStatus,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub total_recipients: i32,
    pub sent_count: i32,
    pub failed_count: i32,
    pub opened_count: i32,
    pub clicked_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Recipient entity - one target address bound to one campaign
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Recipient {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Option<String>,
    /// Free-form personalization values merged into template data
    pub custom_data: serde_json::Value,
    pub status: RecipientStatus,
    pub sent_at: Option<DateTime<Utc>>,
    pub opened_at: Option<DateTime<Utc>>,
    pub clicked_at: Option<DateTime<Utc>>,
    pub unsubscribed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    /// Delivery attempts that have failed so far
    pub retry_count: i32,
    /// Backoff due-time; retry selection skips recipients whose due-time
    /// has not elapsed
    pub next_retry_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Append-only email event row
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EmailLogEntry {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub recipient_id: Uuid,
    pub email: String,
    pub event_type: EmailEventType,
    pub event_data: serde_json::Value,
    pub provider_message_id: Option<String>,
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Global suppression entry, keyed by lowercased email
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SuppressionEntry {
    pub id: Uuid,
    pub email: String,
    pub source: SuppressionSource,
    pub reason: Option<String>,
    /// Campaign the unsubscribe/bounce originated from, when known
    pub campaign_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// DTO for creating a new campaign (always starts in `draft`)
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCampaign {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 500))]
    pub subject: String,
    #[validate(length(min = 1, max = 255))]
    pub from_name: String,
    #[validate(email)]
    pub from_email: String,
    #[validate(email)]
    pub reply_to: Option<String>,
    #[validate(length(min = 1))]
    pub html_content: String,
    #[serde(default = "default_batch_size")]
    #[validate(range(min = 1, max = 1000))]
    pub batch_size: i32,
    #[serde(default = "default_rate_limit")]
    #[validate(range(min = 1, max = 100))]
    pub rate_limit_per_second: i32,
}

fn default_batch_size() -> i32 {
    100
}

fn default_rate_limit() -> i32 {
    10
}

/// DTO for updating a campaign's draft-editable fields
#[derive(Debug, Clone, Deserialize, Validate, ToSchema, Default)]
pub struct UpdateCampaign {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub subject: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub from_name: Option<String>,
    #[validate(email)]
    pub from_email: Option<String>,
    #[validate(email)]
    pub reply_to: Option<String>,
    #[validate(length(min = 1))]
    pub html_content: Option<String>,
    #[validate(range(min = 1, max = 1000))]
    pub batch_size: Option<i32>,
    #[validate(range(min = 1, max = 100))]
    pub rate_limit_per_second: Option<i32>,
}

/// DTO for adding a recipient to a campaign
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateRecipient {
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 255))]
    pub first_name: Option<String>,
    #[validate(length(max = 255))]
    pub last_name: Option<String>,
    #[validate(length(max = 255))]
    pub company: Option<String>,
    #[serde(default = "empty_object")]
    pub custom_data: serde_json::Value,
}

/// Query filters for listing campaigns
#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct CampaignFilter {
    pub status: Option<CampaignStatus>,
    #[serde(default = "default_campaign_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

impl Default for CampaignFilter {
    fn default() -> Self {
        Self {
            status: None,
            limit: default_campaign_limit(),
            offset: 0,
        }
    }
}

fn default_campaign_limit() -> usize {
    50
}

/// Query filters for listing a campaign's recipients
#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct RecipientFilter {
    pub status: Option<RecipientStatus>,
    #[serde(default = "default_recipient_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

impl Default for RecipientFilter {
    fn default() -> Self {
        Self {
            status: None,
            limit: default_recipient_limit(),
            offset: 0,
        }
    }
}

fn default_recipient_limit() -> usize {
    100
}

/// Request body for `POST /campaigns/{id}/send`
#[derive(Debug, Clone, Deserialize, ToSchema, Default)]
pub struct SendRequest {
    /// Restrict the pass to `test_emails` without touching pending state
    #[serde(default)]
    pub test_mode: bool,
    pub test_emails: Option<Vec<String>>,
}

/// Accepted response for an asynchronous send
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SendAccepted {
    pub message: String,
    pub campaign_id: Uuid,
    pub test_mode: bool,
}

/// Request body for scheduling a campaign
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ScheduleRequest {
    pub scheduled_at: DateTime<Utc>,
}

/// Response for schedule operations
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScheduleResponse {
    pub campaign_id: Uuid,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub status: CampaignStatus,
    pub message: String,
}

/// One recent delivery failure, surfaced in progress reports
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DeliveryError {
    pub email: String,
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Live progress of a sending campaign
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CampaignProgress {
    pub campaign_id: Uuid,
    pub status: CampaignStatus,
    pub total_recipients: i32,
    pub sent_count: i32,
    pub failed_count: i32,
    pub remaining: i32,
    pub progress_percentage: f64,
    pub recent_errors: Vec<DeliveryError>,
}

/// Public unsubscribe request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UnsubscribeRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 1000))]
    pub reason: Option<String>,
    pub campaign_id: Option<Uuid>,
}

/// One provider-side delivery event (bounce webhook payload item)
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ProviderEvent {
    pub email: String,
    /// Provider event name, e.g. `bounce`, `dropped`, `spam_report`
    pub event: String,
    pub campaign_id: Option<Uuid>,
    pub reason: Option<String>,
}

/// Acknowledgement for a webhook event batch
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WebhookAck {
    pub processed: usize,
    pub ignored: usize,
}

/// New email-log row, before persistence assigns id and timestamp
#[derive(Debug, Clone)]
pub struct NewEmailEvent {
    pub campaign_id: Uuid,
    pub recipient_id: Uuid,
    pub email: String,
    pub event_type: EmailEventType,
    pub event_data: serde_json::Value,
    pub provider_message_id: Option<String>,
    pub error_message: Option<String>,
}

impl NewEmailEvent {
    pub fn new(
        campaign_id: Uuid,
        recipient_id: Uuid,
        email: impl Into<String>,
        event_type: EmailEventType,
    ) -> Self {
        Self {
            campaign_id,
            recipient_id,
            email: email.into(),
            event_type,
            event_data: empty_object(),
            provider_message_id: None,
            error_message: None,
        }
    }

    pub fn with_provider_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.provider_message_id = Some(message_id.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error_message = Some(error.into());
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.event_data = data;
        self
    }
}

impl Campaign {
    /// Construct a new draft campaign from a validated create payload
    pub fn new(input: CreateCampaign) -> Self {
        let now = Utc::now();
        let reply_to = input.reply_to.or_else(|| Some(input.from_email.clone()));
        Self {
            id: Uuid::now_v7(),
            name: input.name,
            subject: input.subject,
            from_name: input.from_name,
            from_email: input.from_email,
            reply_to,
            html_content: input.html_content,
            batch_size: input.batch_size,
            rate_limit_per_second: input.rate_limit_per_second,
            status: CampaignStatus::Draft,
            scheduled_at: None,
            started_at: None,
            completed_at: None,
            total_recipients: 0,
            sent_count: 0,
            failed_count: 0,
            opened_count: 0,
            clicked_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply updates from UpdateCampaign DTO
    pub fn apply_update(&mut self, update: UpdateCampaign) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(subject) = update.subject {
            self.subject = subject;
        }
        if let Some(from_name) = update.from_name {
            self.from_name = from_name;
        }
        if let Some(from_email) = update.from_email {
            self.from_email = from_email;
        }
        if let Some(reply_to) = update.reply_to {
            self.reply_to = Some(reply_to);
        }
        if let Some(html_content) = update.html_content {
            self.html_content = html_content;
        }
        if let Some(batch_size) = update.batch_size {
            self.batch_size = batch_size;
        }
        if let Some(rate_limit) = update.rate_limit_per_second {
            self.rate_limit_per_second = rate_limit;
        }
        self.updated_at = Utc::now();
    }
}

impl Recipient {
    /// Construct a new pending recipient, email normalized to lowercase
    pub fn new(campaign_id: Uuid, input: CreateRecipient) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            campaign_id,
            email: input.email.to_lowercase(),
            first_name: input.first_name,
            last_name: input.last_name,
            company: input.company,
            custom_data: input.custom_data,
            status: RecipientStatus::Pending,
            sent_at: None,
            opened_at: None,
            clicked_at: None,
            unsubscribed_at: None,
            error_message: None,
            retry_count: 0,
            next_retry_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl SuppressionEntry {
    pub fn new(
        email: impl Into<String>,
        source: SuppressionSource,
        reason: Option<String>,
        campaign_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            email: email.into().to_lowercase(),
            source,
            reason,
            campaign_id,
            created_at: Utc::now(),
        }
    }
}

impl EmailLogEntry {
    pub fn from_event(event: NewEmailEvent) -> Self {
        Self {
            id: Uuid::now_v7(),
            campaign_id: event.campaign_id,
            recipient_id: event.recipient_id,
            email: event.email,
            event_type: event.event_type,
            event_data: event.event_data,
            provider_message_id: event.provider_message_id,
            error_message: event.error_message,
            timestamp: Utc::now(),
        }
    }
}
