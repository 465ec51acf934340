use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::sea_query::{Expr, ExprTrait};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use uuid::Uuid;

use crate::entity::{campaign, email_log, recipient, suppression};
use crate::error::{CampaignError, CampaignResult};
use crate::models::{
    Campaign, CampaignFilter, CampaignStatus, CreateCampaign, CreateRecipient, EmailEventType,
    EmailLogEntry, NewEmailEvent, Recipient, RecipientFilter, RecipientStatus, SuppressionEntry,
    UpdateCampaign,
};
use crate::repository::CampaignRepository;

pub struct PgCampaignRepository {
    db: DatabaseConnection,
}

impl PgCampaignRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CampaignRepository for PgCampaignRepository {
    async fn create_campaign(&self, input: CreateCampaign) -> CampaignResult<Campaign> {
        let active: campaign::ActiveModel = Campaign::new(input).into();
        let model = active.insert(&self.db).await?;

        tracing::info!(campaign_id = %model.id, "Created campaign");
        Ok(model.into())
    }

    async fn get_campaign(&self, id: Uuid) -> CampaignResult<Option<Campaign>> {
        let model = campaign::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Into::into))
    }

    async fn list_campaigns(&self, filter: CampaignFilter) -> CampaignResult<Vec<Campaign>> {
        let mut query = campaign::Entity::find();

        if let Some(status) = filter.status {
            query = query.filter(campaign::Column::Status.eq(status));
        }

        let models = query
            .order_by_desc(campaign::Column::CreatedAt)
            .limit(filter.limit as u64)
            .offset(filter.offset as u64)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn update_campaign(&self, id: Uuid, input: UpdateCampaign) -> CampaignResult<Campaign> {
        let model = campaign::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(CampaignError::NotFound(id))?;

        let mut existing: Campaign = model.into();
        existing.apply_update(input);

        let active: campaign::ActiveModel = existing.into();
        let updated = active.update(&self.db).await?;

        tracing::info!(campaign_id = %id, "Updated campaign");
        Ok(updated.into())
    }

    async fn delete_campaign(&self, id: Uuid) -> CampaignResult<bool> {
        recipient::Entity::delete_many()
            .filter(recipient::Column::CampaignId.eq(id))
            .exec(&self.db)
            .await?;

        let result = campaign::Entity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected > 0 {
            tracing::info!(campaign_id = %id, "Deleted campaign");
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn begin_sending(&self, id: Uuid) -> CampaignResult<bool> {
        let now = Utc::now();
        let result = campaign::Entity::update_many()
            .set(campaign::ActiveModel {
                status: Set(CampaignStatus::Sending),
                started_at: Set(Some(now.into())),
                updated_at: Set(now.into()),
                ..Default::default()
            })
            .filter(campaign::Column::Id.eq(id))
            .filter(campaign::Column::Status.is_in([
                CampaignStatus::Draft,
                CampaignStatus::Scheduled,
                CampaignStatus::Paused,
            ]))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    async fn mark_paused(&self, id: Uuid) -> CampaignResult<bool> {
        let result = campaign::Entity::update_many()
            .set(campaign::ActiveModel {
                status: Set(CampaignStatus::Paused),
                updated_at: Set(Utc::now().into()),
                ..Default::default()
            })
            .filter(campaign::Column::Id.eq(id))
            .filter(campaign::Column::Status.eq(CampaignStatus::Sending))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    async fn schedule_campaign(&self, id: Uuid, at: DateTime<Utc>) -> CampaignResult<bool> {
        let result = campaign::Entity::update_many()
            .set(campaign::ActiveModel {
                status: Set(CampaignStatus::Scheduled),
                scheduled_at: Set(Some(at.into())),
                updated_at: Set(Utc::now().into()),
                ..Default::default()
            })
            .filter(campaign::Column::Id.eq(id))
            .filter(
                campaign::Column::Status
                    .is_in([CampaignStatus::Draft, CampaignStatus::Paused]),
            )
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    async fn cancel_schedule(&self, id: Uuid) -> CampaignResult<bool> {
        let result = campaign::Entity::update_many()
            .set(campaign::ActiveModel {
                status: Set(CampaignStatus::Draft),
                scheduled_at: Set(None),
                updated_at: Set(Utc::now().into()),
                ..Default::default()
            })
            .filter(campaign::Column::Id.eq(id))
            .filter(campaign::Column::Status.eq(CampaignStatus::Scheduled))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    async fn mark_completed(&self, id: Uuid) -> CampaignResult<()> {
        let now = Utc::now();
        let result = campaign::Entity::update_many()
            .set(campaign::ActiveModel {
                status: Set(CampaignStatus::Completed),
                completed_at: Set(Some(now.into())),
                updated_at: Set(now.into()),
                ..Default::default()
            })
            .filter(campaign::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(CampaignError::NotFound(id));
        }
        Ok(())
    }

    async fn mark_failed(&self, id: Uuid) -> CampaignResult<()> {
        let result = campaign::Entity::update_many()
            .set(campaign::ActiveModel {
                status: Set(CampaignStatus::Failed),
                updated_at: Set(Utc::now().into()),
                ..Default::default()
            })
            .filter(campaign::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(CampaignError::NotFound(id));
        }
        Ok(())
    }

    async fn due_scheduled(&self, now: DateTime<Utc>) -> CampaignResult<Vec<Campaign>> {
        let models = campaign::Entity::find()
            .filter(campaign::Column::Status.eq(CampaignStatus::Scheduled))
            .filter(campaign::Column::ScheduledAt.lte(now))
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn update_progress(
        &self,
        id: Uuid,
        sent_count: i32,
        failed_count: i32,
    ) -> CampaignResult<()> {
        let result = campaign::Entity::update_many()
            .set(campaign::ActiveModel {
                sent_count: Set(sent_count),
                failed_count: Set(failed_count),
                updated_at: Set(Utc::now().into()),
                ..Default::default()
            })
            .filter(campaign::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(CampaignError::NotFound(id));
        }
        Ok(())
    }

    async fn finish_send_pass(
        &self,
        id: Uuid,
        sent_count: i32,
        failed_count: i32,
    ) -> CampaignResult<()> {
        let now = Utc::now();
        let result = campaign::Entity::update_many()
            .set(campaign::ActiveModel {
                sent_count: Set(sent_count),
                failed_count: Set(failed_count),
                status: Set(CampaignStatus::Completed),
                completed_at: Set(Some(now.into())),
                updated_at: Set(now.into()),
                ..Default::default()
            })
            .filter(campaign::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(CampaignError::NotFound(id));
        }
        Ok(())
    }

    async fn increment_opened(&self, id: Uuid) -> CampaignResult<()> {
        campaign::Entity::update_many()
            .col_expr(
                campaign::Column::OpenedCount,
                Expr::col(campaign::Column::OpenedCount).add(1),
            )
            .filter(campaign::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn increment_clicked(&self, id: Uuid) -> CampaignResult<()> {
        campaign::Entity::update_many()
            .col_expr(
                campaign::Column::ClickedCount,
                Expr::col(campaign::Column::ClickedCount).add(1),
            )
            .filter(campaign::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn add_recipient(
        &self,
        campaign_id: Uuid,
        input: CreateRecipient,
    ) -> CampaignResult<Recipient> {
        campaign::Entity::find_by_id(campaign_id)
            .one(&self.db)
            .await?
            .ok_or(CampaignError::NotFound(campaign_id))?;

        let active: recipient::ActiveModel = Recipient::new(campaign_id, input).into();
        let model = active.insert(&self.db).await?;

        campaign::Entity::update_many()
            .col_expr(
                campaign::Column::TotalRecipients,
                Expr::col(campaign::Column::TotalRecipients).add(1),
            )
            .filter(campaign::Column::Id.eq(campaign_id))
            .exec(&self.db)
            .await?;

        Ok(model.into())
    }

    async fn get_recipient(&self, id: Uuid) -> CampaignResult<Option<Recipient>> {
        let model = recipient::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Into::into))
    }

    async fn list_recipients(
        &self,
        campaign_id: Uuid,
        filter: RecipientFilter,
    ) -> CampaignResult<Vec<Recipient>> {
        let mut query =
            recipient::Entity::find().filter(recipient::Column::CampaignId.eq(campaign_id));

        if let Some(status) = filter.status {
            query = query.filter(recipient::Column::Status.eq(status));
        }

        let models = query
            .order_by_desc(recipient::Column::CreatedAt)
            .limit(filter.limit as u64)
            .offset(filter.offset as u64)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn pending_recipients(
        &self,
        campaign_id: Uuid,
        now: DateTime<Utc>,
    ) -> CampaignResult<Vec<Recipient>> {
        let models = recipient::Entity::find()
            .filter(recipient::Column::CampaignId.eq(campaign_id))
            .filter(recipient::Column::Status.eq(RecipientStatus::Pending))
            .filter(
                Condition::any()
                    .add(recipient::Column::NextRetryAt.is_null())
                    .add(recipient::Column::NextRetryAt.lte(now)),
            )
            .order_by_asc(recipient::Column::CreatedAt)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn recipients_by_emails(
        &self,
        campaign_id: Uuid,
        emails: &[String],
    ) -> CampaignResult<Vec<Recipient>> {
        let wanted: Vec<String> = emails.iter().map(|e| e.to_lowercase()).collect();

        let models = recipient::Entity::find()
            .filter(recipient::Column::CampaignId.eq(campaign_id))
            .filter(recipient::Column::Email.is_in(wanted))
            .order_by_asc(recipient::Column::CreatedAt)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn mark_recipient_sent(&self, id: Uuid) -> CampaignResult<()> {
        let now = Utc::now();
        let result = recipient::Entity::update_many()
            .set(recipient::ActiveModel {
                status: Set(RecipientStatus::Sent),
                sent_at: Set(Some(now.into())),
                updated_at: Set(now.into()),
                ..Default::default()
            })
            .filter(recipient::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(CampaignError::RecipientNotFound(id));
        }
        Ok(())
    }

    async fn requeue_recipient(
        &self,
        id: Uuid,
        retry_count: i32,
        error_message: &str,
        next_retry_at: DateTime<Utc>,
    ) -> CampaignResult<()> {
        let result = recipient::Entity::update_many()
            .set(recipient::ActiveModel {
                status: Set(RecipientStatus::Pending),
                retry_count: Set(retry_count),
                error_message: Set(Some(error_message.to_string())),
                next_retry_at: Set(Some(next_retry_at.into())),
                updated_at: Set(Utc::now().into()),
                ..Default::default()
            })
            .filter(recipient::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(CampaignError::RecipientNotFound(id));
        }
        Ok(())
    }

    async fn mark_recipient_failed(&self, id: Uuid, error_message: &str) -> CampaignResult<()> {
        let result = recipient::Entity::update_many()
            .set(recipient::ActiveModel {
                status: Set(RecipientStatus::Failed),
                error_message: Set(Some(error_message.to_string())),
                updated_at: Set(Utc::now().into()),
                ..Default::default()
            })
            .filter(recipient::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(CampaignError::RecipientNotFound(id));
        }
        Ok(())
    }

    async fn mark_recipient_opened(&self, id: Uuid, at: DateTime<Utc>) -> CampaignResult<bool> {
        let result = recipient::Entity::update_many()
            .set(recipient::ActiveModel {
                opened_at: Set(Some(at.into())),
                updated_at: Set(Utc::now().into()),
                ..Default::default()
            })
            .filter(recipient::Column::Id.eq(id))
            .filter(recipient::Column::OpenedAt.is_null())
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    async fn mark_recipient_clicked(&self, id: Uuid, at: DateTime<Utc>) -> CampaignResult<bool> {
        let result = recipient::Entity::update_many()
            .set(recipient::ActiveModel {
                clicked_at: Set(Some(at.into())),
                updated_at: Set(Utc::now().into()),
                ..Default::default()
            })
            .filter(recipient::Column::Id.eq(id))
            .filter(recipient::Column::ClickedAt.is_null())
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    async fn mark_recipients_unsubscribed(&self, email: &str) -> CampaignResult<Vec<Recipient>> {
        let targets = recipient::Entity::find()
            .filter(recipient::Column::Email.eq(email.to_lowercase()))
            .filter(
                recipient::Column::Status
                    .is_in([RecipientStatus::Pending, RecipientStatus::Sending]),
            )
            .all(&self.db)
            .await?;

        if targets.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = targets.iter().map(|m| m.id).collect();
        let now = Utc::now();
        recipient::Entity::update_many()
            .set(recipient::ActiveModel {
                status: Set(RecipientStatus::Unsubscribed),
                unsubscribed_at: Set(Some(now.into())),
                updated_at: Set(now.into()),
                ..Default::default()
            })
            .filter(recipient::Column::Id.is_in(ids.clone()))
            .exec(&self.db)
            .await?;

        let updated = recipient::Entity::find()
            .filter(recipient::Column::Id.is_in(ids))
            .all(&self.db)
            .await?;
        Ok(updated.into_iter().map(Into::into).collect())
    }

    async fn mark_recipients_bounced(
        &self,
        email: &str,
        campaign_id: Option<Uuid>,
        reason: Option<String>,
    ) -> CampaignResult<Vec<Recipient>> {
        let mut query = recipient::Entity::find()
            .filter(recipient::Column::Email.eq(email.to_lowercase()))
            .filter(recipient::Column::Status.is_in([
                RecipientStatus::Pending,
                RecipientStatus::Sending,
                RecipientStatus::Sent,
            ]));
        if let Some(campaign_id) = campaign_id {
            query = query.filter(recipient::Column::CampaignId.eq(campaign_id));
        }
        let targets = query.all(&self.db).await?;

        if targets.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = targets.iter().map(|m| m.id).collect();
        recipient::Entity::update_many()
            .set(recipient::ActiveModel {
                status: Set(RecipientStatus::Bounced),
                error_message: Set(reason),
                updated_at: Set(Utc::now().into()),
                ..Default::default()
            })
            .filter(recipient::Column::Id.is_in(ids.clone()))
            .exec(&self.db)
            .await?;

        let updated = recipient::Entity::find()
            .filter(recipient::Column::Id.is_in(ids))
            .all(&self.db)
            .await?;
        Ok(updated.into_iter().map(Into::into).collect())
    }

    async fn is_suppressed(&self, email: &str) -> CampaignResult<bool> {
        let existing = suppression::Entity::find()
            .filter(suppression::Column::Email.eq(email.to_lowercase()))
            .one(&self.db)
            .await?;
        Ok(existing.is_some())
    }

    async fn insert_suppression(
        &self,
        entry: SuppressionEntry,
    ) -> CampaignResult<SuppressionEntry> {
        let existing = suppression::Entity::find()
            .filter(suppression::Column::Email.eq(entry.email.clone()))
            .one(&self.db)
            .await?;
        if let Some(model) = existing {
            return Ok(model.into());
        }

        let active: suppression::ActiveModel = entry.into();
        let model = active.insert(&self.db).await?;

        tracing::info!(email = %model.email, "Added suppression entry");
        Ok(model.into())
    }

    async fn log_event(&self, event: NewEmailEvent) -> CampaignResult<EmailLogEntry> {
        let active: email_log::ActiveModel = EmailLogEntry::from_event(event).into();
        let model = active.insert(&self.db).await?;
        Ok(model.into())
    }

    async fn recent_failures(
        &self,
        campaign_id: Uuid,
        limit: usize,
    ) -> CampaignResult<Vec<EmailLogEntry>> {
        let models = email_log::Entity::find()
            .filter(email_log::Column::CampaignId.eq(campaign_id))
            .filter(email_log::Column::EventType.eq(EmailEventType::Failed))
            .order_by_desc(email_log::Column::Timestamp)
            .limit(limit as u64)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }
}
