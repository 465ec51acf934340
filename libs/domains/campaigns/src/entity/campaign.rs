use crate::models::{Campaign, CampaignStatus};
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sea-ORM entity for the campaigns table
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "campaigns")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub subject: String,
    pub from_name: String,
    pub from_email: String,
    pub reply_to: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub html_content: String,
    pub batch_size: i32,
    pub rate_limit_per_second: i32,
    pub status: CampaignStatus,
    pub scheduled_at: Option<DateTimeWithTimeZone>,
    pub started_at: Option<DateTimeWithTimeZone>,
    pub completed_at: Option<DateTimeWithTimeZone>,
    pub total_recipients: i32,
    pub sent_count: i32,
    pub failed_count: i32,
    pub opened_count: i32,
    pub clicked_count: i32,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Campaign {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            subject: model.subject,
            from_name: model.from_name,
            from_email: model.from_email,
            reply_to: model.reply_to,
            html_content: model.html_content,
            batch_size: model.batch_size,
            rate_limit_per_second: model.rate_limit_per_second,
            status: model.status,
            scheduled_at: model.scheduled_at.map(Into::into),
            started_at: model.started_at.map(Into::into),
            completed_at: model.completed_at.map(Into::into),
            total_recipients: model.total_recipients,
            sent_count: model.sent_count,
            failed_count: model.failed_count,
            opened_count: model.opened_count,
            clicked_count: model.clicked_count,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<Campaign> for ActiveModel {
    fn from(campaign: Campaign) -> Self {
        ActiveModel {
            id: Set(campaign.id),
            name: Set(campaign.name),
            subject: Set(campaign.subject),
            from_name: Set(campaign.from_name),
            from_email: Set(campaign.from_email),
            reply_to: Set(campaign.reply_to),
            html_content: Set(campaign.html_content),
            batch_size: Set(campaign.batch_size),
            rate_limit_per_second: Set(campaign.rate_limit_per_second),
            status: Set(campaign.status),
            scheduled_at: Set(campaign.scheduled_at.map(Into::into)),
            started_at: Set(campaign.started_at.map(Into::into)),
            completed_at: Set(campaign.completed_at.map(Into::into)),
            total_recipients: Set(campaign.total_recipients),
            sent_count: Set(campaign.sent_count),
            failed_count: Set(campaign.failed_count),
            opened_count: Set(campaign.opened_count),
            clicked_count: Set(campaign.clicked_count),
            created_at: Set(campaign.created_at.into()),
            updated_at: Set(campaign.updated_at.into()),
        }
    }
}
