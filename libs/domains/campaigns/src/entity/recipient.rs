use crate::models::{Recipient, RecipientStatus};
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sea-ORM entity for the recipients table
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "recipients")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Option<String>,
    #[sea_orm(column_type = "Json")]
    pub custom_data: Json,
    pub status: RecipientStatus,
    pub sent_at: Option<DateTimeWithTimeZone>,
    pub opened_at: Option<DateTimeWithTimeZone>,
    pub clicked_at: Option<DateTimeWithTimeZone>,
    pub unsubscribed_at: Option<DateTimeWithTimeZone>,
    pub error_message: Option<String>,
    pub retry_count: i32,
    pub next_retry_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Recipient {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            campaign_id: model.campaign_id,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            company: model.company,
            custom_data: model.custom_data,
            status: model.status,
            sent_at: model.sent_at.map(Into::into),
            opened_at: model.opened_at.map(Into::into),
            clicked_at: model.clicked_at.map(Into::into),
            unsubscribed_at: model.unsubscribed_at.map(Into::into),
            error_message: model.error_message,
            retry_count: model.retry_count,
            next_retry_at: model.next_retry_at.map(Into::into),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<Recipient> for ActiveModel {
    fn from(recipient: Recipient) -> Self {
        ActiveModel {
            id: Set(recipient.id),
            campaign_id: Set(recipient.campaign_id),
            email: Set(recipient.email),
            first_name: Set(recipient.first_name),
            last_name: Set(recipient.last_name),
            company: Set(recipient.company),
            custom_data: Set(recipient.custom_data),
            status: Set(recipient.status),
            sent_at: Set(recipient.sent_at.map(Into::into)),
            opened_at: Set(recipient.opened_at.map(Into::into)),
            clicked_at: Set(recipient.clicked_at.map(Into::into)),
            unsubscribed_at: Set(recipient.unsubscribed_at.map(Into::into)),
            error_message: Set(recipient.error_message),
            retry_count: Set(recipient.retry_count),
            next_retry_at: Set(recipient.next_retry_at.map(Into::into)),
            created_at: Set(recipient.created_at.into()),
            updated_at: Set(recipient.updated_at.into()),
        }
    }
}
