use crate::models::{EmailEventType, EmailLogEntry};
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sea-ORM entity for the append-only email_logs table
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "email_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub recipient_id: Uuid,
    pub email: String,
    pub event_type: EmailEventType,
    #[sea_orm(column_type = "Json")]
    pub event_data: Json,
    pub provider_message_id: Option<String>,
    pub error_message: Option<String>,
    pub timestamp: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for EmailLogEntry {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            campaign_id: model.campaign_id,
            recipient_id: model.recipient_id,
            email: model.email,
            event_type: model.event_type,
            event_data: model.event_data,
            provider_message_id: model.provider_message_id,
            error_message: model.error_message,
            timestamp: model.timestamp.into(),
        }
    }
}

impl From<EmailLogEntry> for ActiveModel {
    fn from(entry: EmailLogEntry) -> Self {
        ActiveModel {
            id: Set(entry.id),
            campaign_id: Set(entry.campaign_id),
            recipient_id: Set(entry.recipient_id),
            email: Set(entry.email),
            event_type: Set(entry.event_type),
            event_data: Set(entry.event_data),
            provider_message_id: Set(entry.provider_message_id),
            error_message: Set(entry.error_message),
            timestamp: Set(entry.timestamp.into()),
        }
    }
}
