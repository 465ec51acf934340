use crate::models::{SuppressionEntry, SuppressionSource};
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sea-ORM entity for the global suppression list
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "suppression_list")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    pub source: SuppressionSource,
    pub reason: Option<String>,
    pub campaign_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for SuppressionEntry {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            source: model.source,
            reason: model.reason,
            campaign_id: model.campaign_id,
            created_at: model.created_at.into(),
        }
    }
}

impl From<SuppressionEntry> for ActiveModel {
    fn from(entry: SuppressionEntry) -> Self {
        ActiveModel {
            id: Set(entry.id),
            email: Set(entry.email),
            source: Set(entry.source),
            reason: Set(entry.reason),
            campaign_id: Set(entry.campaign_id),
            created_at: Set(entry.created_at.into()),
        }
    }
}
