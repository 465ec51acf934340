use sea_orm_migration::sea_query::extension::postgres::Type;
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create campaign_status enum
        manager
            .create_type(
                Type::create()
                    .as_enum(CampaignStatus::Enum)
                    .values([
                        CampaignStatus::Draft,
                        CampaignStatus::Scheduled,
                        CampaignStatus::Sending,
                        CampaignStatus::Paused,
                        CampaignStatus::Completed,
                        CampaignStatus::Failed,
                    ])
                    .to_owned(),
            )
            .await?;

        // Create recipient_status enum
        manager
            .create_type(
                Type::create()
                    .as_enum(RecipientStatus::Enum)
                    .values([
                        RecipientStatus::Pending,
                        RecipientStatus::Sending,
                        RecipientStatus::Sent,
                        RecipientStatus::Failed,
                        RecipientStatus::Bounced,
                        RecipientStatus::Unsubscribed,
                    ])
                    .to_owned(),
            )
            .await?;

        // Create email_event_type enum
        manager
            .create_type(
                Type::create()
                    .as_enum(EmailEventType::Enum)
                    .values([
                        EmailEventType::Sent,
                        EmailEventType::Failed,
                        EmailEventType::Opened,
                        EmailEventType::Clicked,
                        EmailEventType::Bounced,
                        EmailEventType::Unsubscribed,
                    ])
                    .to_owned(),
            )
            .await?;

        // Create suppression_source enum
        manager
            .create_type(
                Type::create()
                    .as_enum(SuppressionSource::Enum)
                    .values([
                        SuppressionSource::Unsubscribe,
                        SuppressionSource::Bounce,
                        SuppressionSource::Complaint,
                        SuppressionSource::Manual,
                    ])
                    .to_owned(),
            )
            .await?;

        // Create campaigns table
        manager
            .create_table(
                Table::create()
                    .table(Campaigns::Table)
                    .if_not_exists()
                    .col(pk_uuid(Campaigns::Id))
                    .col(
                        ColumnDef::new(Campaigns::Name)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Campaigns::Subject)
                            .string_len(500)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Campaigns::FromName)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Campaigns::FromEmail)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Campaigns::ReplyTo)
                            .string_len(255)
                            .null(),
                    )
                    .col(text(Campaigns::HtmlContent))
                    .col(integer(Campaigns::BatchSize).default(100))
                    .col(integer(Campaigns::RateLimitPerSecond).default(10))
                    .col(
                        ColumnDef::new(Campaigns::Status)
                            .enumeration(
                                CampaignStatus::Enum,
                                [
                                    CampaignStatus::Draft,
                                    CampaignStatus::Scheduled,
                                    CampaignStatus::Sending,
                                    CampaignStatus::Paused,
                                    CampaignStatus::Completed,
                                    CampaignStatus::Failed,
                                ],
                            )
                            .not_null()
                            .default("draft"),
                    )
                    .col(timestamp_with_time_zone_null(Campaigns::ScheduledAt))
                    .col(timestamp_with_time_zone_null(Campaigns::StartedAt))
                    .col(timestamp_with_time_zone_null(Campaigns::CompletedAt))
                    .col(integer(Campaigns::TotalRecipients).default(0))
                    .col(integer(Campaigns::SentCount).default(0))
                    .col(integer(Campaigns::FailedCount).default(0))
                    .col(integer(Campaigns::OpenedCount).default(0))
                    .col(integer(Campaigns::ClickedCount).default(0))
                    .col(
                        timestamp_with_time_zone(Campaigns::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Campaigns::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Create recipients table
        manager
            .create_table(
                Table::create()
                    .table(Recipients::Table)
                    .if_not_exists()
                    .col(pk_uuid(Recipients::Id))
                    .col(uuid(Recipients::CampaignId))
                    .col(
                        ColumnDef::new(Recipients::Email)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Recipients::FirstName)
                            .string_len(255)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Recipients::LastName)
                            .string_len(255)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Recipients::Company)
                            .string_len(255)
                            .null(),
                    )
                    .col(json(Recipients::CustomData))
                    .col(
                        ColumnDef::new(Recipients::Status)
                            .enumeration(
                                RecipientStatus::Enum,
                                [
                                    RecipientStatus::Pending,
                                    RecipientStatus::Sending,
                                    RecipientStatus::Sent,
                                    RecipientStatus::Failed,
                                    RecipientStatus::Bounced,
                                    RecipientStatus::Unsubscribed,
                                ],
                            )
                            .not_null()
                            .default("pending"),
                    )
                    .col(timestamp_with_time_zone_null(Recipients::SentAt))
                    .col(timestamp_with_time_zone_null(Recipients::OpenedAt))
                    .col(timestamp_with_time_zone_null(Recipients::ClickedAt))
                    .col(timestamp_with_time_zone_null(Recipients::UnsubscribedAt))
                    .col(text_null(Recipients::ErrorMessage))
                    .col(integer(Recipients::RetryCount).default(0))
                    .col(timestamp_with_time_zone_null(Recipients::NextRetryAt))
                    .col(
                        timestamp_with_time_zone(Recipients::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Recipients::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_recipients_campaign_id")
                            .from(Recipients::Table, Recipients::CampaignId)
                            .to(Campaigns::Table, Campaigns::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create email_logs table (no FK: the audit trail outlives campaigns)
        manager
            .create_table(
                Table::create()
                    .table(EmailLogs::Table)
                    .if_not_exists()
                    .col(pk_uuid(EmailLogs::Id))
                    .col(uuid(EmailLogs::CampaignId))
                    .col(uuid(EmailLogs::RecipientId))
                    .col(
                        ColumnDef::new(EmailLogs::Email)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EmailLogs::EventType)
                            .enumeration(
                                EmailEventType::Enum,
                                [
                                    EmailEventType::Sent,
                                    EmailEventType::Failed,
                                    EmailEventType::Opened,
                                    EmailEventType::Clicked,
                                    EmailEventType::Bounced,
                                    EmailEventType::Unsubscribed,
                                ],
                            )
                            .not_null(),
                    )
                    .col(json(EmailLogs::EventData))
                    .col(text_null(EmailLogs::ProviderMessageId))
                    .col(text_null(EmailLogs::ErrorMessage))
                    .col(
                        timestamp_with_time_zone(EmailLogs::Timestamp)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Create suppression_list table
        manager
            .create_table(
                Table::create()
                    .table(SuppressionList::Table)
                    .if_not_exists()
                    .col(pk_uuid(SuppressionList::Id))
                    .col(
                        ColumnDef::new(SuppressionList::Email)
                            .string_len(255)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(SuppressionList::Source)
                            .enumeration(
                                SuppressionSource::Enum,
                                [
                                    SuppressionSource::Unsubscribe,
                                    SuppressionSource::Bounce,
                                    SuppressionSource::Complaint,
                                    SuppressionSource::Manual,
                                ],
                            )
                            .not_null(),
                    )
                    .col(text_null(SuppressionList::Reason))
                    .col(uuid_null(SuppressionList::CampaignId))
                    .col(
                        timestamp_with_time_zone(SuppressionList::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Create indexes
        manager
            .create_index(
                Index::create()
                    .name("idx_campaigns_status")
                    .table(Campaigns::Table)
                    .col(Campaigns::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_campaigns_scheduled_at")
                    .table(Campaigns::Table)
                    .col(Campaigns::ScheduledAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_recipients_campaign_id")
                    .table(Recipients::Table)
                    .col(Recipients::CampaignId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_recipients_status")
                    .table(Recipients::Table)
                    .col(Recipients::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_recipients_email")
                    .table(Recipients::Table)
                    .col(Recipients::Email)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_email_logs_campaign_id")
                    .table(EmailLogs::Table)
                    .col(EmailLogs::CampaignId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_email_logs_event_type")
                    .table(EmailLogs::Table)
                    .col(EmailLogs::EventType)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_email_logs_timestamp")
                    .table(EmailLogs::Table)
                    .col(EmailLogs::Timestamp)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_suppression_list_email")
                    .table(SuppressionList::Table)
                    .col(SuppressionList::Email)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SuppressionList::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(EmailLogs::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Recipients::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Campaigns::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(SuppressionSource::Enum).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(EmailEventType::Enum).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(RecipientStatus::Enum).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(CampaignStatus::Enum).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Campaigns {
    Table,
    Id,
    Name,
    Subject,
    FromName,
    FromEmail,
    ReplyTo,
    HtmlContent,
    BatchSize,
    RateLimitPerSecond,
    Status,
    ScheduledAt,
    StartedAt,
    CompletedAt,
    TotalRecipients,
    SentCount,
    FailedCount,
    OpenedCount,
    ClickedCount,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Recipients {
    Table,
    Id,
    CampaignId,
    Email,
    FirstName,
    LastName,
    Company,
    CustomData,
    Status,
    SentAt,
    OpenedAt,
    ClickedAt,
    UnsubscribedAt,
    ErrorMessage,
    RetryCount,
    NextRetryAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum EmailLogs {
    Table,
    Id,
    CampaignId,
    RecipientId,
    Email,
    EventType,
    EventData,
    ProviderMessageId,
    ErrorMessage,
    Timestamp,
}

#[derive(DeriveIden)]
enum SuppressionList {
    Table,
    Id,
    Email,
    Source,
    Reason,
    CampaignId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum CampaignStatus {
    #[sea_orm(iden = "campaign_status")]
    Enum,
    #[sea_orm(iden = "draft")]
    Draft,
    #[sea_orm(iden = "scheduled")]
    Scheduled,
    #[sea_orm(iden = "sending")]
    Sending,
    #[sea_orm(iden = "paused")]
    Paused,
    #[sea_orm(iden = "completed")]
    Completed,
    #[sea_orm(iden = "failed")]
    Failed,
}

#[derive(DeriveIden)]
enum RecipientStatus {
    #[sea_orm(iden = "recipient_status")]
    Enum,
    #[sea_orm(iden = "pending")]
    Pending,
    #[sea_orm(iden = "sending")]
    Sending,
    #[sea_orm(iden = "sent")]
    Sent,
    #[sea_orm(iden = "failed")]
    Failed,
    #[sea_orm(iden = "bounced")]
    Bounced,
    #[sea_orm(iden = "unsubscribed")]
    Unsubscribed,
}

#[derive(DeriveIden)]
enum EmailEventType {
    #[sea_orm(iden = "email_event_type")]
    Enum,
    #[sea_orm(iden = "sent")]
    Sent,
    #[sea_orm(iden = "failed")]
    Failed,
    #[sea_orm(iden = "opened")]
    Opened,
    #[sea_orm(iden = "clicked")]
    Clicked,
    #[sea_orm(iden = "bounced")]
    Bounced,
    #[sea_orm(iden = "unsubscribed")]
    Unsubscribed,
}

#[derive(DeriveIden)]
enum SuppressionSource {
    #[sea_orm(iden = "suppression_source")]
    Enum,
    #[sea_orm(iden = "unsubscribe")]
    Unsubscribe,
    #[sea_orm(iden = "bounce")]
    Bounce,
    #[sea_orm(iden = "complaint")]
    Complaint,
    #[sea_orm(iden = "manual")]
    Manual,
}
