//! Create sms_message and sms_delivery tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SmsMessage::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SmsMessage::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SmsMessage::GalleryId).string_len(32).not_null())
                    .col(ColumnDef::new(SmsMessage::SenderId).string_len(32).null())
                    .col(ColumnDef::new(SmsMessage::MessageTemplate).text().not_null())
                    .col(
                        ColumnDef::new(SmsMessage::TotalRecipients)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(SmsMessage::SentCount).integer().not_null().default(0))
                    .col(ColumnDef::new(SmsMessage::FailedCount).integer().not_null().default(0))
                    .col(
                        ColumnDef::new(SmsMessage::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(SmsMessage::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SmsMessage::CompletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sms_message_gallery")
                            .from(SmsMessage::Table, SmsMessage::GalleryId)
                            .to(Gallery::Table, Gallery::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sms_message_sender")
                            .from(SmsMessage::Table, SmsMessage::SenderId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sms_message_gallery_created")
                    .table(SmsMessage::Table)
                    .col(SmsMessage::GalleryId)
                    .col(SmsMessage::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SmsDelivery::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SmsDelivery::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SmsDelivery::MessageId).string_len(32).not_null())
                    .col(ColumnDef::new(SmsDelivery::ClientId).string_len(32).not_null())
                    .col(ColumnDef::new(SmsDelivery::PhoneNumber).string_len(20).not_null())
                    .col(ColumnDef::new(SmsDelivery::RenderedMessage).text().not_null())
                    .col(
                        ColumnDef::new(SmsDelivery::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(SmsDelivery::ProviderMessageId).string_len(100).null())
                    .col(ColumnDef::new(SmsDelivery::ProviderStatus).string_len(50).null())
                    .col(ColumnDef::new(SmsDelivery::ErrorMessage).text().null())
                    .col(ColumnDef::new(SmsDelivery::SentAt).timestamp_with_time_zone().null())
                    .col(
                        ColumnDef::new(SmsDelivery::DeliveredAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(SmsDelivery::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sms_delivery_message")
                            .from(SmsDelivery::Table, SmsDelivery::MessageId)
                            .to(SmsMessage::Table, SmsMessage::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sms_delivery_client")
                            .from(SmsDelivery::Table, SmsDelivery::ClientId)
                            .to(Client::Table, Client::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sms_delivery_message_status")
                    .table(SmsDelivery::Table)
                    .col(SmsDelivery::MessageId)
                    .col(SmsDelivery::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sms_delivery_provider_message_id")
                    .table(SmsDelivery::Table)
                    .col(SmsDelivery::ProviderMessageId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SmsDelivery::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SmsMessage::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum SmsMessage {
    Table,
    Id,
    GalleryId,
    SenderId,
    MessageTemplate,
    TotalRecipients,
    SentCount,
    FailedCount,
    Status,
    CreatedAt,
    CompletedAt,
}

#[derive(Iden)]
enum SmsDelivery {
    Table,
    Id,
    MessageId,
    ClientId,
    PhoneNumber,
    RenderedMessage,
    Status,
    ProviderMessageId,
    ProviderStatus,
    ErrorMessage,
    SentAt,
    DeliveredAt,
    CreatedAt,
}

#[derive(Iden)]
enum Gallery {
    Table,
    Id,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}

#[derive(Iden)]
enum Client {
    Table,
    Id,
}
