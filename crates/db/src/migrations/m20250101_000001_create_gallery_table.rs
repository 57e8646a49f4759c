//! Create gallery table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Gallery::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Gallery::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Gallery::Name).string_len(200).not_null().unique_key())
                    .col(ColumnDef::new(Gallery::RegistrationCode).string_len(8).null().unique_key())
                    .col(
                        ColumnDef::new(Gallery::SignupMethod)
                            .string_len(10)
                            .not_null()
                            .default("manual"),
                    )
                    .col(ColumnDef::new(Gallery::VerifiedPhone).string_len(20).null().unique_key())
                    .col(ColumnDef::new(Gallery::PhoneVerifiedAt).timestamp_with_time_zone().null())
                    .col(
                        ColumnDef::new(Gallery::AutoGenerated)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Gallery::Address).text().null())
                    .col(ColumnDef::new(Gallery::Phone).string_len(20).null())
                    .col(ColumnDef::new(Gallery::Email).string_len(254).null())
                    .col(ColumnDef::new(Gallery::Website).string_len(200).null())
                    .col(ColumnDef::new(Gallery::Description).text().null())
                    .col(
                        ColumnDef::new(Gallery::MaxUsers)
                            .integer()
                            .not_null()
                            .default(10),
                    )
                    .col(
                        ColumnDef::new(Gallery::SubscriptionExpiresAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Gallery::IsActive).boolean().not_null().default(true))
                    .col(
                        ColumnDef::new(Gallery::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Gallery::UpdatedAt).timestamp_with_time_zone().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_gallery_is_active")
                    .table(Gallery::Table)
                    .col(Gallery::IsActive)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Gallery::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Gallery {
    Table,
    Id,
    Name,
    RegistrationCode,
    SignupMethod,
    VerifiedPhone,
    PhoneVerifiedAt,
    AutoGenerated,
    Address,
    Phone,
    Email,
    Website,
    Description,
    MaxUsers,
    SubscriptionExpiresAt,
    IsActive,
    CreatedAt,
    UpdatedAt,
}
