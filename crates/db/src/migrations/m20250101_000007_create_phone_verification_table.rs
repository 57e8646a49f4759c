//! Create phone_verification table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PhoneVerification::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PhoneVerification::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PhoneVerification::PhoneNumber)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(ColumnDef::new(PhoneVerification::Code).string_len(6).not_null())
                    .col(
                        ColumnDef::new(PhoneVerification::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PhoneVerification::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PhoneVerification::Verified)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(PhoneVerification::VerifiedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PhoneVerification::Attempts)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_phone_verification_phone_number")
                    .table(PhoneVerification::Table)
                    .col(PhoneVerification::PhoneNumber)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PhoneVerification::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum PhoneVerification {
    Table,
    Id,
    PhoneNumber,
    Code,
    CreatedAt,
    ExpiresAt,
    Verified,
    VerifiedAt,
    Attempts,
}
