//! Create user and login_history tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(User::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(User::GalleryId).string_len(32).null())
                    .col(ColumnDef::new(User::Username).string_len(150).not_null().unique_key())
                    .col(ColumnDef::new(User::Email).string_len(254).not_null().unique_key())
                    .col(ColumnDef::new(User::PasswordHash).string_len(256).not_null())
                    .col(ColumnDef::new(User::FirstName).string_len(150).not_null().default(""))
                    .col(ColumnDef::new(User::LastName).string_len(150).not_null().default(""))
                    .col(ColumnDef::new(User::Phone).string_len(20).null())
                    .col(ColumnDef::new(User::EmergencyContact).string_len(20).null())
                    .col(ColumnDef::new(User::JobTitle).string_len(100).null())
                    .col(ColumnDef::new(User::Role).string_len(20).not_null().default("staff"))
                    .col(ColumnDef::new(User::CanManageClients).boolean().not_null().default(true))
                    .col(ColumnDef::new(User::CanManageArtworks).boolean().not_null().default(true))
                    .col(ColumnDef::new(User::CanExportData).boolean().not_null().default(false))
                    .col(ColumnDef::new(User::CanSendMessages).boolean().not_null().default(false))
                    .col(ColumnDef::new(User::CanViewReports).boolean().not_null().default(false))
                    .col(ColumnDef::new(User::CanManageUsers).boolean().not_null().default(false))
                    .col(
                        ColumnDef::new(User::CanManageGallerySettings)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(User::IsActive).boolean().not_null().default(true))
                    .col(ColumnDef::new(User::IsStaff).boolean().not_null().default(false))
                    .col(ColumnDef::new(User::IsSuperuser).boolean().not_null().default(false))
                    .col(ColumnDef::new(User::EmailVerified).boolean().not_null().default(false))
                    .col(
                        ColumnDef::new(User::FailedLoginAttempts)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(User::AccountLockedUntil).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(User::LastLogin).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(User::LastLoginIp).string_len(45).null())
                    .col(ColumnDef::new(User::PasswordChangedAt).timestamp_with_time_zone().null())
                    .col(
                        ColumnDef::new(User::TimezoneSetting)
                            .string_len(50)
                            .not_null()
                            .default("Asia/Seoul"),
                    )
                    .col(ColumnDef::new(User::Language).string_len(10).not_null().default("ko"))
                    .col(
                        ColumnDef::new(User::ThemePreference)
                            .string_len(10)
                            .not_null()
                            .default("light"),
                    )
                    .col(ColumnDef::new(User::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(User::UpdatedAt).timestamp_with_time_zone().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_gallery")
                            .from(User::Table, User::GalleryId)
                            .to(Gallery::Table, Gallery::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_user_gallery_role")
                    .table(User::Table)
                    .col(User::GalleryId)
                    .col(User::Role)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LoginHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LoginHistory::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LoginHistory::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(LoginHistory::IpAddress).string_len(45).not_null())
                    .col(ColumnDef::new(LoginHistory::UserAgent).text().not_null())
                    .col(
                        ColumnDef::new(LoginHistory::LoginTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LoginHistory::LogoutTime)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(LoginHistory::SessionDurationSecs).big_integer().null())
                    .col(
                        ColumnDef::new(LoginHistory::DeviceType)
                            .string_len(20)
                            .not_null()
                            .default("unknown"),
                    )
                    .col(ColumnDef::new(LoginHistory::Browser).string_len(50).not_null().default(""))
                    .col(ColumnDef::new(LoginHistory::Os).string_len(50).not_null().default(""))
                    .col(ColumnDef::new(LoginHistory::Country).string_len(50).null())
                    .col(ColumnDef::new(LoginHistory::City).string_len(50).null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_login_history_user")
                            .from(LoginHistory::Table, LoginHistory::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_login_history_user_time")
                    .table(LoginHistory::Table)
                    .col(LoginHistory::UserId)
                    .col(LoginHistory::LoginTime)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LoginHistory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum User {
    Table,
    Id,
    GalleryId,
    Username,
    Email,
    PasswordHash,
    FirstName,
    LastName,
    Phone,
    EmergencyContact,
    JobTitle,
    Role,
    CanManageClients,
    CanManageArtworks,
    CanExportData,
    CanSendMessages,
    CanViewReports,
    CanManageUsers,
    CanManageGallerySettings,
    IsActive,
    IsStaff,
    IsSuperuser,
    EmailVerified,
    FailedLoginAttempts,
    AccountLockedUntil,
    LastLogin,
    LastLoginIp,
    PasswordChangedAt,
    TimezoneSetting,
    Language,
    ThemePreference,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum LoginHistory {
    Table,
    Id,
    UserId,
    IpAddress,
    UserAgent,
    LoginTime,
    LogoutTime,
    SessionDurationSecs,
    DeviceType,
    Browser,
    Os,
    Country,
    City,
}

#[derive(Iden)]
enum Gallery {
    Table,
    Id,
}
