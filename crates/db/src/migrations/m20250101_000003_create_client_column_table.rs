//! Create client_column table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ClientColumn::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ClientColumn::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ClientColumn::GalleryId).string_len(32).not_null())
                    .col(ColumnDef::new(ClientColumn::Header).string_len(255).not_null())
                    .col(ColumnDef::new(ClientColumn::Accessor).string_len(255).not_null())
                    .col(
                        ColumnDef::new(ClientColumn::ColumnType)
                            .string_len(20)
                            .not_null()
                            .default("text"),
                    )
                    .col(
                        ColumnDef::new(ClientColumn::Order)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ClientColumn::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_client_column_gallery")
                            .from(ClientColumn::Table, ClientColumn::GalleryId)
                            .to(Gallery::Table, Gallery::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Re-uploading a spreadsheet must not duplicate columns.
        manager
            .create_index(
                Index::create()
                    .name("idx_client_column_gallery_accessor")
                    .table(ClientColumn::Table)
                    .col(ClientColumn::GalleryId)
                    .col(ClientColumn::Accessor)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_client_column_gallery_order")
                    .table(ClientColumn::Table)
                    .col(ClientColumn::GalleryId)
                    .col(ClientColumn::Order)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ClientColumn::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ClientColumn {
    Table,
    Id,
    GalleryId,
    Header,
    Accessor,
    ColumnType,
    Order,
    CreatedAt,
}

#[derive(Iden)]
enum Gallery {
    Table,
    Id,
}
