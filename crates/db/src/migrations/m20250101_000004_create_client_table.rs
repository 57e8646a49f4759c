//! Create tag, client and client_tag tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Tag::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Tag::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Tag::GalleryId).string_len(32).not_null())
                    .col(ColumnDef::new(Tag::Name).string_len(50).not_null())
                    .col(
                        ColumnDef::new(Tag::Color)
                            .string_len(7)
                            .not_null()
                            .default("#3B82F6"),
                    )
                    .col(ColumnDef::new(Tag::CreatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tag_gallery")
                            .from(Tag::Table, Tag::GalleryId)
                            .to(Gallery::Table, Gallery::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tag_gallery_name")
                    .table(Tag::Table)
                    .col(Tag::GalleryId)
                    .col(Tag::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Client::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Client::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Client::GalleryId).string_len(32).not_null())
                    .col(ColumnDef::new(Client::Name).string_len(100).null())
                    .col(ColumnDef::new(Client::Phone).string_len(20).null())
                    .col(ColumnDef::new(Client::Data).json_binary().not_null())
                    .col(
                        ColumnDef::new(Client::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Client::UpdatedAt).timestamp_with_time_zone().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_client_gallery")
                            .from(Client::Table, Client::GalleryId)
                            .to(Gallery::Table, Gallery::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_client_gallery_created")
                    .table(Client::Table)
                    .col(Client::GalleryId)
                    .col(Client::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_client_gallery_name_phone")
                    .table(Client::Table)
                    .col(Client::GalleryId)
                    .col(Client::Name)
                    .col(Client::Phone)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ClientTag::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ClientTag::ClientId).string_len(32).not_null())
                    .col(ColumnDef::new(ClientTag::TagId).string_len(32).not_null())
                    .primary_key(
                        Index::create()
                            .col(ClientTag::ClientId)
                            .col(ClientTag::TagId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_client_tag_client")
                            .from(ClientTag::Table, ClientTag::ClientId)
                            .to(Client::Table, Client::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_client_tag_tag")
                            .from(ClientTag::Table, ClientTag::TagId)
                            .to(Tag::Table, Tag::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_client_tag_tag_id")
                    .table(ClientTag::Table)
                    .col(ClientTag::TagId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ClientTag::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Client::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Tag::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Tag {
    Table,
    Id,
    GalleryId,
    Name,
    Color,
    CreatedAt,
}

#[derive(Iden)]
enum Client {
    Table,
    Id,
    GalleryId,
    Name,
    Phone,
    Data,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum ClientTag {
    Table,
    ClientId,
    TagId,
}

#[derive(Iden)]
enum Gallery {
    Table,
    Id,
}
