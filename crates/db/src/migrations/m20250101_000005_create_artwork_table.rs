//! Create artwork table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Artwork::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Artwork::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Artwork::GalleryId).string_len(32).not_null())
                    .col(ColumnDef::new(Artwork::TitleKo).string_len(255).null())
                    .col(ColumnDef::new(Artwork::TitleEn).string_len(255).null())
                    .col(ColumnDef::new(Artwork::ArtistKo).string_len(100).null())
                    .col(ColumnDef::new(Artwork::ArtistEn).string_len(100).null())
                    .col(ColumnDef::new(Artwork::Year).string_len(20).null())
                    .col(ColumnDef::new(Artwork::Height).double().null())
                    .col(ColumnDef::new(Artwork::Width).double().null())
                    .col(ColumnDef::new(Artwork::Depth).double().null())
                    .col(
                        ColumnDef::new(Artwork::SizeUnit)
                            .string_len(10)
                            .not_null()
                            .default("cm"),
                    )
                    .col(ColumnDef::new(Artwork::Medium).string_len(100).null())
                    .col(ColumnDef::new(Artwork::Price).big_integer().null())
                    .col(ColumnDef::new(Artwork::ImageUrl).string_len(1024).null())
                    .col(ColumnDef::new(Artwork::BuyerId).string_len(32).null())
                    .col(
                        ColumnDef::new(Artwork::HasMissingFields)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Artwork::Note).text().null())
                    .col(
                        ColumnDef::new(Artwork::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Artwork::UpdatedAt).timestamp_with_time_zone().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_artwork_gallery")
                            .from(Artwork::Table, Artwork::GalleryId)
                            .to(Gallery::Table, Gallery::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_artwork_buyer")
                            .from(Artwork::Table, Artwork::BuyerId)
                            .to(Client::Table, Client::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_artwork_gallery_id")
                    .table(Artwork::Table)
                    .col(Artwork::GalleryId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_artwork_buyer_id")
                    .table(Artwork::Table)
                    .col(Artwork::BuyerId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Artwork::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Artwork {
    Table,
    Id,
    GalleryId,
    TitleKo,
    TitleEn,
    ArtistKo,
    ArtistEn,
    Year,
    Height,
    Width,
    Depth,
    SizeUnit,
    Medium,
    Price,
    ImageUrl,
    BuyerId,
    HasMissingFields,
    Note,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Gallery {
    Table,
    Id,
}

#[derive(Iden)]
enum Client {
    Table,
    Id,
}
