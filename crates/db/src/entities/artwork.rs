//! Artwork entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// An artwork in a gallery's inventory.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "artwork")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub gallery_id: String,

    #[sea_orm(nullable)]
    pub title_ko: Option<String>,

    #[sea_orm(nullable)]
    pub title_en: Option<String>,

    #[sea_orm(nullable)]
    pub artist_ko: Option<String>,

    #[sea_orm(nullable)]
    pub artist_en: Option<String>,

    /// Free text, e.g. `2021` or `c. 1970`.
    #[sea_orm(nullable)]
    pub year: Option<String>,

    #[sea_orm(nullable)]
    pub height: Option<f64>,

    #[sea_orm(nullable)]
    pub width: Option<f64>,

    #[sea_orm(nullable)]
    pub depth: Option<f64>,

    #[sea_orm(default_value = "cm")]
    pub size_unit: String,

    #[sea_orm(nullable)]
    pub medium: Option<String>,

    /// Price in won.
    #[sea_orm(nullable)]
    pub price: Option<i64>,

    #[sea_orm(nullable)]
    pub image_url: Option<String>,

    /// Buying client, always in the same gallery.
    #[sea_orm(indexed, nullable)]
    pub buyer_id: Option<String>,

    #[sea_orm(default_value = false)]
    pub has_missing_fields: bool,

    #[sea_orm(column_type = "Text", nullable)]
    pub note: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::gallery::Entity",
        from = "Column::GalleryId",
        to = "super::gallery::Column::Id",
        on_delete = "Cascade"
    )]
    Gallery,
    #[sea_orm(
        belongs_to = "super::client::Entity",
        from = "Column::BuyerId",
        to = "super::client::Column::Id",
        on_delete = "SetNull"
    )]
    Buyer,
}

impl Related<super::gallery::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Gallery.def()
    }
}

impl Related<super::client::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Buyer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
