//! Client entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A gallery customer. Fixed `name`/`phone` plus free-form `data` keyed by
/// client column accessor.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "client")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub gallery_id: String,

    #[sea_orm(nullable)]
    pub name: Option<String>,

    #[sea_orm(nullable)]
    pub phone: Option<String>,

    /// JSON object of dynamic fields.
    #[sea_orm(column_type = "JsonBinary")]
    pub data: Json,

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
    #[sea_orm(has_many = "super::client_tag::Entity")]
    ClientTags,
}

impl Related<super::gallery::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Gallery.def()
    }
}

impl Related<super::client_tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ClientTags.def()
    }
}

impl Related<super::tag::Entity> for Entity {
    fn to() -> RelationDef {
        super::client_tag::Relation::Tag.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::client_tag::Relation::Client.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
