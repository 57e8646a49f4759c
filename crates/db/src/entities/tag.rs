//! Tag entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Client label scoped to a gallery. `(gallery_id, name)` is unique.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tag")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub gallery_id: String,

    pub name: String,

    /// Hex color such as `#3B82F6`.
    pub color: String,

    pub created_at: DateTimeWithTimeZone,
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

impl Related<super::client::Entity> for Entity {
    fn to() -> RelationDef {
        super::client_tag::Relation::Client.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::client_tag::Relation::Tag.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
