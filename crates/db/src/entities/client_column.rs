//! Client column entity: one entry of a gallery's dynamic client schema.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Column definition. `(gallery_id, accessor)` is unique.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "client_column")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub gallery_id: String,

    /// Display header.
    pub header: String,

    /// Key into `client.data`.
    pub accessor: String,

    /// Data type tag such as `text` or `tag`.
    #[sea_orm(default_value = "text")]
    pub column_type: String,

    #[sea_orm(default_value = 0)]
    pub order: i32,

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
}

impl Related<super::gallery::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Gallery.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
