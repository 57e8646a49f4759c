//! Login history entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One successful login session.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "login_history")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub user_id: String,

    pub ip_address: String,

    #[sea_orm(column_type = "Text")]
    pub user_agent: String,

    pub login_time: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub logout_time: Option<DateTimeWithTimeZone>,

    /// Session length in seconds, set on logout.
    #[sea_orm(nullable)]
    pub session_duration_secs: Option<i64>,

    /// `mobile`, `tablet`, `desktop` or `unknown`.
    #[sea_orm(default_value = "unknown")]
    pub device_type: String,

    #[sea_orm(default_value = "")]
    pub browser: String,

    #[sea_orm(default_value = "")]
    pub os: String,

    #[sea_orm(nullable)]
    pub country: Option<String>,

    #[sea_orm(nullable)]
    pub city: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
