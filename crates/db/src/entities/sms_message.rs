//! SMS broadcast entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Broadcast status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum SmsStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "sending")]
    Sending,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl SmsStatus {
    /// Stored string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sending => "sending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Korean display name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Pending => "대기중",
            Self::Sending => "발송중",
            Self::Completed => "완료",
            Self::Failed => "실패",
            Self::Cancelled => "취소",
        }
    }
}

/// One broadcast request and its aggregate outcome.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sms_message")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub gallery_id: String,

    /// Sending user. Kept as `NULL` if the user is deleted.
    #[sea_orm(nullable)]
    pub sender_id: Option<String>,

    /// Template text before rendering.
    #[sea_orm(column_type = "Text")]
    pub message_template: String,

    /// Number of clients in the request.
    #[sea_orm(default_value = 0)]
    pub total_recipients: i32,

    #[sea_orm(default_value = 0)]
    pub sent_count: i32,

    #[sea_orm(default_value = 0)]
    pub failed_count: i32,

    pub status: SmsStatus,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub completed_at: Option<DateTimeWithTimeZone>,
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
        belongs_to = "super::user::Entity",
        from = "Column::SenderId",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    Sender,
    #[sea_orm(has_many = "super::sms_delivery::Entity")]
    Deliveries,
}

impl Related<super::gallery::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Gallery.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sender.def()
    }
}

impl Related<super::sms_delivery::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Deliveries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
