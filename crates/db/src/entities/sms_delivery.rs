//! Per-recipient SMS delivery entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Delivery status, mirroring the gateway's message states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "queued")]
    Queued,
    #[sea_orm(string_value = "sent")]
    Sent,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "undelivered")]
    Undelivered,
}

impl DeliveryStatus {
    /// Stored string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Queued => "queued",
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Failed => "failed",
            Self::Undelivered => "undelivered",
        }
    }

    /// Korean display name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Pending => "대기중",
            Self::Queued => "발송대기",
            Self::Sent => "발송완료",
            Self::Delivered => "전달완료",
            Self::Failed => "실패",
            Self::Undelivered => "전달실패",
        }
    }

    /// Map a gateway status string. Unknown values map to `Sent`.
    #[must_use]
    pub fn from_provider(status: &str) -> Self {
        match status {
            "queued" | "accepted" | "scheduled" => Self::Queued,
            "delivered" => Self::Delivered,
            "failed" => Self::Failed,
            "undelivered" => Self::Undelivered,
            _ => Self::Sent,
        }
    }
}

/// Outcome of sending one rendered message to one client.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sms_delivery")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub message_id: String,

    #[sea_orm(indexed)]
    pub client_id: String,

    /// Normalized number the message was sent to.
    pub phone_number: String,

    #[sea_orm(column_type = "Text")]
    pub rendered_message: String,

    pub status: DeliveryStatus,

    /// Gateway message id.
    #[sea_orm(nullable)]
    pub provider_message_id: Option<String>,

    /// Raw gateway status string.
    #[sea_orm(nullable)]
    pub provider_status: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub error_message: Option<String>,

    #[sea_orm(nullable)]
    pub sent_at: Option<DateTimeWithTimeZone>,

    #[sea_orm(nullable)]
    pub delivered_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sms_message::Entity",
        from = "Column::MessageId",
        to = "super::sms_message::Column::Id",
        on_delete = "Cascade"
    )]
    Message,
    #[sea_orm(
        belongs_to = "super::client::Entity",
        from = "Column::ClientId",
        to = "super::client::Column::Id",
        on_delete = "Cascade"
    )]
    Client,
}

impl Related<super::sms_message::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Message.def()
    }
}

impl Related<super::client::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Client.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_provider() {
        assert_eq!(DeliveryStatus::from_provider("queued"), DeliveryStatus::Queued);
        assert_eq!(DeliveryStatus::from_provider("delivered"), DeliveryStatus::Delivered);
        assert_eq!(DeliveryStatus::from_provider("undelivered"), DeliveryStatus::Undelivered);
        assert_eq!(DeliveryStatus::from_provider("sending"), DeliveryStatus::Sent);
    }
}
