//! Gallery entity: the tenant boundary.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// How a gallery was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "lowercase")]
pub enum SignupMethod {
    /// Created by an operator.
    #[sea_orm(string_value = "manual")]
    Manual,
    /// Self-service signup with phone verification.
    #[sea_orm(string_value = "quick")]
    Quick,
    /// Created around a registration code.
    #[sea_orm(string_value = "code")]
    Code,
}

impl SignupMethod {
    /// Stored string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Quick => "quick",
            Self::Code => "code",
        }
    }
}

/// A gallery (tenant).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "gallery")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Display name, unique across galleries.
    #[sea_orm(unique)]
    pub name: String,

    /// Code staff use to join the gallery.
    #[sea_orm(unique, nullable)]
    pub registration_code: Option<String>,

    pub signup_method: SignupMethod,

    /// Phone number verified at quick signup.
    #[sea_orm(unique, nullable)]
    pub verified_phone: Option<String>,

    #[sea_orm(nullable)]
    pub phone_verified_at: Option<DateTimeWithTimeZone>,

    /// Whether the gallery was created by quick signup.
    #[sea_orm(default_value = false)]
    pub auto_generated: bool,

    #[sea_orm(column_type = "Text", nullable)]
    pub address: Option<String>,

    #[sea_orm(nullable)]
    pub phone: Option<String>,

    #[sea_orm(nullable)]
    pub email: Option<String>,

    #[sea_orm(nullable)]
    pub website: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    /// Maximum number of active users.
    #[sea_orm(default_value = 10)]
    pub max_users: i32,

    /// Subscription end. `None` means no expiry.
    #[sea_orm(nullable)]
    pub subscription_expires_at: Option<DateTimeWithTimeZone>,

    #[sea_orm(default_value = true)]
    pub is_active: bool,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Whether the subscription is still running at `now`.
    #[must_use]
    pub fn is_subscription_active_at(&self, now: DateTimeWithTimeZone) -> bool {
        self.subscription_expires_at
            .is_none_or(|expires_at| now < expires_at)
    }

    /// Whether the subscription is still running.
    #[must_use]
    pub fn is_subscription_active(&self) -> bool {
        self.is_subscription_active_at(chrono::Utc::now().fixed_offset())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user::Entity")]
    Users,
    #[sea_orm(has_many = "super::client::Entity")]
    Clients,
    #[sea_orm(has_many = "super::client_column::Entity")]
    ClientColumns,
    #[sea_orm(has_many = "super::tag::Entity")]
    Tags,
    #[sea_orm(has_many = "super::artwork::Entity")]
    Artworks,
    #[sea_orm(has_many = "super::sms_message::Entity")]
    SmsMessages,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::client::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Clients.def()
    }
}

impl Related<super::client_column::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ClientColumns.def()
    }
}

impl Related<super::tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tags.def()
    }
}

impl Related<super::artwork::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Artworks.def()
    }
}

impl Related<super::sms_message::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SmsMessages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn gallery(expires_at: Option<DateTimeWithTimeZone>) -> Model {
        Model {
            id: "g1".to_string(),
            name: "Gallery".to_string(),
            registration_code: None,
            signup_method: SignupMethod::Manual,
            verified_phone: None,
            phone_verified_at: None,
            auto_generated: false,
            address: None,
            phone: None,
            email: None,
            website: None,
            description: None,
            max_users: 10,
            subscription_expires_at: expires_at,
            is_active: true,
            created_at: Utc::now().fixed_offset(),
            updated_at: None,
        }
    }

    #[test]
    fn test_subscription_without_expiry_is_active() {
        assert!(gallery(None).is_subscription_active());
    }

    #[test]
    fn test_subscription_expiry() {
        let now = Utc::now().fixed_offset();
        assert!(gallery(Some(now + Duration::days(1))).is_subscription_active_at(now));
        assert!(!gallery(Some(now - Duration::days(1))).is_subscription_active_at(now));
    }
}
