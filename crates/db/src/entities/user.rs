//! User entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role of a user inside their gallery.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[sea_orm(string_value = "owner")]
    Owner,
    #[sea_orm(string_value = "manager")]
    Manager,
    #[sea_orm(string_value = "staff")]
    Staff,
    #[sea_orm(string_value = "viewer")]
    Viewer,
    #[sea_orm(string_value = "intern")]
    Intern,
}

impl UserRole {
    /// Stored string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Manager => "manager",
            Self::Staff => "staff",
            Self::Viewer => "viewer",
            Self::Intern => "intern",
        }
    }

    /// Korean display name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Owner => "갤러리 오너",
            Self::Manager => "매니저",
            Self::Staff => "직원",
            Self::Viewer => "조회자",
            Self::Intern => "인턴",
        }
    }
}

/// User entity.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Owning gallery. `None` only for platform superusers.
    #[sea_orm(indexed, nullable)]
    pub gallery_id: Option<String>,

    #[sea_orm(unique)]
    pub username: String,

    #[sea_orm(unique)]
    pub email: String,

    #[serde(skip_serializing)]
    pub password_hash: String,

    #[sea_orm(default_value = "")]
    pub first_name: String,

    #[sea_orm(default_value = "")]
    pub last_name: String,

    #[sea_orm(nullable)]
    pub phone: Option<String>,

    #[sea_orm(nullable)]
    pub emergency_contact: Option<String>,

    #[sea_orm(nullable)]
    pub job_title: Option<String>,

    pub role: UserRole,

    // Capability flags. `owner` implies all of them.
    #[sea_orm(default_value = true)]
    pub can_manage_clients: bool,
    #[sea_orm(default_value = true)]
    pub can_manage_artworks: bool,
    #[sea_orm(default_value = false)]
    pub can_export_data: bool,
    #[sea_orm(default_value = false)]
    pub can_send_messages: bool,
    #[sea_orm(default_value = false)]
    pub can_view_reports: bool,
    #[sea_orm(default_value = false)]
    pub can_manage_users: bool,
    #[sea_orm(default_value = false)]
    pub can_manage_gallery_settings: bool,

    #[sea_orm(default_value = true)]
    pub is_active: bool,

    #[sea_orm(default_value = false)]
    pub is_staff: bool,

    /// Platform operator with access to the admin dashboard.
    #[sea_orm(default_value = false)]
    pub is_superuser: bool,

    #[sea_orm(default_value = false)]
    pub email_verified: bool,

    #[sea_orm(default_value = 0)]
    pub failed_login_attempts: i32,

    #[sea_orm(nullable)]
    pub account_locked_until: Option<DateTimeWithTimeZone>,

    #[sea_orm(nullable)]
    pub last_login: Option<DateTimeWithTimeZone>,

    #[sea_orm(nullable)]
    pub last_login_ip: Option<String>,

    #[sea_orm(nullable)]
    pub password_changed_at: Option<DateTimeWithTimeZone>,

    #[sea_orm(default_value = "Asia/Seoul")]
    pub timezone_setting: String,

    #[sea_orm(default_value = "ko")]
    pub language: String,

    /// `light`, `dark` or `auto`.
    #[sea_orm(default_value = "light")]
    pub theme_preference: String,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Whether the account is locked at `now`.
    #[must_use]
    pub fn is_locked_at(&self, now: DateTimeWithTimeZone) -> bool {
        self.account_locked_until
            .is_some_and(|locked_until| now < locked_until)
    }

    /// `"{first} {last}"`, or the username when both are blank.
    #[must_use]
    pub fn full_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let trimmed = full.trim();
        if trimmed.is_empty() {
            self.username.clone()
        } else {
            trimmed.to_string()
        }
    }
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
    #[sea_orm(has_many = "super::login_history::Entity")]
    LoginHistory,
}

impl Related<super::gallery::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Gallery.def()
    }
}

impl Related<super::login_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LoginHistory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
