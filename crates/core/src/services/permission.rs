//! Role and capability checks.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, Utc};
use maws_common::{AppError, AppResult};
use maws_db::entities::{gallery, user, user::UserRole};
use serde::Serialize;

/// A capability a user may be granted independently of their role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ManageClients,
    ManageArtworks,
    ExportData,
    SendMessages,
    ViewReports,
    ManageUsers,
    ManageGallerySettings,
}

impl Capability {
    /// Every capability, in display order.
    pub const ALL: [Self; 7] = [
        Self::ManageClients,
        Self::ManageArtworks,
        Self::ExportData,
        Self::SendMessages,
        Self::ViewReports,
        Self::ManageUsers,
        Self::ManageGallerySettings,
    ];

    /// Permission name used by the API.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ManageClients => "manage_clients",
            Self::ManageArtworks => "manage_artworks",
            Self::ExportData => "export_data",
            Self::SendMessages => "send_messages",
            Self::ViewReports => "view_reports",
            Self::ManageUsers => "manage_users",
            Self::ManageGallerySettings => "manage_gallery_settings",
        }
    }

    /// Parse a permission name. Unknown names yield `None`.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }

    /// The stored flag for this capability.
    #[must_use]
    pub const fn flag(self, user: &user::Model) -> bool {
        match self {
            Self::ManageClients => user.can_manage_clients,
            Self::ManageArtworks => user.can_manage_artworks,
            Self::ExportData => user.can_export_data,
            Self::SendMessages => user.can_send_messages,
            Self::ViewReports => user.can_view_reports,
            Self::ManageUsers => user.can_manage_users,
            Self::ManageGallerySettings => user.can_manage_gallery_settings,
        }
    }
}

/// Whether the user holds a capability. Owners hold every capability.
#[must_use]
pub fn has_capability(user: &user::Model, capability: Capability) -> bool {
    user.role == UserRole::Owner || capability.flag(user)
}

/// Whether the user holds the named permission. Unknown names are denied.
#[must_use]
pub fn has_permission(user: &user::Model, name: &str) -> bool {
    Capability::parse(name).is_some_and(|c| has_capability(user, c))
}

/// Permission map for the user summary.
#[must_use]
pub fn permission_map(user: &user::Model) -> BTreeMap<&'static str, bool> {
    Capability::ALL
        .into_iter()
        .map(|c| (c.as_str(), has_capability(user, c)))
        .collect()
}

/// Owner or manager.
#[must_use]
pub const fn is_manager_tier(role: UserRole) -> bool {
    matches!(role, UserRole::Owner | UserRole::Manager)
}

/// Owner, manager or staff.
#[must_use]
pub const fn is_staff_tier(role: UserRole) -> bool {
    matches!(role, UserRole::Owner | UserRole::Manager | UserRole::Staff)
}

/// Require a role in the staff tier.
pub fn require_staff_tier(user: &user::Model) -> AppResult<()> {
    if is_staff_tier(user.role) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "owner, manager, staff 역할이 필요합니다.".to_string(),
        ))
    }
}

/// Composite guard run before gallery-scoped work: the account is not
/// locked, the gallery is active with a live subscription, and the user
/// holds the capability.
pub fn ensure_capability(
    user: &user::Model,
    gallery: &gallery::Model,
    capability: Capability,
) -> AppResult<()> {
    ensure_capability_at(user, gallery, capability, Utc::now().fixed_offset())
}

/// [`ensure_capability`] evaluated at a fixed instant.
pub fn ensure_capability_at(
    user: &user::Model,
    gallery: &gallery::Model,
    capability: Capability,
    now: DateTime<FixedOffset>,
) -> AppResult<()> {
    if user.gallery_id.as_deref() != Some(gallery.id.as_str()) {
        return Err(AppError::Forbidden("다른 갤러리에 접근할 수 없습니다.".to_string()));
    }
    if user.is_locked_at(now) {
        return Err(AppError::Forbidden("계정이 잠겨 있습니다.".to_string()));
    }
    if !gallery.is_active {
        return Err(AppError::Forbidden("비활성화된 갤러리입니다.".to_string()));
    }
    if !gallery.is_subscription_active_at(now) {
        return Err(AppError::Forbidden("구독이 만료되었습니다.".to_string()));
    }
    if !has_capability(user, capability) {
        return Err(AppError::Forbidden(format!(
            "{} 권한이 필요합니다.",
            capability.as_str()
        )));
    }
    Ok(())
}

/// Whether `actor` may change `target`'s role and capabilities.
#[must_use]
pub fn can_manage_user(actor: &user::Model, target: &user::Model) -> bool {
    if actor.gallery_id.is_none() || actor.gallery_id != target.gallery_id {
        return false;
    }
    if actor.id == target.id {
        return true;
    }
    if actor.role == UserRole::Owner {
        return true;
    }
    if !actor.can_manage_users {
        return false;
    }
    actor.role == UserRole::Manager
        && matches!(
            target.role,
            UserRole::Staff | UserRole::Viewer | UserRole::Intern
        )
}
