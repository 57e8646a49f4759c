//! Profile, login history, dashboard and gallery membership.

use chrono::{DateTime, FixedOffset, Utc};
use maws_common::{AppError, AppResult};
use maws_db::{
    entities::{gallery, login_history, user, user::UserRole},
    repositories::{GalleryRepository, UserRepository},
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use super::auth::{hash_password, validate_new_password, verify_password};
use super::permission::{
    Capability, can_manage_user, ensure_capability, has_capability, has_permission,
    is_manager_tier,
};

const LOGIN_HISTORY_LIMIT: u64 = 50;
const DASHBOARD_RECENT_LOGINS: u64 = 5;

/// A user as shown on profile and member screens.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub emergency_contact: Option<String>,
    pub job_title: Option<String>,
    pub role: UserRole,
    pub role_display: &'static str,
    pub gallery_name: Option<String>,
    pub can_manage_clients: bool,
    pub can_manage_artworks: bool,
    pub can_export_data: bool,
    pub can_send_messages: bool,
    pub can_view_reports: bool,
    pub can_manage_users: bool,
    pub can_manage_gallery_settings: bool,
    pub timezone_setting: String,
    pub language: String,
    pub theme_preference: String,
    pub last_login: Option<DateTime<FixedOffset>>,
    pub created_at: DateTime<FixedOffset>,
}

impl UserProfile {
    #[must_use]
    pub fn new(user: &user::Model, gallery_name: Option<String>) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            full_name: user.full_name(),
            phone: user.phone.clone(),
            emergency_contact: user.emergency_contact.clone(),
            job_title: user.job_title.clone(),
            role: user.role,
            role_display: user.role.display_name(),
            gallery_name,
            can_manage_clients: user.can_manage_clients,
            can_manage_artworks: user.can_manage_artworks,
            can_export_data: user.can_export_data,
            can_send_messages: user.can_send_messages,
            can_view_reports: user.can_view_reports,
            can_manage_users: user.can_manage_users,
            can_manage_gallery_settings: user.can_manage_gallery_settings,
            timezone_setting: user.timezone_setting.clone(),
            language: user.language.clone(),
            theme_preference: user.theme_preference.clone(),
            last_login: user.last_login,
            created_at: user.created_at,
        }
    }
}

/// Self-service profile changes.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileInput {
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 150))]
    pub first_name: Option<String>,
    #[validate(length(max = 150))]
    pub last_name: Option<String>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    #[validate(length(max = 20))]
    pub emergency_contact: Option<String>,
    #[validate(length(max = 100))]
    pub job_title: Option<String>,
    #[validate(length(max = 50))]
    pub timezone_setting: Option<String>,
    #[validate(length(max = 10))]
    pub language: Option<String>,
    pub theme_preference: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordInput {
    pub old_password: String,
    pub new_password: String,
    pub new_password_confirm: String,
}

/// One login session.
#[derive(Debug, Clone, Serialize)]
pub struct LoginHistoryEntry {
    pub id: String,
    pub user_name: String,
    pub ip_address: String,
    pub device_type: String,
    pub browser: String,
    pub os: String,
    pub login_time: DateTime<FixedOffset>,
    pub logout_time: Option<DateTime<FixedOffset>>,
    pub session_duration_display: String,
    pub is_active: bool,
}

impl LoginHistoryEntry {
    fn new(entry: login_history::Model, user_name: &str) -> Self {
        Self {
            session_duration_display: session_duration_display(entry.session_duration_secs),
            is_active: entry.logout_time.is_none(),
            id: entry.id,
            user_name: user_name.to_string(),
            ip_address: entry.ip_address,
            device_type: entry.device_type,
            browser: entry.browser,
            os: entry.os,
            login_time: entry.login_time,
            logout_time: entry.logout_time,
        }
    }
}

/// Human readable session length. Open or zero-length sessions read "진행 중".
#[must_use]
pub fn session_duration_display(secs: Option<i64>) -> String {
    let total = match secs {
        Some(s) if s > 0 => s,
        _ => return "진행 중".to_string(),
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours > 0 {
        format!("{hours}시간 {minutes}분")
    } else if minutes > 0 {
        format!("{minutes}분 {seconds}초")
    } else {
        format!("{seconds}초")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardUser {
    pub full_name: String,
    pub role_display: &'static str,
    pub job_title: Option<String>,
    pub last_login: Option<DateTime<FixedOffset>>,
    pub last_login_ip: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardGallery {
    pub name: String,
    /// Present only for users allowed to manage members.
    pub users_count: Option<u64>,
    pub max_users: Option<i32>,
    pub subscription_active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSecurity {
    pub active_sessions: u64,
    pub recent_logins: Vec<LoginHistoryEntry>,
}

/// Personal dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub user: DashboardUser,
    pub gallery: Option<DashboardGallery>,
    pub security: DashboardSecurity,
}

/// Gallery details for its members.
#[derive(Debug, Clone, Serialize)]
pub struct GalleryInfo {
    pub id: String,
    pub name: String,
    pub registration_code: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub max_users: i32,
    pub user_count: u64,
    pub subscription_active: bool,
    pub subscription_expires_at: Option<DateTime<FixedOffset>>,
    pub can_add_user: bool,
    pub created_at: DateTime<FixedOffset>,
}

/// Editable gallery settings.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateGalleryInput {
    #[validate(length(min = 2, max = 100))]
    pub name: Option<String>,
    pub address: Option<String>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(url)]
    pub website: Option<String>,
    pub description: Option<String>,
}

/// Role and capability changes for a gallery member.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateMemberInput {
    pub role: Option<UserRole>,
    #[validate(length(max = 100))]
    pub job_title: Option<String>,
    pub is_active: Option<bool>,
    pub can_manage_clients: Option<bool>,
    pub can_manage_artworks: Option<bool>,
    pub can_export_data: Option<bool>,
    pub can_send_messages: Option<bool>,
    pub can_view_reports: Option<bool>,
    pub can_manage_users: Option<bool>,
    pub can_manage_gallery_settings: Option<bool>,
}

impl UpdateMemberInput {
    const fn touches_privileges(&self) -> bool {
        self.role.is_some()
            || self.is_active.is_some()
            || self.can_manage_clients.is_some()
            || self.can_manage_artworks.is_some()
            || self.can_export_data.is_some()
            || self.can_send_messages.is_some()
            || self.can_view_reports.is_some()
            || self.can_manage_users.is_some()
            || self.can_manage_gallery_settings.is_some()
    }
}

/// Answer to a permission probe.
#[derive(Debug, Clone, Serialize)]
pub struct PermissionCheck {
    pub permission: String,
    pub has_permission: bool,
    pub user_role: UserRole,
}

/// Account service.
#[derive(Clone)]
pub struct AccountService {
    user_repo: UserRepository,
    gallery_repo: GalleryRepository,
}

impl AccountService {
    /// Create a new account service.
    #[must_use]
    pub const fn new(user_repo: UserRepository, gallery_repo: GalleryRepository) -> Self {
        Self {
            user_repo,
            gallery_repo,
        }
    }

    /// The gallery a user belongs to.
    pub async fn gallery_of(&self, user: &user::Model) -> AppResult<gallery::Model> {
        let gallery_id = user
            .gallery_id
            .as_deref()
            .ok_or_else(|| AppError::Forbidden("소속 갤러리가 없습니다.".to_string()))?;
        self.gallery_repo
            .find_by_id(gallery_id)
            .await?
            .ok_or_else(|| AppError::GalleryNotFound(gallery_id.to_string()))
    }

    async fn gallery_name(&self, user: &user::Model) -> AppResult<Option<String>> {
        match user.gallery_id.as_deref() {
            Some(id) => Ok(self.gallery_repo.find_by_id(id).await?.map(|g| g.name)),
            None => Ok(None),
        }
    }

    // ==================== Profile Operations ====================

    /// The caller's profile with their gallery name.
    pub async fn profile(&self, user: &user::Model) -> AppResult<UserProfile> {
        Ok(UserProfile::new(user, self.gallery_name(user).await?))
    }

    pub async fn update_profile(
        &self,
        user: user::Model,
        input: UpdateProfileInput,
    ) -> AppResult<UserProfile> {
        input.validate()?;

        if let Some(theme) = input.theme_preference.as_deref() {
            if !matches!(theme, "light" | "dark" | "auto") {
                return Err(AppError::Validation(format!("Unknown theme: {theme}")));
            }
        }
        if let Some(email) = input.email.as_deref().filter(|e| *e != user.email) {
            if self.user_repo.email_exists(email).await? {
                return Err(AppError::BadRequest("이미 사용 중인 이메일입니다.".to_string()));
            }
        }

        let mut active: user::ActiveModel = user.into();
        if let Some(email) = input.email {
            active.email = Set(email);
        }
        if let Some(first_name) = input.first_name {
            active.first_name = Set(first_name);
        }
        if let Some(last_name) = input.last_name {
            active.last_name = Set(last_name);
        }
        if let Some(phone) = input.phone {
            active.phone = Set(Some(phone).filter(|p| !p.is_empty()));
        }
        if let Some(contact) = input.emergency_contact {
            active.emergency_contact = Set(Some(contact).filter(|c| !c.is_empty()));
        }
        if let Some(job_title) = input.job_title {
            active.job_title = Set(Some(job_title).filter(|j| !j.is_empty()));
        }
        if let Some(tz) = input.timezone_setting {
            active.timezone_setting = Set(tz);
        }
        if let Some(language) = input.language {
            active.language = Set(language);
        }
        if let Some(theme) = input.theme_preference {
            active.theme_preference = Set(theme);
        }
        active.updated_at = Set(Some(Utc::now().into()));

        let updated = self.user_repo.update(active).await?;
        self.profile(&updated).await
    }

    /// Change the password after checking the current one. Open sessions stay open.
    pub async fn change_password(
        &self,
        user: user::Model,
        input: ChangePasswordInput,
    ) -> AppResult<()> {
        if !verify_password(&input.old_password, &user.password_hash)? {
            return Err(AppError::Validation(
                "기존 비밀번호가 올바르지 않습니다.".to_string(),
            ));
        }
        validate_new_password(&input.new_password, &input.new_password_confirm)?;

        let user_id = user.id.clone();
        let now = Utc::now();
        let mut active: user::ActiveModel = user.into();
        active.password_hash = Set(hash_password(&input.new_password)?);
        active.password_changed_at = Set(Some(now.into()));
        active.updated_at = Set(Some(now.into()));
        self.user_repo.update(active).await?;

        info!(user_id = %user_id, "Password changed");
        Ok(())
    }

    /// Recent sessions of the user, newest first.
    pub async fn login_history(&self, user: &user::Model) -> AppResult<Vec<LoginHistoryEntry>> {
        let name = user.full_name();
        Ok(self
            .user_repo
            .find_login_history(&user.id, LOGIN_HISTORY_LIMIT)
            .await?
            .into_iter()
            .map(|entry| LoginHistoryEntry::new(entry, &name))
            .collect())
    }

    /// Personal dashboard: profile summary, gallery usage and recent logins.
    pub async fn dashboard(&self, user: &user::Model) -> AppResult<Dashboard> {
        let name = user.full_name();
        let recent_logins = self
            .user_repo
            .find_login_history(&user.id, DASHBOARD_RECENT_LOGINS)
            .await?
            .into_iter()
            .map(|entry| LoginHistoryEntry::new(entry, &name))
            .collect();
        let active_sessions = self.user_repo.count_open_sessions(&user.id).await?;

        let gallery = match user.gallery_id.as_deref() {
            Some(id) => match self.gallery_repo.find_by_id(id).await? {
                Some(gallery) => {
                    let users_count = if has_capability(user, Capability::ManageUsers)
                        || is_manager_tier(user.role)
                    {
                        Some(self.user_repo.count_active_by_gallery(&gallery.id).await?)
                    } else {
                        None
                    };
                    Some(DashboardGallery {
                        subscription_active: gallery.is_subscription_active(),
                        max_users: users_count.map(|_| gallery.max_users),
                        users_count,
                        name: gallery.name,
                    })
                }
                None => None,
            },
            None => None,
        };

        Ok(Dashboard {
            user: DashboardUser {
                full_name: name,
                role_display: user.role.display_name(),
                job_title: user.job_title.clone(),
                last_login: user.last_login,
                last_login_ip: user.last_login_ip.clone(),
            },
            gallery,
            security: DashboardSecurity {
                active_sessions,
                recent_logins,
            },
        })
    }

    // ==================== Gallery Operations ====================

    pub async fn gallery_info(&self, user: &user::Model) -> AppResult<GalleryInfo> {
        let gallery = self.gallery_of(user).await?;
        let user_count = self.user_repo.count_active_by_gallery(&gallery.id).await?;
        Ok(GalleryInfo {
            subscription_active: gallery.is_subscription_active(),
            can_add_user: user_count < u64::try_from(gallery.max_users).unwrap_or(0),
            user_count,
            id: gallery.id,
            name: gallery.name,
            registration_code: gallery.registration_code,
            address: gallery.address,
            phone: gallery.phone,
            email: gallery.email,
            website: gallery.website,
            description: gallery.description,
            max_users: gallery.max_users,
            subscription_expires_at: gallery.subscription_expires_at,
            created_at: gallery.created_at,
        })
    }

    /// Change gallery settings. Requires `manage_gallery_settings`.
    pub async fn update_gallery(
        &self,
        user: &user::Model,
        input: UpdateGalleryInput,
    ) -> AppResult<GalleryInfo> {
        input.validate()?;
        let gallery = self.gallery_of(user).await?;
        ensure_capability(user, &gallery, Capability::ManageGallerySettings)?;

        if let Some(name) = input
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| *n != gallery.name)
        {
            if self.gallery_repo.name_exists(name).await? {
                return Err(AppError::BadRequest("이미 사용 중인 갤러리명입니다.".to_string()));
            }
        }

        let gallery_id = gallery.id.clone();
        let mut active: gallery::ActiveModel = gallery.into();
        if let Some(name) = input.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(address) = input.address {
            active.address = Set(Some(address));
        }
        if let Some(phone) = input.phone {
            active.phone = Set(Some(phone));
        }
        if let Some(email) = input.email {
            active.email = Set(Some(email));
        }
        if let Some(website) = input.website {
            active.website = Set(Some(website));
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        active.updated_at = Set(Some(Utc::now().into()));
        self.gallery_repo.update(active).await?;

        info!(gallery_id = %gallery_id, user_id = %user.id, "Gallery settings updated");
        self.gallery_info(user).await
    }

    /// Active members of the caller's gallery.
    pub async fn gallery_users(&self, user: &user::Model) -> AppResult<Vec<UserProfile>> {
        if !has_capability(user, Capability::ManageUsers) && !is_manager_tier(user.role) {
            return Err(AppError::Forbidden("사용자 관리 권한이 필요합니다.".to_string()));
        }
        let gallery = self.gallery_of(user).await?;
        Ok(self
            .user_repo
            .find_active_by_gallery(&gallery.id)
            .await?
            .iter()
            .map(|member| UserProfile::new(member, Some(gallery.name.clone())))
            .collect())
    }

    /// Change a member's role, capabilities or status.
    pub async fn update_member(
        &self,
        actor: &user::Model,
        target_id: &str,
        input: UpdateMemberInput,
    ) -> AppResult<UserProfile> {
        input.validate()?;
        let target = self.user_repo.get_by_id(target_id).await?;

        if !can_manage_user(actor, &target) {
            return Err(AppError::Forbidden(
                "이 사용자를 관리할 권한이 없습니다.".to_string(),
            ));
        }
        if actor.role != UserRole::Owner {
            if actor.id == target.id && input.touches_privileges() {
                return Err(AppError::Forbidden(
                    "자신의 역할과 권한은 변경할 수 없습니다.".to_string(),
                ));
            }
            if matches!(input.role, Some(UserRole::Owner | UserRole::Manager)) {
                return Err(AppError::Forbidden(
                    "오너만 매니저 이상의 역할을 부여할 수 있습니다.".to_string(),
                ));
            }
        }

        let mut active: user::ActiveModel = target.into();
        if let Some(role) = input.role {
            active.role = Set(role);
        }
        if let Some(job_title) = input.job_title {
            active.job_title = Set(Some(job_title).filter(|j| !j.is_empty()));
        }
        if let Some(v) = input.is_active {
            active.is_active = Set(v);
        }
        if let Some(v) = input.can_manage_clients {
            active.can_manage_clients = Set(v);
        }
        if let Some(v) = input.can_manage_artworks {
            active.can_manage_artworks = Set(v);
        }
        if let Some(v) = input.can_export_data {
            active.can_export_data = Set(v);
        }
        if let Some(v) = input.can_send_messages {
            active.can_send_messages = Set(v);
        }
        if let Some(v) = input.can_view_reports {
            active.can_view_reports = Set(v);
        }
        if let Some(v) = input.can_manage_users {
            active.can_manage_users = Set(v);
        }
        if let Some(v) = input.can_manage_gallery_settings {
            active.can_manage_gallery_settings = Set(v);
        }
        active.updated_at = Set(Some(Utc::now().into()));

        let updated = self.user_repo.update(active).await?;
        info!(actor = %actor.id, target = %updated.id, role = updated.role.as_str(), "Member updated");
        self.profile(&updated).await
    }

    /// Whether the user holds a named permission.
    #[must_use]
    pub fn check_permission(user: &user::Model, permission: &str) -> PermissionCheck {
        PermissionCheck {
            permission: permission.to_string(),
            has_permission: has_permission(user, permission),
            user_role: user.role,
        }
    }
}
