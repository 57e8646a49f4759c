//! User repository.

use std::collections::HashMap;
use std::sync::Arc;

use crate::entities::{LoginHistory, User, login_history, user};
use chrono::{DateTime, FixedOffset};
use maws_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};

/// User repository for database operations.
#[derive(Clone)]
pub struct UserRepository {
    db: Arc<DatabaseConnection>,
}

impl UserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    // ==================== User Operations ====================

    /// Find a user by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<user::Model>> {
        User::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<user::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User: {id}")))
    }

    /// Find a user by username.
    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::Username.eq(username))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Whether a username is taken.
    pub async fn username_exists(&self, username: &str) -> AppResult<bool> {
        let count = User::find()
            .filter(user::Column::Username.eq(username))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Whether an email is taken.
    pub async fn email_exists(&self, email: &str) -> AppResult<bool> {
        let count = User::find()
            .filter(user::Column::Email.eq(email))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Active users of a gallery ordered by username.
    pub async fn find_active_by_gallery(&self, gallery_id: &str) -> AppResult<Vec<user::Model>> {
        User::find()
            .filter(user::Column::GalleryId.eq(gallery_id))
            .filter(user::Column::IsActive.eq(true))
            .order_by_asc(user::Column::Username)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Number of active users in a gallery.
    pub async fn count_active_by_gallery(&self, gallery_id: &str) -> AppResult<u64> {
        User::find()
            .filter(user::Column::GalleryId.eq(gallery_id))
            .filter(user::Column::IsActive.eq(true))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new user.
    pub async fn create(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a user.
    pub async fn update(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Active user counts keyed by gallery id.
    pub async fn count_active_per_gallery(&self) -> AppResult<HashMap<String, u64>> {
        let rows: Vec<(Option<String>, i64)> = User::find()
            .select_only()
            .column(user::Column::GalleryId)
            .column_as(user::Column::Id.count(), "count")
            .filter(user::Column::IsActive.eq(true))
            .group_by(user::Column::GalleryId)
            .into_tuple()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .filter_map(|(gallery_id, count)| gallery_id.map(|id| (id, u64::try_from(count).unwrap_or(0))))
            .collect())
    }

    /// User counts for the admin dashboard.
    pub async fn get_stats(
        &self,
        now: DateTime<FixedOffset>,
        month_start: DateTime<FixedOffset>,
        recent_since: DateTime<FixedOffset>,
        password_fresh_since: DateTime<FixedOffset>,
    ) -> AppResult<UserStats> {
        let db = self.db.as_ref();
        let count = |condition: Condition| async move {
            User::find()
                .filter(condition)
                .count(db)
                .await
                .map_err(|e| AppError::Database(e.to_string()))
        };

        let mut roles = HashMap::new();
        for role in [
            user::UserRole::Owner,
            user::UserRole::Manager,
            user::UserRole::Staff,
            user::UserRole::Viewer,
            user::UserRole::Intern,
        ] {
            let n = count(Condition::all().add(user::Column::Role.eq(role))).await?;
            roles.insert(role.as_str().to_string(), n);
        }

        let mut permissions = HashMap::new();
        for (name, column) in [
            ("can_manage_clients", user::Column::CanManageClients),
            ("can_manage_artworks", user::Column::CanManageArtworks),
            ("can_export_data", user::Column::CanExportData),
            ("can_send_messages", user::Column::CanSendMessages),
            ("can_view_reports", user::Column::CanViewReports),
            ("can_manage_users", user::Column::CanManageUsers),
            ("can_manage_gallery_settings", user::Column::CanManageGallerySettings),
        ] {
            let n = count(Condition::all().add(column.eq(true))).await?;
            permissions.insert(name.to_string(), n);
        }

        Ok(UserStats {
            total: count(Condition::all()).await?,
            active: count(Condition::all().add(user::Column::IsActive.eq(true))).await?,
            new_this_month: count(Condition::all().add(user::Column::CreatedAt.gte(month_start)))
                .await?,
            email_verified: count(Condition::all().add(user::Column::EmailVerified.eq(true)))
                .await?,
            locked: count(Condition::all().add(user::Column::AccountLockedUntil.gt(now))).await?,
            recent_login: count(Condition::all().add(user::Column::LastLogin.gte(recent_since)))
                .await?,
            fresh_passwords: count(
                Condition::all().add(user::Column::PasswordChangedAt.gte(password_fresh_since)),
            )
            .await?,
            with_failed_attempts: count(
                Condition::all().add(user::Column::FailedLoginAttempts.gt(0)),
            )
            .await?,
            high_failed_attempts: count(
                Condition::all().add(user::Column::FailedLoginAttempts.gte(3)),
            )
            .await?,
            superusers: count(Condition::all().add(user::Column::IsSuperuser.eq(true))).await?,
            staff: count(Condition::all().add(user::Column::IsStaff.eq(true))).await?,
            roles,
            permissions,
        })
    }

    // ==================== Login History Operations ====================

    /// Record a login.
    pub async fn create_login_history(
        &self,
        model: login_history::ActiveModel,
    ) -> AppResult<login_history::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a login record.
    pub async fn update_login_history(
        &self,
        model: login_history::ActiveModel,
    ) -> AppResult<login_history::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Newest login record without a logout time.
    pub async fn find_latest_open_session(
        &self,
        user_id: &str,
    ) -> AppResult<Option<login_history::Model>> {
        LoginHistory::find()
            .filter(login_history::Column::UserId.eq(user_id))
            .filter(login_history::Column::LogoutTime.is_null())
            .order_by_desc(login_history::Column::LoginTime)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// An open session of the user by id.
    pub async fn find_open_session(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> AppResult<Option<login_history::Model>> {
        LoginHistory::find_by_id(session_id)
            .filter(login_history::Column::UserId.eq(user_id))
            .filter(login_history::Column::LogoutTime.is_null())
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Login records for a user, newest first.
    pub async fn find_login_history(
        &self,
        user_id: &str,
        limit: u64,
    ) -> AppResult<Vec<login_history::Model>> {
        LoginHistory::find()
            .filter(login_history::Column::UserId.eq(user_id))
            .order_by_desc(login_history::Column::LoginTime)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Number of sessions without a logout time.
    pub async fn count_open_sessions(&self, user_id: &str) -> AppResult<u64> {
        LoginHistory::find()
            .filter(login_history::Column::UserId.eq(user_id))
            .filter(login_history::Column::LogoutTime.is_null())
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Login counts for the admin dashboard.
    pub async fn get_login_stats(&self, since: DateTime<FixedOffset>) -> AppResult<LoginStats> {
        let db = self.db.as_ref();

        let logins = LoginHistory::find()
            .filter(login_history::Column::LoginTime.gte(since))
            .count(db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let unique_users = LoginHistory::find()
            .select_only()
            .column(login_history::Column::UserId)
            .filter(login_history::Column::LoginTime.gte(since))
            .distinct()
            .into_tuple::<String>()
            .all(db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .len() as u64;

        let open_sessions = LoginHistory::find()
            .filter(login_history::Column::LogoutTime.is_null())
            .count(db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let closed_durations: Vec<Option<i64>> = LoginHistory::find()
            .select_only()
            .column(login_history::Column::SessionDurationSecs)
            .filter(login_history::Column::SessionDurationSecs.is_not_null())
            .filter(login_history::Column::LoginTime.gte(since))
            .into_tuple()
            .all(db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let admin_logins = LoginHistory::find()
            .inner_join(User)
            .filter(login_history::Column::LoginTime.gte(since))
            .filter(
                Condition::any()
                    .add(user::Column::IsSuperuser.eq(true))
                    .add(user::Column::IsStaff.eq(true)),
            )
            .count(db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let durations: Vec<i64> = closed_durations.into_iter().flatten().collect();
        let avg_session_secs = if durations.is_empty() {
            0.0
        } else {
            durations.iter().sum::<i64>() as f64 / durations.len() as f64
        };

        Ok(LoginStats {
            logins,
            unique_users,
            open_sessions,
            avg_session_secs,
            admin_logins,
        })
    }
}

/// Aggregate user counts.
#[derive(Debug, Clone, Default)]
pub struct UserStats {
    /// Number of users.
    pub total: u64,
    /// Users with `is_active`.
    pub active: u64,
    /// Created since the start of the month.
    pub new_this_month: u64,
    /// Users with a verified email.
    pub email_verified: u64,
    /// Accounts locked right now.
    pub locked: u64,
    /// Users who logged in within the recent window.
    pub recent_login: u64,
    /// Users who changed their password within the freshness window.
    pub fresh_passwords: u64,
    /// Users with at least one failed login.
    pub with_failed_attempts: u64,
    /// Users with three or more failed logins.
    pub high_failed_attempts: u64,
    /// Platform superusers.
    pub superusers: u64,
    /// Platform staff.
    pub staff: u64,
    /// Count per role name.
    pub roles: HashMap<String, u64>,
    /// Count per enabled capability flag.
    pub permissions: HashMap<String, u64>,
}

/// Aggregate login counts.
#[derive(Debug, Clone, Default)]
pub struct LoginStats {
    /// Logins in the window.
    pub logins: u64,
    /// Distinct users who logged in during the window.
    pub unique_users: u64,
    /// Sessions with no logout recorded.
    pub open_sessions: u64,
    /// Mean closed-session length in seconds.
    pub avg_session_secs: f64,
    /// Logins by superusers or platform staff.
    pub admin_logins: u64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_user(id: &str, username: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            gallery_id: Some("g1".to_string()),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_hash: "hash".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            phone: None,
            emergency_contact: None,
            job_title: None,
            role: user::UserRole::Staff,
            can_manage_clients: true,
            can_manage_artworks: true,
            can_export_data: false,
            can_send_messages: false,
            can_view_reports: false,
            can_manage_users: false,
            can_manage_gallery_settings: false,
            is_active: true,
            is_staff: false,
            is_superuser: false,
            email_verified: true,
            failed_login_attempts: 0,
            account_locked_until: None,
            last_login: None,
            last_login_ip: None,
            password_changed_at: None,
            timezone_setting: "Asia/Seoul".to_string(),
            language: "ko".to_string(),
            theme_preference: "light".to_string(),
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn create_test_login(id: &str, user_id: &str) -> login_history::Model {
        login_history::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            ip_address: "127.0.0.1".to_string(),
            user_agent: "test".to_string(),
            login_time: Utc::now().into(),
            logout_time: None,
            session_duration_secs: None,
            device_type: "desktop".to_string(),
            browser: "Chrome".to_string(),
            os: "Windows".to_string(),
            country: None,
            city: None,
        }
    }

    #[tokio::test]
    async fn test_find_by_username() {
        let user = create_test_user("u1", "alice");

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[user.clone()]])
            .into_connection();

        let repo = UserRepository::new(Arc::new(db));
        let result = repo.find_by_username("alice").await.unwrap();

        assert!(result.is_some());
        assert_eq!(result.unwrap().id, "u1");
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .into_connection();

        let repo = UserRepository::new(Arc::new(db));
        let result = repo.get_by_id("missing").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_find_active_by_gallery() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[
                create_test_user("u1", "alice"),
                create_test_user("u2", "bob"),
            ]])
            .into_connection();

        let repo = UserRepository::new(Arc::new(db));
        let result = repo.find_active_by_gallery("g1").await.unwrap();

        assert_eq!(result.len(), 2);
    }

    #[tokio::test]
    async fn test_find_latest_open_session() {
        let login = create_test_login("l1", "u1");

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[login.clone()]])
            .into_connection();

        let repo = UserRepository::new(Arc::new(db));
        let result = repo.find_latest_open_session("u1").await.unwrap();

        assert_eq!(result.unwrap().id, "l1");
    }

    #[tokio::test]
    async fn test_find_open_session_of_other_user() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<login_history::Model>::new()])
            .into_connection();

        let repo = UserRepository::new(Arc::new(db));
        let result = repo.find_open_session("u2", "l1").await.unwrap();

        assert!(result.is_none());
    }
}
