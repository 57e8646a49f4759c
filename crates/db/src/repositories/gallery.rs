//! Gallery repository.

use std::sync::Arc;

use crate::entities::{Gallery, gallery};
use chrono::{DateTime, FixedOffset};
use maws_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder,
};

/// Gallery repository for database operations.
#[derive(Clone)]
pub struct GalleryRepository {
    db: Arc<DatabaseConnection>,
}

impl GalleryRepository {
    /// Create a new gallery repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a gallery by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<gallery::Model>> {
        Gallery::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a gallery by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<gallery::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::GalleryNotFound(id.to_string()))
    }

    /// Find a gallery by its registration code.
    pub async fn find_by_registration_code(
        &self,
        code: &str,
    ) -> AppResult<Option<gallery::Model>> {
        Gallery::find()
            .filter(gallery::Column::RegistrationCode.eq(code))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Whether a gallery with this exact name exists.
    pub async fn name_exists(&self, name: &str) -> AppResult<bool> {
        let count = Gallery::find()
            .filter(gallery::Column::Name.eq(name))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Whether a registration code is taken.
    pub async fn registration_code_exists(&self, code: &str) -> AppResult<bool> {
        let count = Gallery::find()
            .filter(gallery::Column::RegistrationCode.eq(code))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Whether a verified phone number is already bound to a gallery.
    pub async fn verified_phone_exists(&self, phone: &str) -> AppResult<bool> {
        let count = Gallery::find()
            .filter(gallery::Column::VerifiedPhone.eq(phone))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// All galleries ordered by name.
    pub async fn find_all(&self) -> AppResult<Vec<gallery::Model>> {
        Gallery::find()
            .order_by_asc(gallery::Column::Name)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Active galleries ordered by name.
    pub async fn find_active(&self) -> AppResult<Vec<gallery::Model>> {
        Gallery::find()
            .filter(gallery::Column::IsActive.eq(true))
            .order_by_asc(gallery::Column::Name)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new gallery.
    pub async fn create(&self, model: gallery::ActiveModel) -> AppResult<gallery::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a gallery.
    pub async fn update(&self, model: gallery::ActiveModel) -> AppResult<gallery::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a gallery. Owned rows cascade.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Gallery::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Gallery counts for the admin dashboard.
    pub async fn get_stats(
        &self,
        now: DateTime<FixedOffset>,
        month_start: DateTime<FixedOffset>,
        expiring_before: DateTime<FixedOffset>,
    ) -> AppResult<GalleryStats> {
        let db = self.db.as_ref();
        let count = |condition: Condition| async move {
            Gallery::find()
                .filter(condition)
                .count(db)
                .await
                .map_err(|e| AppError::Database(e.to_string()))
        };

        let total = count(Condition::all()).await?;
        let active = count(Condition::all().add(gallery::Column::IsActive.eq(true))).await?;
        let new_this_month =
            count(Condition::all().add(gallery::Column::CreatedAt.gte(month_start))).await?;

        let manual_signups = count(
            Condition::all().add(gallery::Column::SignupMethod.eq(gallery::SignupMethod::Manual)),
        )
        .await?;
        let quick_signups = count(
            Condition::all().add(gallery::Column::SignupMethod.eq(gallery::SignupMethod::Quick)),
        )
        .await?;
        let code_signups = count(
            Condition::all().add(gallery::Column::SignupMethod.eq(gallery::SignupMethod::Code)),
        )
        .await?;

        let subscription_active = count(
            Condition::any()
                .add(gallery::Column::SubscriptionExpiresAt.is_null())
                .add(gallery::Column::SubscriptionExpiresAt.gt(now)),
        )
        .await?;
        let expiring_soon = count(
            Condition::all()
                .add(gallery::Column::SubscriptionExpiresAt.gt(now))
                .add(gallery::Column::SubscriptionExpiresAt.lte(expiring_before)),
        )
        .await?;
        let expired =
            count(Condition::all().add(gallery::Column::SubscriptionExpiresAt.lte(now))).await?;

        Ok(GalleryStats {
            total,
            active,
            new_this_month,
            manual_signups,
            quick_signups,
            code_signups,
            subscription_active,
            expiring_soon,
            expired,
        })
    }
}

/// Aggregate gallery counts.
#[derive(Debug, Clone, Default)]
pub struct GalleryStats {
    /// Number of galleries.
    pub total: u64,
    /// Galleries with `is_active`.
    pub active: u64,
    /// Created since the start of the month.
    pub new_this_month: u64,
    /// Signup method `manual`.
    pub manual_signups: u64,
    /// Signup method `quick`.
    pub quick_signups: u64,
    /// Signup method `code`.
    pub code_signups: u64,
    /// No expiry, or expiry in the future.
    pub subscription_active: u64,
    /// Expiring within the requested window.
    pub expiring_soon: u64,
    /// Expiry in the past.
    pub expired: u64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_gallery(id: &str, name: &str) -> gallery::Model {
        gallery::Model {
            id: id.to_string(),
            name: name.to_string(),
            registration_code: Some("ABCD1234".to_string()),
            signup_method: gallery::SignupMethod::Code,
            verified_phone: None,
            phone_verified_at: None,
            auto_generated: false,
            address: None,
            phone: None,
            email: None,
            website: None,
            description: None,
            max_users: 10,
            subscription_expires_at: None,
            is_active: true,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_by_registration_code() {
        let gallery = create_test_gallery("g1", "Gallery One");

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[gallery.clone()]])
            .into_connection();

        let repo = GalleryRepository::new(Arc::new(db));
        let result = repo.find_by_registration_code("ABCD1234").await.unwrap();

        assert_eq!(result.unwrap().name, "Gallery One");
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<gallery::Model>::new()])
            .into_connection();

        let repo = GalleryRepository::new(Arc::new(db));
        let result = repo.get_by_id("missing").await;

        assert!(matches!(result, Err(AppError::GalleryNotFound(_))));
    }

    #[tokio::test]
    async fn test_find_all() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[
                create_test_gallery("g1", "A Gallery"),
                create_test_gallery("g2", "B Gallery"),
            ]])
            .into_connection();

        let repo = GalleryRepository::new(Arc::new(db));
        let result = repo.find_all().await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].name, "A Gallery");
    }
}
