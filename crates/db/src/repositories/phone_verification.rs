//! Phone verification code repository.

use std::sync::Arc;

use crate::entities::{PhoneVerification, phone_verification};
use maws_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};

#[derive(Clone)]
pub struct PhoneVerificationRepository {
    db: Arc<DatabaseConnection>,
}

impl PhoneVerificationRepository {
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Newest code of the number that has not been used yet.
    pub async fn find_pending(
        &self,
        phone_number: &str,
    ) -> AppResult<Option<phone_verification::Model>> {
        PhoneVerification::find()
            .filter(phone_verification::Column::PhoneNumber.eq(phone_number))
            .filter(phone_verification::Column::Verified.eq(false))
            .order_by_desc(phone_verification::Column::CreatedAt)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Newest confirmed code of the number.
    pub async fn find_verified(
        &self,
        phone_number: &str,
    ) -> AppResult<Option<phone_verification::Model>> {
        PhoneVerification::find()
            .filter(phone_verification::Column::PhoneNumber.eq(phone_number))
            .filter(phone_verification::Column::Verified.eq(true))
            .order_by_desc(phone_verification::Column::VerifiedAt)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Drop every code of the number, then store `model`.
    pub async fn replace(
        &self,
        model: phone_verification::ActiveModel,
    ) -> AppResult<phone_verification::Model> {
        let phone_number = model
            .phone_number
            .try_as_ref()
            .cloned()
            .ok_or_else(|| AppError::Internal("phone_number not set".to_string()))?;
        PhoneVerification::delete_many()
            .filter(phone_verification::Column::PhoneNumber.eq(phone_number))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn update(
        &self,
        model: phone_verification::ActiveModel,
    ) -> AppResult<phone_verification::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
