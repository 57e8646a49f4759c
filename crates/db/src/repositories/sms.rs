//! SMS broadcast and delivery repository.

use std::sync::Arc;

use crate::entities::{SmsDelivery, SmsMessage, sms_delivery, sms_message};
use maws_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};

/// SMS repository for database operations.
#[derive(Clone)]
pub struct SmsRepository {
    db: Arc<DatabaseConnection>,
}

impl SmsRepository {
    /// Create a new SMS repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    // ==================== Message Operations ====================

    /// Create a broadcast record.
    pub async fn create_message(
        &self,
        model: sms_message::ActiveModel,
    ) -> AppResult<sms_message::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a broadcast record.
    pub async fn update_message(
        &self,
        model: sms_message::ActiveModel,
    ) -> AppResult<sms_message::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Most recent broadcasts of a gallery.
    pub async fn find_recent_by_gallery(
        &self,
        gallery_id: &str,
        limit: u64,
    ) -> AppResult<Vec<sms_message::Model>> {
        SmsMessage::find()
            .filter(sms_message::Column::GalleryId.eq(gallery_id))
            .order_by_desc(sms_message::Column::CreatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a broadcast by ID within a gallery.
    pub async fn get_message_in_gallery(
        &self,
        gallery_id: &str,
        id: &str,
    ) -> AppResult<sms_message::Model> {
        SmsMessage::find_by_id(id)
            .filter(sms_message::Column::GalleryId.eq(gallery_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::NotFound(format!("SMS message: {id}")))
    }

    /// Total number of broadcasts.
    pub async fn count_messages(&self) -> AppResult<u64> {
        SmsMessage::find()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ==================== Delivery Operations ====================

    /// Create a delivery record.
    pub async fn create_delivery(
        &self,
        model: sms_delivery::ActiveModel,
    ) -> AppResult<sms_delivery::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a delivery record.
    pub async fn update_delivery(
        &self,
        model: sms_delivery::ActiveModel,
    ) -> AppResult<sms_delivery::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Deliveries of a broadcast, newest first.
    pub async fn find_deliveries(&self, message_id: &str) -> AppResult<Vec<sms_delivery::Model>> {
        SmsDelivery::find()
            .filter(sms_delivery::Column::MessageId.eq(message_id))
            .order_by_desc(sms_delivery::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
