//! Client repository.

use std::collections::HashMap;
use std::sync::Arc;

use crate::entities::{Client, client};
use maws_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};

/// Client repository for database operations.
#[derive(Clone)]
pub struct ClientRepository {
    db: Arc<DatabaseConnection>,
}

impl ClientRepository {
    /// Create a new client repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Clients of a gallery, newest first.
    pub async fn find_by_gallery(&self, gallery_id: &str) -> AppResult<Vec<client::Model>> {
        Client::find()
            .filter(client::Column::GalleryId.eq(gallery_id))
            .order_by_desc(client::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a client by ID within a gallery.
    pub async fn find_in_gallery(
        &self,
        gallery_id: &str,
        id: &str,
    ) -> AppResult<Option<client::Model>> {
        Client::find_by_id(id)
            .filter(client::Column::GalleryId.eq(gallery_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a client by ID within a gallery, returning an error if not found.
    pub async fn get_in_gallery(&self, gallery_id: &str, id: &str) -> AppResult<client::Model> {
        self.find_in_gallery(gallery_id, id)
            .await?
            .ok_or_else(|| AppError::ClientNotFound(id.to_string()))
    }

    /// Clients among `ids` that belong to the gallery, newest first.
    pub async fn find_by_ids_in_gallery(
        &self,
        gallery_id: &str,
        ids: &[String],
    ) -> AppResult<Vec<client::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        Client::find()
            .filter(client::Column::GalleryId.eq(gallery_id))
            .filter(client::Column::Id.is_in(ids.to_vec()))
            .order_by_desc(client::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// First client in the gallery with this exact name and phone.
    pub async fn find_by_name_and_phone(
        &self,
        gallery_id: &str,
        name: &str,
        phone: &str,
    ) -> AppResult<Option<client::Model>> {
        Client::find()
            .filter(client::Column::GalleryId.eq(gallery_id))
            .filter(client::Column::Name.eq(name))
            .filter(client::Column::Phone.eq(phone))
            .order_by_asc(client::Column::CreatedAt)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a client.
    pub async fn create(&self, model: client::ActiveModel) -> AppResult<client::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a client.
    pub async fn update(&self, model: client::ActiveModel) -> AppResult<client::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a client.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Client::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Total number of clients.
    pub async fn count(&self) -> AppResult<u64> {
        Client::find()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Client counts keyed by gallery id.
    pub async fn count_per_gallery(&self) -> AppResult<HashMap<String, u64>> {
        let rows: Vec<(String, i64)> = Client::find()
            .select_only()
            .column(client::Column::GalleryId)
            .column_as(client::Column::Id.count(), "count")
            .group_by(client::Column::GalleryId)
            .into_tuple()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(id, count)| (id, u64::try_from(count).unwrap_or(0)))
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use serde_json::json;

    fn create_test_client(id: &str, name: &str) -> client::Model {
        client::Model {
            id: id.to_string(),
            gallery_id: "g1".to_string(),
            name: Some(name.to_string()),
            phone: Some("010-1234-5678".to_string()),
            data: json!({"직업": "작가"}),
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_get_in_gallery() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_client("c1", "홍길동")]])
            .into_connection();

        let repo = ClientRepository::new(Arc::new(db));
        let result = repo.get_in_gallery("g1", "c1").await.unwrap();

        assert_eq!(result.name.as_deref(), Some("홍길동"));
        assert_eq!(result.data["직업"], "작가");
    }

    #[tokio::test]
    async fn test_get_in_other_gallery_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<client::Model>::new()])
            .into_connection();

        let repo = ClientRepository::new(Arc::new(db));
        let result = repo.get_in_gallery("g2", "c1").await;

        assert!(matches!(result, Err(AppError::ClientNotFound(_))));
    }

    #[tokio::test]
    async fn test_find_by_name_and_phone() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_client("c1", "홍길동")]])
            .into_connection();

        let repo = ClientRepository::new(Arc::new(db));
        let result = repo
            .find_by_name_and_phone("g1", "홍길동", "010-1234-5678")
            .await
            .unwrap();

        assert!(result.is_some());
    }
}
