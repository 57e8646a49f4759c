//! Client column repository.

use std::collections::HashMap;
use std::sync::Arc;

use crate::entities::{ClientColumn, client_column};
use maws_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, SqlErr,
};

/// Client column repository for database operations.
#[derive(Clone)]
pub struct ClientColumnRepository {
    db: Arc<DatabaseConnection>,
}

/// Map an insert error, surfacing `(gallery_id, accessor)` collisions as conflicts.
fn map_insert_error(e: &DbErr) -> AppError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => {
            AppError::Conflict(format!("Column accessor already exists: {detail}"))
        }
        _ => AppError::Database(e.to_string()),
    }
}

impl ClientColumnRepository {
    /// Create a new client column repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Columns of a gallery in display order.
    pub async fn find_by_gallery(&self, gallery_id: &str) -> AppResult<Vec<client_column::Model>> {
        ClientColumn::find()
            .filter(client_column::Column::GalleryId.eq(gallery_id))
            .order_by_asc(client_column::Column::Order)
            .order_by_asc(client_column::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a column by ID within a gallery.
    pub async fn find_in_gallery(
        &self,
        gallery_id: &str,
        id: &str,
    ) -> AppResult<Option<client_column::Model>> {
        ClientColumn::find_by_id(id)
            .filter(client_column::Column::GalleryId.eq(gallery_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a column by ID within a gallery, returning an error if not found.
    pub async fn get_in_gallery(
        &self,
        gallery_id: &str,
        id: &str,
    ) -> AppResult<client_column::Model> {
        self.find_in_gallery(gallery_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Client column: {id}")))
    }

    /// Columns of a gallery keyed by id.
    pub async fn find_by_ids_in_gallery(
        &self,
        gallery_id: &str,
        ids: &[String],
    ) -> AppResult<HashMap<String, client_column::Model>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let columns = ClientColumn::find()
            .filter(client_column::Column::GalleryId.eq(gallery_id))
            .filter(client_column::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(columns.into_iter().map(|c| (c.id.clone(), c)).collect())
    }

    /// Create a column.
    pub async fn create(&self, model: client_column::ActiveModel) -> AppResult<client_column::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| map_insert_error(&e))
    }

    /// Insert many columns at once.
    pub async fn create_many(&self, models: Vec<client_column::ActiveModel>) -> AppResult<()> {
        if models.is_empty() {
            return Ok(());
        }

        ClientColumn::insert_many(models)
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| map_insert_error(&e))?;
        Ok(())
    }

    /// Update a column.
    pub async fn update(&self, model: client_column::ActiveModel) -> AppResult<client_column::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| map_insert_error(&e))
    }

    /// Delete a column.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        ClientColumn::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete every column of a gallery.
    pub async fn delete_by_gallery(&self, gallery_id: &str) -> AppResult<u64> {
        let result = ClientColumn::delete_many()
            .filter(client_column::Column::GalleryId.eq(gallery_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }

    /// Total number of columns.
    pub async fn count(&self) -> AppResult<u64> {
        ClientColumn::find()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Column counts keyed by gallery id.
    pub async fn count_per_gallery(&self) -> AppResult<HashMap<String, u64>> {
        let rows: Vec<(String, i64)> = ClientColumn::find()
            .select_only()
            .column(client_column::Column::GalleryId)
            .column_as(client_column::Column::Id.count(), "count")
            .group_by(client_column::Column::GalleryId)
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
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_column(id: &str, accessor: &str, order: i32) -> client_column::Model {
        client_column::Model {
            id: id.to_string(),
            gallery_id: "g1".to_string(),
            header: accessor.to_string(),
            accessor: accessor.to_string(),
            column_type: "text".to_string(),
            order,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_gallery() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[
                create_test_column("c1", "고객명", 0),
                create_test_column("c2", "연락처", 1),
            ]])
            .into_connection();

        let repo = ClientColumnRepository::new(Arc::new(db));
        let result = repo.find_by_gallery("g1").await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[1].accessor, "연락처");
    }

    #[tokio::test]
    async fn test_get_in_gallery_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<client_column::Model>::new()])
            .into_connection();

        let repo = ClientColumnRepository::new(Arc::new(db));
        let result = repo.get_in_gallery("g1", "missing").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_find_by_ids_in_gallery_empty() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let repo = ClientColumnRepository::new(Arc::new(db));

        let result = repo.find_by_ids_in_gallery("g1", &[]).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_delete_by_gallery() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 3,
            }])
            .into_connection();

        let repo = ClientColumnRepository::new(Arc::new(db));
        assert_eq!(repo.delete_by_gallery("g1").await.unwrap(), 3);
    }
}
