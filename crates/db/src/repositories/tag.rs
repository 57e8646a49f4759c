//! Tag repository, including client-tag links.

use std::collections::HashMap;
use std::sync::Arc;

use crate::entities::{ClientTag, Tag, client_tag, tag};
use maws_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, sea_query::OnConflict,
};

/// Tag repository for database operations.
#[derive(Clone)]
pub struct TagRepository {
    db: Arc<DatabaseConnection>,
}

impl TagRepository {
    /// Create a new tag repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    // ==================== Tag Operations ====================

    /// Tags of a gallery ordered by name.
    pub async fn find_by_gallery(&self, gallery_id: &str) -> AppResult<Vec<tag::Model>> {
        Tag::find()
            .filter(tag::Column::GalleryId.eq(gallery_id))
            .order_by_asc(tag::Column::Name)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a tag by ID within a gallery.
    pub async fn find_in_gallery(&self, gallery_id: &str, id: &str) -> AppResult<Option<tag::Model>> {
        Tag::find_by_id(id)
            .filter(tag::Column::GalleryId.eq(gallery_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a tag by ID within a gallery, returning an error if not found.
    pub async fn get_in_gallery(&self, gallery_id: &str, id: &str) -> AppResult<tag::Model> {
        self.find_in_gallery(gallery_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Tag: {id}")))
    }

    /// Find a tag by exact name within a gallery.
    pub async fn find_by_name(&self, gallery_id: &str, name: &str) -> AppResult<Option<tag::Model>> {
        Tag::find()
            .filter(tag::Column::GalleryId.eq(gallery_id))
            .filter(tag::Column::Name.eq(name))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Tags among `ids` that belong to the gallery.
    pub async fn find_by_ids_in_gallery(
        &self,
        gallery_id: &str,
        ids: &[String],
    ) -> AppResult<Vec<tag::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        Tag::find()
            .filter(tag::Column::GalleryId.eq(gallery_id))
            .filter(tag::Column::Id.is_in(ids.to_vec()))
            .order_by_asc(tag::Column::Name)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a tag.
    pub async fn create(&self, model: tag::ActiveModel) -> AppResult<tag::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a tag.
    pub async fn update(&self, model: tag::ActiveModel) -> AppResult<tag::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a tag. Client links cascade.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Tag::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Total number of tags.
    pub async fn count(&self) -> AppResult<u64> {
        Tag::find()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Tag counts keyed by gallery id.
    pub async fn count_per_gallery(&self) -> AppResult<HashMap<String, u64>> {
        let rows: Vec<(String, i64)> = Tag::find()
            .select_only()
            .column(tag::Column::GalleryId)
            .column_as(tag::Column::Id.count(), "count")
            .group_by(tag::Column::GalleryId)
            .into_tuple()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(id, count)| (id, u64::try_from(count).unwrap_or(0)))
            .collect())
    }

    // ==================== Client Tag Operations ====================

    /// Tags attached to one client, ordered by name.
    pub async fn find_for_client(&self, client_id: &str) -> AppResult<Vec<tag::Model>> {
        Tag::find()
            .inner_join(ClientTag)
            .filter(client_tag::Column::ClientId.eq(client_id))
            .order_by_asc(tag::Column::Name)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Tags for many clients, keyed by client id.
    pub async fn find_for_clients(
        &self,
        client_ids: &[String],
    ) -> AppResult<HashMap<String, Vec<tag::Model>>> {
        if client_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let links = ClientTag::find()
            .filter(client_tag::Column::ClientId.is_in(client_ids.to_vec()))
            .find_also_related(Tag)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut result: HashMap<String, Vec<tag::Model>> = HashMap::new();
        for (link, tag) in links {
            if let Some(tag) = tag {
                result.entry(link.client_id).or_default().push(tag);
            }
        }
        for tags in result.values_mut() {
            tags.sort_by(|a, b| a.name.cmp(&b.name));
        }
        Ok(result)
    }

    /// Attach tags to a client. Existing links are left alone.
    pub async fn attach(&self, client_id: &str, tag_ids: &[String]) -> AppResult<()> {
        if tag_ids.is_empty() {
            return Ok(());
        }

        let links = tag_ids.iter().map(|tag_id| client_tag::ActiveModel {
            client_id: Set(client_id.to_string()),
            tag_id: Set(tag_id.clone()),
        });

        ClientTag::insert_many(links)
            .on_conflict(
                OnConflict::columns([client_tag::Column::ClientId, client_tag::Column::TagId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Remove every tag from a client.
    pub async fn detach_all(&self, client_id: &str) -> AppResult<()> {
        ClientTag::delete_many()
            .filter(client_tag::Column::ClientId.eq(client_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Replace a client's tags.
    pub async fn set_client_tags(&self, client_id: &str, tag_ids: &[String]) -> AppResult<()> {
        self.detach_all(client_id).await?;
        self.attach(client_id, tag_ids).await
    }

    /// Number of tags attached to a client.
    pub async fn count_for_client(&self, client_id: &str) -> AppResult<u64> {
        ClientTag::find()
            .filter(client_tag::Column::ClientId.eq(client_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Client ids carrying any of the given tags.
    pub async fn find_client_ids_with_any(&self, tag_ids: &[String]) -> AppResult<Vec<String>> {
        if tag_ids.is_empty() {
            return Ok(vec![]);
        }

        let links = ClientTag::find()
            .filter(client_tag::Column::TagId.is_in(tag_ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut ids: Vec<String> = links.into_iter().map(|l| l.client_id).collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }
}
