//! Artwork repository.

use std::collections::HashMap;
use std::sync::Arc;

use crate::entities::{Artwork, artwork};
use maws_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
    sea_query::{Expr, Func, NullOrdering, Order},
};

/// Artwork list ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ArtworkSort {
    /// Newest first.
    #[default]
    Latest,
    /// Oldest first.
    Oldest,
    /// Most expensive first.
    PriceHigh,
    /// Cheapest first.
    PriceLow,
}

impl ArtworkSort {
    /// Parse the `sort` query value. Unknown values fall back to `Latest`.
    #[must_use]
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("oldest") => Self::Oldest,
            Some("price_high") => Self::PriceHigh,
            Some("price_low") => Self::PriceLow,
            _ => Self::Latest,
        }
    }
}

/// Artwork list filter.
#[derive(Debug, Clone, Default)]
pub struct ArtworkFilter {
    /// Case-insensitive substring over Korean and English artist names.
    pub artist: Option<String>,
    /// Case-insensitive substring over titles and artist names.
    pub search: Option<String>,
    /// Result ordering.
    pub sort: ArtworkSort,
}

/// Case-insensitive `LIKE %term%` over a column.
fn icontains(column: artwork::Column, term: &str) -> sea_orm::sea_query::SimpleExpr {
    let pattern = format!("%{}%", term.to_lowercase());
    Expr::expr(Func::lower(Expr::col(column))).like(pattern)
}

/// Artwork repository for database operations.
#[derive(Clone)]
pub struct ArtworkRepository {
    db: Arc<DatabaseConnection>,
}

impl ArtworkRepository {
    /// Create a new artwork repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Artworks of a gallery matching the filter.
    pub async fn find_by_gallery(
        &self,
        gallery_id: &str,
        filter: &ArtworkFilter,
    ) -> AppResult<Vec<artwork::Model>> {
        let mut query = Artwork::find().filter(artwork::Column::GalleryId.eq(gallery_id));

        if let Some(artist) = filter.artist.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(icontains(artwork::Column::ArtistKo, artist))
                    .add(icontains(artwork::Column::ArtistEn, artist)),
            );
        }

        if let Some(term) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(icontains(artwork::Column::TitleKo, term))
                    .add(icontains(artwork::Column::TitleEn, term))
                    .add(icontains(artwork::Column::ArtistKo, term))
                    .add(icontains(artwork::Column::ArtistEn, term)),
            );
        }

        query = match filter.sort {
            ArtworkSort::Latest => query.order_by_desc(artwork::Column::CreatedAt),
            ArtworkSort::Oldest => query.order_by_asc(artwork::Column::CreatedAt),
            ArtworkSort::PriceHigh => {
                query.order_by_with_nulls(artwork::Column::Price, Order::Desc, NullOrdering::Last)
            }
            ArtworkSort::PriceLow => {
                query.order_by_with_nulls(artwork::Column::Price, Order::Asc, NullOrdering::Last)
            }
        };

        query
            .order_by_desc(artwork::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find an artwork by ID within a gallery.
    pub async fn find_in_gallery(
        &self,
        gallery_id: &str,
        id: &str,
    ) -> AppResult<Option<artwork::Model>> {
        Artwork::find_by_id(id)
            .filter(artwork::Column::GalleryId.eq(gallery_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get an artwork by ID within a gallery, returning an error if not found.
    pub async fn get_in_gallery(&self, gallery_id: &str, id: &str) -> AppResult<artwork::Model> {
        self.find_in_gallery(gallery_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Artwork: {id}")))
    }

    /// Create an artwork.
    pub async fn create(&self, model: artwork::ActiveModel) -> AppResult<artwork::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update an artwork.
    pub async fn update(&self, model: artwork::ActiveModel) -> AppResult<artwork::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete an artwork.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Artwork::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Total number of artworks.
    pub async fn count(&self) -> AppResult<u64> {
        Artwork::find()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Artwork counts keyed by gallery id.
    pub async fn count_per_gallery(&self) -> AppResult<HashMap<String, u64>> {
        let rows: Vec<(String, i64)> = Artwork::find()
            .select_only()
            .column(artwork::Column::GalleryId)
            .column_as(artwork::Column::Id.count(), "count")
            .group_by(artwork::Column::GalleryId)
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

    fn create_test_artwork(id: &str, artist: &str, price: Option<i64>) -> artwork::Model {
        artwork::Model {
            id: id.to_string(),
            gallery_id: "g1".to_string(),
            title_ko: Some("무제".to_string()),
            title_en: Some("Untitled".to_string()),
            artist_ko: Some(artist.to_string()),
            artist_en: None,
            year: Some("2021".to_string()),
            height: Some(53.0),
            width: Some(45.5),
            depth: None,
            size_unit: "cm".to_string(),
            medium: Some("Oil on canvas".to_string()),
            price,
            image_url: None,
            buyer_id: None,
            has_missing_fields: false,
            note: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[test]
    fn test_sort_parse() {
        assert_eq!(ArtworkSort::parse(None), ArtworkSort::Latest);
        assert_eq!(ArtworkSort::parse(Some("oldest")), ArtworkSort::Oldest);
        assert_eq!(ArtworkSort::parse(Some("price_high")), ArtworkSort::PriceHigh);
        assert_eq!(ArtworkSort::parse(Some("price_low")), ArtworkSort::PriceLow);
        assert_eq!(ArtworkSort::parse(Some("bogus")), ArtworkSort::Latest);
    }

    #[tokio::test]
    async fn test_find_by_gallery_with_filter() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_artwork("a1", "김환기", Some(1_000_000))]])
            .into_connection();

        let repo = ArtworkRepository::new(Arc::new(db));
        let filter = ArtworkFilter {
            artist: Some("환기".to_string()),
            search: None,
            sort: ArtworkSort::PriceHigh,
        };
        let result = repo.find_by_gallery("g1", &filter).await.unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].price, Some(1_000_000));
    }

    #[tokio::test]
    async fn test_delete() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let repo = ArtworkRepository::new(Arc::new(db));
        assert!(repo.delete("a1").await.is_ok());
    }
}
