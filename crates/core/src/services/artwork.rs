//! Artwork inventory service.

use std::sync::Arc;

use chrono::Utc;
use maws_common::{AppError, AppResult, IdGenerator, PresignedUpload, StorageBackend, artwork_storage_key};
use maws_db::{
    entities::artwork,
    repositories::{ArtworkFilter, ArtworkRepository, ClientRepository},
};
use sea_orm::Set;
use serde::Deserialize;
use tracing::{info, warn};
use validator::Validate;

/// An image part of an artwork form.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Artwork form fields. On update only present fields change; an empty
/// `buyer_id` clears the buyer.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ArtworkInput {
    #[validate(length(max = 200))]
    pub title_ko: Option<String>,
    #[validate(length(max = 200))]
    pub title_en: Option<String>,
    #[validate(length(max = 100))]
    pub artist_ko: Option<String>,
    #[validate(length(max = 100))]
    pub artist_en: Option<String>,
    #[validate(length(max = 20))]
    pub year: Option<String>,
    pub height: Option<f64>,
    pub width: Option<f64>,
    pub depth: Option<f64>,
    #[validate(length(min = 1, max = 10))]
    pub size_unit: Option<String>,
    #[validate(length(max = 200))]
    pub medium: Option<String>,
    #[validate(range(min = 0))]
    pub price: Option<i64>,
    pub buyer_id: Option<String>,
    pub has_missing_fields: Option<bool>,
    pub note: Option<String>,
    #[serde(skip)]
    pub image: Option<ImageUpload>,
}

/// `artworks/a.jpg` + `x1` → `artworks/a_x1.jpg`.
fn with_suffix(key: &str, suffix: &str) -> String {
    match key.rsplit_once('.') {
        Some((stem, ext)) if !stem.ends_with('/') && !ext.contains('/') => {
            format!("{stem}_{suffix}.{ext}")
        }
        _ => format!("{key}_{suffix}"),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Artwork service.
#[derive(Clone)]
pub struct ArtworkService {
    artwork_repo: ArtworkRepository,
    client_repo: ClientRepository,
    storage: Arc<dyn StorageBackend>,
    id_gen: IdGenerator,
}

impl ArtworkService {
    /// Create a new artwork service.
    #[must_use]
    pub fn new(
        artwork_repo: ArtworkRepository,
        client_repo: ClientRepository,
        storage: Arc<dyn StorageBackend>,
    ) -> Self {
        Self {
            artwork_repo,
            client_repo,
            storage,
            id_gen: IdGenerator::new(),
        }
    }

    pub async fn list(
        &self,
        gallery_id: &str,
        filter: &ArtworkFilter,
    ) -> AppResult<Vec<artwork::Model>> {
        self.artwork_repo.find_by_gallery(gallery_id, filter).await
    }

    pub async fn get(&self, gallery_id: &str, id: &str) -> AppResult<artwork::Model> {
        self.artwork_repo.get_in_gallery(gallery_id, id).await
    }

    /// Resolve a buyer id to a client of the same gallery. `None` for blank.
    async fn check_buyer(&self, gallery_id: &str, buyer_id: &str) -> AppResult<Option<String>> {
        let buyer_id = buyer_id.trim();
        if buyer_id.is_empty() {
            return Ok(None);
        }
        self.client_repo
            .find_in_gallery(gallery_id, buyer_id)
            .await?
            .map(|c| Some(c.id))
            .ok_or_else(|| {
                AppError::Validation("구매자는 같은 갤러리의 고객이어야 합니다.".to_string())
            })
    }

    /// Upload under `artworks/`. A taken key gets a short random suffix.
    async fn store_image(&self, image: &ImageUpload) -> AppResult<String> {
        let mut key = artwork_storage_key(&image.file_name);
        if self.storage.exists(&key).await? {
            let id = self.id_gen.generate();
            key = with_suffix(&key, &id[id.len().saturating_sub(7)..]);
        }
        let uploaded = self
            .storage
            .upload(&key, &image.bytes, &image.content_type)
            .await?;
        info!(key = %uploaded.key, size = uploaded.size, "Artwork image stored");
        Ok(uploaded.url)
    }

    /// Remove a stored image. Failures are logged and not returned.
    async fn discard_image(&self, url: &str) {
        let Some(key) = self.storage.key_for_url(url) else {
            warn!(url, "Artwork image is not served by the configured storage");
            return;
        };
        match self.storage.delete(&key).await {
            Ok(()) => info!(key = %key, "Artwork image deleted"),
            Err(e) => warn!(key = %key, error = %e, "Failed to delete artwork image"),
        }
    }

    /// Create an artwork. A buyer, when given, must be a client of the same gallery.
    pub async fn create(&self, gallery_id: &str, input: ArtworkInput) -> AppResult<artwork::Model> {
        input.validate()?;
        let buyer_id = match input.buyer_id.as_deref() {
            Some(id) => self.check_buyer(gallery_id, id).await?,
            None => None,
        };
        let image_url = match &input.image {
            Some(image) => Some(self.store_image(image).await?),
            None => None,
        };

        let now = Utc::now();
        self.artwork_repo
            .create(artwork::ActiveModel {
                id: Set(self.id_gen.generate()),
                gallery_id: Set(gallery_id.to_string()),
                title_ko: Set(non_blank(input.title_ko)),
                title_en: Set(non_blank(input.title_en)),
                artist_ko: Set(non_blank(input.artist_ko)),
                artist_en: Set(non_blank(input.artist_en)),
                year: Set(non_blank(input.year)),
                height: Set(input.height),
                width: Set(input.width),
                depth: Set(input.depth),
                size_unit: Set(non_blank(input.size_unit).unwrap_or_else(|| "cm".to_string())),
                medium: Set(non_blank(input.medium)),
                price: Set(input.price),
                image_url: Set(image_url),
                buyer_id: Set(buyer_id),
                has_missing_fields: Set(input.has_missing_fields.unwrap_or(false)),
                note: Set(non_blank(input.note)),
                created_at: Set(now.into()),
                updated_at: Set(Some(now.into())),
            })
            .await
    }

    /// Update the present fields. Without an image part the stored image is kept.
    pub async fn update(
        &self,
        gallery_id: &str,
        id: &str,
        input: ArtworkInput,
    ) -> AppResult<artwork::Model> {
        input.validate()?;
        let existing = self.artwork_repo.get_in_gallery(gallery_id, id).await?;
        let previous_image = existing.image_url.clone();

        let mut active: artwork::ActiveModel = existing.into();
        if let Some(buyer_id) = input.buyer_id.as_deref() {
            active.buyer_id = Set(self.check_buyer(gallery_id, buyer_id).await?);
        }
        if let Some(image) = &input.image {
            active.image_url = Set(Some(self.store_image(image).await?));
        }

        macro_rules! set_text {
            ($($field:ident),*) => {
                $(if input.$field.is_some() {
                    active.$field = Set(non_blank(input.$field));
                })*
            };
        }
        set_text!(title_ko, title_en, artist_ko, artist_en, year, medium, note);

        if let Some(height) = input.height {
            active.height = Set(Some(height));
        }
        if let Some(width) = input.width {
            active.width = Set(Some(width));
        }
        if let Some(depth) = input.depth {
            active.depth = Set(Some(depth));
        }
        if let Some(unit) = non_blank(input.size_unit) {
            active.size_unit = Set(unit);
        }
        if let Some(price) = input.price {
            active.price = Set(Some(price));
        }
        if let Some(flag) = input.has_missing_fields {
            active.has_missing_fields = Set(flag);
        }
        active.updated_at = Set(Some(Utc::now().into()));

        let updated = self.artwork_repo.update(active).await?;
        if let Some(previous) = previous_image {
            if updated.image_url.as_deref() != Some(previous.as_str()) {
                self.discard_image(&previous).await;
            }
        }
        Ok(updated)
    }

    /// Delete the record, then its image.
    pub async fn delete(&self, gallery_id: &str, id: &str) -> AppResult<()> {
        let artwork = self.artwork_repo.get_in_gallery(gallery_id, id).await?;
        self.artwork_repo.delete(&artwork.id).await?;
        if let Some(url) = artwork.image_url.as_deref() {
            self.discard_image(url).await;
        }
        Ok(())
    }

    /// Direct-upload URLs for an artwork image.
    pub async fn presigned_url(
        &self,
        file_name: Option<&str>,
        file_type: Option<&str>,
    ) -> AppResult<PresignedUpload> {
        let file_name = file_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| AppError::BadRequest("file_name is required".to_string()))?;
        let key = artwork_storage_key(file_name);

        self.storage
            .presign_upload(&key, file_type.unwrap_or("application/octet-stream"))
            .await?
            .ok_or_else(|| {
                AppError::BadRequest("Direct upload is not available for this storage".to_string())
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use maws_common::{LocalStorage, UploadedFile};
    use maws_db::entities::client;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use serde_json::json;
    use std::sync::Mutex;

    /// Records uploads and deletions in memory.
    #[derive(Default)]
    struct MemoryStorage {
        keys: Mutex<Vec<String>>,
        deleted: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl StorageBackend for MemoryStorage {
        async fn upload(&self, key: &str, data: &[u8], content_type: &str) -> AppResult<UploadedFile> {
            self.keys.lock().unwrap().push(key.to_string());
            Ok(UploadedFile {
                key: key.to_string(),
                url: self.public_url(key),
                size: data.len() as u64,
                content_type: content_type.to_string(),
                md5: String::new(),
            })
        }

        async fn delete(&self, key: &str) -> AppResult<()> {
            self.keys.lock().unwrap().retain(|k| k != key);
            self.deleted.lock().unwrap().push(key.to_string());
            Ok(())
        }

        fn public_url(&self, key: &str) -> String {
            format!("https://cdn.test/{key}")
        }

        async fn exists(&self, key: &str) -> AppResult<bool> {
            Ok(self.keys.lock().unwrap().iter().any(|k| k == key))
        }

        async fn presign_upload(&self, key: &str, _content_type: &str) -> AppResult<Option<PresignedUpload>> {
            Ok(Some(PresignedUpload {
                upload_url: format!("https://upload.test/{key}?sig=1"),
                file_url: self.public_url(key),
            }))
        }
    }

    fn test_artwork(image_url: Option<&str>) -> artwork::Model {
        artwork::Model {
            id: "a1".to_string(),
            gallery_id: "g1".to_string(),
            title_ko: Some("해질녘".to_string()),
            title_en: None,
            artist_ko: Some("김작가".to_string()),
            artist_en: None,
            year: Some("2021".to_string()),
            height: Some(50.0),
            width: Some(70.0),
            depth: None,
            size_unit: "cm".to_string(),
            medium: None,
            price: Some(1_000_000),
            image_url: image_url.map(str::to_string),
            buyer_id: None,
            has_missing_fields: false,
            note: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn service(db: DatabaseConnection, storage: Arc<dyn StorageBackend>) -> ArtworkService {
        let db = Arc::new(db);
        ArtworkService::new(
            ArtworkRepository::new(db.clone()),
            ClientRepository::new(db),
            storage,
        )
    }

    #[tokio::test]
    async fn test_negative_price_rejected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let result = service(db, Arc::new(MemoryStorage::default()))
            .create(
                "g1",
                ArtworkInput {
                    price: Some(-1),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_buyer_from_other_gallery_rejected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<client::Model>::new()])
            .into_connection();
        let result = service(db, Arc::new(MemoryStorage::default()))
            .create(
                "g1",
                ArtworkInput {
                    buyer_id: Some("c-other".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_uploads_image() {
        let storage = Arc::new(MemoryStorage::default());
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_artwork(Some("https://cdn.test/artworks/sunset.jpg"))]])
            .into_connection();

        let created = service(db, storage.clone())
            .create(
                "g1",
                ArtworkInput {
                    title_ko: Some("해질녘".to_string()),
                    image: Some(ImageUpload {
                        file_name: "sunset.jpg".to_string(),
                        content_type: "image/jpeg".to_string(),
                        bytes: vec![1, 2, 3],
                    }),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(created.id, "a1");
        assert_eq!(*storage.keys.lock().unwrap(), vec!["artworks/sunset.jpg".to_string()]);
    }

    #[tokio::test]
    async fn test_update_without_image_keeps_existing() {
        let storage = Arc::new(MemoryStorage::default());
        let existing = test_artwork(Some("https://cdn.test/artworks/old.jpg"));
        let mut updated = existing.clone();
        updated.price = Some(2_000_000);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[existing]])
            .append_query_results([[updated]])
            .into_connection();

        let result = service(db, storage.clone())
            .update(
                "g1",
                "a1",
                ArtworkInput {
                    price: Some(2_000_000),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(result.image_url.as_deref(), Some("https://cdn.test/artworks/old.jpg"));
        assert!(storage.keys.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_with_image_deletes_previous_file() {
        let storage = Arc::new(MemoryStorage::default());
        storage.keys.lock().unwrap().push("artworks/old.jpg".to_string());
        let existing = test_artwork(Some("https://cdn.test/artworks/old.jpg"));
        let updated = test_artwork(Some("https://cdn.test/artworks/new.jpg"));
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[existing]])
            .append_query_results([[updated]])
            .into_connection();

        service(db, storage.clone())
            .update(
                "g1",
                "a1",
                ArtworkInput {
                    image: Some(ImageUpload {
                        file_name: "new.jpg".to_string(),
                        content_type: "image/jpeg".to_string(),
                        bytes: vec![1],
                    }),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(*storage.keys.lock().unwrap(), vec!["artworks/new.jpg".to_string()]);
        assert_eq!(*storage.deleted.lock().unwrap(), vec!["artworks/old.jpg".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_removes_image() {
        let storage = Arc::new(MemoryStorage::default());
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_artwork(Some("https://cdn.test/artworks/old.jpg"))]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        service(db, storage.clone()).delete("g1", "a1").await.unwrap();

        assert_eq!(*storage.deleted.lock().unwrap(), vec!["artworks/old.jpg".to_string()]);
    }

    #[tokio::test]
    async fn test_taken_key_gets_suffix() {
        let storage = Arc::new(MemoryStorage::default());
        storage.keys.lock().unwrap().push("artworks/sunset.jpg".to_string());
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_artwork(None)]])
            .into_connection();

        service(db, storage.clone())
            .create(
                "g1",
                ArtworkInput {
                    image: Some(ImageUpload {
                        file_name: "sunset.jpg".to_string(),
                        content_type: "image/jpeg".to_string(),
                        bytes: vec![1],
                    }),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let keys = storage.keys.lock().unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys[1].starts_with("artworks/sunset_"), "{}", keys[1]);
        assert!(keys[1].ends_with(".jpg"));
    }

    #[test]
    fn test_with_suffix() {
        assert_eq!(with_suffix("artworks/a.jpg", "x1"), "artworks/a_x1.jpg");
        assert_eq!(with_suffix("artworks/noext", "x1"), "artworks/noext_x1");
    }

    #[tokio::test]
    async fn test_presigned_url() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let svc = service(db, Arc::new(MemoryStorage::default()));

        let urls = svc.presigned_url(Some("a b.png"), Some("image/png")).await.unwrap();
        assert_eq!(urls.file_url, "https://cdn.test/artworks/a_b.png");
        assert!(matches!(
            svc.presigned_url(None, None).await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_presigned_url_unsupported_backend() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let local = LocalStorage::new(std::env::temp_dir(), "/files".to_string());
        let result = service(db, Arc::new(local)).presigned_url(Some("a.png"), None).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_input_from_json() {
        let input: ArtworkInput =
            serde_json::from_value(json!({"title_ko": "무제", "price": 0})).unwrap();
        assert!(input.validate().is_ok());
        assert!(input.image.is_none());
    }
}
