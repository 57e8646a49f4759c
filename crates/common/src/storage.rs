//! Object storage abstraction for file uploads.
//!
//! Supports both local filesystem and S3-compatible object storage.

use std::path::PathBuf;

use crate::{AppError, AppResult, config::StorageSettings};

/// Storage configuration.
#[derive(Debug, Clone)]
pub enum StorageConfig {
    /// Local filesystem storage.
    Local {
        /// Base path for stored files.
        base_path: PathBuf,
        /// Base URL for serving files.
        base_url: String,
    },
    /// S3-compatible object storage.
    S3 {
        /// S3 endpoint URL (e.g., "<https://s3.amazonaws.com>" or `MinIO` URL).
        endpoint: String,
        /// S3 bucket name.
        bucket: String,
        /// AWS region.
        region: String,
        /// Access key ID.
        access_key_id: String,
        /// Secret access key.
        secret_access_key: String,
        /// Public URL prefix for serving files.
        public_url: Option<String>,
        /// Path prefix within the bucket.
        prefix: Option<String>,
    },
}

impl StorageConfig {
    /// Build from the `storage` config section. Falls back to local storage
    /// when the S3 bucket or credentials are missing.
    #[must_use]
    pub fn from_settings(settings: &StorageSettings) -> Self {
        if settings.kind == "s3" {
            if let (Some(bucket), Some(access_key_id), Some(secret_access_key)) = (
                settings.s3_bucket.clone(),
                settings.s3_access_key_id.clone(),
                settings.s3_secret_access_key.clone(),
            ) {
                return Self::S3 {
                    endpoint: settings.s3_endpoint.clone().unwrap_or_else(|| {
                        format!("https://s3.{}.amazonaws.com", settings.s3_region)
                    }),
                    bucket,
                    region: settings.s3_region.clone(),
                    access_key_id,
                    secret_access_key,
                    public_url: None,
                    prefix: None,
                };
            }
            tracing::warn!("S3 storage selected but bucket or credentials missing, using local");
        }

        Self::Local {
            base_path: PathBuf::from(&settings.local_path),
            base_url: settings.local_url.clone(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Local {
            base_path: PathBuf::from("./files"),
            base_url: "/files".to_string(),
        }
    }
}

/// Uploaded file metadata.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Storage key (path or object key).
    pub key: String,
    /// Public URL to access the file.
    pub url: String,
    /// File size in bytes.
    pub size: u64,
    /// MIME content type.
    pub content_type: String,
    /// MD5 hash of the file.
    pub md5: String,
}

/// Direct-upload URL pair for clients that upload straight to object storage.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PresignedUpload {
    /// URL the client `PUT`s the file to.
    pub upload_url: String,
    /// URL the file is served from afterwards.
    pub file_url: String,
}

/// Storage backend trait.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Upload a file.
    async fn upload(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> AppResult<UploadedFile>;

    /// Delete a file.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Get the public URL for a key.
    fn public_url(&self, key: &str) -> String;

    /// Check if a file exists.
    async fn exists(&self, key: &str) -> AppResult<bool>;

    /// Key of a URL built by [`Self::public_url`], `None` for foreign URLs.
    fn key_for_url(&self, url: &str) -> Option<String> {
        url.strip_prefix(&self.public_url(""))
            .filter(|key| !key.is_empty())
            .map(str::to_string)
    }

    /// Presign a direct upload. Backends without direct upload return `None`.
    async fn presign_upload(
        &self,
        _key: &str,
        _content_type: &str,
    ) -> AppResult<Option<PresignedUpload>> {
        Ok(None)
    }
}

/// Local filesystem storage backend.
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new local storage backend.
    #[must_use] 
    pub const fn new(base_path: PathBuf, base_url: String) -> Self {
        Self { base_path, base_url }
    }
}

#[async_trait::async_trait]
impl StorageBackend for LocalStorage {
    async fn upload(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> AppResult<UploadedFile> {
        let path = self.base_path.join(key);

        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Internal(format!("Failed to create directory: {e}")))?;
        }

        // Write file
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to write file: {e}")))?;

        // Calculate MD5
        let md5 = format!("{:x}", md5::compute(data));

        Ok(UploadedFile {
            key: key.to_string(),
            url: self.public_url(key),
            size: data.len() as u64,
            content_type: content_type.to_string(),
            md5,
        })
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let path = self.base_path.join(key);
        if path.exists() {
            tokio::fs::remove_file(&path)
                .await
                .map_err(|e| AppError::Internal(format!("Failed to delete file: {e}")))?;
        }
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let path = self.base_path.join(key);
        Ok(path.exists())
    }
}

/// S3-compatible object storage backend.
#[cfg(feature = "s3")]
pub struct S3Storage {
    client: aws_sdk_s3::Client,
    bucket: String,
    region: String,
    public_url: Option<String>,
    prefix: Option<String>,
}

#[cfg(feature = "s3")]
impl S3Storage {
    /// Create a new S3 storage backend.
    pub async fn new(
        endpoint: &str,
        bucket: String,
        region: &str,
        access_key_id: &str,
        secret_access_key: &str,
        public_url: Option<String>,
        prefix: Option<String>,
    ) -> AppResult<Self> {
        use aws_config::Region;
        use aws_sdk_s3::config::Credentials;

        let credentials = Credentials::new(
            access_key_id,
            secret_access_key,
            None,
            None,
            "maws",
        );

        let config = aws_sdk_s3::Config::builder()
            .endpoint_url(endpoint)
            .region(Region::new(region.to_string()))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        let client = aws_sdk_s3::Client::from_conf(config);

        Ok(Self {
            client,
            bucket,
            region: region.to_string(),
            public_url,
            prefix,
        })
    }

    fn full_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}/{}", prefix.trim_end_matches('/'), key),
            None => key.to_string(),
        }
    }
}

#[cfg(feature = "s3")]
#[async_trait::async_trait]
impl StorageBackend for S3Storage {
    async fn upload(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> AppResult<UploadedFile> {
        use aws_sdk_s3::primitives::ByteStream;

        let full_key = self.full_key(key);
        let md5 = format!("{:x}", md5::compute(data));

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .body(ByteStream::from(data.to_vec()))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("S3 upload failed: {e}")))?;

        Ok(UploadedFile {
            key: key.to_string(),
            url: self.public_url(key),
            size: data.len() as u64,
            content_type: content_type.to_string(),
            md5,
        })
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let full_key = self.full_key(key);

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("S3 delete failed: {e}")))?;

        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        let full_key = self.full_key(key);
        match &self.public_url {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), full_key),
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, full_key
            ),
        }
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let full_key = self.full_key(key);

        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                if e.to_string().contains("NotFound") || e.to_string().contains("404") {
                    Ok(false)
                } else {
                    Err(AppError::Internal(format!("S3 head_object failed: {e}")))
                }
            }
        }
    }

    async fn presign_upload(
        &self,
        key: &str,
        content_type: &str,
    ) -> AppResult<Option<PresignedUpload>> {
        use aws_sdk_s3::presigning::PresigningConfig;

        let full_key = self.full_key(key);
        let presign_config = PresigningConfig::expires_in(std::time::Duration::from_secs(3600))
            .map_err(|e| AppError::Internal(format!("S3 presign config failed: {e}")))?;

        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .content_type(content_type)
            .presigned(presign_config)
            .await
            .map_err(|e| AppError::ExternalService(format!("S3 presign failed: {e}")))?;

        Ok(Some(PresignedUpload {
            upload_url: request.uri().to_string(),
            file_url: self.public_url(key),
        }))
    }
}

/// Storage key for an artwork image: `artworks/{file name}`.
///
/// Path separators and whitespace in the client-supplied name are replaced so
/// the key cannot escape the `artworks/` prefix.
#[must_use]
pub fn artwork_storage_key(original_name: &str) -> String {
    let base = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original_name)
        .trim();

    let sanitized: String = base
        .chars()
        .map(|c| if c.is_whitespace() || c == ':' { '_' } else { c })
        .collect();

    let name = match sanitized.trim_start_matches('.') {
        "" => format!("{}.bin", chrono::Utc::now().timestamp_millis()),
        rest => rest.to_string(),
    };

    format!("artworks/{name}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_config_falls_back_to_local() {
        let settings = StorageSettings {
            kind: "s3".to_string(),
            ..StorageSettings::default()
        };
        assert!(matches!(
            StorageConfig::from_settings(&settings),
            StorageConfig::Local { .. }
        ));
    }

    #[test]
    fn test_artwork_storage_key() {
        assert_eq!(artwork_storage_key("sunset.jpg"), "artworks/sunset.jpg");
        assert_eq!(artwork_storage_key("my photo.png"), "artworks/my_photo.png");
        assert_eq!(artwork_storage_key("../../etc/passwd"), "artworks/passwd");
        assert!(artwork_storage_key("").ends_with(".bin"));
    }

    #[tokio::test]
    async fn test_local_storage_roundtrip() {
        let dir = std::env::temp_dir().join(format!("maws-storage-{}", uuid::Uuid::new_v4()));
        let storage = LocalStorage::new(dir.clone(), "/files/".to_string());

        let uploaded = storage
            .upload("artworks/a.txt", b"hello", "text/plain")
            .await
            .unwrap();
        assert_eq!(uploaded.url, "/files/artworks/a.txt");
        assert_eq!(uploaded.size, 5);
        assert!(storage.exists("artworks/a.txt").await.unwrap());
        assert_eq!(storage.key_for_url(&uploaded.url).as_deref(), Some("artworks/a.txt"));
        assert_eq!(storage.key_for_url("https://elsewhere.test/a.txt"), None);
        assert!(storage.presign_upload("artworks/a.txt", "text/plain").await.unwrap().is_none());

        storage.delete("artworks/a.txt").await.unwrap();
        assert!(!storage.exists("artworks/a.txt").await.unwrap());
        let _ = tokio::fs::remove_dir_all(dir).await;
    }
}
