//! Client tag service.

use std::sync::LazyLock;

use chrono::Utc;
use maws_common::{AppError, AppResult, IdGenerator};
use maws_db::{entities::tag, repositories::TagRepository};
use regex::Regex;
use sea_orm::Set;
use serde::Deserialize;
use tracing::debug;
use validator::Validate;

/// Tag every client carries when nothing else applies.
pub const DEFAULT_TAG_NAME: &str = "일반고객";
/// Color of [`DEFAULT_TAG_NAME`].
pub const DEFAULT_TAG_COLOR: &str = "#6B7280";
/// Color for tags created without one.
pub const FALLBACK_TAG_COLOR: &str = "#3B82F6";

#[allow(clippy::unwrap_used)]
static HEX_COLOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").unwrap());

fn check_color(color: &str) -> AppResult<()> {
    if HEX_COLOR_RE.is_match(color) {
        Ok(())
    } else {
        Err(AppError::Validation(format!("Invalid color: {color}")))
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTagInput {
    #[validate(length(min = 1, max = 50))]
    pub name: String,
    pub color: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTagInput {
    #[validate(length(min = 1, max = 50))]
    pub name: Option<String>,
    pub color: Option<String>,
}

/// Tag service.
#[derive(Clone)]
pub struct TagService {
    tag_repo: TagRepository,
    id_gen: IdGenerator,
}

impl TagService {
    /// Create a new tag service.
    #[must_use]
    pub const fn new(tag_repo: TagRepository) -> Self {
        Self {
            tag_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Underlying repository, shared with the client service.
    #[must_use]
    pub const fn repository(&self) -> &TagRepository {
        &self.tag_repo
    }

    /// Tags of the gallery.
    pub async fn list(&self, gallery_id: &str) -> AppResult<Vec<tag::Model>> {
        self.tag_repo.find_by_gallery(gallery_id).await
    }

    pub async fn get(&self, gallery_id: &str, id: &str) -> AppResult<tag::Model> {
        self.tag_repo.get_in_gallery(gallery_id, id).await
    }

    /// Create a tag. Names are unique per gallery and a missing color falls
    /// back to the neutral gray.
    pub async fn create(&self, gallery_id: &str, input: CreateTagInput) -> AppResult<tag::Model> {
        input.validate()?;
        let name = input.name.trim().to_string();
        let color = input
            .color
            .unwrap_or_else(|| FALLBACK_TAG_COLOR.to_string());
        check_color(&color)?;

        if self.tag_repo.find_by_name(gallery_id, &name).await?.is_some() {
            return Err(AppError::Conflict(format!("Tag already exists: {name}")));
        }
        self.insert(gallery_id, name, color).await
    }

    async fn insert(&self, gallery_id: &str, name: String, color: String) -> AppResult<tag::Model> {
        self.tag_repo
            .create(tag::ActiveModel {
                id: Set(self.id_gen.generate()),
                gallery_id: Set(gallery_id.to_string()),
                name: Set(name),
                color: Set(color),
                created_at: Set(Utc::now().into()),
            })
            .await
    }

    /// Rename or recolor. Renaming onto another tag's name is a `Conflict`.
    pub async fn update(
        &self,
        gallery_id: &str,
        id: &str,
        input: UpdateTagInput,
    ) -> AppResult<tag::Model> {
        input.validate()?;
        let existing = self.tag_repo.get_in_gallery(gallery_id, id).await?;

        if let Some(name) = input.name.as_deref().map(str::trim) {
            if name != existing.name
                && self.tag_repo.find_by_name(gallery_id, name).await?.is_some()
            {
                return Err(AppError::Conflict(format!("Tag already exists: {name}")));
            }
        }
        if let Some(color) = input.color.as_deref() {
            check_color(color)?;
        }

        let mut active: tag::ActiveModel = existing.into();
        if let Some(name) = input.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(color) = input.color {
            active.color = Set(color);
        }
        self.tag_repo.update(active).await
    }

    /// Delete a tag. Clients keep their other tags.
    pub async fn delete(&self, gallery_id: &str, id: &str) -> AppResult<()> {
        let tag = self.tag_repo.get_in_gallery(gallery_id, id).await?;
        self.tag_repo.delete(&tag.id).await
    }

    /// Fetch the tag with this exact name, creating it when missing.
    /// The flag tells whether it was created.
    pub async fn get_or_create(
        &self,
        gallery_id: &str,
        name: &str,
        color: Option<&str>,
    ) -> AppResult<(tag::Model, bool)> {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > 50 {
            return Err(AppError::Validation(
                "태그명은 1~50자여야 합니다.".to_string(),
            ));
        }
        if let Some(existing) = self.tag_repo.find_by_name(gallery_id, name).await? {
            return Ok((existing, false));
        }

        let color = color.unwrap_or(FALLBACK_TAG_COLOR);
        check_color(color)?;
        let created = self
            .insert(gallery_id, name.to_string(), color.to_string())
            .await?;
        debug!(gallery_id = %gallery_id, tag = %created.name, "Tag created");
        Ok((created, true))
    }

    /// The gallery's default client tag.
    pub async fn default_tag(&self, gallery_id: &str) -> AppResult<tag::Model> {
        self.get_or_create(gallery_id, DEFAULT_TAG_NAME, Some(DEFAULT_TAG_COLOR))
            .await
            .map(|(tag, _)| tag)
    }

    /// Attach the default tag when the client has none.
    /// Returns whether it was attached.
    pub async fn ensure_default_tag(&self, gallery_id: &str, client_id: &str) -> AppResult<bool> {
        if self.tag_repo.count_for_client(client_id).await? > 0 {
            return Ok(false);
        }
        let tag = self.default_tag(gallery_id).await?;
        self.tag_repo
            .attach(client_id, std::slice::from_ref(&tag.id))
            .await?;
        Ok(true)
    }
}
