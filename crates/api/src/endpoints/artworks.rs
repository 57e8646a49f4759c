//! Artwork endpoints.

use std::collections::HashMap;
use std::str::FromStr;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
};
use maws_common::{AppError, AppResult, PresignedUpload};
use maws_core::{ArtworkInput, Capability, ImageUpload};
use maws_db::{
    entities::artwork,
    repositories::{ArtworkFilter, ArtworkSort},
};
use serde::Deserialize;

use super::{gallery_with, member_gallery};
use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{self, ApiResponse},
};

/// Largest accepted artwork form, image included.
const MAX_FORM_BYTES: usize = 20 * 1024 * 1024;

fn parse_number<T: FromStr>(fields: &HashMap<String, String>, key: &str) -> AppResult<Option<T>> {
    match fields.get(key).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| AppError::Validation(format!("{key}: 숫자가 아닙니다."))),
        None => Ok(None),
    }
}

fn parse_flag(fields: &HashMap<String, String>, key: &str) -> Option<bool> {
    fields
        .get(key)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "on" | "yes"))
}

/// Build the input from text form fields. Blank numbers count as absent;
/// blank text clears the field on update.
fn artwork_input(
    mut fields: HashMap<String, String>,
    image: Option<ImageUpload>,
) -> AppResult<ArtworkInput> {
    Ok(ArtworkInput {
        height: parse_number(&fields, "height")?,
        width: parse_number(&fields, "width")?,
        depth: parse_number(&fields, "depth")?,
        price: parse_number(&fields, "price")?,
        has_missing_fields: parse_flag(&fields, "has_missing_fields"),
        size_unit: fields.remove("size_unit").filter(|u| !u.trim().is_empty()),
        title_ko: fields.remove("title_ko"),
        title_en: fields.remove("title_en"),
        artist_ko: fields.remove("artist_ko"),
        artist_en: fields.remove("artist_en"),
        year: fields.remove("year"),
        medium: fields.remove("medium"),
        buyer_id: fields.remove("buyer_id"),
        note: fields.remove("note"),
        image,
    })
}

async fn read_form(mut multipart: Multipart) -> AppResult<ArtworkInput> {
    let mut fields = HashMap::new();
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("잘못된 요청입니다: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "image" {
            let file_name = field.file_name().unwrap_or("image").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("이미지를 읽을 수 없습니다: {e}")))?;
            if !bytes.is_empty() {
                image = Some(ImageUpload {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(format!("잘못된 필드입니다: {e}")))?;
            fields.insert(name, value);
        }
    }

    artwork_input(fields, image)
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub artist: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
}

async fn list(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<ApiResponse<Vec<artwork::Model>>> {
    let gallery = member_gallery(&state, &user).await?;
    let filter = ArtworkFilter {
        sort: ArtworkSort::parse(query.sort.as_deref()),
        artist: query.artist,
        search: query.search,
    };
    Ok(ApiResponse::ok(state.artworks.list(&gallery.id, &filter).await?))
}

async fn show(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<artwork::Model>> {
    let gallery = member_gallery(&state, &user).await?;
    Ok(ApiResponse::ok(state.artworks.get(&gallery.id, &id).await?))
}

async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<ApiResponse<artwork::Model>> {
    let gallery = gallery_with(&state, &user, Capability::ManageArtworks).await?;
    let input = read_form(multipart).await?;
    Ok(ApiResponse::created(state.artworks.create(&gallery.id, input).await?))
}

async fn update(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> AppResult<ApiResponse<artwork::Model>> {
    let gallery = gallery_with(&state, &user, Capability::ManageArtworks).await?;
    let input = read_form(multipart).await?;
    Ok(ApiResponse::ok(state.artworks.update(&gallery.id, &id, input).await?))
}

async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let gallery = gallery_with(&state, &user, Capability::ManageArtworks).await?;
    state.artworks.delete(&gallery.id, &id).await?;
    Ok(response::ok())
}

#[derive(Debug, Deserialize)]
pub struct PresignRequest {
    pub file_name: Option<String>,
    pub file_type: Option<String>,
}

/// URLs for uploading an image straight to object storage.
async fn presigned_url(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<PresignRequest>,
) -> AppResult<ApiResponse<PresignedUpload>> {
    gallery_with(&state, &user, Capability::ManageArtworks).await?;
    let urls = state
        .artworks
        .presigned_url(req.file_name.as_deref(), req.file_type.as_deref())
        .await?;
    Ok(ApiResponse::ok(urls))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(show).put(update).delete(delete))
        .layer(DefaultBodyLimit::max(MAX_FORM_BYTES))
        .route("/presigned-url", post(presigned_url))
}
