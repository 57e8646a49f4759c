//! Client tag endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
};
use maws_common::AppResult;
use maws_core::{Capability, CreateTagInput, UpdateTagInput};
use maws_db::entities::tag;
use serde::{Deserialize, Serialize};

use super::{gallery_with, member_gallery};
use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{self, ApiResponse},
};

async fn list(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<tag::Model>>> {
    let gallery = member_gallery(&state, &user).await?;
    Ok(ApiResponse::ok(state.tags.list(&gallery.id).await?))
}

async fn show(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<tag::Model>> {
    let gallery = member_gallery(&state, &user).await?;
    Ok(ApiResponse::ok(state.tags.get(&gallery.id, &id).await?))
}

async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateTagInput>,
) -> AppResult<ApiResponse<tag::Model>> {
    let gallery = gallery_with(&state, &user, Capability::ManageClients).await?;
    Ok(ApiResponse::created(state.tags.create(&gallery.id, input).await?))
}

async fn update(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateTagInput>,
) -> AppResult<ApiResponse<tag::Model>> {
    let gallery = gallery_with(&state, &user, Capability::ManageClients).await?;
    Ok(ApiResponse::ok(state.tags.update(&gallery.id, &id, input).await?))
}

async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let gallery = gallery_with(&state, &user, Capability::ManageClients).await?;
    state.tags.delete(&gallery.id, &id).await?;
    Ok(response::ok())
}

#[derive(Debug, Deserialize)]
pub struct GetOrCreateRequest {
    #[serde(default)]
    pub name: String,
    pub color: Option<String>,
}

#[derive(Serialize)]
pub struct GetOrCreateResponse {
    pub tag: tag::Model,
    pub created: bool,
}

/// Fetch a tag by exact name, creating it when missing.
async fn get_or_create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<GetOrCreateRequest>,
) -> AppResult<ApiResponse<GetOrCreateResponse>> {
    let gallery = gallery_with(&state, &user, Capability::ManageClients).await?;
    let (tag, created) = state
        .tags
        .get_or_create(&gallery.id, &req.name, req.color.as_deref())
        .await?;
    Ok(ApiResponse::ok(GetOrCreateResponse { tag, created }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/get-or-create", post(get_or_create))
        .route("/{id}", get(show).put(update).delete(delete))
}
