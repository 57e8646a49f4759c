//! Client column endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
};
use maws_common::AppResult;
use maws_core::{Capability, CreateColumnInput, SyncColumn, UpdateColumnInput};
use maws_db::entities::client_column;
use serde::Deserialize;

use super::{gallery_with, member_gallery};
use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{self, ApiResponse},
};

async fn list(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<client_column::Model>>> {
    let gallery = member_gallery(&state, &user).await?;
    Ok(ApiResponse::ok(state.columns.list(&gallery.id).await?))
}

async fn show(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<client_column::Model>> {
    let gallery = member_gallery(&state, &user).await?;
    Ok(ApiResponse::ok(state.columns.get(&gallery.id, &id).await?))
}

async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateColumnInput>,
) -> AppResult<ApiResponse<client_column::Model>> {
    let gallery = gallery_with(&state, &user, Capability::ManageClients).await?;
    Ok(ApiResponse::created(state.columns.create(&gallery.id, input).await?))
}

async fn update(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateColumnInput>,
) -> AppResult<ApiResponse<client_column::Model>> {
    let gallery = gallery_with(&state, &user, Capability::ManageClients).await?;
    Ok(ApiResponse::ok(state.columns.update(&gallery.id, &id, input).await?))
}

async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let gallery = gallery_with(&state, &user, Capability::ManageClients).await?;
    state.columns.delete(&gallery.id, &id).await?;
    Ok(response::ok())
}

#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    #[serde(default)]
    pub columns: Vec<SyncColumn>,
}

/// Replace the gallery's whole column set.
async fn sync(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<SyncRequest>,
) -> AppResult<ApiResponse<Vec<client_column::Model>>> {
    let gallery = gallery_with(&state, &user, Capability::ManageClients).await?;
    Ok(ApiResponse::ok(state.columns.sync(&gallery.id, req.columns).await?))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/sync", post(sync))
        .route("/{id}", get(show).put(update).delete(delete))
}
