//! Client endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post, put},
};
use maws_common::AppResult;
use maws_core::{Capability, ClientView, NewClient, UpdateClient};
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
) -> AppResult<ApiResponse<Vec<ClientView>>> {
    let gallery = member_gallery(&state, &user).await?;
    Ok(ApiResponse::ok(state.clients.list(&gallery.id).await?))
}

async fn show(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<ClientView>> {
    let gallery = member_gallery(&state, &user).await?;
    Ok(ApiResponse::ok(state.clients.get(&gallery.id, &id).await?))
}

async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<NewClient>,
) -> AppResult<ApiResponse<ClientView>> {
    let gallery = gallery_with(&state, &user, Capability::ManageClients).await?;
    Ok(ApiResponse::created(state.clients.create(&gallery.id, input).await?))
}

async fn update(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateClient>,
) -> AppResult<ApiResponse<ClientView>> {
    let gallery = gallery_with(&state, &user, Capability::ManageClients).await?;
    Ok(ApiResponse::ok(state.clients.update(&gallery.id, &id, input).await?))
}

async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let gallery = gallery_with(&state, &user, Capability::ManageClients).await?;
    state.clients.delete(&gallery.id, &id).await?;
    Ok(response::ok())
}

#[derive(Debug, Deserialize)]
pub struct TagIdsRequest {
    #[serde(default)]
    pub tag_ids: Vec<String>,
}

/// Replace a client's tags.
async fn update_tags(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<TagIdsRequest>,
) -> AppResult<ApiResponse<ClientView>> {
    let gallery = gallery_with(&state, &user, Capability::ManageClients).await?;
    let client = state
        .clients
        .update_tags(&gallery.id, &id, &req.tag_ids)
        .await?;
    Ok(ApiResponse::ok(client))
}

/// Clients carrying any of the given tags.
async fn filter_by_tags(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<TagIdsRequest>,
) -> AppResult<ApiResponse<Vec<ClientView>>> {
    let gallery = member_gallery(&state, &user).await?;
    let clients = state.clients.filter_by_tags(&gallery.id, &req.tag_ids).await?;
    Ok(ApiResponse::ok(clients))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/filter-by-tags", post(filter_by_tags))
        .route("/{id}", get(show).put(update).delete(delete))
        .route("/{id}/tags", put(update_tags))
}
