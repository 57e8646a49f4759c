//! Profile, gallery settings and member management endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post, put},
};
use maws_common::AppResult;
use maws_core::{
    AccountService, ChangePasswordInput, Dashboard, GalleryInfo, LoginHistoryEntry,
    PermissionCheck, UpdateGalleryInput, UpdateMemberInput, UpdateProfileInput, UserProfile,
};
use serde::Deserialize;

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{self, ApiResponse},
};

async fn profile(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<UserProfile>> {
    Ok(ApiResponse::ok(state.account.profile(&user).await?))
}

async fn update_profile(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<UpdateProfileInput>,
) -> AppResult<ApiResponse<UserProfile>> {
    Ok(ApiResponse::ok(state.account.update_profile(user, input).await?))
}

async fn change_password(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<ChangePasswordInput>,
) -> AppResult<impl IntoResponse> {
    state.account.change_password(user, input).await?;
    Ok(response::ok())
}

async fn login_history(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<LoginHistoryEntry>>> {
    Ok(ApiResponse::ok(state.account.login_history(&user).await?))
}

async fn dashboard(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Dashboard>> {
    Ok(ApiResponse::ok(state.account.dashboard(&user).await?))
}

async fn gallery_info(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<GalleryInfo>> {
    Ok(ApiResponse::ok(state.account.gallery_info(&user).await?))
}

async fn update_gallery(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<UpdateGalleryInput>,
) -> AppResult<ApiResponse<GalleryInfo>> {
    Ok(ApiResponse::ok(state.account.update_gallery(&user, input).await?))
}

async fn gallery_users(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<UserProfile>>> {
    Ok(ApiResponse::ok(state.account.gallery_users(&user).await?))
}

async fn update_member(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(member_id): Path<String>,
    Json(input): Json<UpdateMemberInput>,
) -> AppResult<ApiResponse<UserProfile>> {
    let updated = state.account.update_member(&user, &member_id, input).await?;
    Ok(ApiResponse::ok(updated))
}

#[derive(Debug, Deserialize)]
pub struct PermissionQuery {
    #[serde(default)]
    pub permission: String,
}

async fn check_permission(
    AuthUser(user): AuthUser,
    Query(query): Query<PermissionQuery>,
) -> ApiResponse<PermissionCheck> {
    ApiResponse::ok(AccountService::check_permission(&user, &query.permission))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(profile).put(update_profile))
        .route("/password", post(change_password))
        .route("/login-history", get(login_history))
        .route("/dashboard", get(dashboard))
        .route("/gallery", get(gallery_info).put(update_gallery))
        .route("/gallery/users", get(gallery_users))
        .route("/gallery/users/{id}", put(update_member))
        .route("/check-permission", get(check_permission))
}
