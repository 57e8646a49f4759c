//! Platform administration endpoints. Superusers only.

use axum::{
    Router,
    extract::{Path, State},
    middleware,
    routing::get,
};
use maws_common::{AppError, AppResult};
use maws_core::StatType;
use maws_db::entities::user;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::{
    extractors::AuthUser,
    middleware::{AppState, admin_guard},
    response::ApiResponse,
};

fn require_superuser(user: &user::Model) -> AppResult<()> {
    if user.is_superuser {
        Ok(())
    } else {
        Err(AppError::Forbidden("관리자 권한이 필요합니다.".to_string()))
    }
}

/// All statistics sections with collection metadata.
async fn dashboard(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Value>> {
    require_superuser(&user)?;
    info!(user_id = %user.id, "Admin dashboard requested");
    Ok(ApiResponse::ok(state.admin_stats.dashboard().await))
}

/// One statistics section.
async fn stats_detail(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(stat_type): Path<String>,
) -> AppResult<ApiResponse<Value>> {
    require_superuser(&user)?;
    Ok(ApiResponse::ok(state.admin_stats.detail(&stat_type).await?))
}

#[derive(Serialize)]
pub struct AdminPermission {
    pub is_superuser: bool,
    pub username: String,
    pub available_stats: Vec<&'static str>,
}

async fn check_permission(AuthUser(user): AuthUser) -> AppResult<ApiResponse<AdminPermission>> {
    require_superuser(&user)?;
    Ok(ApiResponse::ok(AdminPermission {
        is_superuser: true,
        username: user.username,
        available_stats: StatType::NAMES.to_vec(),
    }))
}

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/stats/{stat_type}", get(stats_detail))
        .route("/check-permission", get(check_permission))
        .route_layer(middleware::from_fn_with_state(state.clone(), admin_guard))
}
