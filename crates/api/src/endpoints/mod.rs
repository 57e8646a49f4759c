//! API endpoints.

mod account;
mod admin;
mod artworks;
mod auth;
mod client_columns;
mod clients;
mod excel;
mod sms;
mod tags;

use axum::Router;
use chrono::Utc;
use maws_common::{AppError, AppResult};
use maws_core::{Capability, permission::ensure_capability};
use maws_db::entities::{gallery, user};

use crate::middleware::AppState;

/// The caller's gallery, provided it is active with a live subscription.
pub(crate) async fn member_gallery(
    state: &AppState,
    user: &user::Model,
) -> AppResult<gallery::Model> {
    let gallery = state.account.gallery_of(user).await?;
    if !gallery.is_active {
        return Err(AppError::Forbidden("비활성화된 갤러리입니다.".to_string()));
    }
    if !gallery.is_subscription_active_at(Utc::now().fixed_offset()) {
        return Err(AppError::Forbidden("구독이 만료되었습니다.".to_string()));
    }
    Ok(gallery)
}

/// The caller's gallery after the full capability guard.
pub(crate) async fn gallery_with(
    state: &AppState,
    user: &user::Model,
    capability: Capability,
) -> AppResult<gallery::Model> {
    let gallery = state.account.gallery_of(user).await?;
    ensure_capability(user, &gallery, capability)?;
    Ok(gallery)
}

/// Create the API router. `state` configures the admin route guard.
pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/account", account::router())
        .nest("/clients", clients::router())
        .nest("/tags", tags::router())
        .nest("/client-columns", client_columns::router())
        .nest("/excel", excel::router())
        .nest("/artworks", artworks::router())
        .nest("/sms", sms::router())
        .nest("/admin", admin::router(state))
}
