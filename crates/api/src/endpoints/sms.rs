//! SMS broadcast endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use maws_common::AppResult;
use maws_core::{BulkSendResult, HistoryEntry, MessageDetail, SendSmsInput};

use super::member_gallery;
use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Send one templated message to the selected clients. Runs to completion
/// within the request.
async fn send(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<SendSmsInput>,
) -> AppResult<ApiResponse<BulkSendResult>> {
    Ok(ApiResponse::ok(state.sms.send_bulk(&user, input).await?))
}

async fn history(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<HistoryEntry>>> {
    let gallery = member_gallery(&state, &user).await?;
    Ok(ApiResponse::ok(state.sms.history(&gallery.id).await?))
}

async fn detail(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<MessageDetail>> {
    let gallery = member_gallery(&state, &user).await?;
    Ok(ApiResponse::ok(state.sms.detail(&gallery.id, &id).await?))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/send", post(send))
        .route("/history", get(history))
        .route("/messages/{id}", get(detail))
}
