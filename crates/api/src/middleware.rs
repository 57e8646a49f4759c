//! API middleware.

#![allow(missing_docs)]

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use maws_common::{AppError, AppResult, TokenKind, config::AdminConfig};
use maws_core::{
    AccountService, AdminStatsService, ArtworkService, AuthService, ClientColumnService,
    ClientService, ExcelImportService, SmsService, TagService,
};
use maws_db::{entities::user, repositories::UserRepository};
use tracing::{debug, warn};

use crate::extractors::ClientIp;

/// Headers added to every `/admin` response.
const SECURITY_HEADERS: [(&str, &str); 5] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("x-xss-protection", "1; mode=block"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
    ("content-security-policy", "default-src 'self'"),
];

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub account: AccountService,
    pub clients: ClientService,
    pub tags: TagService,
    pub columns: ClientColumnService,
    pub excel: ExcelImportService,
    pub artworks: ArtworkService,
    pub sms: SmsService,
    pub admin_stats: AdminStatsService,
    pub users: UserRepository,
    pub admin: AdminConfig,
}

impl AppState {
    /// Resolve an access token to an active, unlocked user.
    pub async fn authenticate(&self, token: &str) -> AppResult<user::Model> {
        let claims = self.auth.tokens().validate(token, TokenKind::Access)?;
        let now = Utc::now().fixed_offset();
        self.users
            .find_by_id(&claims.sub)
            .await?
            .filter(|u| u.is_active && !u.is_locked_at(now))
            .ok_or(AppError::Unauthorized)
    }
}

fn bearer_token(req: &Request<Body>) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Authentication middleware.
///
/// A valid bearer token puts the user into the request extensions for
/// [`crate::extractors::AuthUser`]. Requests without one pass through and are
/// rejected by handlers that need a user.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(token) = bearer_token(&req) {
        match state.authenticate(&token).await {
            Ok(user) => {
                req.extensions_mut().insert(user);
            }
            Err(e) => debug!(error = %e, "Bearer token rejected"),
        }
    }

    next.run(req).await
}

/// Admin route guard: enforces the configured IP allow-list and adds
/// browser security headers to the response.
pub async fn admin_guard(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let allowed = state.admin.allowed_ip_list();
    let (parts, body) = req.into_parts();

    if !allowed.is_empty() {
        let ClientIp(ip) = ClientIp::from_parts(&parts);
        let permitted = ip.as_deref().is_some_and(|ip| allowed.iter().any(|a| a == ip));
        if !permitted {
            warn!(ip = ip.as_deref().unwrap_or("unknown"), "Admin access from disallowed IP");
            return with_security_headers(
                AppError::Forbidden("허용되지 않은 IP입니다.".to_string()).into_response(),
            );
        }
    }

    with_security_headers(next.run(Request::from_parts(parts, body)).await)
}

fn with_security_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    for (name, value) in SECURITY_HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
    response
}
