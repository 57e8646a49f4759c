//! Authentication endpoints.

use axum::{Json, Router, extract::State, routing::post};
use maws_common::{AppResult, TokenPair};
use maws_core::{
    LoginInput, LoginResponse, PhoneCodeSent, PhoneCodeVerified, QuickSignupInput, RegisterInput,
    RegistrationCodeInfo, SendPhoneCodeInput, UserSummary, VerifyPhoneCodeInput,
};
use serde::{Deserialize, Serialize};

use crate::{
    extractors::{AuthUser, ClientIp, UserAgent},
    middleware::AppState,
    response::ApiResponse,
};

/// Join an existing gallery with its registration code.
async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> AppResult<ApiResponse<UserSummary>> {
    let (user, gallery) = state.auth.register(input).await?;
    Ok(ApiResponse::created(UserSummary::new(&user, Some(&gallery))))
}

/// Create a gallery together with its owner.
async fn quick_signup(
    State(state): State<AppState>,
    Json(input): Json<QuickSignupInput>,
) -> AppResult<ApiResponse<UserSummary>> {
    let (user, gallery) = state.auth.quick_signup(input).await?;
    Ok(ApiResponse::created(UserSummary::new(&user, Some(&gallery))))
}

async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    UserAgent(user_agent): UserAgent,
    Json(input): Json<LoginInput>,
) -> AppResult<ApiResponse<LoginResponse>> {
    let response = state
        .auth
        .login(input, ip.as_deref(), user_agent.as_deref())
        .await?;
    Ok(ApiResponse::ok(response))
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> AppResult<ApiResponse<TokenPair>> {
    Ok(ApiResponse::ok(state.auth.refresh(&req.refresh).await?))
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub session_closed: bool,
}

/// Close the caller's newest login session.
async fn logout(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<LogoutResponse>> {
    let session_closed = state.auth.logout(&user.id).await?;
    Ok(ApiResponse::ok(LogoutResponse { session_closed }))
}

#[derive(Debug, Deserialize)]
pub struct ForceLogoutRequest {
    #[serde(default)]
    pub session_id: String,
}

/// Close one of the caller's sessions, e.g. on a lost device.
async fn force_logout(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ForceLogoutRequest>,
) -> AppResult<ApiResponse<LogoutResponse>> {
    state.auth.force_logout(&user.id, &req.session_id).await?;
    Ok(ApiResponse::ok(LogoutResponse {
        session_closed: true,
    }))
}

async fn send_phone_verification(
    State(state): State<AppState>,
    Json(input): Json<SendPhoneCodeInput>,
) -> AppResult<ApiResponse<PhoneCodeSent>> {
    let sent = state.auth.send_phone_code(&input.phone_number).await?;
    Ok(ApiResponse::ok(sent))
}

async fn verify_phone_code(
    State(state): State<AppState>,
    Json(input): Json<VerifyPhoneCodeInput>,
) -> AppResult<ApiResponse<PhoneCodeVerified>> {
    let verified = state
        .auth
        .verify_phone_code(&input.phone_number, &input.code)
        .await?;
    Ok(ApiResponse::ok(verified))
}

#[derive(Debug, Deserialize)]
pub struct ValidateCodeRequest {
    #[serde(default)]
    pub registration_code: String,
}

async fn validate_code(
    State(state): State<AppState>,
    Json(req): Json<ValidateCodeRequest>,
) -> AppResult<ApiResponse<RegistrationCodeInfo>> {
    let info = state
        .auth
        .validate_registration_code(&req.registration_code)
        .await?;
    Ok(ApiResponse::ok(info))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/quick-signup", post(quick_signup))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/force-logout", post(force_logout))
        .route("/send-phone-verification", post(send_phone_verification))
        .route("/verify-phone-code", post(verify_phone_code))
        .route("/validate-code", post(validate_code))
}
