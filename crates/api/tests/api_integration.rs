//! API integration tests.
//!
//! Requests run through the full router and auth middleware over a mock
//! database.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
    middleware,
    response::Response,
};
use chrono::Utc;
use maws_api::{middleware::AppState, middleware::auth_middleware, router as api_router};
use maws_common::{
    LocalStorage, TokenIssuer, TokenKind,
    config::{AdminConfig, AuthConfig, SmsConfig},
};
use maws_core::{
    AccountService, AdminStatsService, ArtworkService, AuthService, ClientColumnService,
    ClientService, ExcelImportService, SmsService, TagService,
};
use maws_db::{
    entities::user::{self, UserRole},
    repositories::{
        ArtworkRepository, ClientColumnRepository, ClientRepository, GalleryRepository,
        PhoneVerificationRepository, SmsRepository, TagRepository, UserRepository,
    },
};
use sea_orm::{DatabaseBackend, MockDatabase};
use serde_json::Value;
use tower::ServiceExt;

fn auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "integration-test-secret".to_string(),
        access_token_minutes: 15,
        refresh_token_days: 7,
        skip_email_verification: true,
        require_phone_verification: false,
        max_failed_logins: 5,
        lockout_minutes: 30,
    }
}

fn test_user(id: &str, role: UserRole, gallery_id: Option<&str>) -> user::Model {
    user::Model {
        id: id.to_string(),
        gallery_id: gallery_id.map(ToString::to_string),
        username: id.to_string(),
        email: format!("{id}@example.com"),
        password_hash: String::new(),
        first_name: String::new(),
        last_name: String::new(),
        phone: None,
        emergency_contact: None,
        job_title: None,
        role,
        can_manage_clients: true,
        can_manage_artworks: true,
        can_export_data: false,
        can_send_messages: false,
        can_view_reports: false,
        can_manage_users: false,
        can_manage_gallery_settings: false,
        is_active: true,
        is_staff: false,
        is_superuser: false,
        email_verified: true,
        failed_login_attempts: 0,
        account_locked_until: None,
        last_login: None,
        last_login_ip: None,
        password_changed_at: None,
        timezone_setting: "Asia/Seoul".to_string(),
        language: "ko".to_string(),
        theme_preference: "light".to_string(),
        created_at: Utc::now().into(),
        updated_at: None,
    }
}

fn superuser() -> user::Model {
    let mut admin = test_user("root", UserRole::Staff, None);
    admin.is_superuser = true;
    admin
}

fn access_token(user: &user::Model) -> String {
    TokenIssuer::from_config(&auth_config())
        .issue(&user.id, user.role.as_str(), TokenKind::Access)
        .unwrap()
}

/// Build the app over a mock database that answers user lookups with
/// `users`, in order.
fn create_test_app(users: Vec<Vec<user::Model>>, admin: AdminConfig) -> Router {
    let db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(users)
            .into_connection(),
    );

    let user_repo = UserRepository::new(Arc::clone(&db));
    let gallery_repo = GalleryRepository::new(Arc::clone(&db));
    let client_repo = ClientRepository::new(Arc::clone(&db));
    let column_repo = ClientColumnRepository::new(Arc::clone(&db));
    let tag_repo = TagRepository::new(Arc::clone(&db));
    let artwork_repo = ArtworkRepository::new(Arc::clone(&db));
    let sms_repo = SmsRepository::new(Arc::clone(&db));

    let tags = TagService::new(tag_repo.clone());
    let clients = ClientService::new(client_repo.clone(), tags.clone());
    let columns = ClientColumnService::new(column_repo.clone());
    let storage = Arc::new(LocalStorage::new(
        PathBuf::from("./target/test-files"),
        "/files".to_string(),
    ));

    let state = AppState {
        auth: AuthService::new(
            user_repo.clone(),
            gallery_repo.clone(),
            PhoneVerificationRepository::new(Arc::clone(&db)),
            &auth_config(),
        ),
        account: AccountService::new(user_repo.clone(), gallery_repo.clone()),
        excel: ExcelImportService::new(clients.clone(), columns.clone(), tags.clone()),
        artworks: ArtworkService::new(artwork_repo.clone(), client_repo.clone(), storage),
        sms: SmsService::new(
            sms_repo.clone(),
            client_repo.clone(),
            gallery_repo.clone(),
            user_repo.clone(),
            &SmsConfig::default(),
        )
        .unwrap(),
        admin_stats: AdminStatsService::new(
            gallery_repo,
            user_repo.clone(),
            client_repo,
            artwork_repo,
            tag_repo,
            column_repo,
            sms_repo,
        ),
        clients,
        tags,
        columns,
        users: user_repo,
        admin,
    };

    api_router(&state)
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri).method("GET");
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, token: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .uri(uri)
        .method("POST")
        .header("Content-Type", "application/json");
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_unknown_endpoint_returns_404() {
    let app = create_test_app(vec![], AdminConfig::default());

    let response = app.oneshot(get("/nonexistent/endpoint", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_clients_require_authentication() {
    let app = create_test_app(vec![], AdminConfig::default());

    let response = app.oneshot(get("/clients", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invalid_token_is_unauthorized() {
    let app = create_test_app(vec![], AdminConfig::default());

    let response = app
        .oneshot(get("/account/profile", Some("not-a-jwt")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_with_unknown_user_is_unauthorized() {
    let app = create_test_app(vec![vec![]], AdminConfig::default());

    let response = app
        .oneshot(post_json(
            "/auth/login",
            None,
            r#"{"username":"nobody","password":"wrongpassword"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_login_with_invalid_json_is_rejected() {
    let app = create_test_app(vec![], AdminConfig::default());

    let response = app
        .oneshot(post_json("/auth/login", None, "invalid json"))
        .await
        .unwrap();

    assert!(
        response.status() == StatusCode::BAD_REQUEST
            || response.status() == StatusCode::UNPROCESSABLE_ENTITY
    );
}

#[tokio::test]
async fn test_force_logout_requires_authentication() {
    let app = create_test_app(vec![], AdminConfig::default());

    let response = app
        .oneshot(post_json("/auth/force-logout", None, r#"{"session_id":"h1"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_phone_verification_requires_number() {
    let app = create_test_app(vec![], AdminConfig::default());

    let response = app
        .oneshot(post_json("/auth/send-phone-verification", None, r#"{"phone_number":""}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_check_permission_reports_flag() {
    let staff = test_user("u1", UserRole::Staff, Some("g1"));
    let token = access_token(&staff);
    let app = create_test_app(vec![vec![staff]], AdminConfig::default());

    let response = app
        .oneshot(get(
            "/account/check-permission?permission=send_messages",
            Some(&token),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["permission"], "send_messages");
    assert_eq!(body["data"]["has_permission"], false);
}

#[tokio::test]
async fn test_gallery_routes_forbid_users_without_gallery() {
    let admin = superuser();
    let token = access_token(&admin);
    let app = create_test_app(vec![vec![admin]], AdminConfig::default());

    let response = app.oneshot(get("/tags", Some(&token))).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_sms_send_requires_recipients() {
    let staff = test_user("u1", UserRole::Staff, Some("g1"));
    let token = access_token(&staff);
    let app = create_test_app(vec![vec![staff]], AdminConfig::default());

    let response = app
        .oneshot(post_json(
            "/sms/send",
            Some(&token),
            r#"{"client_ids":[],"message":"안녕하세요 {{고객명}}님"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_analyze_headers_maps_known_headers() {
    let staff = test_user("u1", UserRole::Staff, Some("g1"));
    let token = access_token(&staff);
    let app = create_test_app(vec![vec![staff]], AdminConfig::default());

    let response = app
        .oneshot(post_json(
            "/excel/analyze-headers",
            Some(&token),
            r#"{"headers":["고객명","연락처","column3"]}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["mapping"]["고객명"], "customer_name");
    assert_eq!(body["data"]["mapping"]["연락처"], "phone");
    assert_eq!(body["data"]["mapping"]["column3"], "unknown_field_3");
}

#[tokio::test]
async fn test_admin_requires_superuser() {
    let staff = test_user("u1", UserRole::Owner, Some("g1"));
    let token = access_token(&staff);
    let app = create_test_app(vec![vec![staff]], AdminConfig::default());

    let response = app
        .oneshot(get("/admin/check-permission", Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_check_permission_for_superuser() {
    let admin = superuser();
    let token = access_token(&admin);
    let app = create_test_app(vec![vec![admin]], AdminConfig::default());

    let response = app
        .oneshot(get("/admin/check-permission", Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-frame-options").unwrap(),
        "DENY"
    );
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    let body = json_body(response).await;
    assert_eq!(body["data"]["is_superuser"], true);
    assert_eq!(body["data"]["available_stats"][0], "system");
}

#[tokio::test]
async fn test_admin_ip_allow_list() {
    let admin = superuser();
    let token = access_token(&admin);
    let allow_list = AdminConfig {
        allowed_ips: "10.0.0.1, 10.0.0.2".to_string(),
    };

    let app = create_test_app(vec![vec![admin.clone()]], allow_list.clone());
    let mut request = get("/admin/check-permission", Some(&token));
    request
        .headers_mut()
        .insert("x-forwarded-for", "192.168.0.9".parse().unwrap());
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(response.headers().get("content-security-policy").is_some());

    let app = create_test_app(vec![vec![admin]], allow_list);
    let mut request = get("/admin/check-permission", Some(&token));
    request
        .headers_mut()
        .insert("x-forwarded-for", "10.0.0.2, 172.16.0.1".parse().unwrap());
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_stat_type_is_bad_request() {
    let admin = superuser();
    let token = access_token(&admin);
    let app = create_test_app(vec![vec![admin]], AdminConfig::default());

    let response = app
        .oneshot(get("/admin/stats/revenue", Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
