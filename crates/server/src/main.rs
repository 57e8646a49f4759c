//! maws server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, middleware};
use maws_api::{middleware::AppState, router as api_router};
use maws_common::{Config, LocalStorage, StorageBackend, StorageConfig, config::StorageSettings};
use maws_core::{
    AccountService, AdminStatsService, ArtworkService, AuthService, ClientColumnService,
    ClientService, ExcelImportService, SmsService, TagService, TwilioGateway,
};
use maws_db::repositories::{
    ArtworkRepository, ClientColumnRepository, ClientRepository, GalleryRepository,
    PhoneVerificationRepository, SmsRepository, TagRepository, UserRepository,
};
use tokio::signal;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

fn init_tracing() {
    let json = std::env::var("MAWS_LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    tracing_subscriber::registry()
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "maws=debug,tower_http=debug".into()),
        )
        .init();
}

async fn build_storage(
    settings: &StorageSettings,
) -> Result<Arc<dyn StorageBackend>, Box<dyn std::error::Error>> {
    match StorageConfig::from_settings(settings) {
        StorageConfig::Local { base_path, base_url } => {
            info!(path = %base_path.display(), "Using local file storage");
            Ok(Arc::new(LocalStorage::new(base_path, base_url)))
        }
        #[cfg(feature = "s3")]
        StorageConfig::S3 {
            endpoint,
            bucket,
            region,
            access_key_id,
            secret_access_key,
            public_url,
            prefix,
        } => {
            info!(bucket = %bucket, "Using S3 storage");
            let storage = maws_common::S3Storage::new(
                &endpoint,
                bucket,
                &region,
                &access_key_id,
                &secret_access_key,
                public_url,
                prefix,
            )
            .await?;
            Ok(Arc::new(storage))
        }
        #[cfg(not(feature = "s3"))]
        StorageConfig::S3 { .. } => {
            tracing::warn!("S3 storage configured but the s3 feature is disabled, using local");
            Ok(Arc::new(LocalStorage::new(
                settings.local_path.clone().into(),
                settings.local_url.clone(),
            )))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration (also reads .env)
    let config = Config::load()?;

    init_tracing();
    info!("Starting maws server...");

    // Connect to database
    let db = maws_db::init(&config).await?;
    info!("Connected to database");

    maws_db::migrate(&db).await?;
    info!("Migrations applied");

    let db = Arc::new(db);

    // Create repositories
    let user_repo = UserRepository::new(Arc::clone(&db));
    let gallery_repo = GalleryRepository::new(Arc::clone(&db));
    let client_repo = ClientRepository::new(Arc::clone(&db));
    let column_repo = ClientColumnRepository::new(Arc::clone(&db));
    let tag_repo = TagRepository::new(Arc::clone(&db));
    let artwork_repo = ArtworkRepository::new(Arc::clone(&db));
    let sms_repo = SmsRepository::new(Arc::clone(&db));

    let storage = build_storage(&config.storage).await?;

    // Create services
    let tags = TagService::new(tag_repo.clone());
    let clients = ClientService::new(client_repo.clone(), tags.clone());
    let columns = ClientColumnService::new(column_repo.clone());
    let excel = ExcelImportService::new(clients.clone(), columns.clone(), tags.clone());
    let artworks = ArtworkService::new(artwork_repo.clone(), client_repo.clone(), storage);
    let sms = SmsService::new(
        sms_repo.clone(),
        client_repo.clone(),
        gallery_repo.clone(),
        user_repo.clone(),
        &config.sms,
    )?;
    let admin_stats = AdminStatsService::new(
        gallery_repo.clone(),
        user_repo.clone(),
        client_repo,
        artwork_repo,
        tag_repo,
        column_repo,
        sms_repo,
    );

    let mut auth = AuthService::new(
        user_repo.clone(),
        gallery_repo.clone(),
        PhoneVerificationRepository::new(Arc::clone(&db)),
        &config.auth,
    );
    if let Some(gateway) = TwilioGateway::from_config(&config.sms)? {
        auth = auth.with_code_sender(Arc::new(gateway));
    }

    let state = AppState {
        auth,
        account: AccountService::new(user_repo.clone(), gallery_repo),
        clients,
        tags,
        columns,
        excel,
        artworks,
        sms,
        admin_stats,
        users: user_repo,
        admin: config.admin.clone(),
    };

    // Build router
    let app = Router::new()
        .nest("/api", api_router(&state))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            maws_api::middleware::auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shutdown complete");
    Ok(())
}
