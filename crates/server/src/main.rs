//! Club server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router, ServiceExt,
    extract::{DefaultBodyLimit, Request},
    middleware,
};
use club_api::{AppState, auth_middleware, router as api_router};
use club_common::{Config, LocalStorage};
use club_web::WebState;
use tokio::signal;
use tower::Layer;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    normalize_path::NormalizePathLayer,
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Room left for form fields next to the largest upload.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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
    let json = std::env::var("CLUB_LOG_JSON").is_ok_and(|v| v == "1" || v == "true");

    tracing_subscriber::registry()
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "club=debug,tower_http=debug".into()),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();
    init_tracing();

    info!("Starting club server...");

    let config = Config::load()?;

    let db = club_db::init(&config).await?;
    info!("Connected to database");

    info!("Running database migrations...");
    club_db::migrate(&db).await?;
    info!("Migrations completed");

    let storage = Arc::new(LocalStorage::new(
        config.storage.base_path.clone(),
        config.storage.base_url.clone(),
    ));
    let state = AppState::new(Arc::new(db), storage, config.clone())?;

    if let Some(bootstrap) = &config.bootstrap {
        let staff = state
            .user_service
            .ensure_staff_account(
                &bootstrap.staff_username,
                &bootstrap.staff_password,
                &bootstrap.staff_email,
            )
            .await?;
        info!(username = %staff.username, "Staff account ready");
    }

    let web_state = WebState::new(state.clone())?;

    let mut app = Router::new()
        .nest("/api", api_router().with_state(state.clone()))
        .merge(club_web::router().with_state(web_state));

    let media_url = config.storage.base_url.trim_end_matches('/');
    if media_url.starts_with('/') {
        app = app.nest_service(media_url, ServeDir::new(&config.storage.base_path));
    } else {
        info!(base_url = %config.storage.base_url, "Media is served outside this server");
    }

    let app = app
        .layer(DefaultBodyLimit::max(
            config.storage.max_upload_bytes + FORM_OVERHEAD_BYTES,
        ))
        .layer(middleware::from_fn_with_state(state, auth_middleware))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    // "/api/rides/" and "/api/rides" reach the same handler
    let app = NormalizePathLayer::trim_trailing_slash().layer(app);

    let host: std::net::IpAddr = config.server.host.parse()?;
    let addr = SocketAddr::from((host, config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
