pub mod api;
pub mod cards;
pub mod comments;
pub mod config;
pub mod db;
pub mod error;
pub mod models;

use anyhow::Result;
use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderValue, StatusCode},
    routing::get,
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower_http::{
    cors::{Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::cards::CardStore;
use crate::comments::CommentStore;
use crate::config::{Config, SecurityConfig, ServerConfig};
use crate::db::{Database, Repository};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub cards: CardStore,
    pub comments: CommentStore,
    repo: Arc<dyn Repository>,
}

impl AppState {
    /// Wire both stores to the same repository
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        let cards = CardStore::new(repo.clone());
        let comments = CommentStore::new(repo.clone(), cards.clone());
        Self { cards, comments, repo }
    }
}

/// Run the server
pub async fn run(config: Config) -> Result<()> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(config.database.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.database.idle_timeout_secs))
        .connect(&config.database.url)
        .await?;

    tracing::info!(
        "Database pool: max={}, min={} connections",
        config.database.max_connections,
        config.database.min_connections
    );

    db::MIGRATOR.run(&pool).await?;
    tracing::info!("Migrations completed successfully");

    let state = AppState::new(Arc::new(Database::new(pool)));
    let app = app(state, &config.server, &config.security);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("kudos-board listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// Build the full application router with middleware
pub fn app(state: AppState, server: &ServerConfig, security: &SecurityConfig) -> Router {
    let cors = build_cors_layer(&security.cors_origins);

    Router::new()
        .route("/", get(welcome))
        .route("/health", get(health_check))
        // Ready check (includes store connectivity)
        .route("/ready", get(ready_check))
        .merge(api::router())
        // Middleware layers (order matters - applied bottom to top)
        .layer(DefaultBodyLimit::max(server.max_body_size))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .with_state(state)
}

async fn welcome() -> &'static str {
    "Welcome to kudos boards!"
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "ok"
}

/// Readiness check - verifies the store is reachable
async fn ready_check(State(state): State<AppState>) -> Result<&'static str, (StatusCode, &'static str)> {
    match state.repo.ping().await {
        Ok(()) => Ok("ready"),
        Err(e) => {
            tracing::warn!("Readiness check failed: {}", e);
            Err((StatusCode::SERVICE_UNAVAILABLE, "database unavailable"))
        }
    }
}

/// Build CORS layer from configuration
fn build_cors_layer(origins: &str) -> CorsLayer {
    if origins == "*" {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        use tower_http::cors::AllowOrigin;

        let origins: Vec<_> = origins
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        }
    }
}
