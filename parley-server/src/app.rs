use crate::auth::{JwtCredentials, issue_token, validate_token};
use crate::config::{DEFAULT_PING_INTERVAL, ServerConfig};
use crate::room::RoomRegistry;
use crate::signaling::{SignalingRouter, ws_handler};
use anyhow::Context;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Shared state for the HTTP and WebSocket handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: SignalingRouter,
    pub credentials: JwtCredentials,
    pub ping_interval: Duration,
}

impl AppState {
    pub fn new(registry: RoomRegistry, credentials: JwtCredentials) -> Self {
        Self {
            router: SignalingRouter::new(registry),
            credentials,
            ping_interval: DEFAULT_PING_INTERVAL,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        let credentials = JwtCredentials::new(&config.auth_secret, config.token_ttl);
        Self::new(RoomRegistry::new(), credentials).with_ping_interval(config.ping_interval)
    }

    pub fn with_ping_interval(mut self, ping_interval: Duration) -> Self {
        self.ping_interval = ping_interval;
        self
    }

    pub fn registry(&self) -> &RoomRegistry {
        self.router.registry()
    }
}

pub fn app(state: AppState) -> Router {
    // Browser clients are served from other origins.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws/signal", get(ws_handler))
        .route("/auth/token", post(issue_token))
        .route("/auth/validate", get(validate_token))
        .route("/health/live", get(health))
        .route("/health/ready", get(health))
        .route("/stats", get(stats))
        .layer(cors)
        .with_state(state)
}

/// No external dependencies, so liveness and readiness are the same.
async fn health() -> &'static str {
    "ok"
}

async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.registry().stats().await)
}

/// Runs the signaling server until ctrl-c.
pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    if config.uses_default_secret() {
        warn!("Using the built-in development auth secret; set a real one in production");
    }

    let state = AppState::from_config(&config);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

    info!("Signaling server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Signaling server failed")?;

    info!("Signaling server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
