//! HTTP API over the rate synchronization service.
//!
//! Endpoints:
//! - `GET /api/rates[?period=P]`: rates of the latest (or given) period
//! - `POST /api/rates`: upsert rows, each under its `lastUpdated` period
//! - `GET /api/latest-period`: `{ period }`
//! - `GET /api/periods`: `{ periods }`
//! - `POST /api/admin/login`, `POST /api/admin/logout`: admin sessions
//! - `GET /api/health`

mod handlers;

use crate::core::auth::AdminAuth;
use crate::core::sync::RateSyncService;
use anyhow::{Context, Result};
use axum::{
    Router,
    http::Method,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub use handlers::{LoginResponse, RateRow};

/// Shared state for axum handlers.
pub struct AppState {
    pub service: RateSyncService,
    pub auth: AdminAuth,
}

/// Build the axum router (separated for testing).
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(handlers::health))
        .route(
            "/api/rates",
            get(handlers::get_rates).post(handlers::post_rates),
        )
        .route("/api/latest-period", get(handlers::latest_period))
        .route("/api/periods", get(handlers::periods))
        .route("/api/admin/login", post(handlers::login))
        .route("/api/admin/logout", post(handlers::logout))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve the API on `bind` until Ctrl-C.
pub async fn serve(state: Arc<AppState>, bind: &str) -> Result<()> {
    if !state.auth.is_enabled() {
        warn!("No admin password configured; POST /api/rates is open to anyone");
    }

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    let addr = listener.local_addr()?;
    info!(%addr, "ratedesk API listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutting down");
        })
        .await
        .context("Server error")
}
