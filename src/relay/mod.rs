//! Gesture relay
//!
//! A small websocket service that runs the cursor tracker on behalf of
//! thin clients: they stream hand landmarks and get gesture updates back.
//!
//! # Endpoints
//!
//! - `GET /health/live` - Liveness probe
//! - `GET /health` - Status with connection count
//! - `GET /ws/track?token=...` - Tracking socket
//!
//! Observers may subscribe to `gestures.{connection_id}` or `gestures.*`
//! to follow other sessions.

pub mod error;
pub mod handler;
pub mod hub;
pub mod messages;
pub mod state;

pub use error::{RelayError, RelayResult};
pub use hub::{ConnectionHub, HubConfig, HubError};
pub use messages::{ClientMessage, RelayEvent, ServerMessage};
pub use state::{RelayState, ServerConfig};

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub connections: usize,
    pub uptime_seconds: u64,
    pub require_auth: bool,
    pub version: String,
}

pub fn build_router(state: RelayState) -> Router {
    let health_routes = Router::new()
        .route("/live", get(liveness))
        .route("/", get(full_health));

    Router::new()
        .route("/ws/track", get(handler::track_handler))
        .nest("/health", health_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

/// Bind and serve until Ctrl-C or SIGTERM
pub async fn serve(state: RelayState) -> RelayResult<()> {
    let addr = state.config.addr();
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Relay listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| RelayError::Internal(format!("Server error: {e}")))?;

    tracing::info!("Relay shut down gracefully");
    Ok(())
}

async fn liveness() -> StatusCode {
    StatusCode::OK
}

async fn full_health(State(state): State<Arc<RelayState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        connections: state.hub.connection_count().await,
        uptime_seconds: state.uptime_seconds(),
        require_auth: state.config.require_auth,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
