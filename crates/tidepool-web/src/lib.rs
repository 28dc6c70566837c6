//! Tidepool web gateway — HTTP surface and WebSocket transport in front of
//! the chat coordinator.

mod api;
mod bridge;
pub mod state;

use axum::{Router, routing::get};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::state::AppState;

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/api/users", get(api::list_users))
        .route("/api/ws", get(bridge::ws_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `GET /` — liveness text.
async fn index_handler() -> &'static str {
    "Chat Server Running"
}

/// `GET /health` — simple liveness check.
async fn health_handler() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({"status": "ok"}))
}

/// Start the coordinator and serve the gateway.
///
/// `TIDEPOOL_DATA_DIR` (default `.`) holds `data.json` and `users.db`;
/// `TIDEPOOL_ADDR` (default `0.0.0.0:5000`) is the bind address.
pub async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let data_dir =
        std::path::PathBuf::from(std::env::var("TIDEPOOL_DATA_DIR").unwrap_or_else(|_| ".".into()));

    let coordinator = tidepool_server::chat::coordinator::spawn(&data_dir)?;
    let state = AppState {
        coordinator,
        data_dir,
    };
    let app = build_router(state);

    let addr = std::env::var("TIDEPOOL_ADDR").unwrap_or_else(|_| "0.0.0.0:5000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
