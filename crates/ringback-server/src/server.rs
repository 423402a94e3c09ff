//! Router assembly and the serve loop.

use std::sync::Arc;

use axum::{
    Json, Router,
    routing::{get, post},
};
use serde_json::json;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::routes;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let audio_dir = state.audio.dir().to_path_buf();

    Router::new()
        .route("/", get(root))
        .route("/webhook/sms", post(routes::sms::sms_webhook))
        .route("/webhook/sms/status", post(routes::sms::sms_status_webhook))
        .route("/webhook/voice", post(routes::voice::voice_fallback))
        .route(
            "/webhook/voice/call/{call_id}",
            get(routes::voice::voice_call_webhook).post(routes::voice::voice_call_webhook),
        )
        .route(
            "/webhook/voice/input/{call_id}",
            get(routes::voice::voice_input_get).post(routes::voice::voice_input_post),
        )
        .route("/call/send", post(routes::call::send_call))
        .nest_service("/audio", ServeDir::new(audio_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the relay HTTP server.
pub async fn start_server(state: Arc<AppState>, port: u16) -> anyhow::Result<()> {
    let bind = state.config.bind();
    let app = router(state);

    let addr = format!("{bind}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Ringback relay listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Liveness probe.
async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C handler");
    info!("Shutdown signal received");
}
