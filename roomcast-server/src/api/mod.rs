//! HTTP API for the listening room
//!
//! Exposes the state channel (SSE), the audio channel (chunked stream), and
//! the REST operations forwarded to the source adapter.

pub mod handlers;

use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::json;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::audio::AudioFanout;
use crate::playback::PlaybackScheduler;
use crate::source::SourceStrategy;
use crate::sse::StateBroadcaster;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Playback scheduler (queue + timer)
    pub scheduler: Arc<PlaybackScheduler>,
    /// State-channel subscriber registry
    pub broadcaster: Arc<StateBroadcaster>,
    /// Audio-channel sink registry
    pub fanout: Arc<AudioFanout>,
    /// Wired source adapter
    pub strategy: Arc<dyn SourceStrategy>,
    /// Server port
    pub port: u16,
}

/// Create the API router
pub fn create_router(state: AppState, static_dir: &Path) -> Router {
    Router::new()
        // Health check (no prefix for health endpoint)
        .route("/health", get(health_check))

        // Live audio channel
        .route("/stream", get(handlers::audio_stream))

        // API v1 routes
        .nest("/api/v1", Router::new()
            .route("/search", get(handlers::search))
            .route("/queue", get(handlers::get_queue).post(handlers::enqueue))
            .route("/skip", post(handlers::skip))

            // SSE state channel
            .route("/events", get(handlers::state_events))
        )

        // Static UI assets at the web root
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "module": "roomcast-server",
        "version": env!("CARGO_PKG_VERSION"),
        "port": state.port,
        "listeners": state.fanout.sink_count(),
        "subscribers": state.broadcaster.subscriber_count(),
    }))
}
