//! HTTP request handlers
//!
//! REST operations, the SSE state channel, and the chunked audio channel.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::sse::{Event, Sse},
    response::{IntoResponse, Response},
    Json,
};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::api::AppState;
use crate::audio::fanout::SinkGuard;
use crate::error::Error;
use crate::source::SearchHit;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    q: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
pub struct EnqueueRequest {
    track_ref: String,
}

type HandlerError = (StatusCode, Json<StatusResponse>);

fn error_response(e: Error) -> HandlerError {
    let status = match &e {
        Error::BadRequest(_) => StatusCode::BAD_REQUEST,
        Error::AdapterUnavailable(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(StatusResponse {
            status: format!("error: {}", e),
        }),
    )
}

// ============================================================================
// Search / Queue
// ============================================================================

/// GET /api/v1/search?q= - Search the wired source's catalog
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, HandlerError> {
    if params.q.trim().is_empty() {
        return Ok(Json(SearchResponse {
            results: Vec::new(),
        }));
    }

    match state.strategy.search(&params.q).await {
        Ok(results) => Ok(Json(SearchResponse { results })),
        Err(e) => {
            error!("Search failed: {}", e);
            Err(error_response(e))
        }
    }
}

/// POST /api/v1/queue - Request an enqueue (forwarded to the source adapter)
pub async fn enqueue(
    State(state): State<AppState>,
    Json(req): Json<EnqueueRequest>,
) -> Result<Json<StatusResponse>, HandlerError> {
    info!("Enqueue request: {}", req.track_ref);

    match state.scheduler.enqueue(&req.track_ref).await {
        Ok(()) => Ok(Json(StatusResponse {
            status: "ok".to_string(),
        })),
        Err(e) => {
            error!("Enqueue failed: {}", e);
            Err(error_response(e))
        }
    }
}

/// GET /api/v1/queue - Current snapshot as a one-shot REST read
pub async fn get_queue(State(state): State<AppState>) -> Json<roomcast_common::events::RoomEvent> {
    Json(state.scheduler.snapshot().await)
}

/// POST /api/v1/skip - Advance past the current track
pub async fn skip(State(state): State<AppState>) -> Json<StatusResponse> {
    info!("Skip requested");
    state.scheduler.skip().await;
    Json(StatusResponse {
        status: "ok".to_string(),
    })
}

// ============================================================================
// State channel (SSE)
// ============================================================================

/// GET /api/v1/events - Join the state channel
///
/// The connection immediately receives the current snapshot (catch-up), then
/// every subsequent state change in order.
pub async fn state_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let snapshot = state.scheduler.snapshot().await;
    state.broadcaster.sse_stream(snapshot)
}

// ============================================================================
// Audio channel
// ============================================================================

/// GET /stream - Attach to the live audio stream
///
/// Chunked transfer of the shared upstream audio; the sink is detached the
/// moment the client disconnects and the body stream drops.
pub async fn audio_stream(State(state): State<AppState>) -> Response {
    let (id, mut rx) = state.fanout.attach();
    let guard = SinkGuard {
        id,
        fanout: Arc::clone(&state.fanout),
    };

    let stream = async_stream::stream! {
        let _guard = guard;
        while let Some(chunk) = rx.recv().await {
            yield Ok::<_, Infallible>(chunk);
        }
        // Upstream ended or we were detached: the body just ends, no error
        // payload goes over the audio channel.
    };

    (
        [
            (header::CONTENT_TYPE, "audio/mpeg"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(stream),
    )
        .into_response()
}
