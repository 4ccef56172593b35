//! Axum-based HTTP surface for the session tracker
//!
//! Routes:
//! - `GET /api/health`
//! - `GET /api/status`: latest snapshot
//! - `GET /api/events`: snapshot stream (SSE, one `snapshot` event per tick)
//! - `POST /api/session`: `{ pickup_hour, target_soc }`
//! - `POST /api/stop`

use crate::error::ChargeClockError;
use crate::tracker::TrackerHandle;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    pub tracker: TrackerHandle,
}

#[derive(Debug, Deserialize)]
pub struct SessionBody {
    pub pickup_hour: i64,
    pub target_soc: i64,
}

/// Map tracker errors onto HTTP status codes
fn error_response(err: &ChargeClockError) -> Response {
    let code = match err {
        ChargeClockError::InvalidSessionState { .. } | ChargeClockError::Validation { .. } => {
            StatusCode::BAD_REQUEST
        }
        ChargeClockError::FetchFailure { .. } | ChargeClockError::Network { .. } => {
            StatusCode::BAD_GATEWAY
        }
        ChargeClockError::StaleEvent { .. } => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (code, Json(serde_json::json!({ "error": err.to_string() }))).into_response()
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn status(State(state): State<AppState>) -> Response {
    let snapshot = state.tracker.snapshot();
    Json(snapshot.as_ref()).into_response()
}

async fn events(State(state): State<AppState>) -> impl IntoResponse {
    let stream = WatchStream::new(state.tracker.subscribe())
        .map(|snapshot| Event::default().event("snapshot").json_data(snapshot.as_ref()));
    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn create_session(
    State(state): State<AppState>,
    Json(body): Json<SessionBody>,
) -> Response {
    match state
        .tracker
        .create_session(body.pickup_hour, body.target_soc)
        .await
    {
        Ok(session) => (StatusCode::CREATED, Json(session)).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn stop(State(state): State<AppState>) -> Response {
    match state.tracker.stop().await {
        Ok(()) => {
            let snapshot = state.tracker.snapshot();
            Json(snapshot.as_ref()).into_response()
        }
        Err(e) => error_response(&e),
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/status", get(status))
        .route("/api/events", get(events))
        .route("/api/session", post(create_session))
        .route("/api/stop", post(stop))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until `shutdown` is cancelled
pub async fn serve(
    tracker: TrackerHandle,
    host: &str,
    port: u16,
    shutdown: CancellationToken,
) -> crate::error::Result<()> {
    let router = build_router(AppState { tracker });
    let logger = crate::logging::get_logger("web");

    let addr = match host.parse::<IpAddr>() {
        Ok(ip) => SocketAddr::new(ip, port),
        Err(_) => {
            logger.warn(&format!("Invalid host '{}'; falling back to 127.0.0.1", host));
            ([127, 0, 0, 1], port).into()
        }
    };

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    logger.info(&format!(
        "Web server listening at http://{}:{} (API /api)",
        local_addr.ip(),
        local_addr.port()
    ));

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| ChargeClockError::web(e.to_string()))?;
    logger.info("Web server stopped");
    Ok(())
}
