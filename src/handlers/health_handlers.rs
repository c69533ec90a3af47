//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness with object-store and session-table figures

use crate::services::storage_service::StorageService;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

/// `GET /healthz`
///
/// Very small liveness probe; always returns 200 OK with a plain JSON body.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /readyz`
///
/// Takes the shared side of both the bucket lock and the session lock, so a
/// stuck writer shows up as a hanging probe rather than a false "ok".
pub async fn readyz(State(service): State<StorageService>) -> impl IntoResponse {
    let body = ReadyResponse {
        status: "ok".into(),
        buckets: service.store.bucket_count().await,
        resumable_sessions: service.sessions.session_count().await,
    };
    (StatusCode::OK, Json(body))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    buckets: usize,
    resumable_sessions: usize,
}
