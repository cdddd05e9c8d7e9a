use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::collector::{AppState, CycleStatus};

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub registered_meters: usize,
    pub queued_telegrams: usize,
    pub settlement: CycleStatus,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// GET /healthz
pub async fn healthz() -> impl IntoResponse {
    StatusCode::OK
}

/// GET /status
pub async fn status(State(st): State<AppState>) -> impl IntoResponse {
    let queued = st.telegrams.max_capacity() - st.telegrams.capacity();
    Json(StatusResponse {
        registered_meters: st.collector.registered_meters(),
        queued_telegrams: queued,
        settlement: st.collector.status(),
        timestamp: chrono::Utc::now(),
    })
}
