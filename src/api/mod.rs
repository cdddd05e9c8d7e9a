pub mod error;
pub mod health;
pub mod ingest;

use axum::{
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::{collector::AppState, config::Config};

/// Telegrams are small JSON objects.
const MAX_TELEGRAM_BYTES: usize = 16 * 1024;

pub fn router(state: AppState, cfg: &Config) -> Router {
    Router::new()
        .route("/:meter_id/SENSOR", post(ingest::post_telegram))
        .route("/healthz", get(health::healthz))
        .route("/status", get(health::status))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(axum::extract::DefaultBodyLimit::max(MAX_TELEGRAM_BYTES))
                .layer(TimeoutLayer::new(Duration::from_secs(cfg.server.request_timeout_secs))),
        )
        .layer(TraceLayer::new_for_http())
}
