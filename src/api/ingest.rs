use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
};
use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;

use super::error::ApiError;
use crate::collector::AppState;
use crate::domain::Telegram;

/// POST /{meter_id}/SENSOR
///
/// Queues the telegram for the collector and returns immediately; a full
/// queue is reported instead of waited on.
pub async fn post_telegram(
    State(st): State<AppState>,
    Path(meter_id): Path<String>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let telegram = Telegram::parse(meter_id.as_str(), &body).map_err(|e| {
        warn!(meter_id = %meter_id, error = %e, "malformed telegram dropped");
        ApiError::from(e)
    })?;

    match st.telegrams.try_send(telegram) {
        Ok(()) => Ok(StatusCode::ACCEPTED),
        Err(TrySendError::Full(_)) => Err(ApiError::ServiceUnavailable(
            "telegram queue full".to_string(),
        )),
        Err(TrySendError::Closed(_)) => Err(ApiError::ServiceUnavailable(
            "collector shutting down".to_string(),
        )),
    }
}
