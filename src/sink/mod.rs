//! Persistence of settlement batches.

pub mod influx;
pub mod point;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

pub use influx::InfluxSink;
pub use point::{to_line_protocol, Point, COMMUNITY_MEASUREMENT, HOUSE_MEASUREMENT};

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("write request failed: {0}")]
    Request(String),
    #[error("write rejected: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Append-only time-series store. One call per settlement interval; the
/// whole batch is treated as written or lost.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SettlementSink: Send + Sync {
    async fn write(&self, points: &[Point]) -> Result<(), SinkError>;
}

/// Sink used when no store is configured; batches only go to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl SettlementSink for LogSink {
    async fn write(&self, points: &[Point]) -> Result<(), SinkError> {
        for p in points {
            info!(measurement = %p.measurement, line = %p.to_line_protocol(), "settlement point");
        }
        Ok(())
    }
}
