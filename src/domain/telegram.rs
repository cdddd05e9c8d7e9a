use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use super::MeterId;

#[derive(Debug, Error, PartialEq)]
pub enum TelegramError {
    #[error("malformed telegram: {0}")]
    Malformed(String),
}

/// One meter's cumulative energy report.
#[derive(Debug, Clone, PartialEq)]
pub struct Telegram {
    pub meter_id: MeterId,
    /// Cumulative import counter (kWh).
    pub import_kwh: f64,
    /// Cumulative export counter (kWh).
    pub export_kwh: f64,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct RawTelegram {
    #[serde(rename = "Ei")]
    ei: f64,
    #[serde(rename = "Eo")]
    eo: f64,
}

impl Telegram {
    pub fn new(meter_id: impl Into<MeterId>, import_kwh: f64, export_kwh: f64) -> Self {
        Self {
            meter_id: meter_id.into(),
            import_kwh,
            export_kwh,
            received_at: Utc::now(),
        }
    }

    /// Parses a JSON payload such as `{"Ei": 1234.5, "Eo": 87.1, "Pi": 0.4}`.
    /// Fields other than `Ei` and `Eo` are ignored. JSON has no NaN or
    /// infinity, and out-of-range numbers fail to parse, so both counters
    /// are always finite.
    pub fn parse(meter_id: impl Into<MeterId>, payload: &[u8]) -> Result<Self, TelegramError> {
        let raw: RawTelegram = serde_json::from_slice(payload)
            .map_err(|e| TelegramError::Malformed(e.to_string()))?;
        Ok(Self::new(meter_id, raw.ei, raw.eo))
    }
}
