use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::domain::{CommunitySettlementRecord, SettlementRecord};

pub const HOUSE_MEASUREMENT: &str = "house_energy";
pub const COMMUNITY_MEASUREMENT: &str = "community_energy";

/// One typed time-series point.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub measurement: String,
    pub tags: BTreeMap<String, String>,
    pub fields: BTreeMap<String, f64>,
    pub timestamp: DateTime<Utc>,
}

impl Point {
    pub fn new(measurement: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            measurement: measurement.into(),
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
            timestamp,
        }
    }

    pub fn tag(mut self, key: &str, value: impl Into<String>) -> Self {
        self.tags.insert(key.to_string(), value.into());
        self
    }

    pub fn field(mut self, key: &str, value: f64) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    pub fn house_energy(r: &SettlementRecord, timestamp: DateTime<Utc>) -> Self {
        Self::new(HOUSE_MEASUREMENT, timestamp)
            .tag("house_id", r.house_id.as_str())
            .tag("meter_id", r.meter_id.as_str())
            .field("ei", r.last_import)
            .field("eo", r.last_export)
            .field("delta_ei", r.delta_import)
            .field("delta_eo", r.delta_export)
            .field("net_flow", r.net_kwh)
            .field("value_consumption", r.value_consumption)
            .field("value_pv_delivery", r.value_pv_delivery)
            .field("tariff_consumption", r.consumption_rate)
            .field("tariff_pv", r.pv_rate)
    }

    pub fn community_energy(r: &CommunitySettlementRecord, timestamp: DateTime<Utc>) -> Self {
        Self::new(COMMUNITY_MEASUREMENT, timestamp)
            .field("total_consumption", r.total_consumption)
            .field("total_production", r.total_production)
            .field("grid_import", r.grid_import)
            .field("grid_export", r.grid_export)
            .field("value_grid_import", r.value_grid_import)
            .field("value_grid_export", r.value_grid_export)
            .field("tariff_grid_consumption", r.grid_import_rate)
            .field("tariff_grid_delivery", r.grid_export_rate)
    }

    /// InfluxDB line protocol, nanosecond precision.
    pub fn to_line_protocol(&self) -> String {
        let mut line = escape(&self.measurement, &[',', ' ']);
        for (k, v) in &self.tags {
            let _ = write!(line, ",{}={}", escape(k, TAG_SPECIAL), escape(v, TAG_SPECIAL));
        }
        let fields = self
            .fields
            .iter()
            .map(|(k, v)| format!("{}={}", escape(k, TAG_SPECIAL), v))
            .collect::<Vec<_>>()
            .join(",");
        let _ = write!(line, " {} {}", fields, epoch_nanos(&self.timestamp));
        line
    }
}

fn epoch_nanos(ts: &DateTime<Utc>) -> i128 {
    i128::from(ts.timestamp()) * 1_000_000_000 + i128::from(ts.timestamp_subsec_nanos())
}

const TAG_SPECIAL: &[char] = &[',', '=', ' '];

fn escape(raw: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Renders a batch as newline-separated line protocol.
pub fn to_line_protocol(points: &[Point]) -> String {
    points
        .iter()
        .map(Point::to_line_protocol)
        .collect::<Vec<_>>()
        .join("\n")
}
