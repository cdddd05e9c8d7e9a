#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

use leg_collector::collector::Collector;
use leg_collector::domain::{MeterRegistry, PolicyTariffs};
use leg_collector::settlement::{DeltaTracker, StaticPolicySource};
use leg_collector::sink::{Point, SettlementSink, SinkError};

/// Keeps every written batch in memory.
#[derive(Default)]
pub struct RecordingSink {
    pub batches: Mutex<Vec<Vec<Point>>>,
}

impl RecordingSink {
    pub fn batch_count(&self) -> usize {
        self.batches.lock().len()
    }

    pub fn last_batch(&self) -> Vec<Point> {
        self.batches.lock().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl SettlementSink for RecordingSink {
    async fn write(&self, points: &[Point]) -> Result<(), SinkError> {
        self.batches.lock().push(points.to_vec());
        Ok(())
    }
}

/// Rejects every batch.
pub struct FailingSink;

#[async_trait]
impl SettlementSink for FailingSink {
    async fn write(&self, _points: &[Point]) -> Result<(), SinkError> {
        Err(SinkError::Rejected {
            status: 503,
            body: "storage offline".into(),
        })
    }
}

pub fn policy(pv: f64, grid_import: f64, grid_export: f64) -> PolicyTariffs {
    PolicyTariffs {
        pv_payout_rate: pv,
        grid_import_rate: grid_import,
        grid_export_rate: grid_export,
    }
}

/// Meters `M1..=Mn` mapped to houses `1..=n`.
pub fn registry(meters: usize) -> MeterRegistry {
    (1..=meters).map(|i| (format!("M{i}"), i.to_string())).collect()
}

pub fn collector(
    meters: usize,
    max_delta: f64,
    policy: PolicyTariffs,
    sink: Arc<dyn SettlementSink>,
) -> Collector {
    Collector::new(
        DeltaTracker::new(registry(meters), max_delta),
        policy,
        Arc::new(StaticPolicySource),
        sink,
    )
}

pub fn field(point: &Point, name: &str) -> f64 {
    point.fields[name]
}
