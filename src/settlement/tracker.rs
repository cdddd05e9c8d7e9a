use std::collections::HashMap;

use crate::domain::{HouseId, MeterId, MeterRegistry};

/// Default plausibility ceiling per delta, about 36 kW sustained over 10 s.
pub const DEFAULT_MAX_DELTA_KWH: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Baseline {
    import_kwh: f64,
    export_kwh: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedDelta {
    pub house_id: HouseId,
    pub delta_import: f64,
    pub delta_export: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeltaOutcome {
    /// Meter is not in the registry; no state was touched.
    UnknownMeter,
    /// Reading stored as baseline only. `cold_start` is false when an
    /// existing zero baseline was replaced.
    Seeded { cold_start: bool },
    /// Delta above the ceiling. The baseline still moved to the new reading.
    Implausible { delta_import: f64, delta_export: f64 },
    Accepted(AcceptedDelta),
}

impl DeltaOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, DeltaOutcome::Accepted(_))
    }
}

/// Turns cumulative meter counters into non-negative per-telegram deltas.
#[derive(Debug, Clone)]
pub struct DeltaTracker {
    registry: MeterRegistry,
    max_delta_kwh: f64,
    baselines: HashMap<MeterId, Baseline>,
}

impl DeltaTracker {
    pub fn new(registry: MeterRegistry, max_delta_kwh: f64) -> Self {
        Self {
            registry,
            max_delta_kwh,
            baselines: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &MeterRegistry {
        &self.registry
    }

    pub fn max_delta_kwh(&self) -> f64 {
        self.max_delta_kwh
    }

    pub fn apply(&mut self, meter_id: &str, import_kwh: f64, export_kwh: f64) -> DeltaOutcome {
        let Some(house_id) = self.registry.lookup(meter_id) else {
            return DeltaOutcome::UnknownMeter;
        };
        let reading = Baseline { import_kwh, export_kwh };

        // A zero import counter marks a meter that has not been seeded yet.
        let prev = match self.baselines.get_mut(meter_id) {
            Some(prev) if prev.import_kwh != 0.0 => prev,
            Some(prev) => {
                *prev = reading;
                return DeltaOutcome::Seeded { cold_start: false };
            }
            None => {
                self.baselines.insert(meter_id.to_string(), reading);
                return DeltaOutcome::Seeded { cold_start: true };
            }
        };

        let delta_import = (import_kwh - prev.import_kwh).max(0.0);
        let delta_export = (export_kwh - prev.export_kwh).max(0.0);
        *prev = reading;

        if delta_import > self.max_delta_kwh || delta_export > self.max_delta_kwh {
            return DeltaOutcome::Implausible { delta_import, delta_export };
        }

        DeltaOutcome::Accepted(AcceptedDelta {
            house_id: house_id.clone(),
            delta_import,
            delta_export,
        })
    }
}
