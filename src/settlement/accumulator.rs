use std::collections::BTreeMap;

use crate::domain::{HouseDelta, HouseId, IntervalSnapshot};

/// Per-house deltas collected between two settlement cycles.
///
/// Not synchronised on its own; the collector keeps it behind the same lock
/// as the [`DeltaTracker`](super::DeltaTracker).
#[derive(Debug, Default)]
pub struct IntervalAccumulator {
    houses: BTreeMap<HouseId, HouseDelta>,
}

impl IntervalAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        house_id: &str,
        meter_id: &str,
        delta_import: f64,
        delta_export: f64,
        last_import: f64,
        last_export: f64,
    ) {
        match self.houses.get_mut(house_id) {
            Some(entry) => {
                entry.delta_import += delta_import;
                entry.delta_export += delta_export;
                entry.last_import = last_import;
                entry.last_export = last_export;
                if entry.meter_id != meter_id {
                    entry.meter_id = meter_id.to_string();
                }
            }
            None => {
                self.houses.insert(
                    house_id.to_string(),
                    HouseDelta {
                        meter_id: meter_id.to_string(),
                        delta_import,
                        delta_export,
                        last_import,
                        last_export,
                    },
                );
            }
        }
    }

    pub fn len(&self) -> usize {
        self.houses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.houses.is_empty()
    }

    /// Takes everything collected so far and leaves the bucket empty.
    /// Totals are summed from the taken entries.
    pub fn snapshot_and_clear(&mut self) -> IntervalSnapshot {
        let houses = std::mem::take(&mut self.houses);
        let (total_consumption, total_production) = houses
            .values()
            .fold((0.0, 0.0), |(i, e), h| (i + h.delta_import, e + h.delta_export));
        IntervalSnapshot {
            houses,
            total_production,
            total_consumption,
        }
    }
}
