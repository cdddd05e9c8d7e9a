use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type MeterId = String;
pub type HouseId = String;

/// Community policy prices (ct/kWh), configurable and re-read every cycle.
///
/// The short keys are the ones written by the tariff override file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolicyTariffs {
    #[serde(alias = "p_pv")]
    pub pv_payout_rate: f64,
    #[serde(alias = "p_grid_con")]
    pub grid_import_rate: f64,
    #[serde(alias = "p_grid_del")]
    pub grid_export_rate: f64,
}

/// Tariffs applied to one settlement interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SettlementTariffs {
    /// Price houses pay for energy drawn from the community.
    pub consumption_rate: f64,
    /// Price producers receive for energy delivered to the community.
    pub pv_rate: f64,
    pub grid_import_rate: f64,
    pub grid_export_rate: f64,
}

/// Accepted deltas of one house within the current interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HouseDelta {
    pub meter_id: MeterId,
    pub delta_import: f64,
    pub delta_export: f64,
    /// Cumulative counters of the most recent accepted telegram.
    pub last_import: f64,
    pub last_export: f64,
}

/// Read-and-cleared content of the interval bucket.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntervalSnapshot {
    pub houses: BTreeMap<HouseId, HouseDelta>,
    /// E: energy delivered by the houses to the community.
    pub total_production: f64,
    /// I: energy drawn by the houses from the community.
    pub total_consumption: f64,
}

impl IntervalSnapshot {
    pub fn is_empty(&self) -> bool {
        self.houses.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementRecord {
    pub house_id: HouseId,
    pub meter_id: MeterId,
    pub last_import: f64,
    pub last_export: f64,
    pub delta_import: f64,
    pub delta_export: f64,
    /// Positive when the house exported more than it imported.
    pub net_kwh: f64,
    pub value_consumption: f64,
    pub value_pv_delivery: f64,
    pub consumption_rate: f64,
    pub pv_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunitySettlementRecord {
    pub total_consumption: f64,
    pub total_production: f64,
    pub grid_import: f64,
    pub grid_export: f64,
    pub value_grid_import: f64,
    pub value_grid_export: f64,
    pub grid_import_rate: f64,
    pub grid_export_rate: f64,
}
