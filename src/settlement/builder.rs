use crate::domain::{
    CommunitySettlementRecord, IntervalSnapshot, SettlementRecord, SettlementTariffs,
};

/// Builds the per-house and community records for one interval.
pub fn build(
    snapshot: &IntervalSnapshot,
    tariffs: &SettlementTariffs,
) -> (Vec<SettlementRecord>, CommunitySettlementRecord) {
    let houses = snapshot
        .houses
        .iter()
        .map(|(house_id, d)| SettlementRecord {
            house_id: house_id.clone(),
            meter_id: d.meter_id.clone(),
            last_import: d.last_import,
            last_export: d.last_export,
            delta_import: d.delta_import,
            delta_export: d.delta_export,
            net_kwh: d.delta_export - d.delta_import,
            value_consumption: d.delta_import * tariffs.consumption_rate,
            value_pv_delivery: d.delta_export * tariffs.pv_rate,
            consumption_rate: tariffs.consumption_rate,
            pv_rate: tariffs.pv_rate,
        })
        .collect();

    (houses, community(snapshot.total_production, snapshot.total_consumption, tariffs))
}

fn community(
    total_production: f64,
    total_consumption: f64,
    tariffs: &SettlementTariffs,
) -> CommunitySettlementRecord {
    let net = total_production - total_consumption;
    let (grid_import, grid_export) = if net > 0.0 { (0.0, net) } else { (net.abs(), 0.0) };

    CommunitySettlementRecord {
        total_consumption,
        total_production,
        grid_import,
        grid_export,
        value_grid_import: grid_import * tariffs.grid_import_rate,
        value_grid_export: grid_export * tariffs.grid_export_rate,
        grid_import_rate: tariffs.grid_import_rate,
        grid_export_rate: tariffs.grid_export_rate,
    }
}
