use std::collections::HashMap;

use super::{HouseId, MeterId};
use crate::config::HouseConfig;

/// Static meter → house mapping, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct MeterRegistry {
    houses: HashMap<MeterId, HouseId>,
}

impl MeterRegistry {
    pub fn new(houses: HashMap<MeterId, HouseId>) -> Self {
        Self { houses }
    }

    pub fn from_config(houses: &HashMap<String, HouseConfig>) -> Self {
        Self::new(
            houses
                .iter()
                .map(|(meter, house)| (meter.clone(), house.id.clone()))
                .collect(),
        )
    }

    pub fn lookup(&self, meter_id: &str) -> Option<&HouseId> {
        self.houses.get(meter_id)
    }

    pub fn len(&self) -> usize {
        self.houses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.houses.is_empty()
    }
}

impl<M: Into<MeterId>, H: Into<HouseId>> FromIterator<(M, H)> for MeterRegistry {
    fn from_iter<T: IntoIterator<Item = (M, H)>>(iter: T) -> Self {
        Self::new(iter.into_iter().map(|(m, h)| (m.into(), h.into())).collect())
    }
}
