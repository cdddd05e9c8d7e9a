//! Delta tracking, interval aggregation and break-even settlement.

pub mod accumulator;
pub mod builder;
pub mod policy;
pub mod tariff;
pub mod tracker;

pub use accumulator::IntervalAccumulator;
pub use builder::build;
pub use policy::{FilePolicySource, PolicySource, StaticPolicySource};
pub use tariff::{compute, compute_with_regime, TariffRegime};
pub use tracker::{AcceptedDelta, DeltaOutcome, DeltaTracker, DEFAULT_MAX_DELTA_KWH};
