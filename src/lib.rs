//! Local energy community collector.
//!
//! Meter telegrams carry cumulative import/export counters. The collector
//! turns them into per-interval deltas, prices the interval with break-even
//! community tariffs and persists one record per active house plus one
//! community record.

pub mod api;
pub mod collector;
pub mod config;
pub mod domain;
pub mod settlement;
pub mod sink;
pub mod telemetry;
