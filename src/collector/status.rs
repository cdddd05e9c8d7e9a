use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Bookkeeping of settlement cycles, exposed on the status endpoint.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleStatus {
    pub last_run: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub run_count: u64,
    pub written_count: u64,
    pub dropped_count: u64,
    pub empty_count: u64,
    pub telegrams_accepted: u64,
    pub telegrams_rejected: u64,
}

impl CycleStatus {
    /// Records a cycle start and returns its stamp. Stamps strictly
    /// increase so two cycles never share a series timestamp in storage.
    pub(super) fn started(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
        let stamp = match self.last_run {
            Some(prev) if now <= prev => prev + Duration::nanoseconds(1),
            _ => now,
        };
        self.last_run = Some(stamp);
        self.run_count += 1;
        stamp
    }

    pub(super) fn written(&mut self, now: DateTime<Utc>) {
        self.last_success = Some(now);
        self.written_count += 1;
        self.last_error = None;
    }

    pub(super) fn dropped(&mut self, error: String) {
        self.dropped_count += 1;
        self.last_error = Some(error);
    }
}
