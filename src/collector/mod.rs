pub mod status;

use chrono::Utc;
use parking_lot::Mutex;
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, error, info, warn};

pub use status::CycleStatus;

use crate::domain::{IntervalSnapshot, PolicyTariffs, Telegram};
use crate::settlement::{
    self, DeltaOutcome, DeltaTracker, IntervalAccumulator, PolicySource, TariffRegime,
};
use crate::sink::{Point, SettlementSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Accepted,
    Seeded,
    Implausible,
    UnknownMeter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing accepted since the previous cycle; no write issued.
    Empty,
    Written { houses: usize, regime: TariffRegime },
    /// The sink failed and the interval's records were discarded.
    Dropped { houses: usize },
}

/// Tracker and bucket share one lock so a flush never sees half an ingest.
struct Ledger {
    tracker: DeltaTracker,
    bucket: IntervalAccumulator,
}

pub struct Collector {
    ledger: Mutex<Ledger>,
    default_policy: PolicyTariffs,
    policy_source: Arc<dyn PolicySource>,
    sink: Arc<dyn SettlementSink>,
    status: Mutex<CycleStatus>,
}

impl Collector {
    pub fn new(
        tracker: DeltaTracker,
        default_policy: PolicyTariffs,
        policy_source: Arc<dyn PolicySource>,
        sink: Arc<dyn SettlementSink>,
    ) -> Self {
        Self {
            ledger: Mutex::new(Ledger {
                tracker,
                bucket: IntervalAccumulator::new(),
            }),
            default_policy,
            policy_source,
            sink,
            status: Mutex::new(CycleStatus::default()),
        }
    }

    pub fn registered_meters(&self) -> usize {
        self.ledger.lock().tracker.registry().len()
    }

    pub fn status(&self) -> CycleStatus {
        self.status.lock().clone()
    }

    /// Applies one telegram. Never performs I/O.
    pub fn ingest(&self, telegram: &Telegram) -> IngestOutcome {
        let (outcome, max_delta) = {
            let mut ledger = self.ledger.lock();
            let Ledger { tracker, bucket } = &mut *ledger;
            let outcome = tracker.apply(&telegram.meter_id, telegram.import_kwh, telegram.export_kwh);
            if let DeltaOutcome::Accepted(d) = &outcome {
                bucket.add(
                    &d.house_id,
                    &telegram.meter_id,
                    d.delta_import,
                    d.delta_export,
                    telegram.import_kwh,
                    telegram.export_kwh,
                );
            }
            (outcome, tracker.max_delta_kwh())
        };

        let meter_id = telegram.meter_id.as_str();
        match outcome {
            DeltaOutcome::UnknownMeter => {
                debug!(meter_id, "telegram from unregistered meter dropped");
                IngestOutcome::UnknownMeter
            }
            DeltaOutcome::Seeded { cold_start } => {
                if cold_start {
                    info!(
                        meter_id,
                        import_kwh = telegram.import_kwh,
                        export_kwh = telegram.export_kwh,
                        "baseline stored for meter"
                    );
                } else {
                    debug!(meter_id, "zero baseline replaced");
                }
                IngestOutcome::Seeded
            }
            DeltaOutcome::Implausible { delta_import, delta_export } => {
                self.status.lock().telegrams_rejected += 1;
                warn!(
                    meter_id,
                    delta_import_kwh = delta_import,
                    delta_export_kwh = delta_export,
                    max_delta_kwh = max_delta,
                    "implausible delta discarded"
                );
                IngestOutcome::Implausible
            }
            DeltaOutcome::Accepted(d) => {
                self.status.lock().telegrams_accepted += 1;
                debug!(
                    meter_id,
                    house_id = %d.house_id,
                    delta_import_kwh = d.delta_import,
                    delta_export_kwh = d.delta_export,
                    received_at = %telegram.received_at,
                    "delta accepted"
                );
                IngestOutcome::Accepted
            }
        }
    }

    /// Atomically takes the interval bucket, leaving it empty.
    pub fn take_snapshot(&self) -> IntervalSnapshot {
        self.ledger.lock().bucket.snapshot_and_clear()
    }

    /// Runs one settlement cycle. Failures are logged, never returned.
    pub async fn flush(&self) -> FlushOutcome {
        let snapshot = self.take_snapshot();
        if snapshot.is_empty() {
            self.status.lock().empty_count += 1;
            debug!("no accepted deltas this interval");
            return FlushOutcome::Empty;
        }

        let now = self.status.lock().started(Utc::now());

        let policy = self.policy_source.current(&self.default_policy).await;
        let (regime, tariffs) = settlement::compute_with_regime(
            snapshot.total_production,
            snapshot.total_consumption,
            &policy,
        );
        info!(
            %regime,
            production_kwh = snapshot.total_production,
            consumption_kwh = snapshot.total_consumption,
            consumption_rate = tariffs.consumption_rate,
            pv_rate = tariffs.pv_rate,
            policy_pv_rate = policy.pv_payout_rate,
            "break-even tariffs"
        );

        let (houses, community) = settlement::build(&snapshot, &tariffs);
        let mut points: Vec<Point> = houses.iter().map(|r| Point::house_energy(r, now)).collect();
        points.push(Point::community_energy(&community, now));

        let house_count = houses.len();
        match self.sink.write(&points).await {
            Ok(()) => {
                self.status.lock().written(now);
                info!(
                    houses = house_count,
                    grid_import_kwh = community.grid_import,
                    grid_export_kwh = community.grid_export,
                    "settlement stored"
                );
                FlushOutcome::Written { houses: house_count, regime }
            }
            Err(e) => {
                self.status.lock().dropped(e.to_string());
                error!(error = %e, houses = house_count, "settlement write failed, interval dropped");
                FlushOutcome::Dropped { houses: house_count }
            }
        }
    }

    /// Drains the telegram queue in arrival order until it closes or
    /// shutdown is requested. Telegrams already queued at shutdown are
    /// still applied.
    pub async fn run_ingest(&self, mut rx: mpsc::Receiver<Telegram>, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                msg = rx.recv() => match msg {
                    Some(t) => { self.ingest(&t); }
                    None => break,
                },
            }
        }
        rx.close();
        while let Ok(t) = rx.try_recv() {
            self.ingest(&t);
        }
        debug!("telegram consumer stopped");
    }

    /// Fixed-period settlement ticker, independent of telegram arrival.
    pub async fn run_settlement(&self, period: Duration, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(period.max(Duration::from_secs(1)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick fires immediately
        interval.tick().await;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => { self.flush().await; }
            }
        }
        debug!("settlement ticker stopped");
    }
}

/// Bounded queue between the transport and the single telegram consumer.
pub fn telegram_queue(capacity: usize) -> (mpsc::Sender<Telegram>, mpsc::Receiver<Telegram>) {
    mpsc::channel(capacity.max(1))
}

/// Spawns the telegram consumer and the settlement ticker.
pub fn spawn_collector_tasks(
    collector: Arc<Collector>,
    rx: mpsc::Receiver<Telegram>,
    period: Duration,
    shutdown: CancellationToken,
) -> TaskTracker {
    let tasks = TaskTracker::new();

    let c = collector.clone();
    let token = shutdown.clone();
    tasks.spawn(async move { c.run_ingest(rx, token).await });

    tasks.spawn(async move { collector.run_settlement(period, shutdown).await });

    tasks.close();
    tasks
}

/// Shared state of the HTTP surface.
#[derive(Clone)]
pub struct AppState {
    pub collector: Arc<Collector>,
    pub telegrams: mpsc::Sender<Telegram>,
}
