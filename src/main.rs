use anyhow::{Context, Result};
use leg_collector::{api, collector, config, domain, settlement, sink, telemetry};
use config::Config;
use std::sync::Arc;
use telemetry::init_tracing;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use collector::{AppState, Collector};
use domain::MeterRegistry;
use settlement::{DeltaTracker, FilePolicySource, PolicySource, StaticPolicySource};
use sink::{InfluxSink, LogSink, SettlementSink};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;
    let _log_guard = init_tracing(&cfg.logging);
    cfg.validate().context("invalid configuration")?;

    let registry = MeterRegistry::from_config(&cfg.houses);
    let tracker = DeltaTracker::new(registry, cfg.collector.max_delta_kwh);

    let policy_source: Arc<dyn PolicySource> = match &cfg.collector.tariffs_file {
        Some(path) => Arc::new(FilePolicySource::new(path)),
        None => Arc::new(StaticPolicySource),
    };

    let sink: Arc<dyn SettlementSink> = if cfg.influx.url.is_empty() {
        warn!("no influx url configured, settlement records are only logged");
        Arc::new(LogSink)
    } else {
        if cfg.influx.token.is_empty() || cfg.influx.token.starts_with("__SET_VIA_ENV") {
            anyhow::bail!("LEG__INFLUX__TOKEN must be set when an influx url is configured");
        }
        Arc::new(InfluxSink::new(&cfg.influx)?)
    };

    let collector = Arc::new(Collector::new(tracker, cfg.tariffs, policy_source, sink));
    let (tx, rx) = collector::telegram_queue(cfg.collector.queue_capacity);

    let shutdown = CancellationToken::new();
    let tasks = collector::spawn_collector_tasks(
        collector.clone(),
        rx,
        cfg.collector.interval(),
        shutdown.clone(),
    );

    let state = AppState { collector: collector.clone(), telegrams: tx };
    let app = api::router(state, &cfg);
    let addr = cfg.server.socket_addr()?;

    info!(
        %addr,
        meters = cfg.houses.len(),
        interval_secs = cfg.collector.interval_secs,
        "starting LEG collector"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(telemetry::shutdown_signal())
        .await?;

    shutdown.cancel();
    tasks.wait().await;

    // partial interval; losing it is tolerable but try once
    let outcome = collector.flush().await;
    info!(?outcome, "final flush");

    warn!("shutdown complete");
    Ok(())
}
