use crate::{
    collector::{Collector, CollectorError, StatusSource},
    config::{AppConfig, OutputFormat},
    engine::MetricsEngine,
    error::MonitorError,
    report::{CLEAR_SCREEN, StatusReport},
    units::Ether,
};
use chrono::{DateTime, Utc};
use std::io::{self, Write};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

/// Fetches one snapshot and folds it into the engine.
pub async fn poll_once<S>(
    source: &S,
    engine: &mut MetricsEngine,
    min_signing_balance: &Ether,
    now: DateTime<Utc>,
) -> Result<StatusReport, CollectorError>
where
    S: StatusSource + ?Sized,
{
    let snapshot = source.fetch_snapshot().await?;
    Ok(engine.evaluate(&snapshot, min_signing_balance, now))
}

pub fn render(
    report: &StatusReport,
    status_url: &str,
    config: &AppConfig,
) -> Result<String, MonitorError> {
    match config.output {
        OutputFormat::Json => Ok(format!("{}\n", report.to_json()?)),
        OutputFormat::Text => {
            let clear = if config.once { "" } else { CLEAR_SCREEN };
            Ok(format!(
                "{clear}Monitoring url {status_url}\n{}",
                report.render_text(config.color_enabled())
            ))
        }
    }
}

/// Polls until the source fails, or once when `config.once` is set.
pub async fn run_loop<S, W>(source: &S, config: &AppConfig, out: &mut W) -> Result<(), MonitorError>
where
    S: StatusSource + ?Sized,
    W: Write,
{
    let mut engine = MetricsEngine::default();
    let status_url = format!("{}/status", source.address().trim_end_matches('/'));

    let mut ticker = time::interval(config.refresh_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let report = poll_once(source, &mut engine, &config.min_signing_balance, Utc::now()).await?;
        let rendered = render(&report, &status_url, config)?;
        out.write_all(rendered.as_bytes())?;
        out.flush()?;

        debug!(
            warnings = report.warnings().count(),
            history_len = engine.history().len(),
            "status refreshed"
        );

        if config.once {
            return Ok(());
        }
    }
}

/// Runs the dashboard against the configured node until interrupted.
pub async fn run(config: AppConfig) -> Result<(), MonitorError> {
    let collector = Collector::new(config.address.clone())?;
    info!(
        url = collector.status_url(),
        refresh_secs = config.refresh_interval.as_secs(),
        min_balance = %config.min_signing_balance,
        "monitoring node status"
    );

    let mut stdout = io::stdout();
    tokio::select! {
        result = run_loop(&collector, &config, &mut stdout) => result,
        signal = tokio::signal::ctrl_c() => {
            signal.map_err(MonitorError::Signal)?;
            println!("\nExiting");
            Ok(())
        }
    }
}
