use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use ethereum_types::U256;
use node_status_monitor::{
    collector::{CollectorError, StatusSource},
    config::{AppConfig, ColorChoice, OutputFormat},
    engine::MetricsEngine,
    error::MonitorError,
    models::{RawSnapshot, Warning},
    report::CLEAR_SCREEN,
    service::{poll_once, run_loop},
    units::Ether,
};
use std::{collections::VecDeque, sync::Mutex, time::Duration};

/// Serves queued snapshots, then a parse failure once the queue is empty.
#[derive(Default)]
struct MockSource {
    queued: Mutex<VecDeque<RawSnapshot>>,
}

impl MockSource {
    fn with(snapshots: impl IntoIterator<Item = RawSnapshot>) -> Self {
        Self {
            queued: Mutex::new(snapshots.into_iter().collect()),
        }
    }
}

#[async_trait::async_trait]
impl StatusSource for MockSource {
    fn address(&self) -> &str {
        "http://mock-node:6539"
    }

    async fn fetch_snapshot(&self) -> Result<RawSnapshot, CollectorError> {
        let next = match self.queued.lock() {
            Ok(mut guard) => guard.pop_front(),
            Err(_) => None,
        };
        next.ok_or_else(|| CollectorError::Parse {
            address: self.address().to_owned(),
            reason: "no more snapshots".to_owned(),
        })
    }
}

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn snapshot(height: u64, committed_at: DateTime<Utc>) -> RawSnapshot {
    RawSnapshot {
        is_recovery_sync_complete: true,
        last_committed_block_at: Some(committed_at),
        current_block_height: height,
        last_block_height_from_governors: height,
        last_synced_with_governors_at: Some(committed_at),
        current_superblock_height: 3,
        last_superblock_height_from_bootnodes: 3,
        last_synced_with_bootnodes_at: Some(committed_at),
        certificate_dns_names: vec!["node.example.org".to_owned()],
        certificates_valid_until: Some(committed_at + TimeDelta::days(30)),
        signing_address: "0xaa".to_owned(),
        signing_address_balance_wei: U256::from_dec_str("50000000000000000000").unwrap(),
        binary_version: "v1".to_owned(),
    }
}

fn config(once: bool) -> AppConfig {
    AppConfig {
        address: "http://mock-node:6539".to_owned(),
        min_signing_balance: Ether::from_whole(10),
        refresh_interval: Duration::from_secs(5),
        output: OutputFormat::Text,
        color: ColorChoice::Never,
        once,
    }
}

#[tokio::test]
async fn repeated_polls_build_block_rate_from_window_endpoints() {
    let samples: Vec<RawSnapshot> = (0..12u64)
        .map(|step| {
            let offset = i64::try_from(step).unwrap() * 5;
            snapshot(1_000 + step * 10, base_time() + TimeDelta::seconds(offset))
        })
        .collect();
    let source = MockSource::with(samples);
    let mut engine = MetricsEngine::default();
    let minimum = Ether::from_whole(10);

    let mut last_report = None;
    for step in 0..12i64 {
        let now = base_time() + TimeDelta::seconds(step * 5);
        let report = poll_once(&source, &mut engine, &minimum, now)
            .await
            .expect("queued snapshot");
        assert!(report.warnings().next().is_none());
        last_report = Some(report);
    }

    assert_eq!(engine.history().len(), 10);
    assert_eq!(engine.history().oldest().map(|sample| sample.height), Some(1_020));
    assert_eq!(engine.history().newest().map(|sample| sample.height), Some(1_110));
    assert_eq!(last_report.map(|report| report.metrics.block_rate), Some(2.0));
}

#[tokio::test]
async fn failed_fetch_produces_no_report() {
    let source = MockSource::default();
    let mut engine = MetricsEngine::default();

    let result = poll_once(&source, &mut engine, &Ether::from_whole(10), base_time()).await;

    assert!(matches!(result, Err(CollectorError::Parse { .. })));
    assert!(engine.history().is_empty());
}

#[tokio::test]
async fn once_mode_writes_a_single_report() {
    let source = MockSource::with([snapshot(7, Utc::now())]);
    let mut out = Vec::new();

    run_loop(&source, &config(true), &mut out).await.expect("single poll");
    let text = String::from_utf8(out).expect("utf8");

    assert!(text.starts_with("Monitoring url http://mock-node:6539/status\n"));
    assert!(text.contains("\nBlock Information:\nCurrent block: 7\n"));
    assert!(text.contains("Balance: 50 RBNT"));
    assert!(!text.contains("WARNING"));
}

#[tokio::test(start_paused = true)]
async fn dashboard_redraws_each_tick_until_the_source_fails() {
    let now = Utc::now();
    let source = MockSource::with([snapshot(1, now), snapshot(2, now), snapshot(3, now)]);
    let mut out = Vec::new();

    let result = run_loop(&source, &config(false), &mut out).await;

    assert!(matches!(
        result,
        Err(MonitorError::Collector(CollectorError::Parse { .. }))
    ));
    let text = String::from_utf8(out).expect("utf8");
    assert_eq!(text.matches(CLEAR_SCREEN).count(), 3);
    assert!(text.contains("Current block: 3"));
}

#[tokio::test]
async fn low_balance_and_lag_surface_in_rendered_dashboard() {
    let mut lagging = snapshot(100, Utc::now());
    lagging.last_block_height_from_governors = 250;
    lagging.signing_address_balance_wei = U256::from_dec_str("9999999999999999999").unwrap();
    let source = MockSource::with([lagging]);
    let mut out = Vec::new();

    run_loop(&source, &config(true), &mut out).await.expect("single poll");
    let text = String::from_utf8(out).expect("utf8");

    assert!(text.contains(&format!(
        "WARNING: {}",
        Warning::BehindGovernors { blocks: 150 }
    )));
    assert!(text.contains("Balance: 9.999999999999999999 RBNT"));
    assert!(text.contains(
        "WARNING: signing address balance is less than the minimum needed of 10 RBNT"
    ));
}
