use crate::{
    history::BlockHistory,
    models::{BlockSample, RawSnapshot, Warning},
    report::{self, ReportLine, Section, StatusReport},
    units::Ether,
};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Serialize, Serializer};
use std::{iter::Peekable, vec};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct Thresholds {
    pub stale_block: TimeDelta,
    pub max_blocks_behind_governors: i128,
    pub stale_governor_sync: TimeDelta,
    pub max_superblocks_behind_bootnodes: i128,
    pub stale_bootnode_sync: TimeDelta,
    pub certificate_expiry_notice: TimeDelta,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            stale_block: TimeDelta::minutes(5),
            max_blocks_behind_governors: 100,
            stale_governor_sync: TimeDelta::minutes(1),
            max_superblocks_behind_bootnodes: 100,
            stale_bootnode_sync: TimeDelta::minutes(2),
            certificate_expiry_notice: TimeDelta::days(7),
        }
    }
}

/// Time elapsed since something was last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness {
    Never,
    Since(TimeDelta),
}

impl Staleness {
    pub fn measure(observed_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        match observed_at {
            Some(at) => Staleness::Since(now.signed_duration_since(at)),
            None => Staleness::Never,
        }
    }

    /// Never-observed events always exceed the limit.
    pub fn exceeds(&self, limit: TimeDelta) -> bool {
        match self {
            Staleness::Never => true,
            Staleness::Since(elapsed) => *elapsed > limit,
        }
    }
}

impl Serialize for Staleness {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Staleness::Never => serializer.serialize_none(),
            Staleness::Since(elapsed) => serializer.serialize_some(&elapsed.num_seconds()),
        }
    }
}

/// Signed time left before the node's certificates expire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateValidity {
    Unknown,
    Remaining(TimeDelta),
}

impl CertificateValidity {
    pub fn measure(valid_until: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        match valid_until {
            Some(until) => CertificateValidity::Remaining(until.signed_duration_since(now)),
            None => CertificateValidity::Unknown,
        }
    }

    pub fn is_expired(&self) -> bool {
        match self {
            CertificateValidity::Unknown => true,
            CertificateValidity::Remaining(left) => *left <= TimeDelta::zero(),
        }
    }

    pub fn expires_within(&self, notice: TimeDelta) -> bool {
        match self {
            CertificateValidity::Unknown => false,
            CertificateValidity::Remaining(left) => *left > TimeDelta::zero() && *left <= notice,
        }
    }
}

impl Serialize for CertificateValidity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CertificateValidity::Unknown => serializer.serialize_none(),
            CertificateValidity::Remaining(left) => serializer.serialize_some(&left.num_seconds()),
        }
    }
}

/// Health indicators computed for one poll.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedMetrics {
    pub block_rate: f64,
    pub since_last_block: Staleness,
    pub since_governor_sync: Staleness,
    pub since_bootnode_sync: Staleness,
    pub certificate_validity: CertificateValidity,
    pub blocks_behind_governors: i128,
    pub superblocks_behind_bootnodes: i128,
    pub signing_balance: Ether,
}

/// Turns status snapshots into reports, remembering recent block heights.
///
/// One engine serves one node; engines share nothing.
#[derive(Debug, Clone, Default)]
pub struct MetricsEngine {
    history: BlockHistory,
    thresholds: Thresholds,
}

impl MetricsEngine {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            history: BlockHistory::default(),
            thresholds,
        }
    }

    pub fn history(&self) -> &BlockHistory {
        &self.history
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn evaluate(
        &mut self,
        snapshot: &RawSnapshot,
        min_signing_balance: &Ether,
        now: DateTime<Utc>,
    ) -> StatusReport {
        self.history.push(BlockSample {
            height: snapshot.current_block_height,
            observed_at: snapshot.last_committed_block_at,
        });

        let metrics = self.derive_metrics(snapshot, now);
        debug!(
            block_rate = metrics.block_rate,
            blocks_behind = %metrics.blocks_behind_governors,
            superblocks_behind = %metrics.superblocks_behind_bootnodes,
            history_len = self.history.len(),
            "metrics derived"
        );

        let warnings = self.check_thresholds(&metrics, min_signing_balance);
        for warning in &warnings {
            warn!(severity = ?warning.severity(), warning = %warning, "threshold breached");
        }

        assemble_report(snapshot, metrics, warnings, now)
    }

    fn derive_metrics(&self, snapshot: &RawSnapshot, now: DateTime<Utc>) -> DerivedMetrics {
        DerivedMetrics {
            block_rate: self.history.block_rate(),
            since_last_block: Staleness::measure(snapshot.last_committed_block_at, now),
            since_governor_sync: Staleness::measure(snapshot.last_synced_with_governors_at, now),
            since_bootnode_sync: Staleness::measure(snapshot.last_synced_with_bootnodes_at, now),
            certificate_validity: CertificateValidity::measure(
                snapshot.certificates_valid_until,
                now,
            ),
            blocks_behind_governors: i128::from(snapshot.last_block_height_from_governors)
                - i128::from(snapshot.current_block_height),
            superblocks_behind_bootnodes: i128::from(snapshot.last_superblock_height_from_bootnodes)
                - i128::from(snapshot.current_superblock_height),
            signing_balance: snapshot.signing_address_balance(),
        }
    }

    /// Applies every threshold rule to the current poll, in report order.
    pub fn check_thresholds(&self, metrics: &DerivedMetrics, min_signing_balance: &Ether) -> Vec<Warning> {
        let limits = &self.thresholds;
        let mut warnings = Vec::new();

        if metrics.since_last_block.exceeds(limits.stale_block) {
            warnings.push(Warning::StaleBlock {
                threshold_secs: limits.stale_block.num_seconds(),
            });
        }
        if metrics.blocks_behind_governors > limits.max_blocks_behind_governors {
            warnings.push(Warning::BehindGovernors {
                blocks: metrics.blocks_behind_governors,
            });
        }
        if metrics.since_governor_sync.exceeds(limits.stale_governor_sync) {
            warnings.push(Warning::StaleGovernorSync {
                threshold_secs: limits.stale_governor_sync.num_seconds(),
            });
        }
        if metrics.superblocks_behind_bootnodes > limits.max_superblocks_behind_bootnodes {
            warnings.push(Warning::BehindBootnodes {
                superblocks: metrics.superblocks_behind_bootnodes,
            });
        }
        if metrics.since_bootnode_sync.exceeds(limits.stale_bootnode_sync) {
            warnings.push(Warning::StaleBootnodeSync {
                threshold_secs: limits.stale_bootnode_sync.num_seconds(),
            });
        }
        if metrics.signing_balance < *min_signing_balance {
            warnings.push(Warning::LowSigningBalance {
                minimum: *min_signing_balance,
            });
        }
        if metrics.certificate_validity.is_expired() {
            warnings.push(Warning::CertificateExpired);
        }
        if metrics
            .certificate_validity
            .expires_within(limits.certificate_expiry_notice)
        {
            warnings.push(Warning::CertificateExpiringSoon);
        }

        warnings
    }
}

type PendingWarnings = Peekable<vec::IntoIter<Warning>>;

fn attach(lines: &mut Vec<ReportLine>, pending: &mut PendingWarnings, belongs: fn(&Warning) -> bool) {
    while let Some(warning) = pending.next_if(|warning| belongs(warning)) {
        lines.push(ReportLine::Warning(warning));
    }
}

fn assemble_report(
    snapshot: &RawSnapshot,
    metrics: DerivedMetrics,
    warnings: Vec<Warning>,
    now: DateTime<Utc>,
) -> StatusReport {
    let mut pending = warnings.into_iter().peekable();

    let sync = Section::new(
        "Sync Status",
        vec![ReportLine::Info(
            if snapshot.is_recovery_sync_complete {
                "Node has completed initial sync"
            } else {
                "Node is still running initial sync"
            }
            .to_owned(),
        )],
    );

    let mut block = vec![
        ReportLine::Info(format!("Current block: {}", snapshot.current_block_height)),
        ReportLine::Info(format!(
            "Block processed at {}, i.e. {}",
            report::format_timestamp(snapshot.last_committed_block_at),
            report::format_staleness(&metrics.since_last_block),
        )),
    ];
    attach(&mut block, &mut pending, |w| matches!(w, Warning::StaleBlock { .. }));
    block.push(ReportLine::Info(format!(
        "Block process rate: {} blocks per second",
        report::format_rate(metrics.block_rate)
    )));
    attach(&mut block, &mut pending, |w| matches!(w, Warning::BehindGovernors { .. }));
    block.push(ReportLine::Info(format!(
        "Last block seen from governors: {}",
        snapshot.last_block_height_from_governors
    )));
    block.push(ReportLine::Info(format!(
        "Time of last block sync with governors: {}, i.e. {}",
        report::format_timestamp(snapshot.last_synced_with_governors_at),
        report::format_staleness(&metrics.since_governor_sync),
    )));
    attach(&mut block, &mut pending, |w| matches!(w, Warning::StaleGovernorSync { .. }));

    let mut superblock = vec![ReportLine::Info(format!(
        "Current superblock: {}",
        snapshot.current_superblock_height
    ))];
    attach(&mut superblock, &mut pending, |w| matches!(w, Warning::BehindBootnodes { .. }));
    superblock.push(ReportLine::Info(format!(
        "Last superblock seen from bootnodes: {}",
        snapshot.last_superblock_height_from_bootnodes
    )));
    superblock.push(ReportLine::Info(format!(
        "Time of last superblock sync with bootnodes: {}, i.e. {}",
        report::format_timestamp(snapshot.last_synced_with_bootnodes_at),
        report::format_staleness(&metrics.since_bootnode_sync),
    )));
    attach(&mut superblock, &mut pending, |w| matches!(w, Warning::StaleBootnodeSync { .. }));

    let mut signing = vec![
        ReportLine::Info(format!("Address: {}", snapshot.signing_address)),
        ReportLine::Info(format!("Balance: {} RBNT", metrics.signing_balance)),
    ];
    attach(&mut signing, &mut pending, |w| matches!(w, Warning::LowSigningBalance { .. }));

    let mut certificate = vec![
        ReportLine::Info(format!(
            "Certificate DNS names: [{}]",
            snapshot.certificate_dns_names.join(", ")
        )),
        ReportLine::Info(format!(
            "Certificate valid until {}, i.e. {}",
            report::format_timestamp(snapshot.certificates_valid_until),
            report::format_validity(&metrics.certificate_validity),
        )),
    ];
    attach(&mut certificate, &mut pending, |w| {
        matches!(w, Warning::CertificateExpired | Warning::CertificateExpiringSoon)
    });

    let version = Section::new(
        "Binary Version",
        vec![ReportLine::Info(snapshot.binary_version.clone())],
    );

    StatusReport {
        generated_at: now,
        sections: vec![
            sync,
            Section::new("Block Information", block),
            Section::new("Superblock Information", superblock),
            Section::new("Signing Address Information", signing),
            Section::new("Certificate Information", certificate),
            version,
        ],
        metrics,
    }
}
