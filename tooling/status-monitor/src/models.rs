use chrono::{DateTime, Utc};
use ethereum_types::U256;
use serde::Serialize;
use std::fmt;

use crate::units::Ether;

/// One poll's worth of facts reported by the node's status server.
///
/// Timestamps the node has never observed are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSnapshot {
    pub is_recovery_sync_complete: bool,
    pub last_committed_block_at: Option<DateTime<Utc>>,
    pub current_block_height: u64,
    pub last_block_height_from_governors: u64,
    pub last_synced_with_governors_at: Option<DateTime<Utc>>,
    pub current_superblock_height: u64,
    pub last_superblock_height_from_bootnodes: u64,
    pub last_synced_with_bootnodes_at: Option<DateTime<Utc>>,
    pub certificate_dns_names: Vec<String>,
    pub certificates_valid_until: Option<DateTime<Utc>>,
    pub signing_address: String,
    pub signing_address_balance_wei: U256,
    pub binary_version: String,
}

impl RawSnapshot {
    pub fn signing_address_balance(&self) -> Ether {
        Ether::from_wei(self.signing_address_balance_wei)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlockSample {
    pub height: u64,
    pub observed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Warning,
    Critical,
}

/// Threshold breaches detected for a single poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum Warning {
    StaleBlock { threshold_secs: i64 },
    BehindGovernors { blocks: i128 },
    StaleGovernorSync { threshold_secs: i64 },
    BehindBootnodes { superblocks: i128 },
    StaleBootnodeSync { threshold_secs: i64 },
    LowSigningBalance { minimum: Ether },
    CertificateExpired,
    CertificateExpiringSoon,
}

impl Warning {
    pub fn severity(&self) -> Severity {
        match self {
            Warning::StaleBlock { .. } | Warning::CertificateExpired => Severity::Critical,
            _ => Severity::Warning,
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::StaleBlock { threshold_secs } => write!(
                f,
                "node has not processed a block in more than {} minutes, may be out of sync with network",
                threshold_secs / 60
            ),
            Warning::BehindGovernors { blocks } => {
                write!(f, "node is {blocks} blocks behind the governors")
            }
            Warning::StaleGovernorSync { threshold_secs } => write!(
                f,
                "node has not synced block number with governors in more than {} minute(s), node may be out of sync with network",
                threshold_secs / 60
            ),
            Warning::BehindBootnodes { superblocks } => {
                write!(f, "node is {superblocks} superblocks behind the bootnodes")
            }
            Warning::StaleBootnodeSync { threshold_secs } => write!(
                f,
                "node has not synced superblock number with bootnodes in more than {} minutes, node may be out of sync with network",
                threshold_secs / 60
            ),
            Warning::LowSigningBalance { minimum } => write!(
                f,
                "signing address balance is less than the minimum needed of {minimum} RBNT"
            ),
            Warning::CertificateExpired => write!(f, "certificate has expired"),
            Warning::CertificateExpiringSoon => write!(f, "certificate will expire soon"),
        }
    }
}
