use crate::models::RawSnapshot;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use ethereum_types::U256;
use reqwest::Client;
use serde::Deserialize;
use serde_with::{DisplayFromStr, PickFirst, serde_as};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("request to {address} failed: {source}")]
    Transport {
        address: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("invalid status response from {address}: {reason}")]
    Parse { address: String, reason: String },
}

impl CollectorError {
    pub fn address(&self) -> &str {
        match self {
            CollectorError::Transport { address, .. } | CollectorError::Parse { address, .. } => {
                address
            }
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, CollectorError::Transport { .. })
    }
}

/// Anything able to hand out a fresh status snapshot on demand.
#[async_trait::async_trait]
pub trait StatusSource {
    fn address(&self) -> &str;

    async fn fetch_snapshot(&self) -> Result<RawSnapshot, CollectorError>;
}

#[derive(Debug, Clone)]
pub struct Collector {
    client: Client,
    address: String,
    status_url: String,
}

impl Collector {
    pub fn new(address: impl Into<String>) -> Result<Self, CollectorError> {
        let address = address.into();
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| CollectorError::Transport {
                address: address.clone(),
                source,
            })?;
        let status_url = format!("{}/status", address.trim_end_matches('/'));

        Ok(Self {
            client,
            address,
            status_url,
        })
    }

    pub fn status_url(&self) -> &str {
        &self.status_url
    }

    fn transport_error(&self, source: reqwest::Error) -> CollectorError {
        CollectorError::Transport {
            address: self.address.clone(),
            source,
        }
    }

    fn parse_error(&self, reason: impl Into<String>) -> CollectorError {
        CollectorError::Parse {
            address: self.address.clone(),
            reason: reason.into(),
        }
    }
}

#[async_trait::async_trait]
impl StatusSource for Collector {
    fn address(&self) -> &str {
        &self.address
    }

    async fn fetch_snapshot(&self) -> Result<RawSnapshot, CollectorError> {
        let body = self
            .client
            .get(&self.status_url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|error| self.transport_error(error))?
            .bytes()
            .await
            .map_err(|error| self.transport_error(error))?;

        debug!(url = %self.status_url, bytes = body.len(), "status response received");

        let response: StatusResponse =
            serde_json::from_slice(&body).map_err(|error| self.parse_error(error.to_string()))?;
        response.into_snapshot().map_err(|reason| self.parse_error(reason))
    }
}

/// Wire shape of the `/status` document.
#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    is_recovery_complete: bool,
    last_committed_block_at: String,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    current_block: u64,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    last_block_from_governors: u64,
    last_synced_with_governor_nodes: String,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    current_superblock: u64,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    last_superblock_from_bootnodes: u64,
    last_synced_with_bootnodes: String,
    certificate_dns_names: Vec<String>,
    certificates_valid_upto: String,
    signing_address: String,
    signing_address_balance: String,
    version: String,
}

impl StatusResponse {
    fn into_snapshot(self) -> Result<RawSnapshot, String> {
        let signing_address_balance_wei = U256::from_dec_str(self.signing_address_balance.trim())
            .map_err(|_| {
                format!(
                    "signingAddressBalance is not a decimal integer: {:?}",
                    self.signing_address_balance
                )
            })?;

        Ok(RawSnapshot {
            is_recovery_sync_complete: self.is_recovery_complete,
            last_committed_block_at: parse_field("lastCommittedBlockAt", &self.last_committed_block_at)?,
            current_block_height: self.current_block,
            last_block_height_from_governors: self.last_block_from_governors,
            last_synced_with_governors_at: parse_field(
                "lastSyncedWithGovernorNodes",
                &self.last_synced_with_governor_nodes,
            )?,
            current_superblock_height: self.current_superblock,
            last_superblock_height_from_bootnodes: self.last_superblock_from_bootnodes,
            last_synced_with_bootnodes_at: parse_field(
                "lastSyncedWithBootnodes",
                &self.last_synced_with_bootnodes,
            )?,
            certificate_dns_names: self.certificate_dns_names,
            certificates_valid_until: parse_field("certificatesValidUpto", &self.certificates_valid_upto)?,
            signing_address: self.signing_address,
            signing_address_balance_wei,
            binary_version: self.version,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("not a timestamp: {0:?}")]
pub struct InvalidTimestamp(pub String);

fn parse_field(name: &str, raw: &str) -> Result<Option<DateTime<Utc>>, String> {
    parse_timestamp(raw).map_err(|error| format!("{name} is {error}"))
}

const OFFSET_FORMATS: [&str; 5] = [
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M%z",
];

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Rewrites a trailing `Z` designator as `+0000` so `%z` accepts it.
fn zulu_as_offset(candidate: &str) -> String {
    match candidate.strip_suffix(['Z', 'z']) {
        Some(stem) if stem.ends_with(|c: char| c.is_ascii_digit()) => format!("{stem}+0000"),
        _ => candidate.to_owned(),
    }
}

/// Parses a status-server timestamp into an absolute instant.
///
/// Returns `Ok(None)` for the empty string, which the node uses for "never".
/// Naive timestamps are taken as UTC, and a bare date means midnight UTC.
/// Seconds may be omitted, and RFC 2822 dates are accepted too. A trailing
/// zone abbreviation or Go monotonic-clock reading
/// (`2024-01-02 03:04:05 +0000 UTC m=+1.5`) is ignored.
pub fn parse_timestamp(raw: &str) -> Result<Option<DateTime<Utc>>, InvalidTimestamp> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(Some(parsed.with_timezone(&Utc)));
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(trimmed) {
        return Ok(Some(parsed.with_timezone(&Utc)));
    }

    let significant: Vec<&str> = trimmed
        .split_whitespace()
        .take_while(|token| !token.starts_with("m="))
        .collect();
    let mut candidates = vec![significant.join(" ")];
    if let Some((last, rest)) = significant.split_last() {
        if !rest.is_empty() && last.chars().all(|c| c.is_ascii_alphabetic()) {
            candidates.push(rest.join(" "));
        }
    }

    for candidate in &candidates {
        let offset_candidate = zulu_as_offset(candidate);
        for format in OFFSET_FORMATS {
            if let Ok(parsed) = DateTime::parse_from_str(&offset_candidate, format) {
                return Ok(Some(parsed.with_timezone(&Utc)));
            }
        }
        for format in NAIVE_FORMATS {
            if let Ok(parsed) = NaiveDateTime::parse_from_str(candidate, format) {
                return Ok(Some(parsed.and_utc()));
            }
        }
        if let Ok(date) = NaiveDate::parse_from_str(candidate, DATE_FORMAT) {
            return Ok(Some(date.and_time(NaiveTime::MIN).and_utc()));
        }
    }

    Err(InvalidTimestamp(raw.to_owned()))
}
