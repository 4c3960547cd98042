//! Exact conversion between wei and decimal Ether amounts.
//!
//! Balances arrive as integer wei strings and minimums are configured in whole
//! (or fractional) Ether. Both are held as `U256` wei so comparisons never go
//! through floating point.

use ethereum_types::U256;
use serde::{Serialize, Serializer};
use std::{fmt, str::FromStr};
use thiserror::Error;

pub const ETHER_DECIMALS: usize = 18;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitsError {
    #[error("empty amount")]
    Empty,
    #[error("invalid digits in amount: {0}")]
    InvalidDigits(String),
    #[error("amount {0} has more than 18 decimal places")]
    TooManyDecimals(String),
    #[error("amount {0} does not fit in 256 bits of wei")]
    Overflow(String),
}

fn wei_per_ether() -> U256 {
    U256::exp10(ETHER_DECIMALS)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ether(U256);

impl Ether {
    pub fn from_wei(wei: U256) -> Self {
        Self(wei)
    }

    pub fn from_whole(ether: u64) -> Self {
        Self(U256::from(ether).saturating_mul(wei_per_ether()))
    }

    pub fn wei(&self) -> U256 {
        self.0
    }
}

impl fmt::Display for Ether {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (whole, fraction) = self.0.div_mod(wei_per_ether());
        if fraction.is_zero() {
            return write!(f, "{whole}");
        }

        let digits = fraction.to_string();
        let padded = format!("{}{digits}", "0".repeat(ETHER_DECIMALS.saturating_sub(digits.len())));
        write!(f, "{whole}.{}", padded.trim_end_matches('0'))
    }
}

impl FromStr for Ether {
    type Err = UnitsError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(UnitsError::Empty);
        }

        let (whole, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));
        let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction) {
            return Err(UnitsError::InvalidDigits(raw.to_owned()));
        }
        if fraction.len() > ETHER_DECIMALS {
            return Err(UnitsError::TooManyDecimals(raw.to_owned()));
        }

        let overflow = || UnitsError::Overflow(raw.to_owned());
        let whole_wei = if whole.is_empty() {
            U256::zero()
        } else {
            U256::from_dec_str(whole)
                .map_err(|_| overflow())?
                .checked_mul(wei_per_ether())
                .ok_or_else(overflow)?
        };
        let fraction_wei = if fraction.is_empty() {
            U256::zero()
        } else {
            let scale = U256::exp10(ETHER_DECIMALS.saturating_sub(fraction.len()));
            U256::from_dec_str(fraction)
                .map_err(|_| overflow())?
                .checked_mul(scale)
                .ok_or_else(overflow)?
        };

        whole_wei
            .checked_add(fraction_wei)
            .map(Self)
            .ok_or_else(overflow)
    }
}

impl Serialize for Ether {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
