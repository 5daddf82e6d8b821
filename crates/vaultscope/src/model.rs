//! Canonical vault view shared by all provider adapters.

use alloy::primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Data source that produced (or is pinned to produce) a vault record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Api,
    Subgraph,
    Onchain,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Provider::Api => "api",
            Provider::Subgraph => "subgraph",
            Provider::Onchain => "onchain",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VaultStatus {
    Active,
    Paused,
    Deprecated,
}

/// How redemptions settle: atomically in one call, or through a
/// request/settle/claim lifecycle where only the request is built here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedemptionVariant {
    Synchronous,
    Asynchronous,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fees {
    pub mgmt_bps: u32,
    pub perf_bps: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Underlying {
    pub symbol: String,
    pub address: Address,
    pub decimals: u8,
}

/// One value per supported lookback window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowSet {
    pub all: f64,
    #[serde(rename = "30d")]
    pub d30: f64,
    #[serde(rename = "7d")]
    pub d7: f64,
}

/// Derived yield metrics attached when settlement-period history exists.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultMetadata {
    pub apr_net: WindowSet,
    pub apy_net: WindowSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vault_age_days: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realized_apy: Option<f64>,
}

/// Canonical vault view. Constructed fresh per request from adapter output,
/// never mutated after caching; a refresh replaces the record wholesale.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultRecord {
    /// Vault contract address; also the cache key together with `chain_id`.
    pub id: Address,
    pub chain_id: u64,
    pub name: String,
    pub symbol: String,
    /// Decimal string, USD.
    pub tvl_usd: String,
    /// Decimal string, decimal fraction (0.05 = 5%).
    pub apy_net: String,
    pub fees: Fees,
    pub underlying: Underlying,
    pub status: VaultStatus,
    pub provider: Provider,
    /// None means the variant is unknown; the transaction builder refuses
    /// to guess a call shape for such records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redemption: Option<RedemptionVariant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<VaultMetadata>,
}

/// Snapshot of vault economics over one settlement period.
///
/// Asset/supply magnitudes are raw base units; only price-per-share ratios
/// are consumed downstream, so the constant decimal scale cancels out.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodSummary {
    pub total_assets_at_start: f64,
    pub total_supply_at_start: f64,
    pub total_assets_at_end: f64,
    pub total_supply_at_end: f64,
    /// Supply net of shares already queued for redemption; preferred over
    /// the gross figure so pending exits do not dilute measured yield.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_total_supply_at_end: Option<f64>,
    /// Unix seconds.
    pub start_timestamp: i64,
    /// Zero while the period is still accruing.
    pub duration_seconds: i64,
}

impl PeriodSummary {
    pub fn end_timestamp(&self) -> i64 {
        self.start_timestamp + self.duration_seconds
    }

    /// End-of-period supply, net of pending redemptions when reported.
    pub fn end_supply(&self) -> f64 {
        self.net_total_supply_at_end
            .unwrap_or(self.total_supply_at_end)
    }

    /// A period qualifies for window math only once settled: positive
    /// duration and positive end-of-period assets and supply.
    pub fn is_completed(&self) -> bool {
        self.duration_seconds > 0 && self.total_assets_at_end > 0.0 && self.end_supply() > 0.0
    }
}

/// Unsigned call for an external signer; the engine never signs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallDescriptor {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Deposit,
    Withdraw,
    Approve,
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deposit" => Ok(Action::Deposit),
            "withdraw" => Ok(Action::Withdraw),
            "approve" => Ok(Action::Approve),
            other => Err(Error::Invalid(format!("unknown action {other:?}"))),
        }
    }
}
