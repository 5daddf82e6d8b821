//! vaultscope — vault aggregation and yield computation engine.
//!
//! Aggregates ERC-4626/ERC-7540 vault data from a REST API, a subgraph
//! indexer, and direct contract reads; normalizes it into one record
//! shape; derives time-windowed APR/APY from settlement-period history;
//! and builds unsigned transaction payloads for an external signer.
//! Read-only against the chain; no keys, no signing.

pub mod bindings;
pub mod cache;
pub mod compute;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod normalize;
pub mod providers;
pub mod resolve;
pub mod txbuild;

pub use cache::TtlCache;
pub use compute::{vault_age_days, yield_windows, WindowYields};
pub use config::{CuratedVaultDescriptor, CuratedVaults, EngineConfig};
pub use engine::Engine;
pub use error::Error;
pub use model::{
    Action, CallDescriptor, PeriodSummary, Provider, RedemptionVariant, VaultRecord, VaultStatus,
};
pub use providers::{ApiVault, FetchError};

pub use alloy::primitives::{Address, U256};
