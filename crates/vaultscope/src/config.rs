//! Engine configuration and the curated vault table.
//!
//! The curated table pins a vault to one authoritative provider and is
//! loaded once at process start: env `VAULTSCOPE_CURATED_PATH`, then
//! `./config/curated_vaults.json`, then `./curated_vaults.json`. Missing
//! or malformed files mean an empty table, never a startup failure.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::model::Provider;
use crate::providers::http::HttpConfig;
use alloy::primitives::Address;

const DEFAULT_API_URL: &str = "https://api.vaultscope.dev/v1";

/// List results move fast, point reads faster; TTLs track volatility.
const LIST_TTL: Duration = Duration::from_secs(15);
const VAULT_TTL: Duration = Duration::from_secs(10);
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);
const REQUEST_DEADLINE: Duration = Duration::from_secs(20);

#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Chains the engine will serve; anything else is `Unsupported`.
    pub chains: Vec<u64>,
    pub api_base_url: String,
    pub subgraph_urls: HashMap<u64, Url>,
    pub rpc_urls: HashMap<u64, Url>,
    /// Best-effort resolution order. Curated vaults ignore it.
    pub priority: Vec<Provider>,
    pub http: HttpConfig,
    pub vault_ttl: Duration,
    pub list_ttl: Duration,
    pub sweep_interval: Duration,
    /// Overall per-request deadline; on expiry the caller gets an upstream
    /// timeout instead of a hang.
    pub request_deadline: Duration,
    pub curated: CuratedVaults,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chains: vec![1],
            api_base_url: DEFAULT_API_URL.to_string(),
            subgraph_urls: HashMap::new(),
            rpc_urls: HashMap::new(),
            priority: vec![Provider::Onchain, Provider::Api],
            http: HttpConfig::default(),
            vault_ttl: VAULT_TTL,
            list_ttl: LIST_TTL,
            sweep_interval: SWEEP_INTERVAL,
            request_deadline: REQUEST_DEADLINE,
            curated: CuratedVaults::default(),
        }
    }
}

/// Static mapping of `(address, chainId)` to the one provider whose data
/// is authoritative for that vault.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CuratedVaults {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vaults: Vec<CuratedVaultDescriptor>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CuratedVaultDescriptor {
    pub address: Address,
    pub chain_id: u64,
    pub provider: Provider,
    /// Display fallbacks for placeholder records when the pinned provider
    /// is temporarily unreachable.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub underlying_symbol: Option<String>,
}

impl CuratedVaults {
    /// Load from `path`. Returns the empty table on any error.
    pub fn load_from_path(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Load from env `VAULTSCOPE_CURATED_PATH`, then conventional paths.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("VAULTSCOPE_CURATED_PATH") {
            let p = Path::new(&path);
            if p.exists() {
                return Self::load_from_path(p);
            }
        }
        for candidate in [
            Path::new("./config/curated_vaults.json"),
            Path::new("./curated_vaults.json"),
        ] {
            if candidate.exists() {
                return Self::load_from_path(candidate);
            }
        }
        Self::default()
    }

    pub fn get(&self, chain_id: u64, address: Address) -> Option<&CuratedVaultDescriptor> {
        self.vaults
            .iter()
            .find(|v| v.chain_id == chain_id && v.address == address)
    }

    pub fn is_empty(&self) -> bool {
        self.vaults.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curated_lookup_is_chain_scoped() {
        let table: CuratedVaults = serde_json::from_str(
            r#"{
                "vaults": [{
                    "address": "0x4444444444444444444444444444444444444444",
                    "chainId": 1,
                    "provider": "subgraph",
                    "name": "Pinned Vault"
                }]
            }"#,
        )
        .unwrap();
        let addr: Address = "0x4444444444444444444444444444444444444444"
            .parse()
            .unwrap();
        assert_eq!(table.get(1, addr).unwrap().provider, Provider::Subgraph);
        assert!(table.get(10, addr).is_none());
        assert!(table.get(1, Address::ZERO).is_none());
    }

    #[test]
    fn malformed_table_is_empty() {
        let table = CuratedVaults::load_from_path(Path::new("/definitely/not/there.json"));
        assert!(table.is_empty());
    }

    #[test]
    fn default_priority_prefers_onchain() {
        let config = EngineConfig::default();
        assert_eq!(config.priority, vec![Provider::Onchain, Provider::Api]);
        assert_eq!(config.vault_ttl, Duration::from_secs(10));
        assert_eq!(config.list_ttl, Duration::from_secs(15));
    }
}
