//! Direct contract-read adapter. Authoritative for live totals and token
//! metadata; knows nothing about USD prices or history.

use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use tracing::{debug, warn};
use url::Url;

use super::http::HttpConfig;
use super::{FetchError, VaultProvider};
use crate::bindings::{IERC20, IERC4626};
use crate::model::{
    Fees, Provider, RedemptionVariant, Underlying, VaultRecord, VaultStatus,
};
use crate::txbuild::DecimalsSource;
use alloy::primitives::Address;
use alloy::providers::{DynProvider, Provider as _, ProviderBuilder};

pub struct OnchainProvider {
    rpcs: HashMap<u64, DynProvider>,
    config: HttpConfig,
}

/// Error responses are the contract telling us the address is not a vault
/// (revert, missing function, empty returndata); everything else is the
/// transport failing.
fn classify(err: alloy::contract::Error) -> FetchError {
    match &err {
        alloy::contract::Error::TransportError(rpc) if !rpc.is_error_resp() => {
            FetchError::Rpc(err.to_string())
        }
        _ => FetchError::NotFound,
    }
}

impl OnchainProvider {
    pub fn new(rpc_urls: &HashMap<u64, Url>, config: HttpConfig) -> Self {
        let rpcs = rpc_urls
            .iter()
            .map(|(chain_id, url)| {
                let provider = ProviderBuilder::new().connect_http(url.clone()).erased();
                (*chain_id, provider)
            })
            .collect();
        Self { rpcs, config }
    }

    fn rpc(&self, chain_id: u64) -> Result<&DynProvider, FetchError> {
        self.rpcs
            .get(&chain_id)
            .ok_or(FetchError::ChainNotConfigured(chain_id))
    }

    /// Same transport policy as the HTTP adapters: explicit per-attempt
    /// timeout, bounded retries with exponential backoff, transient
    /// failures only.
    async fn retrying<T, Fut, F>(&self, mut op: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, alloy::contract::Error>>,
    {
        let mut last_err = None;
        for attempt in 0..self.config.max_attempts {
            if attempt > 0 {
                let backoff = self.config.retry_backoff * 2u32.pow(attempt - 1);
                warn!(attempt, ?backoff, "retrying chain read");
                tokio::time::sleep(backoff).await;
            }
            let err = match tokio::time::timeout(self.config.timeout, op()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => classify(e),
                Err(_) => FetchError::Timeout,
            };
            if !err.is_transient() && !matches!(err, FetchError::Timeout) {
                return Err(err);
            }
            last_err = Some(err);
        }
        Err(last_err.unwrap_or(FetchError::Timeout))
    }
}

#[async_trait]
impl VaultProvider for OnchainProvider {
    fn kind(&self) -> Provider {
        Provider::Onchain
    }

    async fn fetch_vault(
        &self,
        chain_id: u64,
        address: Address,
    ) -> Result<VaultRecord, FetchError> {
        let rpc = self.rpc(chain_id)?;
        let vault = IERC4626::new(address, rpc.clone());

        // asset() doubles as the "is this an ERC-4626 vault" probe.
        let asset_addr = self
            .retrying(|| async { vault.asset().call().await })
            .await?;
        let total_assets = self
            .retrying(|| async { vault.totalAssets().call().await })
            .await?;
        let total_supply = self
            .retrying(|| async { vault.totalSupply().call().await })
            .await?;
        let name = vault.name().call().await.unwrap_or_default();
        let symbol = vault.symbol().call().await.unwrap_or_default();
        // Non-pausable vaults revert here; that is a "no" answer.
        let paused = vault.paused().call().await.unwrap_or(false);

        let token = IERC20::new(asset_addr, rpc.clone());
        let underlying_symbol = token.symbol().call().await.unwrap_or_default();
        let underlying_decimals = self
            .retrying(|| async { token.decimals().call().await })
            .await?;

        debug!(chain_id, %address, %total_assets, %total_supply, "onchain read");

        Ok(VaultRecord {
            id: address,
            chain_id,
            name,
            symbol,
            // Underlying-denominated totals only; USD TVL comes from the
            // engine's REST enrichment when available.
            tvl_usd: "0".to_string(),
            apy_net: "0".to_string(),
            fees: Fees::default(),
            underlying: Underlying {
                symbol: underlying_symbol,
                address: asset_addr,
                decimals: underlying_decimals,
            },
            status: if paused {
                VaultStatus::Paused
            } else {
                VaultStatus::Active
            },
            provider: Provider::Onchain,
            redemption: Some(RedemptionVariant::Synchronous),
            metadata: None,
        })
    }

    /// There is no on-chain registry to enumerate; listing is served by the
    /// other adapters.
    async fn list_vaults(&self, chain_id: u64) -> Result<Vec<VaultRecord>, FetchError> {
        let _ = self.rpc(chain_id)?;
        Ok(Vec::new())
    }
}

#[async_trait]
impl DecimalsSource for OnchainProvider {
    async fn decimals(&self, chain_id: u64, token: Address) -> Result<u8, FetchError> {
        let rpc = self.rpc(chain_id)?;
        let erc20 = IERC20::new(token, rpc.clone());
        self.retrying(|| async { erc20.decimals().call().await })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_chain_is_not_configured() {
        let provider = OnchainProvider::new(&HashMap::new(), HttpConfig::default());
        let err = provider.fetch_vault(1, Address::ZERO).await.unwrap_err();
        assert!(matches!(err, FetchError::ChainNotConfigured(1)));
        let err = provider.decimals(1, Address::ZERO).await.unwrap_err();
        assert!(matches!(err, FetchError::ChainNotConfigured(1)));
    }
}
