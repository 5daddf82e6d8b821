//! Engine facade: resolve, list, and build-transaction entry points.
//!
//! Owns the cache instances and their sweep tasks; everything else is
//! stateless given the curated table and cache contents. Construct once
//! at process start inside a tokio runtime and call `shutdown` (or drop)
//! on the way out.

use futures_util::future::join_all;
use std::str::FromStr;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::TtlCache;
use crate::compute::{vault_age_days, yield_windows};
use crate::config::EngineConfig;
use crate::error::Error;
use crate::model::{
    Action, CallDescriptor, Provider, VaultMetadata, VaultRecord, WindowSet,
};
use crate::normalize;
use crate::providers::{
    ApiProvider, FetchError, OnchainProvider, SubgraphProvider, VaultProvider,
};
use crate::resolve::Resolver;
use crate::txbuild;
use alloy::primitives::Address;

pub struct Engine {
    config: EngineConfig,
    resolver: Resolver,
    api: Arc<ApiProvider>,
    subgraph: Arc<SubgraphProvider>,
    onchain: Arc<OnchainProvider>,
    vault_cache: TtlCache<(u64, Address), VaultRecord>,
    list_cache: TtlCache<u64, Vec<VaultRecord>>,
    sweepers: Vec<JoinHandle<()>>,
}

impl Engine {
    /// Must be called within a tokio runtime; spawns the cache sweepers.
    pub fn new(config: EngineConfig) -> Result<Self, Error> {
        let api = Arc::new(ApiProvider::new(&config.api_base_url, config.http.clone())?);
        let subgraph = Arc::new(SubgraphProvider::new(
            config.subgraph_urls.clone(),
            config.http.clone(),
        )?);
        let onchain = Arc::new(OnchainProvider::new(&config.rpc_urls, config.http.clone()));

        let ordered: Vec<Arc<dyn VaultProvider>> = config
            .priority
            .iter()
            .map(|kind| -> Arc<dyn VaultProvider> {
                match kind {
                    Provider::Api => api.clone(),
                    Provider::Subgraph => subgraph.clone(),
                    Provider::Onchain => onchain.clone(),
                }
            })
            .collect();
        let resolver = Resolver::new(ordered, config.curated.clone());

        let vault_cache: TtlCache<(u64, Address), VaultRecord> = TtlCache::new();
        let list_cache: TtlCache<u64, Vec<VaultRecord>> = TtlCache::new();
        let sweepers = vec![
            vault_cache.spawn_sweeper(config.sweep_interval),
            list_cache.spawn_sweeper(config.sweep_interval),
        ];
        info!(
            chains = ?config.chains,
            curated = config.curated.vaults.len(),
            "engine ready"
        );

        Ok(Self {
            config,
            resolver,
            api,
            subgraph,
            onchain,
            vault_cache,
            list_cache,
            sweepers,
        })
    }

    /// Authoritative record for one vault, enriched with yield windows
    /// when history is available.
    pub async fn resolve_vault(
        &self,
        chain_id: u64,
        vault_id: &str,
    ) -> Result<VaultRecord, Error> {
        self.ensure_chain(chain_id)?;

        if let Ok(address) = Address::from_str(vault_id) {
            if let Some(hit) = self.vault_cache.get(&(chain_id, address)).await {
                debug!(chain_id, %address, "vault cache hit");
                return Ok(hit);
            }
        }

        let resolve = async {
            let mut record = self.resolver.resolve(chain_id, vault_id).await?;
            self.enrich(&mut record).await;
            Ok::<_, Error>(record)
        };
        let record = tokio::time::timeout(self.config.request_deadline, resolve)
            .await
            .map_err(|_| Error::Upstream(FetchError::Timeout))??;

        self.vault_cache
            .set(
                (chain_id, record.id),
                record.clone(),
                self.config.vault_ttl,
            )
            .await;
        Ok(record)
    }

    /// Every known vault across the requested chains. Chains are fanned
    /// out concurrently and a failing chain shrinks the result instead of
    /// failing it.
    pub async fn list_vaults(&self, chain_ids: &[u64]) -> Result<Vec<VaultRecord>, Error> {
        let fetches = chain_ids
            .iter()
            .map(|&chain_id| async move { (chain_id, self.list_chain(chain_id).await) });
        let results = join_all(fetches).await;

        let mut out = Vec::new();
        for (chain_id, result) in results {
            match result {
                Ok(mut records) => out.append(&mut records),
                Err(err) => warn!(chain_id, %err, "chain listing failed, partial results"),
            }
        }
        Ok(out)
    }

    /// Unsigned call descriptor for a user action against a resolved
    /// vault. Fails loudly; never guesses decimals or call shape.
    pub async fn build_transaction(
        &self,
        vault: &VaultRecord,
        action: Action,
        amount: &str,
        user: Address,
    ) -> Result<CallDescriptor, Error> {
        self.ensure_chain(vault.chain_id)?;
        let build = txbuild::build_transaction(vault, action, amount, user, self.onchain.as_ref());
        tokio::time::timeout(self.config.request_deadline, build)
            .await
            .map_err(|_| Error::Upstream(FetchError::Timeout))?
    }

    /// Stop background sweep tasks. Dropping the engine does this too.
    pub fn shutdown(&self) {
        for sweeper in &self.sweepers {
            sweeper.abort();
        }
    }

    async fn list_chain(&self, chain_id: u64) -> Result<Vec<VaultRecord>, Error> {
        self.ensure_chain(chain_id)?;
        if let Some(hit) = self.list_cache.get(&chain_id).await {
            debug!(chain_id, "list cache hit");
            return Ok(hit);
        }
        let listing = self.resolver.list_chain(chain_id);
        let records = tokio::time::timeout(self.config.request_deadline, listing)
            .await
            .map_err(|_| Error::Upstream(FetchError::Timeout))??;
        self.list_cache
            .set(chain_id, records.clone(), self.config.list_ttl)
            .await;
        Ok(records)
    }

    /// Attach yield windows from settlement history and upgrade TVL to USD
    /// where possible. Enrichment failures leave the record as-is.
    async fn enrich(&self, record: &mut VaultRecord) {
        match self.subgraph.period_summaries(record.chain_id, record.id).await {
            Ok(summaries) if !summaries.is_empty() => {
                let w = yield_windows(&summaries);
                let now = OffsetDateTime::now_utc().unix_timestamp();
                record.metadata = Some(VaultMetadata {
                    apr_net: WindowSet {
                        all: w.apr_all,
                        d30: w.apr_30d,
                        d7: w.apr_7d,
                    },
                    apy_net: WindowSet {
                        all: w.apy_all,
                        d30: w.apy_30d,
                        d7: w.apy_7d,
                    },
                    vault_age_days: vault_age_days(&summaries, now),
                    realized_apy: Some(w.apy_all),
                });
                if record.apy_net == "0" {
                    record.apy_net = normalize::decimal_string(w.apy_all);
                }
            }
            Ok(_) => debug!(vault = %record.id, "no period history"),
            Err(err) => debug!(vault = %record.id, %err, "period history unavailable"),
        }

        if record.tvl_usd == "0" && record.provider != Provider::Api {
            match self.api.tvl_usd(record.chain_id, record.id).await {
                Ok(Some(tvl)) => record.tvl_usd = tvl,
                Ok(None) => {}
                Err(err) => debug!(vault = %record.id, %err, "tvl enrichment unavailable"),
            }
        }
    }

    fn ensure_chain(&self, chain_id: u64) -> Result<(), Error> {
        if self.config.chains.contains(&chain_id) {
            Ok(())
        } else {
            Err(Error::Unsupported(format!("chain {chain_id} is not enabled")))
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
