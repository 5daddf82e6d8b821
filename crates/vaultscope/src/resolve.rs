//! Provider resolution: strict mode for curated vaults, ordered
//! best-effort fallback for everything else.
//!
//! The fallback order is an explicit list handed in at construction, not
//! control flow; reordering providers is configuration, not a code change.

use futures_util::future::join_all;
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::{CuratedVaultDescriptor, CuratedVaults};
use crate::error::Error;
use crate::model::{
    Fees, Provider, RedemptionVariant, Underlying, VaultRecord, VaultStatus,
};
use crate::providers::{FetchError, VaultProvider};
use alloy::primitives::Address;

pub struct Resolver {
    providers: Vec<Arc<dyn VaultProvider>>,
    curated: CuratedVaults,
}

impl Resolver {
    pub fn new(providers: Vec<Arc<dyn VaultProvider>>, curated: CuratedVaults) -> Self {
        Self { providers, curated }
    }

    fn by_kind(&self, kind: Provider) -> Option<&Arc<dyn VaultProvider>> {
        self.providers.iter().find(|p| p.kind() == kind)
    }

    /// Resolve a vault identifier, which may be a contract address or a
    /// slug. Slugs are translated to their canonical address first so that
    /// caching and enrichment stay address-keyed.
    pub async fn resolve(&self, chain_id: u64, vault_id: &str) -> Result<VaultRecord, Error> {
        match Address::from_str(vault_id) {
            Ok(address) => self.resolve_address(chain_id, address).await,
            Err(_) => {
                let address = self.resolve_slug(chain_id, vault_id).await?;
                debug!(chain_id, slug = vault_id, %address, "slug resolved");
                self.resolve_address(chain_id, address).await
            }
        }
    }

    pub async fn resolve_address(
        &self,
        chain_id: u64,
        address: Address,
    ) -> Result<VaultRecord, Error> {
        if let Some(entry) = self.curated.get(chain_id, address) {
            return self.resolve_curated(chain_id, address, entry).await;
        }

        for provider in &self.providers {
            match provider.fetch_vault(chain_id, address).await {
                Ok(record) => return Ok(record),
                Err(FetchError::NotFound) => {
                    debug!(chain_id, %address, provider = %provider.kind(), "no record");
                }
                Err(err) => {
                    warn!(chain_id, %address, provider = %provider.kind(), %err,
                        "provider failed, trying next");
                }
            }
        }
        Err(Error::NotFound(format!(
            "vault {address} unknown on chain {chain_id}"
        )))
    }

    /// Strict mode: only the pinned provider is consulted, and its failure
    /// is a definitive answer for this identifier. The one exception is a
    /// subgraph-pinned vault, which degrades to a placeholder record so a
    /// flaky indexer reads as "temporarily unavailable", not "missing".
    async fn resolve_curated(
        &self,
        chain_id: u64,
        address: Address,
        entry: &CuratedVaultDescriptor,
    ) -> Result<VaultRecord, Error> {
        let Some(provider) = self.by_kind(entry.provider) else {
            return Err(Error::Unsupported(format!(
                "curated provider {} is not configured",
                entry.provider
            )));
        };
        match provider.fetch_vault(chain_id, address).await {
            Ok(mut record) => {
                record.provider = entry.provider;
                Ok(record)
            }
            Err(err) if entry.provider == Provider::Subgraph => {
                warn!(chain_id, %address, %err, "curated subgraph fetch failed, serving placeholder");
                Ok(placeholder_record(chain_id, address, entry))
            }
            Err(err) => {
                warn!(chain_id, %address, provider = %entry.provider, %err,
                    "curated fetch failed");
                Err(Error::NotFound(format!(
                    "curated vault {address} unavailable on chain {chain_id}"
                )))
            }
        }
    }

    async fn resolve_slug(&self, chain_id: u64, slug: &str) -> Result<Address, Error> {
        for provider in &self.providers {
            match provider.resolve_slug(chain_id, slug).await {
                Ok(Some(address)) => return Ok(address),
                Ok(None) => {}
                Err(err) => {
                    warn!(chain_id, slug, provider = %provider.kind(), %err, "slug lookup failed");
                }
            }
        }
        Err(Error::NotFound(format!(
            "no vault matches slug {slug:?} on chain {chain_id}"
        )))
    }

    /// All vaults one chain knows about, providers queried concurrently,
    /// first provider in priority order winning duplicates. A provider
    /// failure shrinks the result, it never fails the listing.
    pub async fn list_chain(&self, chain_id: u64) -> Result<Vec<VaultRecord>, Error> {
        let fetches = self
            .providers
            .iter()
            .map(|provider| async move { (provider.kind(), provider.list_vaults(chain_id).await) });
        let results = join_all(fetches).await;

        let mut seen: HashSet<Address> = HashSet::new();
        let mut out = Vec::new();
        for (kind, result) in results {
            match result {
                Ok(records) => {
                    for record in records {
                        // A curated vault is only listed by its pinned provider.
                        if let Some(entry) = self.curated.get(chain_id, record.id) {
                            if entry.provider != kind {
                                continue;
                            }
                        }
                        if seen.insert(record.id) {
                            out.push(record);
                        }
                    }
                }
                Err(err) => {
                    warn!(chain_id, provider = %kind, %err, "listing failed, partial results");
                }
            }
        }
        Ok(out)
    }
}

/// Zeroed-economics stand-in for a curated vault whose indexer is down.
fn placeholder_record(
    chain_id: u64,
    address: Address,
    entry: &CuratedVaultDescriptor,
) -> VaultRecord {
    VaultRecord {
        id: address,
        chain_id,
        name: entry.name.clone().unwrap_or_else(|| address.to_string()),
        symbol: entry.symbol.clone().unwrap_or_default(),
        tvl_usd: "0".to_string(),
        apy_net: "0".to_string(),
        fees: Fees::default(),
        underlying: Underlying {
            symbol: entry.underlying_symbol.clone().unwrap_or_default(),
            address: Address::ZERO,
            decimals: 18,
        },
        status: VaultStatus::Active,
        provider: Provider::Subgraph,
        redemption: Some(RedemptionVariant::Asynchronous),
        metadata: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Behavior {
        Found,
        Missing,
        Broken,
    }

    struct MockProvider {
        kind: Provider,
        behavior: Behavior,
        slug: Option<(String, Address)>,
        calls: AtomicUsize,
    }

    impl MockProvider {
        fn new(kind: Provider, behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                kind,
                behavior,
                slug: None,
                calls: AtomicUsize::new(0),
            })
        }

        fn with_slug(kind: Provider, behavior: Behavior, slug: &str, address: Address) -> Arc<Self> {
            Arc::new(Self {
                kind,
                behavior,
                slug: Some((slug.to_string(), address)),
                calls: AtomicUsize::new(0),
            })
        }

        fn record(&self, chain_id: u64, address: Address) -> VaultRecord {
            VaultRecord {
                id: address,
                chain_id,
                name: format!("{} vault", self.kind),
                symbol: "vTKN".into(),
                tvl_usd: "100".into(),
                apy_net: "0.05".into(),
                fees: Fees::default(),
                underlying: Underlying {
                    symbol: "TKN".into(),
                    address: Address::repeat_byte(0xaa),
                    decimals: 18,
                },
                status: VaultStatus::Active,
                provider: self.kind,
                redemption: Some(RedemptionVariant::Synchronous),
                metadata: None,
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl VaultProvider for MockProvider {
        fn kind(&self) -> Provider {
            self.kind
        }

        async fn fetch_vault(
            &self,
            chain_id: u64,
            address: Address,
        ) -> Result<VaultRecord, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Found => Ok(self.record(chain_id, address)),
                Behavior::Missing => Err(FetchError::NotFound),
                Behavior::Broken => Err(FetchError::Api(503, "unavailable".into())),
            }
        }

        async fn list_vaults(&self, chain_id: u64) -> Result<Vec<VaultRecord>, FetchError> {
            match self.behavior {
                Behavior::Found => Ok(vec![self.record(chain_id, Address::repeat_byte(0x55))]),
                Behavior::Missing => Ok(Vec::new()),
                Behavior::Broken => Err(FetchError::Api(503, "unavailable".into())),
            }
        }

        async fn resolve_slug(
            &self,
            _chain_id: u64,
            slug: &str,
        ) -> Result<Option<Address>, FetchError> {
            Ok(self
                .slug
                .as_ref()
                .filter(|(s, _)| s == slug)
                .map(|(_, a)| *a))
        }
    }

    fn curated(provider: Provider, address: Address) -> CuratedVaults {
        CuratedVaults {
            vaults: vec![CuratedVaultDescriptor {
                address,
                chain_id: 1,
                provider,
                name: Some("Pinned".into()),
                symbol: None,
                underlying_symbol: Some("USDC".into()),
            }],
        }
    }

    fn addr() -> Address {
        Address::repeat_byte(0x44)
    }

    #[tokio::test]
    async fn first_provider_in_priority_order_wins() {
        let onchain = MockProvider::new(Provider::Onchain, Behavior::Found);
        let api = MockProvider::new(Provider::Api, Behavior::Found);
        let resolver = Resolver::new(
            vec![onchain.clone(), api.clone()],
            CuratedVaults::default(),
        );
        let record = resolver.resolve_address(1, addr()).await.unwrap();
        assert_eq!(record.provider, Provider::Onchain);
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn failure_falls_through_without_surfacing() {
        let onchain = MockProvider::new(Provider::Onchain, Behavior::Broken);
        let api = MockProvider::new(Provider::Api, Behavior::Found);
        let resolver = Resolver::new(vec![onchain, api], CuratedVaults::default());
        let record = resolver.resolve_address(1, addr()).await.unwrap();
        assert_eq!(record.provider, Provider::Api);
    }

    #[tokio::test]
    async fn exhausted_fallback_is_not_found() {
        let onchain = MockProvider::new(Provider::Onchain, Behavior::Broken);
        let api = MockProvider::new(Provider::Api, Behavior::Missing);
        let resolver = Resolver::new(vec![onchain, api], CuratedVaults::default());
        let err = resolver.resolve_address(1, addr()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn curated_vault_never_comes_from_another_provider() {
        // Both providers have data; the curated entry pins the API.
        let onchain = MockProvider::new(Provider::Onchain, Behavior::Found);
        let api = MockProvider::new(Provider::Api, Behavior::Found);
        let resolver = Resolver::new(
            vec![onchain.clone(), api.clone()],
            curated(Provider::Api, addr()),
        );
        let record = resolver.resolve_address(1, addr()).await.unwrap();
        assert_eq!(record.provider, Provider::Api);
        assert_eq!(onchain.call_count(), 0);
    }

    #[tokio::test]
    async fn curated_failure_does_not_fall_back() {
        let onchain = MockProvider::new(Provider::Onchain, Behavior::Found);
        let api = MockProvider::new(Provider::Api, Behavior::Broken);
        let resolver = Resolver::new(
            vec![onchain.clone(), api],
            curated(Provider::Api, addr()),
        );
        let err = resolver.resolve_address(1, addr()).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(onchain.call_count(), 0);
    }

    #[tokio::test]
    async fn curated_subgraph_failure_serves_placeholder() {
        let subgraph = MockProvider::new(Provider::Subgraph, Behavior::Broken);
        let resolver = Resolver::new(vec![subgraph], curated(Provider::Subgraph, addr()));
        let record = resolver.resolve_address(1, addr()).await.unwrap();
        assert_eq!(record.provider, Provider::Subgraph);
        assert_eq!(record.name, "Pinned");
        assert_eq!(record.tvl_usd, "0");
        assert_eq!(record.apy_net, "0");
        assert_eq!(record.status, VaultStatus::Active);
        assert_eq!(record.underlying.symbol, "USDC");
    }

    #[tokio::test]
    async fn slug_translates_to_canonical_address() {
        let target = Address::repeat_byte(0x66);
        let api = MockProvider::with_slug(Provider::Api, Behavior::Found, "prime-usdc", target);
        let resolver = Resolver::new(vec![api], CuratedVaults::default());
        let record = resolver.resolve(1, "prime-usdc").await.unwrap();
        assert_eq!(record.id, target);
    }

    #[tokio::test]
    async fn unknown_slug_is_not_found() {
        let api = MockProvider::new(Provider::Api, Behavior::Found);
        let resolver = Resolver::new(vec![api], CuratedVaults::default());
        let err = resolver.resolve(1, "no-such-vault").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn listing_tolerates_broken_providers() {
        let onchain = MockProvider::new(Provider::Onchain, Behavior::Broken);
        let api = MockProvider::new(Provider::Api, Behavior::Found);
        let resolver = Resolver::new(vec![onchain, api], CuratedVaults::default());
        let records = resolver.list_chain(1).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].provider, Provider::Api);
    }

    #[tokio::test]
    async fn listing_dedupes_by_priority() {
        let subgraph = MockProvider::new(Provider::Subgraph, Behavior::Found);
        let api = MockProvider::new(Provider::Api, Behavior::Found);
        let resolver = Resolver::new(vec![subgraph, api], CuratedVaults::default());
        let records = resolver.list_chain(1).await.unwrap();
        // Both mocks list the same address; the first-priority one stays.
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].provider, Provider::Subgraph);
    }
}
