//! Provider adapters: one REST-backed, one subgraph-backed, one reading
//! contracts directly. Each produces the same record shape and owns its
//! own transport policy.

mod api;
pub mod http;
mod onchain;
mod subgraph;

pub use api::{ApiProvider, ApiUnderlying, ApiVault};
pub use onchain::OnchainProvider;
pub use subgraph::{parse_period_summaries, SubgraphProvider};

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{PeriodSummary, Provider, VaultRecord};
use alloy::primitives::Address;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request: {0}")]
    Request(#[from] reqwest::Error),
    #[error("api status {0}: {1}")]
    Api(u16, String),
    #[error("rpc: {0}")]
    Rpc(String),
    #[error("decode: {0}")]
    Decode(String),
    #[error("no record for vault")]
    NotFound,
    #[error("chain {0} not configured for this provider")]
    ChainNotConfigured(u64),
    #[error("deadline exceeded")]
    Timeout,
}

impl FetchError {
    /// Only transient transport failures are worth another attempt.
    /// Validation problems and definite "no data" answers are not.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Request(e) => {
                e.status().is_none_or(|status| status.is_server_error())
            }
            FetchError::Api(status, _) => *status >= 500,
            FetchError::Rpc(_) => true,
            _ => false,
        }
    }
}

/// Common adapter surface. Implementations must be safe to call
/// concurrently; the resolver fans out across them.
#[async_trait]
pub trait VaultProvider: Send + Sync {
    fn kind(&self) -> Provider;

    async fn fetch_vault(&self, chain_id: u64, address: Address)
        -> Result<VaultRecord, FetchError>;

    async fn list_vaults(&self, chain_id: u64) -> Result<Vec<VaultRecord>, FetchError>;

    /// Settlement-period history for yield windows. Empty when the source
    /// keeps none; that is a normal answer, not a failure.
    async fn period_summaries(
        &self,
        _chain_id: u64,
        _address: Address,
    ) -> Result<Vec<PeriodSummary>, FetchError> {
        Ok(Vec::new())
    }

    /// Translate a human-readable slug to its canonical address when this
    /// source knows the mapping.
    async fn resolve_slug(
        &self,
        _chain_id: u64,
        _slug: &str,
    ) -> Result<Option<Address>, FetchError> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(FetchError::Api(500, String::new()).is_transient());
        assert!(FetchError::Api(503, String::new()).is_transient());
        assert!(!FetchError::Api(404, String::new()).is_transient());
        assert!(!FetchError::Api(400, String::new()).is_transient());
        assert!(FetchError::Rpc("connection reset".into()).is_transient());
        assert!(!FetchError::NotFound.is_transient());
        assert!(!FetchError::Decode("bad json".into()).is_transient());
        assert!(!FetchError::ChainNotConfigured(999).is_transient());
        assert!(!FetchError::Timeout.is_transient());
    }
}
