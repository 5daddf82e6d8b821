//! REST API adapter. The API is the only source with a USD view of TVL,
//! so it also backs the secondary enrichment lookup used for records
//! resolved elsewhere.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::http::{HttpClient, HttpConfig};
use super::{FetchError, VaultProvider};
use crate::model::{
    Fees, Provider, RedemptionVariant, Underlying, VaultRecord, VaultStatus,
};
use crate::normalize;
use alloy::primitives::Address;

pub struct ApiProvider {
    base_url: String,
    http: HttpClient,
}

/// Wire shape of a vault as the REST API reports it. Loosely typed numeric
/// fields go through the normalizer; the API has been seen emitting both
/// numbers and quoted numbers for the same field.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiVault {
    pub address: Address,
    pub chain_id: u64,
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub tvl_usd: serde_json::Value,
    #[serde(default)]
    pub apy_net: serde_json::Value,
    #[serde(default)]
    pub management_fee_bps: u32,
    #[serde(default)]
    pub performance_fee_bps: u32,
    pub underlying: ApiUnderlying,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiUnderlying {
    pub symbol: String,
    pub address: Address,
    pub decimals: u8,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiTvl {
    #[serde(default)]
    tvl_usd: serde_json::Value,
}

impl ApiVault {
    pub fn into_record(self) -> VaultRecord {
        let status = match self.status.as_deref() {
            Some("paused") => VaultStatus::Paused,
            Some("deprecated") | Some("retired") => VaultStatus::Deprecated,
            _ => VaultStatus::Active,
        };
        VaultRecord {
            id: self.address,
            chain_id: self.chain_id,
            name: self.name,
            symbol: self.symbol,
            tvl_usd: normalize::json_number_string(&self.tvl_usd),
            apy_net: normalize::json_number_string(&self.apy_net),
            fees: Fees {
                mgmt_bps: self.management_fee_bps,
                perf_bps: self.performance_fee_bps,
            },
            underlying: Underlying {
                symbol: self.underlying.symbol,
                address: self.underlying.address,
                decimals: self.underlying.decimals,
            },
            status,
            provider: Provider::Api,
            redemption: Some(RedemptionVariant::Synchronous),
            metadata: None,
        }
    }
}

impl ApiProvider {
    pub fn new(base_url: &str, config: HttpConfig) -> Result<Self, FetchError> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: HttpClient::new(config)?,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Short-timeout USD TVL lookup for records resolved from sources with
    /// no USD view. Single attempt; a miss or failure means no enrichment.
    pub async fn tvl_usd(
        &self,
        chain_id: u64,
        address: Address,
    ) -> Result<Option<String>, FetchError> {
        let url = self.url(&format!("/vaults/{chain_id}/{address}/tvl"));
        match self.http.get_json_quick::<ApiTvl>(&url).await {
            Ok(t) => {
                let tvl = normalize::json_number_string(&t.tvl_usd);
                Ok((tvl != "0").then_some(tvl))
            }
            Err(FetchError::NotFound) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

#[async_trait]
impl VaultProvider for ApiProvider {
    fn kind(&self) -> Provider {
        Provider::Api
    }

    async fn fetch_vault(
        &self,
        chain_id: u64,
        address: Address,
    ) -> Result<VaultRecord, FetchError> {
        let url = self.url(&format!("/vaults/{chain_id}/{address}"));
        let vault: ApiVault = self.http.get_json(&url).await?;
        Ok(vault.into_record())
    }

    async fn list_vaults(&self, chain_id: u64) -> Result<Vec<VaultRecord>, FetchError> {
        let url = self.url(&format!("/vaults?chainId={chain_id}"));
        let vaults: Vec<ApiVault> = self.http.get_json(&url).await?;
        debug!(chain_id, count = vaults.len(), "api list");
        Ok(vaults.into_iter().map(ApiVault::into_record).collect())
    }

    async fn resolve_slug(
        &self,
        chain_id: u64,
        slug: &str,
    ) -> Result<Option<Address>, FetchError> {
        let url = self.url(&format!("/vaults?chainId={chain_id}"));
        let vaults: Vec<ApiVault> = self.http.get_json(&url).await?;
        Ok(vaults
            .iter()
            .find(|v| {
                v.slug
                    .as_deref()
                    .is_some_and(|s| s.eq_ignore_ascii_case(slug))
            })
            .map(|v| v.address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn api_vault(extra: serde_json::Value) -> ApiVault {
        let mut base = json!({
            "address": "0x1111111111111111111111111111111111111111",
            "chainId": 1,
            "name": "Prime USDC",
            "symbol": "pUSDC",
            "tvlUsd": "1500000.50",
            "apyNet": 0.0415,
            "managementFeeBps": 100,
            "performanceFeeBps": 1000,
            "underlying": {
                "symbol": "USDC",
                "address": "0x2222222222222222222222222222222222222222",
                "decimals": 6
            }
        });
        if let (Some(obj), Some(patch)) = (base.as_object_mut(), extra.as_object()) {
            for (k, v) in patch {
                obj.insert(k.clone(), v.clone());
            }
        }
        serde_json::from_value(base).unwrap()
    }

    #[test]
    fn record_mapping() {
        let record = api_vault(json!({})).into_record();
        assert_eq!(record.chain_id, 1);
        assert_eq!(record.tvl_usd, "1500000.5");
        assert_eq!(record.apy_net, "0.0415");
        assert_eq!(record.fees.mgmt_bps, 100);
        assert_eq!(record.underlying.decimals, 6);
        assert_eq!(record.provider, Provider::Api);
        assert_eq!(record.redemption, Some(RedemptionVariant::Synchronous));
        assert_eq!(record.status, VaultStatus::Active);
    }

    #[test]
    fn status_mapping() {
        let paused = api_vault(json!({"status": "paused"})).into_record();
        assert_eq!(paused.status, VaultStatus::Paused);
        let retired = api_vault(json!({"status": "retired"})).into_record();
        assert_eq!(retired.status, VaultStatus::Deprecated);
        let odd = api_vault(json!({"status": "launching"})).into_record();
        assert_eq!(odd.status, VaultStatus::Active);
    }

    #[test]
    fn loose_numerics_normalize() {
        let record = api_vault(json!({"tvlUsd": 250000, "apyNet": "0.0500"})).into_record();
        assert_eq!(record.tvl_usd, "250000");
        assert_eq!(record.apy_net, "0.05");
        let nulls = api_vault(json!({"tvlUsd": null, "apyNet": null})).into_record();
        assert_eq!(nulls.tvl_usd, "0");
        assert_eq!(nulls.apy_net, "0");
    }
}
