//! Subgraph (GraphQL indexer) adapter. The only source that keeps
//! settlement-period history, so it also feeds the yield window math.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use tracing::debug;
use url::Url;

use super::http::{HttpClient, HttpConfig};
use super::{FetchError, VaultProvider};
use crate::model::{
    Fees, PeriodSummary, Provider, RedemptionVariant, Underlying, VaultRecord, VaultStatus,
};
use crate::normalize;
use alloy::primitives::Address;

const VAULT_FIELDS: &str = "id name symbol totalAssets totalSupply paused \
     managementFeeBps performanceFeeBps asset { id symbol decimals }";

const PERIOD_FIELDS: &str = "totalAssetsAtStart totalSupplyAtStart totalAssetsAtEnd \
     totalSupplyAtEnd netTotalSupplyAtEnd startTimestamp durationSeconds";

pub struct SubgraphProvider {
    urls: HashMap<u64, Url>,
    http: HttpClient,
}

#[derive(Deserialize)]
struct GqlResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GqlError>>,
}

#[derive(Deserialize)]
struct GqlError {
    message: String,
}

#[derive(Deserialize)]
struct VaultData {
    vault: Option<GqlVault>,
}

#[derive(Deserialize)]
struct VaultsData {
    vaults: Vec<GqlVault>,
}

#[derive(Deserialize)]
struct SummariesData {
    #[serde(rename = "periodSummaries")]
    period_summaries: Vec<GqlPeriodSummary>,
}

/// BigInt fields arrive as quoted strings; Int fields as numbers. Loose
/// typing here, normalization below.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GqlVault {
    id: Address,
    name: String,
    symbol: String,
    #[serde(default)]
    paused: bool,
    #[serde(default)]
    management_fee_bps: serde_json::Value,
    #[serde(default)]
    performance_fee_bps: serde_json::Value,
    asset: GqlAsset,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GqlAsset {
    id: Address,
    symbol: String,
    decimals: serde_json::Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GqlPeriodSummary {
    #[serde(default)]
    total_assets_at_start: serde_json::Value,
    #[serde(default)]
    total_supply_at_start: serde_json::Value,
    #[serde(default)]
    total_assets_at_end: serde_json::Value,
    #[serde(default)]
    total_supply_at_end: serde_json::Value,
    #[serde(default)]
    net_total_supply_at_end: Option<serde_json::Value>,
    #[serde(default)]
    start_timestamp: serde_json::Value,
    #[serde(default)]
    duration_seconds: serde_json::Value,
}

impl From<GqlPeriodSummary> for PeriodSummary {
    fn from(raw: GqlPeriodSummary) -> Self {
        PeriodSummary {
            total_assets_at_start: normalize::value_to_f64(&raw.total_assets_at_start),
            total_supply_at_start: normalize::value_to_f64(&raw.total_supply_at_start),
            total_assets_at_end: normalize::value_to_f64(&raw.total_assets_at_end),
            total_supply_at_end: normalize::value_to_f64(&raw.total_supply_at_end),
            net_total_supply_at_end: raw
                .net_total_supply_at_end
                .as_ref()
                .filter(|v| !v.is_null())
                .map(normalize::value_to_f64),
            start_timestamp: normalize::value_to_i64(&raw.start_timestamp),
            duration_seconds: normalize::value_to_i64(&raw.duration_seconds),
        }
    }
}

impl GqlVault {
    fn into_record(self, chain_id: u64) -> VaultRecord {
        let status = if self.paused {
            VaultStatus::Paused
        } else {
            VaultStatus::Active
        };
        let decimals = normalize::value_to_i64(&self.asset.decimals).clamp(0, 255) as u8;
        VaultRecord {
            id: self.id,
            chain_id,
            name: self.name,
            symbol: self.symbol,
            // The subgraph has no USD view; the engine upgrades TVL through
            // the REST enrichment lookup when it can.
            tvl_usd: "0".to_string(),
            apy_net: "0".to_string(),
            fees: Fees {
                mgmt_bps: normalize::value_to_i64(&self.management_fee_bps).max(0) as u32,
                perf_bps: normalize::value_to_i64(&self.performance_fee_bps).max(0) as u32,
            },
            underlying: Underlying {
                symbol: self.asset.symbol,
                address: self.asset.id,
                decimals,
            },
            status,
            provider: Provider::Subgraph,
            redemption: Some(RedemptionVariant::Asynchronous),
            metadata: None,
        }
    }
}

fn unwrap_response<T>(res: GqlResponse<T>) -> Result<T, FetchError> {
    if let Some(errors) = res.errors {
        if !errors.is_empty() {
            let msg = errors
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(FetchError::Api(200, msg));
        }
    }
    res.data
        .ok_or_else(|| FetchError::Decode("graphql response missing data".into()))
}

/// Parse a raw GraphQL period-summary response body. Shared by the adapter
/// and fixture-driven tests.
pub fn parse_period_summaries(body: &str) -> Result<Vec<PeriodSummary>, FetchError> {
    let res: GqlResponse<SummariesData> =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;
    let data = unwrap_response(res)?;
    Ok(data
        .period_summaries
        .into_iter()
        .map(PeriodSummary::from)
        .collect())
}

impl SubgraphProvider {
    pub fn new(urls: HashMap<u64, Url>, config: HttpConfig) -> Result<Self, FetchError> {
        Ok(Self {
            urls,
            http: HttpClient::new(config)?,
        })
    }

    fn url_for(&self, chain_id: u64) -> Result<&Url, FetchError> {
        self.urls
            .get(&chain_id)
            .ok_or(FetchError::ChainNotConfigured(chain_id))
    }

    async fn query<T: DeserializeOwned>(
        &self,
        chain_id: u64,
        query: String,
        variables: serde_json::Value,
    ) -> Result<T, FetchError> {
        let url = self.url_for(chain_id)?;
        let body = json!({ "query": query, "variables": variables });
        let res: GqlResponse<T> = self.http.post_json(url.as_str(), &body).await?;
        unwrap_response(res)
    }
}

#[async_trait]
impl VaultProvider for SubgraphProvider {
    fn kind(&self) -> Provider {
        Provider::Subgraph
    }

    async fn fetch_vault(
        &self,
        chain_id: u64,
        address: Address,
    ) -> Result<VaultRecord, FetchError> {
        let query = format!("query ($id: ID!) {{ vault(id: $id) {{ {VAULT_FIELDS} }} }}");
        let variables = json!({ "id": format!("{address:#x}") });
        let data: VaultData = self.query(chain_id, query, variables).await?;
        match data.vault {
            Some(vault) => Ok(vault.into_record(chain_id)),
            None => Err(FetchError::NotFound),
        }
    }

    async fn list_vaults(&self, chain_id: u64) -> Result<Vec<VaultRecord>, FetchError> {
        let query = format!("query {{ vaults(first: 200) {{ {VAULT_FIELDS} }} }}");
        let data: VaultsData = self.query(chain_id, query, json!({})).await?;
        debug!(chain_id, count = data.vaults.len(), "subgraph list");
        Ok(data
            .vaults
            .into_iter()
            .map(|v| v.into_record(chain_id))
            .collect())
    }

    async fn period_summaries(
        &self,
        chain_id: u64,
        address: Address,
    ) -> Result<Vec<PeriodSummary>, FetchError> {
        let query = format!(
            "query ($vault: String!) {{ periodSummaries(where: {{ vault: $vault }}, \
             orderBy: startTimestamp, orderDirection: desc, first: 1000) {{ {PERIOD_FIELDS} }} }}"
        );
        let variables = json!({ "vault": format!("{address:#x}") });
        let data: SummariesData = self.query(chain_id, query, variables).await?;
        Ok(data
            .period_summaries
            .into_iter()
            .map(PeriodSummary::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_summaries_parse_bigint_strings() {
        let body = r#"{
            "data": {
                "periodSummaries": [{
                    "totalAssetsAtStart": "1000000000",
                    "totalSupplyAtStart": "1000000000",
                    "totalAssetsAtEnd": "1030000000",
                    "totalSupplyAtEnd": "1010000000",
                    "netTotalSupplyAtEnd": "1000000000",
                    "startTimestamp": "1700000000",
                    "durationSeconds": 2592000
                }]
            }
        }"#;
        let summaries = parse_period_summaries(body).unwrap();
        assert_eq!(summaries.len(), 1);
        let s = &summaries[0];
        assert_eq!(s.total_assets_at_end, 1_030_000_000.0);
        assert_eq!(s.net_total_supply_at_end, Some(1_000_000_000.0));
        assert_eq!(s.start_timestamp, 1_700_000_000);
        assert!(s.is_completed());
    }

    #[test]
    fn null_net_supply_maps_to_none() {
        let body = r#"{
            "data": {
                "periodSummaries": [{
                    "totalAssetsAtStart": "1",
                    "totalSupplyAtStart": "1",
                    "totalAssetsAtEnd": "1",
                    "totalSupplyAtEnd": "1",
                    "netTotalSupplyAtEnd": null,
                    "startTimestamp": "0",
                    "durationSeconds": "86400"
                }]
            }
        }"#;
        let summaries = parse_period_summaries(body).unwrap();
        assert_eq!(summaries[0].net_total_supply_at_end, None);
        assert_eq!(summaries[0].duration_seconds, 86_400);
    }

    #[test]
    fn graphql_errors_surface_as_upstream() {
        let body = r#"{"errors": [{"message": "indexer degraded"}]}"#;
        let err = parse_period_summaries(body).unwrap_err();
        assert!(matches!(err, FetchError::Api(200, msg) if msg.contains("indexer degraded")));
    }

    #[test]
    fn vault_maps_to_async_variant() {
        let raw: GqlVault = serde_json::from_value(json!({
            "id": "0x3333333333333333333333333333333333333333",
            "name": "Settled Yield",
            "symbol": "syUSD",
            "paused": true,
            "managementFeeBps": 50,
            "performanceFeeBps": "1500",
            "asset": {
                "id": "0x2222222222222222222222222222222222222222",
                "symbol": "USDC",
                "decimals": 6
            }
        }))
        .unwrap();
        let record = raw.into_record(42161);
        assert_eq!(record.chain_id, 42161);
        assert_eq!(record.status, VaultStatus::Paused);
        assert_eq!(record.fees.perf_bps, 1500);
        assert_eq!(record.provider, Provider::Subgraph);
        assert_eq!(record.redemption, Some(RedemptionVariant::Asynchronous));
        assert_eq!(record.tvl_usd, "0");
    }

    #[tokio::test]
    async fn missing_chain_is_not_configured() {
        let provider = SubgraphProvider::new(HashMap::new(), HttpConfig::default()).unwrap();
        let err = provider
            .fetch_vault(999, Address::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::ChainNotConfigured(999)));
    }
}
