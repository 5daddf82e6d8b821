//! Shared HTTP plumbing: explicit timeouts and bounded retries with
//! exponential backoff on transient failures only.

use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::warn;

use super::FetchError;

const TIMEOUT: Duration = Duration::from_secs(15);
const ENRICH_TIMEOUT: Duration = Duration::from_secs(3);
const MAX_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

#[derive(Clone, Debug)]
pub struct HttpConfig {
    /// Applies to list and detail calls.
    pub timeout: Duration,
    /// Applies to secondary best-effort enrichment lookups.
    pub enrich_timeout: Duration,
    pub max_attempts: u32,
    /// Base backoff, doubled per attempt.
    pub retry_backoff: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: TIMEOUT,
            enrich_timeout: ENRICH_TIMEOUT,
            max_attempts: MAX_ATTEMPTS,
            retry_backoff: RETRY_BACKOFF,
        }
    }
}

pub struct HttpClient {
    client: reqwest::Client,
    config: HttpConfig,
}

impl HttpClient {
    pub fn new(config: HttpConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        self.execute(url, None).await
    }

    pub async fn post_json<T: DeserializeOwned>(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<T, FetchError> {
        self.execute(url, Some(body)).await
    }

    /// Single attempt with the short enrichment timeout; callers treat any
    /// failure as "no enrichment available".
    pub async fn get_json_quick<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let res = self
            .client
            .get(url)
            .timeout(self.config.enrich_timeout)
            .send()
            .await?;
        Self::decode(res).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<T, FetchError> {
        let mut last_err = None;
        for attempt in 0..self.config.max_attempts {
            if attempt > 0 {
                let backoff = self.config.retry_backoff * 2u32.pow(attempt - 1);
                warn!(attempt, ?backoff, url, "retrying upstream call");
                tokio::time::sleep(backoff).await;
            }
            let request = match body {
                Some(b) => self.client.post(url).json(b),
                None => self.client.get(url),
            };
            let err = match request.send().await {
                Ok(res) => match Self::decode::<T>(res).await {
                    Ok(value) => return Ok(value),
                    Err(err) => err,
                },
                Err(e) => FetchError::Request(e),
            };
            if !err.is_transient() {
                return Err(err);
            }
            last_err = Some(err);
        }
        Err(last_err.unwrap_or(FetchError::Timeout))
    }

    async fn decode<T: DeserializeOwned>(res: reqwest::Response) -> Result<T, FetchError> {
        let status = res.status();
        if status.as_u16() == 404 {
            return Err(FetchError::NotFound);
        }
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(FetchError::Api(status.as_u16(), body));
        }
        res.json::<T>()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }
}
