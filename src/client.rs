use crate::config::{PokemonConfig, RetryConfig};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

// Single GET of a JSON document; no retries at this level
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get_json(&self, url: &str) -> Result<Value>;
}

pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_json(&self, url: &str) -> Result<Value> {
        tracing::debug!("GET {}", url);

        let response = self.http.get(url).send().await.map_err(|e| {
            tracing::debug!("HTTP request to {} failed: {}", url, e);
            AppError::from(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!("{} answered with status {}", url, status);
            return Err(AppError::from_status(status.as_u16(), url));
        }

        response.json::<Value>().await.map_err(|e| {
            tracing::error!("Failed to parse JSON response from {}: {}", url, e);
            AppError::Parse(format!("JSON parsing failed for {}: {}", url, e))
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based): base, 2x base, 4x base, ...
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
        }
    }
}

/// JSON fetcher with a per-attempt timeout and exponential backoff on
/// transient failures. Never caches.
#[derive(Clone)]
pub struct ResourceClient {
    transport: Arc<dyn Transport>,
    base_url: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl ResourceClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        base_url: impl Into<String>,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            retry,
        }
    }

    pub fn from_config(pokemon: &PokemonConfig, retry: &RetryConfig) -> Result<Self> {
        let transport = HttpTransport::new(pokemon.timeout())?;
        Ok(Self::new(
            Arc::new(transport),
            pokemon.api_url.clone(),
            pokemon.timeout(),
            RetryPolicy::from(retry),
        ))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url_for(&self, path: &str, params: &[(&str, String)]) -> Result<String> {
        let raw = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let url = if params.is_empty() {
            reqwest::Url::parse(&raw)
        } else {
            reqwest::Url::parse_with_params(&raw, params)
        }
        .map_err(|e| AppError::Client {
            status: 0,
            message: format!("invalid URL {}: {}", raw, e),
        })?;
        Ok(url.to_string())
    }

    pub async fn fetch_json(&self, path: &str, params: &[(&str, String)]) -> Result<Value> {
        let url = self.url_for(path, params)?;
        self.fetch_url(&url).await
    }

    pub async fn fetch<T: DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> Result<T> {
        let value = self.fetch_json(path, params).await?;
        decode(value, path)
    }

    /// Fetches an absolute URL (evolution-chain references are handed out absolute).
    pub async fn fetch_url_as<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let value = self.fetch_url(url).await?;
        decode(value, url)
    }

    pub async fn fetch_url(&self, url: &str) -> Result<Value> {
        let mut retries = 0;
        loop {
            let outcome = match tokio::time::timeout(self.timeout, self.transport.get_json(url)).await {
                Ok(result) => result,
                Err(_) => Err(AppError::network(format!(
                    "request to {} timed out after {:?}",
                    url, self.timeout
                ))),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && retries < self.retry.max_retries => {
                    retries += 1;
                    let delay = self.retry.delay_for(retries);
                    tracing::warn!(
                        "Transient failure fetching {} ({}), retry {}/{} in {:?}",
                        url,
                        e,
                        retries,
                        self.retry.max_retries,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::debug!("Giving up on {} after {} retries: {}", url, retries, e);
                    return Err(e);
                }
            }
        }
    }
}

fn decode<T: DeserializeOwned>(value: Value, source: &str) -> Result<T> {
    serde_json::from_value(value).map_err(|e| {
        tracing::error!("Unexpected document shape from {}: {}", source, e);
        AppError::Parse(format!("{}: {}", source, e))
    })
}
