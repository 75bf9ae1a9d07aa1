//! HTTP node client
//!
//! Talks to a node's REST API under `/api/v1`. Each call is a single GET with
//! the configured timeout; nothing is retried here. Failures map onto the
//! error taxonomy:
//!
//! | condition               | error          |
//! |-------------------------|----------------|
//! | HTTP 400                | `InvalidArgument` |
//! | HTTP 404                | `NotFound`     |
//! | HTTP 503, connect error | `Unavailable`  |
//! | other 5xx, bad JSON     | `Internal`     |
//! | request timeout         | `Timeout`      |

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{
    client::{
        check_address_arg, check_output_filters, dedup_addresses,
        range::{block_range_bounds, check_block_range},
        types::{
            BalanceResponse, BlockchainMetadata, BlockchainProgress, BuildInfo, CoinSupply,
            HealthResponse, ReadableBlock, ReadableBlocks, ReadableOutputSet, SpentOutput,
        },
        NodeClient,
    },
    config::{ClientConfig, DEFAULT_REQUEST_TIMEOUT},
    crypto::hash::Sha256Hash,
    data_structures::{address::Address, balance::BalancePair},
    errors::{SkyWalletError, SkyWalletResult},
};

/// HTTP client for a Skycoin node
#[derive(Clone)]
pub struct HttpNodeClient {
    client: Client,
    /// `<node>/api/v1`
    base_url: String,
    timeout: Duration,
    max_concurrent_requests: usize,
}

impl std::fmt::Debug for HttpNodeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpNodeClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("max_concurrent_requests", &self.max_concurrent_requests)
            .finish()
    }
}

fn request_error(url: &str, e: reqwest::Error) -> SkyWalletError {
    if e.is_timeout() {
        SkyWalletError::Timeout(format!("GET {}", url))
    } else if e.is_connect() {
        SkyWalletError::Unavailable(format!("connect to {}: {}", url, e))
    } else {
        SkyWalletError::Unavailable(format!("GET {}: {}", url, e))
    }
}

fn status_error(url: &str, status: StatusCode, body: &str) -> SkyWalletError {
    let detail = body.trim();
    let detail = if detail.is_empty() {
        status.to_string()
    } else {
        format!("{} - {}", status, detail)
    };

    match status {
        StatusCode::BAD_REQUEST => SkyWalletError::invalid_argument(detail),
        StatusCode::NOT_FOUND => SkyWalletError::not_found(detail),
        StatusCode::SERVICE_UNAVAILABLE => SkyWalletError::Unavailable(detail),
        _ => SkyWalletError::internal(format!("GET {}: {}", url, detail)),
    }
}

fn join_csv<T: ToString>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

impl HttpNodeClient {
    /// Client for the node at `node_url` with the default timeout
    pub fn new(node_url: impl Into<String>) -> SkyWalletResult<Self> {
        Self::with_timeout(node_url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(node_url: impl Into<String>, timeout: Duration) -> SkyWalletResult<Self> {
        let config = ClientConfig::new(node_url).with_request_timeout(timeout);
        Self::from_config(&config)
    }

    pub fn from_config(config: &ClientConfig) -> SkyWalletResult<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SkyWalletError::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.api_url(),
            timeout: config.request_timeout,
            max_concurrent_requests: config.max_concurrent_requests,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> SkyWalletResult<T> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!("GET {} {:?}", url, query);

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| request_error(&url, e))?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| request_error(&url, e))?;

        if !status.is_success() {
            debug!("GET {} failed with {}", url, status);
            return Err(status_error(&url, status, &String::from_utf8_lossy(&body)));
        }

        serde_json::from_slice(&body).map_err(|e| {
            SkyWalletError::internal(format!("Failed to parse response from {}: {}", url, e))
        })
    }
}

#[async_trait]
impl NodeClient for HttpNodeClient {
    fn max_concurrent_requests(&self) -> usize {
        self.max_concurrent_requests
    }

    async fn version(&self) -> SkyWalletResult<BuildInfo> {
        let info: BuildInfo = self.get_json("version", &[]).await?;
        if info.version.is_empty() {
            return Err(SkyWalletError::internal("node reported an empty version"));
        }
        Ok(info)
    }

    async fn coin_supply(&self) -> SkyWalletResult<CoinSupply> {
        self.get_json("coinSupply", &[]).await
    }

    async fn outputs_filtered(
        &self,
        addresses: &[Address],
        hashes: &[Sha256Hash],
    ) -> SkyWalletResult<ReadableOutputSet> {
        check_output_filters(addresses, hashes)?;

        let mut query = Vec::new();
        if !addresses.is_empty() {
            query.push(("addrs", join_csv(&dedup_addresses(addresses))));
        }
        if !hashes.is_empty() {
            query.push(("hashes", join_csv(hashes)));
        }
        self.get_json("outputs", &query).await
    }

    async fn block_by_seq(&self, seq: u64) -> SkyWalletResult<ReadableBlock> {
        self.get_json("block", &[("seq", seq.to_string())]).await
    }

    async fn block_by_hash(&self, hash: &Sha256Hash) -> SkyWalletResult<ReadableBlock> {
        self.get_json("block", &[("hash", hash.to_string())]).await
    }

    async fn blocks(&self, start: i64, end: i64) -> SkyWalletResult<Vec<ReadableBlock>> {
        let Some((start, end)) = block_range_bounds(start, end)? else {
            return Ok(Vec::new());
        };

        let response: ReadableBlocks = self
            .get_json(
                "blocks",
                &[("start", start.to_string()), ("end", end.to_string())],
            )
            .await?;
        check_block_range(&response.blocks, start, end)?;
        Ok(response.blocks)
    }

    async fn blockchain_metadata(&self) -> SkyWalletResult<BlockchainMetadata> {
        self.get_json("blockchain/metadata", &[]).await
    }

    async fn blockchain_progress(&self) -> SkyWalletResult<BlockchainProgress> {
        self.get_json("blockchain/progress", &[]).await
    }

    async fn balance(&self, addresses: &[Address]) -> SkyWalletResult<BalancePair> {
        if addresses.is_empty() {
            return Err(SkyWalletError::invalid_argument("at least one address is required"));
        }
        let response: BalanceResponse = self
            .get_json("balance", &[("addrs", join_csv(&dedup_addresses(addresses)))])
            .await?;
        Ok(response.pair())
    }

    async fn ux_out(&self, uxid: &Sha256Hash) -> SkyWalletResult<SpentOutput> {
        self.get_json("uxout", &[("uxid", uxid.to_string())]).await
    }

    async fn address_ux_outs(&self, address: &str) -> SkyWalletResult<Vec<SpentOutput>> {
        let address = check_address_arg(address)?;
        self.get_json("address_uxouts", &[("address", address.to_string())])
            .await
    }

    async fn health(&self) -> SkyWalletResult<HealthResponse> {
        self.get_json("health", &[]).await
    }
}

/// Builder for creating HTTP node clients
pub struct HttpClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    config: Option<ClientConfig>,
}

impl HttpClientBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            base_url: None,
            timeout: None,
            config: None,
        }
    }

    /// Set the node URL, overriding any configured one
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the timeout for HTTP requests
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Start from an existing configuration
    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the HTTP client
    pub fn build(self) -> SkyWalletResult<HttpNodeClient> {
        if self.base_url.is_none() && self.config.is_none() {
            return Err(SkyWalletError::invalid_argument("Base URL not specified"));
        }

        let mut config = self.config.unwrap_or_default();
        if let Some(url) = self.base_url {
            config = config.with_node_url(url);
        }
        if let Some(timeout) = self.timeout {
            config = config.with_request_timeout(timeout);
        }
        HttpNodeClient::from_config(&config)
    }
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MAX_CONCURRENT_REQUESTS;
    use crate::errors::ErrorKind;

    #[test]
    fn test_builder_requires_url() {
        assert!(HttpClientBuilder::new().build().is_err());
    }

    #[test]
    fn test_builder_url_and_timeout() {
        let client = HttpClientBuilder::new()
            .with_base_url("127.0.0.1:6420")
            .with_timeout(Duration::from_secs(3))
            .build()
            .unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:6420/api/v1");
        assert_eq!(client.timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_builder_from_config() {
        let config = ClientConfig::new("http://node:1234")
            .with_request_timeout(Duration::from_secs(9))
            .with_max_concurrent_requests(3);
        let client = HttpClientBuilder::new().with_config(config).build().unwrap();
        assert_eq!(client.base_url(), "http://node:1234/api/v1");
        assert_eq!(client.timeout(), Duration::from_secs(9));
        assert_eq!(client.max_concurrent_requests(), 3);

        let default = HttpNodeClient::new("http://node:1234").unwrap();
        assert_eq!(default.max_concurrent_requests(), DEFAULT_MAX_CONCURRENT_REQUESTS);
    }

    #[test]
    fn test_status_mapping() {
        let url = "http://x/api/v1/block";
        assert_eq!(
            status_error(url, StatusCode::BAD_REQUEST, "bad seq").kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(status_error(url, StatusCode::NOT_FOUND, "").kind(), ErrorKind::NotFound);
        assert_eq!(
            status_error(url, StatusCode::SERVICE_UNAVAILABLE, "").kind(),
            ErrorKind::Unavailable
        );
        assert_eq!(
            status_error(url, StatusCode::INTERNAL_SERVER_ERROR, "").kind(),
            ErrorKind::Internal
        );
        assert!(status_error(url, StatusCode::BAD_REQUEST, "bad seq")
            .to_string()
            .contains("bad seq"));
    }

    #[test]
    fn test_join_csv() {
        assert_eq!(join_csv(&[1, 2, 3]), "1,2,3");
        assert_eq!(join_csv::<u8>(&[]), "");
    }

    #[tokio::test]
    async fn test_local_validation_needs_no_network() {
        // Nothing listens on port 9; these must fail before any request
        let client = HttpNodeClient::new("http://127.0.0.1:9").unwrap();
        assert!(client.blocks(10, 9).await.unwrap().is_empty());
        assert_eq!(client.blocks(-1, 0).await.unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert_eq!(
            client.address_ux_outs("").await.unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(client.balance(&[]).await.unwrap_err().kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn test_connection_refused_is_unavailable() {
        let client = HttpNodeClient::with_timeout("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let err = client.version().await.unwrap_err();
        assert!(err.is_retryable());
    }
}
