//! Blockchain query client
//!
//! [`NodeClient`] is the seam between the library and a Skycoin node. Every
//! method is an independent query; implementations hold no mutable state
//! beyond their configuration, so one client can serve concurrent callers.
//!
//! - [`HttpNodeClient`] talks to the node's `/api/v1` REST API (feature `http`)
//! - [`MockNodeClient`] serves an in-memory chain with injectable failures
//!
//! ```rust,no_run
//! use lightweight_skycoin_libs::client::{HttpNodeClient, NodeClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpNodeClient::new("http://127.0.0.1:6420")?;
//! let version = client.version().await?;
//! let blocks = client.blocks(10, 12).await?;
//! assert_eq!(blocks.len(), 3);
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "http")]
pub mod http_client;
pub mod mocks;
pub mod range;
pub mod types;

use std::collections::HashSet;

use async_trait::async_trait;

use crate::{
    config::DEFAULT_MAX_CONCURRENT_REQUESTS,
    crypto::hash::Sha256Hash,
    data_structures::{address::Address, balance::BalancePair},
    errors::{SkyWalletError, SkyWalletResult},
};

#[cfg(feature = "http")]
pub use http_client::{HttpClientBuilder, HttpNodeClient};
pub use mocks::{MockNetworkFailureModes, MockNodeClient};
pub use range::{block_range_bounds, check_block_range, fetch_block_range, fetch_blocks};
pub use types::*;

/// Queries against a single node
#[async_trait]
pub trait NodeClient: Send + Sync {
    /// Upper bound on requests this client should have in flight at once
    fn max_concurrent_requests(&self) -> usize {
        DEFAULT_MAX_CONCURRENT_REQUESTS
    }

    /// Node build information
    async fn version(&self) -> SkyWalletResult<BuildInfo>;

    async fn coin_supply(&self) -> SkyWalletResult<CoinSupply>;

    /// Unspent outputs filtered by owner address or by output hash
    ///
    /// At most one filter may be non-empty; with neither, the whole unspent
    /// set is returned.
    async fn outputs_filtered(
        &self,
        addresses: &[Address],
        hashes: &[Sha256Hash],
    ) -> SkyWalletResult<ReadableOutputSet>;

    async fn outputs(&self) -> SkyWalletResult<ReadableOutputSet> {
        self.outputs_filtered(&[], &[]).await
    }

    async fn outputs_for_addresses(&self, addresses: &[Address]) -> SkyWalletResult<ReadableOutputSet> {
        self.outputs_filtered(addresses, &[]).await
    }

    async fn outputs_for_hashes(&self, hashes: &[Sha256Hash]) -> SkyWalletResult<ReadableOutputSet> {
        self.outputs_filtered(&[], hashes).await
    }

    async fn block_by_seq(&self, seq: u64) -> SkyWalletResult<ReadableBlock>;

    async fn block_by_hash(&self, hash: &Sha256Hash) -> SkyWalletResult<ReadableBlock>;

    /// Blocks `start..=end` in ascending order
    ///
    /// `start > end` yields an empty list; negative bounds are rejected.
    async fn blocks(&self, start: i64, end: i64) -> SkyWalletResult<Vec<ReadableBlock>>;

    async fn blockchain_metadata(&self) -> SkyWalletResult<BlockchainMetadata>;

    async fn blockchain_progress(&self) -> SkyWalletResult<BlockchainProgress>;

    /// Combined balance of `addresses`; duplicates are counted once
    async fn balance(&self, addresses: &[Address]) -> SkyWalletResult<BalancePair>;

    /// A single output by id, spent or not
    async fn ux_out(&self, uxid: &Sha256Hash) -> SkyWalletResult<SpentOutput>;

    /// Every output ever owned by `address`
    async fn address_ux_outs(&self, address: &str) -> SkyWalletResult<Vec<SpentOutput>>;

    async fn health(&self) -> SkyWalletResult<HealthResponse>;
}

/// Drop repeated addresses, keeping first-seen order
pub fn dedup_addresses(addresses: &[Address]) -> Vec<Address> {
    let mut seen = HashSet::with_capacity(addresses.len());
    addresses
        .iter()
        .filter(|a| seen.insert(**a))
        .copied()
        .collect()
}

/// Reject requests that set both output filters
pub fn check_output_filters(addresses: &[Address], hashes: &[Sha256Hash]) -> SkyWalletResult<()> {
    if !addresses.is_empty() && !hashes.is_empty() {
        return Err(SkyWalletError::invalid_argument(
            "addrs and hashes cannot be specified together",
        ));
    }
    Ok(())
}

/// Address query argument: trimmed and non-empty
pub fn check_address_arg(address: &str) -> SkyWalletResult<&str> {
    let address = address.trim();
    if address.is_empty() {
        return Err(SkyWalletError::invalid_argument("address is empty"));
    }
    Ok(address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    const A: &str = "2THDupTBEo7UqB6dsVizkYUvkKq82Qn4gjf";
    const B: &str = "7g3M372kxwNwwQEAmrronu4anXTW8aD1XC";

    #[test]
    fn test_dedup_addresses_keeps_order() {
        let a: Address = A.parse().unwrap();
        let b: Address = B.parse().unwrap();
        assert_eq!(dedup_addresses(&[b, a, b, a]), vec![b, a]);
        assert!(dedup_addresses(&[]).is_empty());
    }

    #[test]
    fn test_output_filters() {
        let a: Address = A.parse().unwrap();
        let h = Sha256Hash::digest(b"x");
        assert!(check_output_filters(&[], &[]).is_ok());
        assert!(check_output_filters(&[a], &[]).is_ok());
        assert!(check_output_filters(&[], &[h]).is_ok());
        assert_eq!(
            check_output_filters(&[a], &[h]).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn test_address_arg() {
        assert_eq!(check_address_arg(" abc ").unwrap(), "abc");
        assert!(check_address_arg("  ").is_err());
    }
}
