//! Queries against a running node
//!
//! Skipped unless `SKYCOIN_INTEGRATION_TESTS=1`. The node is taken from
//! `SKYCOIN_NODE_HOST` (default `http://127.0.0.1:6420`).
#![cfg(feature = "http")]

mod common;

use std::sync::Arc;

use common::live_tests_enabled;
use lightweight_skycoin_libs::{
    client::{fetch_block_range, HttpNodeClient, NodeClient},
    config::ClientConfig,
    errors::ErrorKind,
    verify_chain,
};

fn live_client() -> Option<HttpNodeClient> {
    if !live_tests_enabled() {
        eprintln!("skipping: SKYCOIN_INTEGRATION_TESTS is not set");
        return None;
    }
    let config = ClientConfig::from_env().unwrap();
    Some(HttpNodeClient::from_config(&config).unwrap())
}

#[tokio::test]
async fn test_live_version_and_metadata() {
    let Some(client) = live_client() else { return };
    let version = client.version().await.unwrap();
    assert!(!version.version.is_empty());

    let metadata = client.blockchain_metadata().await.unwrap();
    let tip = client.block_by_seq(metadata.head.seq).await.unwrap();
    assert_eq!(tip.hash(), metadata.head.block_hash);
}

#[tokio::test]
async fn test_live_genesis_and_range() {
    let Some(client) = live_client() else { return };
    let genesis = client.block_by_seq(0).await.unwrap();
    assert!(genesis.header.previous_block_hash.is_zero());
    assert!(genesis.to_block().is_ok());

    let blocks = client.blocks(0, 9).await.unwrap();
    assert_eq!(blocks.len(), 10);
    assert!(verify_chain(&blocks, 0).is_ok());

    let fetched = fetch_block_range(Arc::new(client), 0, 9, 4).await.unwrap();
    assert_eq!(fetched, blocks);
}

#[tokio::test]
async fn test_live_block_past_tip() {
    let Some(client) = live_client() else { return };
    let metadata = client.blockchain_metadata().await.unwrap();
    let err = client.block_by_seq(metadata.head.seq + 1_000_000).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_live_outputs_of_genesis_address() {
    let Some(client) = live_client() else { return };
    let genesis = client.block_by_seq(0).await.unwrap();
    let Some(txn) = genesis.body.txns.first() else { return };
    let owner = txn.outputs[0].dst;

    let history = client.address_ux_outs(&owner.to_string()).await.unwrap();
    assert!(!history.is_empty());
    assert!(history.iter().all(|u| u.owner_address == owner.to_string()));
    assert!(client.balance(&[owner]).await.is_ok());
}
