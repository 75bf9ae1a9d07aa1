//! Block range queries
//!
//! Ranges are inclusive. A range whose start is past its end is empty rather
//! than an error. Bounds arrive as signed integers so that negative values
//! from callers are rejected explicitly instead of wrapping.

use std::sync::Arc;

use tokio::{sync::Semaphore, task::JoinSet};
use tracing::debug;

use crate::{
    client::{types::ReadableBlock, NodeClient},
    data_structures::block::verify_chain,
    errors::{SkyWalletError, SkyWalletResult},
};

/// Validated unsigned bounds, or `None` for an empty range
pub fn block_range_bounds(start: i64, end: i64) -> SkyWalletResult<Option<(u64, u64)>> {
    if start < 0 || end < 0 {
        return Err(SkyWalletError::invalid_argument(format!(
            "block range bounds must not be negative: start={}, end={}",
            start, end
        )));
    }
    if start > end {
        return Ok(None);
    }
    Ok(Some((start as u64, end as u64)))
}

/// Check a fetched range: one block per sequence, ascending, hash-linked
pub fn check_block_range(blocks: &[ReadableBlock], start: u64, end: u64) -> SkyWalletResult<()> {
    let expected = end - start + 1;
    if blocks.len() as u64 != expected {
        return Err(SkyWalletError::not_found(format!(
            "blocks {}..={}: node returned {} of {} blocks",
            start,
            end,
            blocks.len(),
            expected
        )));
    }
    verify_chain(blocks, start)
}

/// Fetch `start..=end` with one `block_by_seq` call per sequence, at most
/// `max_in_flight` at a time
///
/// The result is always in ascending sequence order. The first failed fetch
/// aborts the remaining ones and is returned.
pub async fn fetch_block_range<C>(
    client: Arc<C>,
    start: i64,
    end: i64,
    max_in_flight: usize,
) -> SkyWalletResult<Vec<ReadableBlock>>
where
    C: NodeClient + ?Sized + 'static,
{
    let Some((start, end)) = block_range_bounds(start, end)? else {
        return Ok(Vec::new());
    };

    debug!(
        "Fetching blocks {}..={} with up to {} requests in flight",
        start, end, max_in_flight
    );

    let semaphore = Arc::new(Semaphore::new(max_in_flight.max(1)));
    let mut tasks = JoinSet::new();
    let mut blocks = Vec::with_capacity((end - start + 1).min(1024) as usize);

    for seq in start..=end {
        let permit = Arc::clone(&semaphore)
            .acquire_owned()
            .await
            .map_err(|e| SkyWalletError::internal(format!("semaphore closed: {}", e)))?;
        let client = Arc::clone(&client);
        tasks.spawn(async move {
            let _permit = permit;
            client.block_by_seq(seq).await
        });

        // Surface failures before the rest of the range is queued
        while let Some(joined) = tasks.try_join_next() {
            blocks.push(joined.map_err(join_error)??);
        }
    }

    while let Some(joined) = tasks.join_next().await {
        blocks.push(joined.map_err(join_error)??);
    }

    blocks.sort_by_key(ReadableBlock::seq);
    check_block_range(&blocks, start, end)?;
    Ok(blocks)
}

/// [`fetch_block_range`] bounded by the client's own concurrency limit
pub async fn fetch_blocks<C>(client: Arc<C>, start: i64, end: i64) -> SkyWalletResult<Vec<ReadableBlock>>
where
    C: NodeClient + ?Sized + 'static,
{
    let max_in_flight = client.max_concurrent_requests();
    fetch_block_range(client, start, end, max_in_flight).await
}

fn join_error(e: tokio::task::JoinError) -> SkyWalletError {
    SkyWalletError::internal(format!("block fetch task failed: {}", e))
}
