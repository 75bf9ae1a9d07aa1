//! Wallet balances from the node's output set
//!
//! Confirmed balance is the sum of the confirmed unspent outputs. Predicted
//! balance starts from that, removes the outputs pending transactions spend
//! and adds the outputs they create. Hours are the node's calculated hours at
//! the head block time.

use tracing::debug;

use crate::{
    client::{
        dedup_addresses,
        types::{balance_from_outputs, balances_from_outputs},
        NodeClient,
    },
    data_structures::{address::Address, balance::BalancePair},
    errors::{SkyWalletError, SkyWalletResult},
    wallet::Wallet,
};

/// Combined balance of `addresses`, each address counted once
pub async fn balance(client: &dyn NodeClient, addresses: &[Address]) -> SkyWalletResult<BalancePair> {
    let addresses = dedup_addresses(addresses);
    if addresses.is_empty() {
        return Err(SkyWalletError::invalid_argument("at least one address is required"));
    }

    let outputs = client.outputs_for_addresses(&addresses).await?;
    let pair = balance_from_outputs(&outputs)?;
    debug!(
        "Balance of {} addresses at block {}: confirmed {} droplets, predicted {} droplets",
        addresses.len(),
        outputs.head.seq,
        pair.confirmed.coins,
        pair.predicted.coins
    );
    Ok(pair)
}

/// One balance pair per entry of `addresses`, in the same order
pub async fn balances_by_address(
    client: &dyn NodeClient,
    addresses: &[Address],
) -> SkyWalletResult<Vec<BalancePair>> {
    if addresses.is_empty() {
        return Ok(Vec::new());
    }

    let outputs = client
        .outputs_for_addresses(&dedup_addresses(addresses))
        .await?;
    let by_address = balances_from_outputs(&outputs)?;

    Ok(addresses
        .iter()
        .map(|a| by_address.get(&a.to_string()).copied().unwrap_or_default())
        .collect())
}

/// Look ahead `scan_n` addresses and keep those up to the last one holding coins
///
/// Returns the addresses added to the wallet. The wallet must be unlocked.
pub async fn scan_addresses(
    wallet: &mut Wallet,
    scan_n: u64,
    client: &dyn NodeClient,
) -> SkyWalletResult<Vec<Address>> {
    if wallet.is_encrypted() {
        return Err(SkyWalletError::WalletLocked);
    }
    if scan_n == 0 {
        return Ok(Vec::new());
    }

    let mut lookahead = wallet.clone();
    let candidates = lookahead.generate_addresses(scan_n)?;
    lookahead.erase();

    let balances = balances_by_address(client, &candidates).await?;
    let keep = balances
        .iter()
        .rposition(|b| b.confirmed.coins > 0 || b.predicted.coins > 0)
        .map(|i| i + 1)
        .unwrap_or(0);

    debug!(
        "Scanned {} addresses of wallet {}, keeping {}",
        scan_n,
        wallet.filename(),
        keep
    );

    if keep == 0 {
        return Ok(Vec::new());
    }
    wallet.generate_addresses(keep as u64)
}
