//! Spending: output selection, coin hour distribution and signed transactions
//!
//! Selection always starts with the output holding the most coins among
//! those that carry coin hours, so every spend can pay a fee. Outputs without
//! hours are added next, then the remaining outputs with hours, each group in
//! the order of the chosen [`SpendStrategy`].
//!
//! Hours left after the fee are split between the change output and the
//! destinations: the change output takes half, rounded up, and the
//! destinations share the rest with any remainder going to the first ones.

use std::cmp::Ordering;
use std::collections::HashSet;

use tracing::{debug, info};

use crate::{
    client::{dedup_addresses, types::ReadableOutput, NodeClient},
    crypto::keys::SecKey,
    data_structures::{
        address::Address,
        balance::Balance,
        droplet, fee,
        transaction::{Transaction, TransactionOutput},
        ux_out::{UxBalance, UxOut},
    },
    errors::{SkyWalletError, SkyWalletResult, SpendError},
    wallet::Wallet,
};

/// Order in which candidate outputs are consumed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpendStrategy {
    /// Smallest outputs first, shrinking the unspent set
    MaximizeUxOuts,
    /// Largest outputs first, keeping transactions small
    MinimizeUxOuts,
}

impl SpendStrategy {
    fn sort(self, uxa: &mut [UxBalance]) {
        match self {
            SpendStrategy::MaximizeUxOuts => {
                uxa.sort_by(|a, b| cmp_by_coins(a, b, a.coins.cmp(&b.coins)))
            }
            SpendStrategy::MinimizeUxOuts => {
                uxa.sort_by(|a, b| cmp_by_coins(a, b, b.coins.cmp(&a.coins)))
            }
        }
    }
}

/// `coins` first, then fewest hours, oldest block and output hash
fn cmp_by_coins(a: &UxBalance, b: &UxBalance, coins: Ordering) -> Ordering {
    coins
        .then(a.hours.cmp(&b.hours))
        .then(a.bk_seq.cmp(&b.bk_seq))
        .then(a.hash.cmp(&b.hash))
}

fn total_balance(uxa: &[UxBalance]) -> SkyWalletResult<Balance> {
    uxa.iter()
        .try_fold(Balance::default(), |acc, ux| acc.add(&Balance::new(ux.coins, ux.hours)))
}

/// Choose outputs from `uxa` covering `coins` and leaving at least `hours`
/// after the fee
pub fn choose_spends(
    uxa: &[UxBalance],
    coins: u64,
    hours: u64,
    strategy: SpendStrategy,
) -> SkyWalletResult<Vec<UxBalance>> {
    if coins == 0 {
        return Err(SpendError::ZeroSpend.into());
    }
    if uxa.is_empty() {
        return Err(SpendError::NoUnspents.into());
    }

    let mut seen = HashSet::with_capacity(uxa.len());
    for ux in uxa {
        if ux.coins == 0 {
            return Err(SkyWalletError::invalid_argument(format!(
                "output {} holds no coins",
                ux.hash
            )));
        }
        if !seen.insert(ux.hash) {
            return Err(SkyWalletError::invalid_argument(format!(
                "duplicate output {}",
                ux.hash
            )));
        }
    }

    let (mut nonzero, mut zero): (Vec<UxBalance>, Vec<UxBalance>) =
        uxa.iter().copied().partition(|ux| ux.hours > 0);
    if nonzero.is_empty() {
        return Err(SpendError::NoFee.into());
    }

    let enough = |have: &Balance| have.coins >= coins && fee::remaining_hours(have.hours) >= hours;

    SpendStrategy::MinimizeUxOuts.sort(&mut nonzero);
    let first = nonzero.remove(0);
    let mut have = Balance::new(first.coins, first.hours);
    let mut spending = vec![first];
    if enough(&have) {
        return Ok(spending);
    }

    strategy.sort(&mut zero);
    for ux in zero {
        have = have.add(&Balance::new(ux.coins, ux.hours))?;
        spending.push(ux);
        if have.coins >= coins {
            break;
        }
    }
    if enough(&have) {
        return Ok(spending);
    }

    strategy.sort(&mut nonzero);
    for ux in nonzero {
        have = have.add(&Balance::new(ux.coins, ux.hours))?;
        spending.push(ux);
        if enough(&have) {
            return Ok(spending);
        }
    }

    if have.coins < coins {
        Err(SpendError::InsufficientBalance.into())
    } else {
        Err(SpendError::InsufficientHours.into())
    }
}

pub fn choose_spends_maximize_ux_outs(
    uxa: &[UxBalance],
    coins: u64,
    hours: u64,
) -> SkyWalletResult<Vec<UxBalance>> {
    choose_spends(uxa, coins, hours, SpendStrategy::MaximizeUxOuts)
}

pub fn choose_spends_minimize_ux_outs(
    uxa: &[UxBalance],
    coins: u64,
    hours: u64,
) -> SkyWalletResult<Vec<UxBalance>> {
    choose_spends(uxa, coins, hours, SpendStrategy::MinimizeUxOuts)
}

/// Coin hours assigned to the outputs of a spend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpendHours {
    pub change_hours: u64,
    /// One entry per destination
    pub addr_hours: Vec<u64>,
    /// Sum of every output's hours
    pub total: u64,
}

/// Split the hours of `input_hours` left after the fee across `n_addrs`
/// destinations and, if `have_change`, a change output
pub fn distribute_spend_hours(
    input_hours: u64,
    n_addrs: usize,
    have_change: bool,
) -> SkyWalletResult<SpendHours> {
    if n_addrs == 0 {
        return Err(SkyWalletError::invalid_argument(
            "at least one destination is required",
        ));
    }

    let remaining = fee::remaining_hours(input_hours);
    let change_hours = if have_change {
        remaining / 2 + remaining % 2
    } else {
        0
    };

    let addr_total = remaining - change_hours;
    let share = addr_total / n_addrs as u64;
    let extra = (addr_total % n_addrs as u64) as usize;
    let addr_hours = (0..n_addrs)
        .map(|i| if i < extra { share + 1 } else { share })
        .collect();

    Ok(SpendHours {
        change_hours,
        addr_hours,
        total: remaining,
    })
}

/// Build a transaction spending `utxos` with `keys` into `outs`, signed
pub fn new_transaction(
    utxos: &[UxBalance],
    keys: &[SecKey],
    outs: &[TransactionOutput],
) -> SkyWalletResult<Transaction> {
    let mut txn = Transaction::new();
    for ux in utxos {
        txn.push_input(ux.hash);
    }
    for out in outs {
        txn.push_output(out.address, out.coins, out.hours);
    }
    txn.sign_inputs(keys)?;
    Ok(txn)
}

/// Destination and amount, in droplets, of one output of a raw transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendAmount {
    pub address: Address,
    pub coins: u64,
}

impl Wallet {
    /// Spend `coins` from `auxs` to `dest`, signed with this wallet's keys
    ///
    /// Hours are valued at `head_time`. Change goes back to the owner of the
    /// first chosen output and is placed before the destination output.
    pub fn create_and_sign_transaction(
        &self,
        auxs: &[UxOut],
        head_time: u64,
        coins: u64,
        dest: &Address,
    ) -> SkyWalletResult<Transaction> {
        if self.is_encrypted() {
            return Err(SkyWalletError::WalletLocked);
        }
        if auxs.iter().any(|ux| self.entry(&ux.body.address).is_none()) {
            return Err(SpendError::UnknownAddress.into());
        }

        let balances = auxs
            .iter()
            .map(|ux| UxBalance::new(head_time, ux))
            .collect::<SkyWalletResult<Vec<_>>>()?;
        let spends = choose_spends_maximize_ux_outs(&balances, coins, 0)?;
        let keys = self.spend_keys(&spends)?;

        let spending = total_balance(&spends)?;
        if spending.hours == 0 {
            return Err(SpendError::NoFee.into());
        }

        let change_coins = spending.coins - coins;
        let have_change = change_coins > 0;
        let hours = distribute_spend_hours(spending.hours, 1, have_change)?;
        fee::verify_fee_for_hours(hours.total, spending.hours - hours.total)?;

        let mut outs = Vec::with_capacity(2);
        if have_change {
            outs.push(TransactionOutput::new(
                spends[0].address,
                change_coins,
                hours.change_hours,
            ));
        }
        outs.push(TransactionOutput::new(*dest, coins, hours.addr_hours[0]));

        let txn = new_transaction(&spends, &keys, &outs)?;
        debug!(
            "Created transaction {} spending {} outputs from wallet {}",
            txn.hash(),
            spends.len(),
            self.filename()
        );
        Ok(txn)
    }

    /// Secret keys of the owners of `spends`, in order
    fn spend_keys(&self, spends: &[UxBalance]) -> SkyWalletResult<Vec<SecKey>> {
        spends
            .iter()
            .map(|ux| {
                let entry = self
                    .entry(&ux.address)
                    .ok_or(SpendError::UnknownAddress)?;
                entry.secret.clone().ok_or(SkyWalletError::WalletLocked)
            })
            .collect()
    }
}

/// Build and sign a transaction paying `to_addrs` from the unspent outputs
/// of `in_addrs`, sending change to `change_addr`
///
/// With no `in_addrs` every wallet address is a source. Outputs already
/// spent by pending transactions are skipped. Destination outputs come in
/// the given order, followed by the change output. `password` is only used
/// when the wallet is encrypted.
pub async fn create_raw_tx(
    client: &dyn NodeClient,
    wallet: &Wallet,
    in_addrs: &[Address],
    change_addr: &Address,
    to_addrs: &[SendAmount],
    password: &[u8],
) -> SkyWalletResult<Transaction> {
    if to_addrs.is_empty() {
        return Err(SkyWalletError::invalid_argument(
            "at least one destination is required",
        ));
    }
    for to in to_addrs {
        if to.coins == 0 {
            return Err(SpendError::ZeroSpend.into());
        }
        droplet::check_precision(to.coins)?;
    }
    if wallet.is_encrypted() && password.is_empty() {
        return Err(SkyWalletError::MissingPassword);
    }

    let in_addrs = if in_addrs.is_empty() {
        wallet.addresses()
    } else {
        dedup_addresses(in_addrs)
    };
    if in_addrs.iter().any(|a| wallet.entry(a).is_none()) {
        return Err(SpendError::UnknownAddress.into());
    }

    let outputs = client.outputs_for_addresses(&in_addrs).await?;
    let balances = outputs
        .spendable_outputs()
        .iter()
        .map(ReadableOutput::to_ux_balance)
        .collect::<SkyWalletResult<Vec<_>>>()?;

    let total_coins = to_addrs
        .iter()
        .try_fold(0u64, |acc, to| acc.checked_add(to.coins))
        .ok_or_else(|| SkyWalletError::invalid_argument("total send amount overflows"))?;
    let spends = choose_spends_maximize_ux_outs(&balances, total_coins, 0)?;
    let spending = total_balance(&spends)?;

    let change_coins = spending.coins - total_coins;
    let have_change = change_coins > 0;
    let hours = distribute_spend_hours(spending.hours, to_addrs.len(), have_change)?;
    fee::verify_fee_for_hours(hours.total, spending.hours - hours.total)?;

    let mut outs: Vec<TransactionOutput> = to_addrs
        .iter()
        .zip(&hours.addr_hours)
        .map(|(to, h)| TransactionOutput::new(to.address, to.coins, *h))
        .collect();
    if have_change {
        outs.push(TransactionOutput::new(
            *change_addr,
            change_coins,
            hours.change_hours,
        ));
    }

    let sign = |w: &Wallet| {
        let keys = w.spend_keys(&spends)?;
        new_transaction(&spends, &keys, &outs)
    };
    let txn = if wallet.is_encrypted() {
        wallet.guard_view(password, sign)?
    } else {
        sign(wallet)?
    };
    txn.verify()?;

    info!(
        "Created raw transaction {}: {} inputs, {} outputs, fee {} hours",
        txn.hash(),
        txn.inputs.len(),
        txn.outputs.len(),
        spending.hours - hours.total
    );
    Ok(txn)
}
