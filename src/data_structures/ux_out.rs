//! Unspent outputs and their balances at a given head time

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::{
    crypto::hash::Sha256Hash,
    data_structures::{address::Address, droplet},
    errors::{SkyWalletError, SkyWalletResult},
};

/// Where and when an output was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct UxHead {
    pub time: u64,
    pub bk_seq: u64,
}

/// What an output holds; its encoding determines the output hash
#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct UxBody {
    pub src_transaction: Sha256Hash,
    pub address: Address,
    pub coins: u64,
    pub hours: u64,
}

impl UxBody {
    pub fn hash(&self) -> Sha256Hash {
        // Fixed-width fields only, so borsh encoding cannot fail
        let encoded = borsh::to_vec(self).unwrap_or_default();
        Sha256Hash::digest(&encoded)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct UxOut {
    pub head: UxHead,
    pub body: UxBody,
}

impl UxOut {
    pub fn hash(&self) -> Sha256Hash {
        self.body.hash()
    }

    /// Coin hours held by this output at time `t`
    ///
    /// Each whole coin earns one hour per 3600 seconds; droplet remainders
    /// accrue proportionally and are rounded down.
    pub fn coin_hours(&self, t: u64) -> SkyWalletResult<u64> {
        if t < self.head.time {
            return Ok(self.body.hours);
        }

        let seconds = t - self.head.time;
        let overflow = || SkyWalletError::invalid_argument("coin hours calculation overflow");

        let whole_coins = self.body.coins / droplet::MULTIPLIER;
        let whole_coin_seconds = seconds.checked_mul(whole_coins).ok_or_else(overflow)?;

        let remainder = self.body.coins % droplet::MULTIPLIER;
        let droplet_seconds = seconds.checked_mul(remainder).ok_or_else(overflow)?;

        let coin_seconds = whole_coin_seconds
            .checked_add(droplet_seconds / droplet::MULTIPLIER)
            .ok_or_else(overflow)?;

        self.body
            .hours
            .checked_add(coin_seconds / 3600)
            .ok_or_else(overflow)
    }
}

/// An unspent output resolved against the head block time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UxBalance {
    pub hash: Sha256Hash,
    pub bk_seq: u64,
    pub time: u64,
    pub address: Address,
    pub coins: u64,
    pub initial_hours: u64,
    pub hours: u64,
    pub src_transaction: Sha256Hash,
}

impl UxBalance {
    pub fn new(head_time: u64, ux: &UxOut) -> SkyWalletResult<Self> {
        Ok(UxBalance {
            hash: ux.hash(),
            bk_seq: ux.head.bk_seq,
            time: ux.head.time,
            address: ux.body.address,
            coins: ux.body.coins,
            initial_hours: ux.body.hours,
            hours: ux.coin_hours(head_time)?,
            src_transaction: ux.body.src_transaction,
        })
    }
}

/// Remove from `a` every output whose hash appears in `b`
pub fn ux_balances_sub(a: &[UxBalance], b: &[UxBalance]) -> Vec<UxBalance> {
    let exclude: std::collections::HashSet<Sha256Hash> = b.iter().map(|ux| ux.hash).collect();
    a.iter()
        .filter(|ux| !exclude.contains(&ux.hash))
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ux(coins: u64, hours: u64, time: u64) -> UxOut {
        UxOut {
            head: UxHead { time, bk_seq: 4 },
            body: UxBody {
                src_transaction: Sha256Hash::digest(b"tx"),
                address: Address::null(),
                coins,
                hours,
            },
        }
    }

    #[test]
    fn test_coin_hours_before_creation() {
        assert_eq!(ux(1_000_000, 7, 1000).coin_hours(500).unwrap(), 7);
    }

    #[test]
    fn test_coin_hours_whole_coins() {
        // 2 coins for 2 hours earns 4 hours
        assert_eq!(ux(2_000_000, 10, 0).coin_hours(7200).unwrap(), 14);
    }

    #[test]
    fn test_coin_hours_droplet_remainder() {
        // 0.5 coins for 2 hours earns 1 hour
        assert_eq!(ux(500_000, 0, 0).coin_hours(7200).unwrap(), 1);
        // 1.5 coins for 1 hour earns 1.5 hours, rounded down
        assert_eq!(ux(1_500_000, 0, 0).coin_hours(3600).unwrap(), 1);
    }

    #[test]
    fn test_coin_hours_overflow() {
        let out = ux(u64::MAX, 0, 0);
        assert!(out.coin_hours(u64::MAX).is_err());
    }

    #[test]
    fn test_hash_depends_on_body_only() {
        let a = ux(5, 1, 100);
        let mut b = a;
        b.head.time = 999;
        assert_eq!(a.hash(), b.hash());
        b.body.hours = 2;
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn test_ux_balance_new() {
        let out = ux(3_000_000, 2, 0);
        let balance = UxBalance::new(3600, &out).unwrap();
        assert_eq!(balance.initial_hours, 2);
        assert_eq!(balance.hours, 5);
        assert_eq!(balance.hash, out.hash());
        assert_eq!(balance.bk_seq, 4);
    }

    #[test]
    fn test_ux_balances_sub() {
        let a = UxBalance::new(0, &ux(1, 0, 0)).unwrap();
        let b = UxBalance::new(0, &ux(2, 0, 0)).unwrap();
        let remaining = ux_balances_sub(&[a, b], &[b]);
        assert_eq!(remaining, vec![a]);
    }
}
