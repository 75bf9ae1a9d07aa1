use serde::{Deserialize, Serialize};

use crate::errors::{SkyWalletError, SkyWalletResult};

/// Coins (in droplets) and coin hours
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub coins: u64,
    pub hours: u64,
}

impl Balance {
    pub fn new(coins: u64, hours: u64) -> Self {
        Self { coins, hours }
    }

    pub fn is_zero(&self) -> bool {
        self.coins == 0 && self.hours == 0
    }

    pub fn add(&self, other: &Balance) -> SkyWalletResult<Balance> {
        let coins = self
            .coins
            .checked_add(other.coins)
            .ok_or_else(|| SkyWalletError::internal("balance coins overflow"))?;
        let hours = self
            .hours
            .checked_add(other.hours)
            .ok_or_else(|| SkyWalletError::internal("balance hours overflow"))?;
        Ok(Balance { coins, hours })
    }

    pub fn sub(&self, other: &Balance) -> SkyWalletResult<Balance> {
        let coins = self
            .coins
            .checked_sub(other.coins)
            .ok_or_else(|| SkyWalletError::internal("balance coins underflow"))?;
        let hours = self
            .hours
            .checked_sub(other.hours)
            .ok_or_else(|| SkyWalletError::internal("balance hours underflow"))?;
        Ok(Balance { coins, hours })
    }
}

/// Settled and pending-adjusted balances
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalancePair {
    pub confirmed: Balance,
    pub predicted: Balance,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_sub() {
        let a = Balance::new(10, 5);
        let b = Balance::new(3, 2);
        assert_eq!(a.add(&b).unwrap(), Balance::new(13, 7));
        assert_eq!(a.sub(&b).unwrap(), Balance::new(7, 3));
    }

    #[test]
    fn test_overflow_and_underflow() {
        assert!(Balance::new(u64::MAX, 0).add(&Balance::new(1, 0)).is_err());
        assert!(Balance::new(1, 1).sub(&Balance::new(0, 2)).is_err());
    }

    #[test]
    fn test_json_shape() {
        let pair = BalancePair {
            confirmed: Balance::new(1_000_000, 12),
            predicted: Balance::new(2_000_000, 24),
        };
        let value = serde_json::to_value(pair).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "confirmed": {"coins": 1_000_000, "hours": 12},
                "predicted": {"coins": 2_000_000, "hours": 24}
            })
        );
    }
}
