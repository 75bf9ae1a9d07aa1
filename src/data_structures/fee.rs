//! Coin hour fees
//!
//! A transaction burns part of the coin hours of its inputs. The user-facing
//! rule requires at least one tenth of the input hours, rounded up, to be
//! burned.

use crate::errors::{SkyWalletError, SkyWalletResult, SpendError};

/// Fraction of input hours that must be burned, as a divisor
pub const BURN_FACTOR: u64 = 10;

/// Hours that must be burned when spending `hours`
pub fn required_fee(hours: u64) -> u64 {
    hours.div_ceil(BURN_FACTOR)
}

/// Hours left for outputs after the required fee
pub fn remaining_hours(hours: u64) -> u64 {
    hours - required_fee(hours)
}

/// Check that burning `fee` hours while sending `hours` meets the minimum
pub fn verify_fee_for_hours(hours: u64, fee: u64) -> SkyWalletResult<()> {
    let total = hours
        .checked_add(fee)
        .ok_or_else(|| SkyWalletError::invalid_argument("Hours and fee overflow"))?;
    if fee < required_fee(total) {
        return Err(SpendError::InsufficientFee.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn test_required_fee_rounds_up() {
        assert_eq!(required_fee(0), 0);
        assert_eq!(required_fee(1), 1);
        assert_eq!(required_fee(10), 1);
        assert_eq!(required_fee(11), 2);
        assert_eq!(required_fee(100), 10);
        assert_eq!(required_fee(u64::MAX), u64::MAX / 10 + 1);
    }

    #[test]
    fn test_remaining_hours() {
        assert_eq!(remaining_hours(0), 0);
        assert_eq!(remaining_hours(1), 0);
        assert_eq!(remaining_hours(15), 13);
        assert_eq!(remaining_hours(100), 90);
    }

    #[test]
    fn test_verify_fee_for_hours() {
        assert!(verify_fee_for_hours(90, 10).is_ok());
        assert!(verify_fee_for_hours(0, 1).is_ok());
        assert!(verify_fee_for_hours(90, 9).is_err());

        let err = verify_fee_for_hours(9, 0).unwrap_err();
        assert_eq!(err.to_string(), "Transaction coinhour fee minimum not met");
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(verify_fee_for_hours(u64::MAX, 1).is_err());
    }
}
