//! Conversions between droplets and decimal coin strings
//!
//! Amounts are stored as integer droplets; 1 coin is 1,000,000 droplets.
//! The node renders coin amounts as fixed six-decimal strings ("177.999000").

use crate::errors::{SkyWalletError, SkyWalletResult};

/// Number of decimal places in a coin amount
pub const EXPONENT: u32 = 6;

/// Droplets per whole coin
pub const MULTIPLIER: u64 = 1_000_000;

/// Decimal places a spent amount may carry
pub const MAX_DECIMALS: u32 = 3;

/// Render droplets as a fixed six-decimal coin string
pub fn to_string(droplets: u64) -> String {
    format!("{}.{:06}", droplets / MULTIPLIER, droplets % MULTIPLIER)
}

/// Reject amounts finer than [`MAX_DECIMALS`] decimal places
pub fn check_precision(droplets: u64) -> SkyWalletResult<()> {
    let unit = 10u64.pow(EXPONENT - MAX_DECIMALS);
    if droplets % unit != 0 {
        return Err(SkyWalletError::invalid_argument(
            "invalid amount, too many decimal places",
        ));
    }
    Ok(())
}

/// Parse a decimal coin string into droplets
pub fn from_string(s: &str) -> SkyWalletResult<u64> {
    let invalid = || SkyWalletError::invalid_argument(format!("invalid coin amount: {:?}", s));

    let s = s.trim();
    if s.is_empty() || s.starts_with('-') || s.starts_with('+') {
        return Err(invalid());
    }

    let (whole, frac) = match s.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (s, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid());
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let frac = frac.trim_end_matches('0');
    if frac.len() > EXPONENT as usize {
        return Err(SkyWalletError::invalid_argument(format!(
            "too many decimal places: {:?}",
            s
        )));
    }

    let whole: u64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid())?
    };
    let frac_droplets: u64 = if frac.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", frac, width = EXPONENT as usize);
        padded.parse().map_err(|_| invalid())?
    };

    whole
        .checked_mul(MULTIPLIER)
        .and_then(|d| d.checked_add(frac_droplets))
        .ok_or_else(|| SkyWalletError::invalid_argument(format!("coin amount overflows: {:?}", s)))
}

/// Serde adapter for droplet amounts rendered as coin strings
pub mod serde_coins {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(droplets: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::to_string(*droplets))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::from_string(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_string() {
        assert_eq!(to_string(177_999_000), "177.999000");
        assert_eq!(to_string(0), "0.000000");
        assert_eq!(to_string(1), "0.000001");
        assert_eq!(to_string(27_000_000), "27.000000");
    }

    #[test]
    fn test_from_string() {
        assert_eq!(from_string("177.999000").unwrap(), 177_999_000);
        assert_eq!(from_string("177.999").unwrap(), 177_999_000);
        assert_eq!(from_string("27").unwrap(), 27_000_000);
        assert_eq!(from_string("0.000001").unwrap(), 1);
        assert_eq!(from_string(".5").unwrap(), 500_000);
        assert_eq!(from_string("1.0000000").unwrap(), 1_000_000);
    }

    #[test]
    fn test_from_string_rejects() {
        for bad in ["", "-1", "1.2.3", "abc", "1.0000001", ".", "1e6", "99999999999999999999"] {
            assert!(from_string(bad).is_err(), "{:?} should fail", bad);
        }
    }

    #[test]
    fn test_check_precision() {
        assert!(check_precision(1_000_000).is_ok());
        assert!(check_precision(1_001_000).is_ok());
        assert!(check_precision(0).is_ok());
        let err = check_precision(1_000_100).unwrap_err();
        assert!(err.to_string().contains("too many decimal places"));
    }
}
