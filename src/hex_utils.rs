//! Hex helpers shared by the fixed-width byte types
//!
//! Hashes, keys and signatures all travel as lowercase hex strings in the
//! node's JSON documents. [`impl_hex_newtype!`] gives a `[u8; N]` newtype the
//! matching `Display`, `FromStr` and serde impls.

use crate::errors::{SkyWalletError, SkyWalletResult};

/// Types that round-trip through a hex string
pub trait HexEncodable: Sized {
    fn to_hex(&self) -> String;
    fn from_hex(hex: &str) -> SkyWalletResult<Self>;
}

/// Decode a hex string into exactly `N` bytes
pub fn decode_fixed<const N: usize>(hex_str: &str, what: &str) -> SkyWalletResult<[u8; N]> {
    let bytes = hex::decode(hex_str)?;
    if bytes.len() != N {
        return Err(SkyWalletError::invalid_encoding(format!(
            "invalid {} length: expected {} bytes, got {}",
            what,
            N,
            bytes.len()
        )));
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes);
    Ok(out)
}

#[macro_export]
#[doc(hidden)]
macro_rules! impl_hex_newtype {
    ($name:ident, $len:expr, $what:expr) => {
        impl $name {
            pub const LEN: usize = $len;

            pub fn from_bytes(bytes: [u8; $len]) -> Self {
                $name(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            pub fn is_zero(&self) -> bool {
                self.0.iter().all(|b| *b == 0)
            }
        }

        impl $crate::hex_utils::HexEncodable for $name {
            fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            fn from_hex(hex_str: &str) -> $crate::errors::SkyWalletResult<Self> {
                $crate::hex_utils::decode_fixed::<$len>(hex_str, $what).map($name)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::errors::SkyWalletError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <$name as $crate::hex_utils::HexEncodable>::from_hex(s)
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&hex::encode(self.0))
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = <String as serde::Deserialize>::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}
