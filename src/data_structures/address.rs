//! Skycoin address handling
//!
//! An address is a version byte plus the 20-byte key
//! `RIPEMD160(SHA256(SHA256(pubkey)))`. The base58 form uses the Bitcoin
//! alphabet over `key || version || checksum`, where the checksum is the first
//! four bytes of `SHA256(key || version)`. Inside transactions the address is
//! encoded as `version || key`.

use std::fmt;
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    crypto::{
        hash::{ripemd160, sha256},
        keys::{PubKey, SecKey},
    },
    errors::{AddressError, SkyWalletResult},
};

/// The only address version accepted on the main network
pub const ADDRESS_VERSION: u8 = 0;

const KEY_LEN: usize = 20;
const ENCODED_LEN: usize = KEY_LEN + 1 + 4;

#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, BorshSerialize, BorshDeserialize)]
pub struct Address {
    pub version: u8,
    pub key: [u8; KEY_LEN],
}

impl Address {
    /// The all-zero address
    pub fn null() -> Self {
        Self::default()
    }

    pub fn is_null(&self) -> bool {
        self.version == 0 && self.key == [0u8; KEY_LEN]
    }

    pub fn from_pubkey(pubkey: &PubKey) -> Self {
        let key = ripemd160(&sha256(&sha256(&pubkey.0)));
        Address {
            version: ADDRESS_VERSION,
            key,
        }
    }

    pub fn from_sec_key(sec: &SecKey) -> SkyWalletResult<Self> {
        Ok(Self::from_pubkey(&PubKey::from_sec_key(sec)?))
    }

    /// Decode the 25-byte base58 payload
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AddressError> {
        if bytes.len() != ENCODED_LEN {
            return Err(AddressError::InvalidLength);
        }

        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&bytes[..KEY_LEN]);
        let address = Address {
            version: bytes[KEY_LEN],
            key,
        };

        if address.version != ADDRESS_VERSION {
            return Err(AddressError::InvalidVersion);
        }
        if address.checksum() != bytes[KEY_LEN + 1..] {
            return Err(AddressError::InvalidChecksum);
        }
        Ok(address)
    }

    /// The 25-byte payload that is base58 encoded
    pub fn to_bytes(&self) -> [u8; ENCODED_LEN] {
        let mut out = [0u8; ENCODED_LEN];
        out[..KEY_LEN].copy_from_slice(&self.key);
        out[KEY_LEN] = self.version;
        out[KEY_LEN + 1..].copy_from_slice(&self.checksum());
        out
    }

    pub fn checksum(&self) -> [u8; 4] {
        let mut body = [0u8; KEY_LEN + 1];
        body[..KEY_LEN].copy_from_slice(&self.key);
        body[KEY_LEN] = self.version;
        let digest = sha256(&body);
        [digest[0], digest[1], digest[2], digest[3]]
    }

    pub fn from_base58(s: &str) -> Result<Self, AddressError> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|_| AddressError::InvalidBase58)?;
        Self::from_bytes(&bytes)
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(self.to_bytes()).into_string()
    }

    /// Checks that `pubkey` hashes to this address
    pub fn verify(&self, pubkey: &PubKey) -> Result<(), AddressError> {
        if self.version != ADDRESS_VERSION {
            return Err(AddressError::InvalidVersion);
        }
        if Address::from_pubkey(pubkey).key != self.key {
            return Err(AddressError::InvalidPubKey);
        }
        Ok(())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_base58())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::from_base58(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as Deserialize>::deserialize(deserializer)?;
        Address::from_base58(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::deterministic::deterministic_key_pair_iterator;

    #[test]
    fn test_valid_address() {
        let addr: Address = "2Kg3eRXUhY6hrDZvNGB99DKahtrPDQ1W9vN".parse().unwrap();
        assert_eq!(addr.version, 0);
        assert_eq!(addr.to_string(), "2Kg3eRXUhY6hrDZvNGB99DKahtrPDQ1W9vN");
    }

    #[test]
    fn test_invalid_version_reported_before_checksum() {
        for bad in [
            "2KG9eRXUhx6hrDZvNGB99DKahtrPDQ1W9vn",
            // bitcoin address
            "1Dcb9gpaZpBKmjqjCsiBsP3sBW1md2kEM2",
        ] {
            let err = Address::from_base58(bad).unwrap_err();
            assert_eq!(err, AddressError::InvalidVersion, "{}", bad);
            assert_eq!(err.to_string(), "Invalid version");
        }
    }

    #[test]
    fn test_invalid_checksum() {
        let addr: Address = "2Kg3eRXUhY6hrDZvNGB99DKahtrPDQ1W9vN".parse().unwrap();
        let mut bytes = addr.to_bytes();
        bytes[24] ^= 0xff;
        assert_eq!(Address::from_bytes(&bytes), Err(AddressError::InvalidChecksum));
    }

    #[test]
    fn test_invalid_length_and_base58() {
        assert_eq!(Address::from_base58("2Kg3eRX"), Err(AddressError::InvalidLength));
        assert_eq!(Address::from_base58("0OIl"), Err(AddressError::InvalidBase58));
        assert_eq!(Address::from_base58(""), Err(AddressError::InvalidLength));
    }

    #[test]
    fn test_address_from_deterministic_key() {
        let (_, pubkey, sec) = deterministic_key_pair_iterator(b"tQ93w5Aqcunm9SGUfnmF4fJv").unwrap();
        let addr = Address::from_pubkey(&pubkey);
        assert_eq!(addr.to_string(), "DGs938umY6Xg4yyyarQg62FYUdvUSHjvhb");
        assert_eq!(Address::from_sec_key(&sec).unwrap(), addr);
        assert!(addr.verify(&pubkey).is_ok());
    }

    #[test]
    fn test_verify_rejects_other_pubkey() {
        let (_, pubkey, _) = deterministic_key_pair_iterator(b"one").unwrap();
        let (_, other, _) = deterministic_key_pair_iterator(b"two").unwrap();
        let addr = Address::from_pubkey(&pubkey);
        assert_eq!(addr.verify(&other), Err(AddressError::InvalidPubKey));
    }

    #[test]
    fn test_wire_encoding_is_version_then_key() {
        let addr: Address = "2Kg3eRXUhY6hrDZvNGB99DKahtrPDQ1W9vN".parse().unwrap();
        let encoded = borsh::to_vec(&addr).unwrap();
        assert_eq!(encoded.len(), 21);
        assert_eq!(encoded[0], addr.version);
        assert_eq!(&encoded[1..], &addr.key);
    }

    #[test]
    fn test_serde_as_base58_string() {
        let addr: Address = "2Kg3eRXUhY6hrDZvNGB99DKahtrPDQ1W9vN".parse().unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"2Kg3eRXUhY6hrDZvNGB99DKahtrPDQ1W9vN\"");
        assert!(serde_json::from_str::<Address>("\"1Dcb9gpaZpBKmjqjCsiBsP3sBW1md2kEM2\"").is_err());
    }
}
