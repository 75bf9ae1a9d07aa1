//! SHA256 and RIPEMD160 helpers

use borsh::{BorshDeserialize, BorshSerialize};
use digest::Digest;
use ripemd::Ripemd160;
use sha2::Sha256;

use crate::impl_hex_newtype;

/// A 32-byte SHA256 digest
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, BorshSerialize, BorshDeserialize)]
pub struct Sha256Hash(pub [u8; 32]);

impl_hex_newtype!(Sha256Hash, 32, "SHA256");

impl std::fmt::Debug for Sha256Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sha256Hash({})", self)
    }
}

impl Sha256Hash {
    pub fn zero() -> Self {
        Sha256Hash([0u8; 32])
    }

    /// Hash arbitrary bytes
    pub fn digest(data: &[u8]) -> Self {
        Sha256Hash(sha256(data))
    }
}

/// SHA256 of `data`
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// SHA256 over the concatenation of two hashes
pub fn add_sha256(a: &Sha256Hash, b: &Sha256Hash) -> Sha256Hash {
    let mut hasher = Sha256::new();
    hasher.update(a.0);
    hasher.update(b.0);
    Sha256Hash(hasher.finalize().into())
}

/// Merkle root of `hashes`. The leaves are padded with zero hashes up to the
/// next power of two and each level pairs with [`add_sha256`]. A single leaf
/// is its own root; no leaves give the zero hash.
pub fn merkle_root(hashes: &[Sha256Hash]) -> Sha256Hash {
    if hashes.is_empty() {
        return Sha256Hash::zero();
    }
    let mut level = hashes.to_vec();
    level.resize(hashes.len().next_power_of_two(), Sha256Hash::zero());
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| add_sha256(&pair[0], &pair[1]))
            .collect();
    }
    level[0]
}

pub fn ripemd160(data: &[u8]) -> [u8; 20] {
    let mut hasher = Ripemd160::new();
    hasher.update(data);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hex_utils::HexEncodable;

    #[test]
    fn test_sha256_empty() {
        assert_eq!(
            hex::encode(sha256(b"")),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_ripemd160_empty() {
        assert_eq!(
            hex::encode(ripemd160(b"")),
            "9c1185a5c5e9fc54612808977ee8f548b2258d31"
        );
    }

    #[test]
    fn test_add_sha256_is_concatenation() {
        let a = Sha256Hash::digest(b"a");
        let b = Sha256Hash::digest(b"b");
        let mut joined = a.0.to_vec();
        joined.extend_from_slice(&b.0);
        assert_eq!(add_sha256(&a, &b), Sha256Hash::digest(&joined));
    }

    #[test]
    fn test_merkle_root() {
        let a = Sha256Hash::digest(b"a");
        let b = Sha256Hash::digest(b"b");
        let c = Sha256Hash::digest(b"c");
        let zero = Sha256Hash::zero();

        assert!(merkle_root(&[]).is_zero());
        assert_eq!(merkle_root(&[a]), a);
        assert_eq!(merkle_root(&[a, b]), add_sha256(&a, &b));
        assert_eq!(
            merkle_root(&[a, b, c]),
            add_sha256(&add_sha256(&a, &b), &add_sha256(&c, &zero))
        );
        // Five leaves pad to eight, so the right half holds hashes of zeros
        let d = Sha256Hash::digest(b"d");
        let e = Sha256Hash::digest(b"e");
        let left = add_sha256(&add_sha256(&a, &b), &add_sha256(&c, &d));
        let right = add_sha256(&add_sha256(&e, &zero), &add_sha256(&zero, &zero));
        assert_eq!(merkle_root(&[a, b, c, d, e]), add_sha256(&left, &right));
    }

    #[test]
    fn test_hash_hex_and_serde() {
        let h = Sha256Hash::digest(b"skycoin");
        let parsed = Sha256Hash::from_hex(&h.to_hex()).unwrap();
        assert_eq!(parsed, h);

        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, format!("\"{}\"", h));
        let back: Sha256Hash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
    }

    #[test]
    fn test_zero_hash() {
        assert!(Sha256Hash::zero().is_zero());
        assert!(!Sha256Hash::digest(b"").is_zero());
    }
}
