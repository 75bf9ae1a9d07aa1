//! Deterministic key chain used by seed-based wallets
//!
//! Each key in the chain is derived from the previous chain seed, so keys can
//! be generated incrementally as long as the last chain seed is remembered.
//! Knowing one secret key does not reveal the following ones: the chain seed
//! goes through an ECDH step before the next key is derived.

use crate::{
    crypto::{
        hash::sha256,
        keys::{ecdh, PubKey, SecKey},
    },
    errors::{SkyWalletError, SkyWalletResult},
};

/// Hash `seed` repeatedly until it is a valid secret key
pub fn generate_deterministic_key_pair(seed: &[u8; 32]) -> SkyWalletResult<(PubKey, SecKey)> {
    let mut current = *seed;
    loop {
        current = sha256(&current);
        if SecKey::is_valid(&current) {
            let sec = SecKey::from_bytes(current)?;
            let pubkey = PubKey::from_sec_key(&sec)?;
            return Ok((pubkey, sec));
        }
    }
}

/// Secret-dependent hash used to advance the chain seed
pub fn secp256k1_hash(seed: &[u8]) -> SkyWalletResult<[u8; 32]> {
    let hash = sha256(seed);
    let (_, sec) = generate_deterministic_key_pair(&hash)?;
    let (pubkey, _) = generate_deterministic_key_pair(&sha256(&hash))?;
    let shared = ecdh(&pubkey, &sec)?;

    let mut buf = Vec::with_capacity(32 + shared.len());
    buf.extend_from_slice(&hash);
    buf.extend_from_slice(&shared);
    Ok(sha256(&buf))
}

/// One step of the chain: returns the next chain seed and the key pair for it
pub fn deterministic_key_pair_iterator(seed: &[u8]) -> SkyWalletResult<([u8; 32], PubKey, SecKey)> {
    let next_seed = secp256k1_hash(seed)?;

    let mut buf = Vec::with_capacity(seed.len() + 32);
    buf.extend_from_slice(seed);
    buf.extend_from_slice(&next_seed);
    let (pubkey, sec) = generate_deterministic_key_pair(&sha256(&buf))?;

    Ok((next_seed, pubkey, sec))
}

/// Generate `n` key pairs, returning the last chain seed alongside them
pub fn generate_deterministic_key_pairs_seed(
    seed: &[u8],
    n: usize,
) -> SkyWalletResult<(Vec<u8>, Vec<(PubKey, SecKey)>)> {
    if seed.is_empty() {
        return Err(SkyWalletError::invalid_argument("seed is empty"));
    }

    let mut keys = Vec::with_capacity(n);
    let mut current = seed.to_vec();
    for _ in 0..n {
        let (next, pubkey, sec) = deterministic_key_pair_iterator(&current)?;
        keys.push((pubkey, sec));
        current = next.to_vec();
    }
    Ok((current, keys))
}
