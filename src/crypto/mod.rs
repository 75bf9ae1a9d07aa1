//! Cryptographic building blocks: hashing, secp256k1 keys, the deterministic
//! key chain and password-based encryption of wallet secrets.

pub mod deterministic;
pub mod encrypt;
pub mod hash;
pub mod keys;

pub use deterministic::{
    deterministic_key_pair_iterator, generate_deterministic_key_pair,
    generate_deterministic_key_pairs_seed, secp256k1_hash,
};
pub use encrypt::{Argon2XChaCha20Poly1305, CryptoType, ScryptChaCha20Poly1305, WalletCrypto};
pub use hash::{add_sha256, merkle_root, ripemd160, sha256, Sha256Hash};
pub use keys::{ecdh, pubkey_from_sig, sign_hash, verify_signature, PubKey, SecKey, Sig};
