//! secp256k1 key and signature types
//!
//! Public keys are 33-byte compressed points, secret keys 32-byte scalars and
//! signatures 65-byte compact recoverable signatures (`r || s || recovery id`).
//! Signature verification recovers the signer's public key and compares the
//! derived address, which is how the node authorises spending an output.

use borsh::{BorshDeserialize, BorshSerialize};
use lazy_static::lazy_static;
use secp256k1::{
    ecdsa::{RecoverableSignature, RecoveryId},
    All, Message, PublicKey, Scalar, Secp256k1, SecretKey,
};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{
    crypto::hash::Sha256Hash,
    errors::{SkyWalletError, SkyWalletResult},
    hex_utils::{decode_fixed, HexEncodable},
    impl_hex_newtype,
};

lazy_static! {
    static ref SECP: Secp256k1<All> = Secp256k1::new();
}

/// Compressed secp256k1 public key
#[derive(Clone, Copy, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub struct PubKey(pub [u8; 33]);

impl_hex_newtype!(PubKey, 33, "public key");

impl std::fmt::Debug for PubKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PubKey({})", self)
    }
}

impl PubKey {
    /// Derive the public key for a secret key
    pub fn from_sec_key(sec: &SecKey) -> SkyWalletResult<Self> {
        let sk = sec.to_secp()?;
        Ok(PubKey(PublicKey::from_secret_key(&SECP, &sk).serialize()))
    }

    /// Checks that the bytes are a valid point on the curve
    pub fn verify(&self) -> SkyWalletResult<()> {
        self.to_secp().map(|_| ())
    }

    fn to_secp(self) -> SkyWalletResult<PublicKey> {
        PublicKey::from_slice(&self.0)
            .map_err(|e| SkyWalletError::invalid_encoding(format!("invalid public key: {}", e)))
    }
}

/// secp256k1 secret key, cleared from memory when dropped
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecKey([u8; 32]);

impl SecKey {
    /// Accepts only scalars in `1..n`
    pub fn from_bytes(bytes: [u8; 32]) -> SkyWalletResult<Self> {
        SecretKey::from_slice(&bytes)
            .map_err(|_| SkyWalletError::invalid_encoding("invalid secret key"))?;
        Ok(SecKey(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_valid(bytes: &[u8; 32]) -> bool {
        SecretKey::from_slice(bytes).is_ok()
    }

    fn to_secp(&self) -> SkyWalletResult<SecretKey> {
        SecretKey::from_slice(&self.0)
            .map_err(|_| SkyWalletError::invalid_encoding("invalid secret key"))
    }
}

impl HexEncodable for SecKey {
    fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    fn from_hex(hex_str: &str) -> SkyWalletResult<Self> {
        let mut bytes = decode_fixed::<32>(hex_str, "secret key")?;
        let key = SecKey::from_bytes(bytes);
        bytes.zeroize();
        key
    }
}

impl std::fmt::Debug for SecKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecKey(<redacted>)")
    }
}

/// Compact recoverable ECDSA signature
#[derive(Clone, Copy, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub struct Sig(pub [u8; 65]);

impl_hex_newtype!(Sig, 65, "signature");

impl std::fmt::Debug for Sig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sig({})", self)
    }
}

/// Sign a 32-byte hash
pub fn sign_hash(hash: &Sha256Hash, sec: &SecKey) -> SkyWalletResult<Sig> {
    let sk = sec.to_secp()?;
    let msg = Message::from_digest_slice(&hash.0)
        .map_err(|e| SkyWalletError::internal(format!("invalid message: {}", e)))?;
    let (rec_id, compact) = SECP
        .sign_ecdsa_recoverable(&msg, &sk)
        .serialize_compact();

    let mut out = [0u8; 65];
    out[..64].copy_from_slice(&compact);
    out[64] = rec_id.to_i32() as u8;
    Ok(Sig(out))
}

/// Recover the public key that produced `sig` over `hash`
pub fn pubkey_from_sig(sig: &Sig, hash: &Sha256Hash) -> SkyWalletResult<PubKey> {
    let rec_id = RecoveryId::from_i32(i32::from(sig.0[64]))
        .map_err(|_| SkyWalletError::invalid_encoding("invalid signature recovery id"))?;
    let recoverable = RecoverableSignature::from_compact(&sig.0[..64], rec_id)
        .map_err(|_| SkyWalletError::invalid_encoding("invalid signature"))?;
    let msg = Message::from_digest_slice(&hash.0)
        .map_err(|e| SkyWalletError::internal(format!("invalid message: {}", e)))?;
    let pubkey = SECP
        .recover_ecdsa(&msg, &recoverable)
        .map_err(|_| SkyWalletError::invalid_encoding("signature recovery failed"))?;
    Ok(PubKey(pubkey.serialize()))
}

/// Verify that `sig` over `hash` was produced by the owner of `pubkey`
pub fn verify_signature(pubkey: &PubKey, sig: &Sig, hash: &Sha256Hash) -> SkyWalletResult<()> {
    let recovered = pubkey_from_sig(sig, hash)?;
    if &recovered != pubkey {
        return Err(SkyWalletError::invalid_encoding(
            "signature not valid for public key",
        ));
    }
    Ok(())
}

/// Compressed shared point `pub * sec`
pub fn ecdh(pubkey: &PubKey, sec: &SecKey) -> SkyWalletResult<[u8; 33]> {
    let point = pubkey.to_secp()?;
    let scalar = Scalar::from_be_bytes(sec.0)
        .map_err(|_| SkyWalletError::invalid_encoding("secret key out of range"))?;
    let shared = point
        .mul_tweak(&SECP, &scalar)
        .map_err(|e| SkyWalletError::internal(format!("ecdh failed: {}", e)))?;
    Ok(shared.serialize())
}
