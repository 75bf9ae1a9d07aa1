//! Password-based encryption of wallet secrets
//!
//! Wallets never encrypt key material themselves; they hand the serialized
//! secrets to a [`WalletCrypto`] implementation chosen by [`CryptoType`].
//! The encrypted blob is self-describing: it records the key-derivation
//! parameters so a wallet locked with one cost setting can always be unlocked.
//!
//! Blob layout for [`Argon2XChaCha20Poly1305`]:
//!
//! ```text
//! m_cost u32 LE | t_cost u32 LE | p_cost u32 LE | salt [16] | nonce [24] | ciphertext + tag
//! ```
//!
//! Blob layout for [`ScryptChaCha20Poly1305`], the scheme node wallets use:
//!
//! ```text
//! meta_len u16 LE | meta JSON | ciphertext + tag
//! ```
//!
//! The meta JSON holds `n`, `r`, `p`, `keyLen` and the base64 `salt` and
//! `nonce`. The length prefix and meta together are the AEAD associated data.

use std::fmt;
use std::str::FromStr;

use argon2::{Algorithm, Argon2, Params, Version};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Key, Nonce, XChaCha20Poly1305, XNonce,
};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::errors::{SkyWalletError, SkyWalletResult};

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 24;
const HEADER_LEN: usize = 12 + SALT_LEN + NONCE_LEN;
/// Upper bound on the memory cost accepted from a blob header (1 GiB)
const MAX_M_COST: u32 = 1 << 20;

const SCRYPT_SALT_LEN: usize = 32;
const SCRYPT_NONCE_LEN: usize = 12;
const SCRYPT_KEY_LEN: usize = 32;
/// Largest scrypt work factor accepted from a blob header, as log2(N)
const MAX_SCRYPT_LOG_N: u8 = 20;
const MAX_SCRYPT_R: u32 = 32;

/// Symmetric encryption capability used by wallets
pub trait WalletCrypto: Send + Sync {
    fn crypto_type(&self) -> CryptoType;
    fn encrypt(&self, data: &[u8], password: &[u8]) -> SkyWalletResult<Vec<u8>>;
    fn decrypt(&self, data: &[u8], password: &[u8]) -> SkyWalletResult<Vec<u8>>;
}

/// Encryption schemes a wallet may be locked with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CryptoType {
    #[default]
    #[serde(rename = "argon2id-xchacha20poly1305")]
    Argon2XChaCha20Poly1305,
    #[serde(rename = "scrypt-chacha20poly1305")]
    ScryptChaCha20Poly1305,
}

impl CryptoType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CryptoType::Argon2XChaCha20Poly1305 => "argon2id-xchacha20poly1305",
            CryptoType::ScryptChaCha20Poly1305 => "scrypt-chacha20poly1305",
        }
    }

    /// Default-cost implementation of this scheme
    pub fn crypto(&self) -> Box<dyn WalletCrypto> {
        match self {
            CryptoType::Argon2XChaCha20Poly1305 => Box::<Argon2XChaCha20Poly1305>::default(),
            CryptoType::ScryptChaCha20Poly1305 => Box::<ScryptChaCha20Poly1305>::default(),
        }
    }

    /// Implementation using the cost parameters recorded in `blob`, so that
    /// re-locking keeps them; the defaults when `blob` is empty
    pub fn crypto_for(&self, blob: &[u8]) -> SkyWalletResult<Box<dyn WalletCrypto>> {
        if blob.is_empty() {
            return Ok(self.crypto());
        }
        Ok(match self {
            CryptoType::Argon2XChaCha20Poly1305 => {
                Box::new(Argon2XChaCha20Poly1305::read_header(blob)?.0)
            }
            CryptoType::ScryptChaCha20Poly1305 => {
                Box::new(ScryptChaCha20Poly1305::read_header(blob)?.0)
            }
        })
    }
}

impl fmt::Display for CryptoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CryptoType {
    type Err = SkyWalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "argon2id-xchacha20poly1305" => Ok(CryptoType::Argon2XChaCha20Poly1305),
            "scrypt-chacha20poly1305" => Ok(CryptoType::ScryptChaCha20Poly1305),
            other => Err(SkyWalletError::invalid_argument(format!(
                "unknown crypto type: {}",
                other
            ))),
        }
    }
}

/// Argon2id key derivation with XChaCha20-Poly1305 AEAD
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argon2XChaCha20Poly1305 {
    m_cost: u32,
    t_cost: u32,
    p_cost: u32,
}

impl Default for Argon2XChaCha20Poly1305 {
    fn default() -> Self {
        Self {
            m_cost: Params::DEFAULT_M_COST,
            t_cost: Params::DEFAULT_T_COST,
            p_cost: Params::DEFAULT_P_COST,
        }
    }
}

impl Argon2XChaCha20Poly1305 {
    /// Custom Argon2 cost parameters (memory in KiB, iterations, lanes)
    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> SkyWalletResult<Self> {
        Params::new(m_cost, t_cost, p_cost, Some(32))
            .map_err(|e| SkyWalletError::invalid_argument(format!("argon2 params: {}", e)))?;
        Ok(Self {
            m_cost,
            t_cost,
            p_cost,
        })
    }

    /// Cost parameters, salt and nonce from the front of a blob
    fn read_header(data: &[u8]) -> SkyWalletResult<(Self, &[u8], &[u8])> {
        if data.len() < HEADER_LEN {
            return Err(SkyWalletError::truncated("encrypted data too short"));
        }
        let read_u32 = |offset: usize| {
            let mut buf = [0u8; 4];
            buf.copy_from_slice(&data[offset..offset + 4]);
            u32::from_le_bytes(buf)
        };
        let (m_cost, t_cost, p_cost) = (read_u32(0), read_u32(4), read_u32(8));
        if m_cost > MAX_M_COST {
            return Err(SkyWalletError::invalid_encoding("argon2 memory cost too large"));
        }
        Params::new(m_cost, t_cost, p_cost, Some(32))
            .map_err(|e| SkyWalletError::invalid_encoding(format!("argon2 params: {}", e)))?;

        let params = Self {
            m_cost,
            t_cost,
            p_cost,
        };
        Ok((params, &data[12..12 + SALT_LEN], &data[12 + SALT_LEN..HEADER_LEN]))
    }

    fn derive_key(
        m_cost: u32,
        t_cost: u32,
        p_cost: u32,
        password: &[u8],
        salt: &[u8],
    ) -> SkyWalletResult<Zeroizing<[u8; 32]>> {
        let params = Params::new(m_cost, t_cost, p_cost, Some(32))
            .map_err(|e| SkyWalletError::invalid_encoding(format!("argon2 params: {}", e)))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut key = Zeroizing::new([0u8; 32]);
        argon2
            .hash_password_into(password, salt, &mut key[..])
            .map_err(|e| SkyWalletError::internal(format!("key derivation failed: {}", e)))?;
        Ok(key)
    }
}

impl WalletCrypto for Argon2XChaCha20Poly1305 {
    fn crypto_type(&self) -> CryptoType {
        CryptoType::Argon2XChaCha20Poly1305
    }

    fn encrypt(&self, data: &[u8], password: &[u8]) -> SkyWalletResult<Vec<u8>> {
        if password.is_empty() {
            return Err(SkyWalletError::MissingPassword);
        }

        let mut salt = [0u8; SALT_LEN];
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut salt);
        OsRng.fill_bytes(&mut nonce);

        let key = Self::derive_key(self.m_cost, self.t_cost, self.p_cost, password, &salt)?;
        let cipher = XChaCha20Poly1305::new(Key::from_slice(&key[..]));
        let ciphertext = cipher
            .encrypt(XNonce::from_slice(&nonce), data)
            .map_err(|_| SkyWalletError::internal("encryption failed"))?;

        let mut out = Vec::with_capacity(HEADER_LEN + ciphertext.len());
        out.extend_from_slice(&self.m_cost.to_le_bytes());
        out.extend_from_slice(&self.t_cost.to_le_bytes());
        out.extend_from_slice(&self.p_cost.to_le_bytes());
        out.extend_from_slice(&salt);
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn decrypt(&self, data: &[u8], password: &[u8]) -> SkyWalletResult<Vec<u8>> {
        if password.is_empty() {
            return Err(SkyWalletError::MissingPassword);
        }
        let (params, salt, nonce) = Self::read_header(data)?;
        let key = Self::derive_key(params.m_cost, params.t_cost, params.p_cost, password, salt)?;
        let cipher = XChaCha20Poly1305::new(Key::from_slice(&key[..]));
        cipher
            .decrypt(XNonce::from_slice(nonce), &data[HEADER_LEN..])
            .map_err(|_| SkyWalletError::InvalidPassword)
    }
}

/// Scrypt key derivation with ChaCha20-Poly1305 AEAD, as written by the node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScryptChaCha20Poly1305 {
    log_n: u8,
    r: u32,
    p: u32,
}

impl Default for ScryptChaCha20Poly1305 {
    fn default() -> Self {
        Self {
            log_n: 20,
            r: 8,
            p: 1,
        }
    }
}

/// Parameters stored in front of a scrypt blob
#[derive(Debug, Serialize, Deserialize)]
struct ScryptMeta {
    n: u64,
    r: u32,
    p: u32,
    #[serde(rename = "keyLen")]
    key_len: usize,
    salt: String,
    nonce: String,
}

struct ScryptHeader {
    len: usize,
    salt: Vec<u8>,
    nonce: Vec<u8>,
}

impl ScryptChaCha20Poly1305 {
    /// Custom scrypt cost parameters; `n` must be a power of two
    pub fn with_params(n: u64, r: u32, p: u32) -> SkyWalletResult<Self> {
        let log_n = Self::log_n(n).ok_or_else(|| {
            SkyWalletError::invalid_argument(format!("scrypt N must be a power of two above 1, got {}", n))
        })?;
        scrypt::Params::new(log_n, r, p, SCRYPT_KEY_LEN)
            .map_err(|e| SkyWalletError::invalid_argument(format!("scrypt params: {}", e)))?;
        Ok(Self { log_n, r, p })
    }

    fn log_n(n: u64) -> Option<u8> {
        (n >= 2 && n.is_power_of_two()).then(|| n.trailing_zeros() as u8)
    }

    /// Cost parameters and the decoded meta from the front of a blob
    fn read_header(data: &[u8]) -> SkyWalletResult<(Self, ScryptHeader)> {
        if data.len() < 2 {
            return Err(SkyWalletError::truncated("encrypted data too short"));
        }
        let meta_len = u16::from_le_bytes([data[0], data[1]]) as usize;
        let len = 2 + meta_len;
        if data.len() < len {
            return Err(SkyWalletError::truncated("scrypt metadata truncated"));
        }

        let meta: ScryptMeta = serde_json::from_slice(&data[2..len])?;
        let log_n = Self::log_n(meta.n).ok_or_else(|| {
            SkyWalletError::invalid_encoding(format!("scrypt N is not a power of two: {}", meta.n))
        })?;
        if log_n > MAX_SCRYPT_LOG_N || meta.r > MAX_SCRYPT_R {
            return Err(SkyWalletError::invalid_encoding("scrypt cost too large"));
        }
        if meta.key_len != SCRYPT_KEY_LEN {
            return Err(SkyWalletError::invalid_encoding(format!(
                "unsupported scrypt key length {}",
                meta.key_len
            )));
        }
        scrypt::Params::new(log_n, meta.r, meta.p, SCRYPT_KEY_LEN)
            .map_err(|e| SkyWalletError::invalid_encoding(format!("scrypt params: {}", e)))?;

        let salt = BASE64
            .decode(&meta.salt)
            .map_err(|e| SkyWalletError::invalid_encoding(format!("scrypt salt: {}", e)))?;
        let nonce = BASE64
            .decode(&meta.nonce)
            .map_err(|e| SkyWalletError::invalid_encoding(format!("scrypt nonce: {}", e)))?;
        if nonce.len() != SCRYPT_NONCE_LEN {
            return Err(SkyWalletError::invalid_encoding("scrypt nonce must be 12 bytes"));
        }

        let params = Self {
            log_n,
            r: meta.r,
            p: meta.p,
        };
        Ok((params, ScryptHeader { len, salt, nonce }))
    }

    fn derive_key(
        log_n: u8,
        r: u32,
        p: u32,
        password: &[u8],
        salt: &[u8],
    ) -> SkyWalletResult<Zeroizing<[u8; SCRYPT_KEY_LEN]>> {
        let params = scrypt::Params::new(log_n, r, p, SCRYPT_KEY_LEN)
            .map_err(|e| SkyWalletError::invalid_encoding(format!("scrypt params: {}", e)))?;
        let mut key = Zeroizing::new([0u8; SCRYPT_KEY_LEN]);
        scrypt::scrypt(password, salt, &params, &mut key[..])
            .map_err(|e| SkyWalletError::internal(format!("key derivation failed: {}", e)))?;
        Ok(key)
    }
}

impl WalletCrypto for ScryptChaCha20Poly1305 {
    fn crypto_type(&self) -> CryptoType {
        CryptoType::ScryptChaCha20Poly1305
    }

    fn encrypt(&self, data: &[u8], password: &[u8]) -> SkyWalletResult<Vec<u8>> {
        if password.is_empty() {
            return Err(SkyWalletError::MissingPassword);
        }

        let mut salt = [0u8; SCRYPT_SALT_LEN];
        let mut nonce = [0u8; SCRYPT_NONCE_LEN];
        OsRng.fill_bytes(&mut salt);
        OsRng.fill_bytes(&mut nonce);

        let meta = serde_json::to_vec(&ScryptMeta {
            n: 1u64 << self.log_n,
            r: self.r,
            p: self.p,
            key_len: SCRYPT_KEY_LEN,
            salt: BASE64.encode(salt),
            nonce: BASE64.encode(nonce),
        })?;
        let meta_len = u16::try_from(meta.len())
            .map_err(|_| SkyWalletError::internal("scrypt metadata too long"))?;

        let mut out = Vec::with_capacity(2 + meta.len() + data.len() + 16);
        out.extend_from_slice(&meta_len.to_le_bytes());
        out.extend_from_slice(&meta);

        let key = Self::derive_key(self.log_n, self.r, self.p, password, &salt)?;
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&key[..]));
        let ciphertext = cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: data,
                    aad: &out,
                },
            )
            .map_err(|_| SkyWalletError::internal("encryption failed"))?;
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn decrypt(&self, data: &[u8], password: &[u8]) -> SkyWalletResult<Vec<u8>> {
        if password.is_empty() {
            return Err(SkyWalletError::MissingPassword);
        }
        let (params, header) = Self::read_header(data)?;
        let header_len = header.len;
        let key = Self::derive_key(params.log_n, params.r, params.p, password, &header.salt)?;
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&key[..]));
        cipher
            .decrypt(
                Nonce::from_slice(&header.nonce),
                Payload {
                    msg: &data[header_len..],
                    aad: &data[..header_len],
                },
            )
            .map_err(|_| SkyWalletError::InvalidPassword)
    }
}
