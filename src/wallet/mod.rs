//! Deterministic wallets
//!
//! A wallet is an ordered list of [`Entry`] values generated from a seed,
//! plus a string metadata map that mirrors the node's wallet file format.
//! Entries are derived one after another through the deterministic key chain
//! and the last chain seed is kept in the metadata, so more addresses can be
//! generated later without recomputing the existing ones.
//!
//! ## Encryption
//!
//! Locking a wallet moves the seed, the last chain seed and every secret key
//! into an encrypted `secrets` blob, stored base64 encoded as the node does.
//! Addresses and public keys stay readable.
//! Lock and unlock build a complete new wallet value and swap it in only on
//! success, so a failed unlock leaves the wallet exactly as it was.
//!
//! ```rust,no_run
//! use lightweight_skycoin_libs::wallet::{Wallet, WalletOptions};
//! use lightweight_skycoin_libs::crypto::CryptoType;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut wallet = Wallet::new("test.wlt", WalletOptions::with_seed("my seed"))?;
//! let addresses = wallet.generate_addresses(2)?;
//!
//! wallet.lock(b"pwd", CryptoType::default())?;
//! let more = wallet.generate_addresses_with_password(1, b"pwd")?;
//! # Ok(())
//! # }
//! ```

pub mod balance;
pub mod builder;
pub mod readable;
pub mod spend;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::RngCore;
use tracing::{debug, warn};
use zeroize::{Zeroize, Zeroizing};

use crate::{
    crypto::{
        encrypt::{CryptoType, WalletCrypto},
        generate_deterministic_key_pairs_seed,
        hash::sha256,
        keys::{PubKey, SecKey},
    },
    data_structures::address::Address,
    errors::{SkyWalletError, SkyWalletResult},
    hex_utils::HexEncodable,
};

pub use balance::{balance, balances_by_address, scan_addresses};
pub use builder::{WalletBuildError, WalletBuilder};
pub use readable::{ReadableEntry, ReadableWallet};
pub use spend::{
    choose_spends, choose_spends_maximize_ux_outs, choose_spends_minimize_ux_outs, create_raw_tx,
    distribute_spend_hours, new_transaction, SendAmount, SpendHours, SpendStrategy,
};

pub const META_VERSION: &str = "version";
pub const META_FILENAME: &str = "filename";
pub const META_LABEL: &str = "label";
pub const META_TM: &str = "tm";
pub const META_TYPE: &str = "type";
pub const META_COIN: &str = "coin";
pub const META_ENCRYPTED: &str = "encrypted";
pub const META_CRYPTO_TYPE: &str = "cryptoType";
pub const META_SEED: &str = "seed";
pub const META_LAST_SEED: &str = "lastSeed";
pub const META_SECRETS: &str = "secrets";

pub const WALLET_VERSION: &str = "0.2";
pub const WALLET_TYPE_DETERMINISTIC: &str = "deterministic";
pub const COIN_SKYCOIN: &str = "skycoin";

/// One generated address with its keys
#[derive(Clone, PartialEq, Eq)]
pub struct Entry {
    pub address: Address,
    pub public: PubKey,
    /// Absent while the wallet is locked
    pub secret: Option<SecKey>,
}

impl Entry {
    /// Checks that the keys and address belong together
    pub fn verify(&self) -> SkyWalletResult<()> {
        self.address.verify(&self.public)?;
        if let Some(secret) = &self.secret {
            if PubKey::from_sec_key(secret)? != self.public {
                return Err(SkyWalletError::invalid_encoding(format!(
                    "secret key does not match public key for {}",
                    self.address
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("address", &self.address)
            .field("public", &self.public)
            .field("has_secret", &self.secret.is_some())
            .finish()
    }
}

/// Options for creating a new wallet
#[derive(Clone, Default)]
pub struct WalletOptions {
    pub label: String,
    pub seed: String,
    pub encrypt: bool,
    pub password: Vec<u8>,
    pub crypto: Option<Arc<dyn WalletCrypto>>,
    /// Addresses generated right after creation
    pub generate_n: u64,
}

impl WalletOptions {
    pub fn with_seed(seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            ..Default::default()
        }
    }
}

impl fmt::Debug for WalletOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletOptions")
            .field("label", &self.label)
            .field("encrypt", &self.encrypt)
            .field("generate_n", &self.generate_n)
            .finish()
    }
}

#[derive(Clone)]
pub struct Wallet {
    meta: BTreeMap<String, String>,
    entries: Vec<Entry>,
    crypto: Option<Arc<dyn WalletCrypto>>,
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("filename", &self.filename())
            .field("label", &self.label())
            .field("encrypted", &self.is_encrypted())
            .field("entries", &self.entries)
            .finish()
    }
}

impl Wallet {
    /// Create a deterministic wallet from a seed
    pub fn new(filename: impl Into<String>, options: WalletOptions) -> SkyWalletResult<Self> {
        if options.seed.is_empty() {
            return Err(SkyWalletError::invalid_argument("seed required"));
        }
        if !options.encrypt && !options.password.is_empty() {
            return Err(SkyWalletError::invalid_argument(
                "password provided for a wallet that is not being encrypted",
            ));
        }

        let tm = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        let mut meta = BTreeMap::new();
        meta.insert(META_FILENAME.to_string(), filename.into());
        meta.insert(META_VERSION.to_string(), WALLET_VERSION.to_string());
        meta.insert(META_LABEL.to_string(), options.label.clone());
        meta.insert(META_SEED.to_string(), options.seed.clone());
        meta.insert(META_LAST_SEED.to_string(), String::new());
        meta.insert(META_TM.to_string(), tm.to_string());
        meta.insert(META_TYPE.to_string(), WALLET_TYPE_DETERMINISTIC.to_string());
        meta.insert(META_COIN.to_string(), COIN_SKYCOIN.to_string());
        meta.insert(META_ENCRYPTED.to_string(), "false".to_string());
        meta.insert(META_CRYPTO_TYPE.to_string(), String::new());
        meta.insert(META_SECRETS.to_string(), String::new());

        let mut wallet = Wallet {
            meta,
            entries: Vec::new(),
            crypto: None,
        };

        if options.generate_n > 0 {
            wallet.generate_addresses(options.generate_n)?;
        }

        if options.encrypt {
            if options.password.is_empty() {
                return Err(SkyWalletError::MissingPassword);
            }
            let crypto = options
                .crypto
                .unwrap_or_else(|| Arc::from(CryptoType::default().crypto()));
            wallet.lock_with(&options.password, crypto)?;
        }

        Ok(wallet)
    }

    /// Rebuild a wallet from its metadata map and entries, as read from disk.
    /// An encrypted wallet keeps the cost parameters of its secrets blob.
    pub(crate) fn from_parts(meta: BTreeMap<String, String>, entries: Vec<Entry>) -> SkyWalletResult<Self> {
        let crypto = match meta.get(META_CRYPTO_TYPE).map(String::as_str) {
            Some(ct) if !ct.is_empty() => {
                let crypto_type = ct.parse::<CryptoType>()?;
                let blob = decode_secrets(meta.get(META_SECRETS).map(String::as_str).unwrap_or(""))?;
                Some(Arc::from(crypto_type.crypto_for(&blob)?))
            }
            _ => None,
        };
        let wallet = Wallet {
            meta,
            entries,
            crypto,
        };
        wallet.validate()?;
        Ok(wallet)
    }

    fn meta_str(&self, key: &str) -> &str {
        self.meta.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn meta(&self) -> &BTreeMap<String, String> {
        &self.meta
    }

    pub fn filename(&self) -> &str {
        self.meta_str(META_FILENAME)
    }

    pub fn set_filename(&mut self, filename: impl Into<String>) {
        self.meta.insert(META_FILENAME.to_string(), filename.into());
    }

    pub fn label(&self) -> &str {
        self.meta_str(META_LABEL)
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.meta.insert(META_LABEL.to_string(), label.into());
    }

    pub fn version(&self) -> &str {
        self.meta_str(META_VERSION)
    }

    pub fn coin(&self) -> &str {
        self.meta_str(META_COIN)
    }

    pub fn wallet_type(&self) -> &str {
        self.meta_str(META_TYPE)
    }

    pub fn seed(&self) -> &str {
        self.meta_str(META_SEED)
    }

    pub fn last_seed(&self) -> &str {
        self.meta_str(META_LAST_SEED)
    }

    pub fn secrets(&self) -> &str {
        self.meta_str(META_SECRETS)
    }

    pub fn is_encrypted(&self) -> bool {
        self.meta_str(META_ENCRYPTED) == "true"
    }

    pub fn crypto_type(&self) -> Option<CryptoType> {
        self.meta_str(META_CRYPTO_TYPE).parse().ok()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn addresses(&self) -> Vec<Address> {
        self.entries.iter().map(|e| e.address).collect()
    }

    pub fn entry(&self, address: &Address) -> Option<&Entry> {
        self.entries.iter().find(|e| &e.address == address)
    }

    /// Check the metadata invariants for the wallet's lock state
    pub fn validate(&self) -> SkyWalletResult<()> {
        let invalid = |msg: &str| SkyWalletError::invalid_argument(msg.to_string());

        if self.filename().is_empty() {
            return Err(invalid("filename not set"));
        }
        if self.wallet_type().is_empty() {
            return Err(invalid("type not set"));
        }
        if self.wallet_type() != WALLET_TYPE_DETERMINISTIC {
            return Err(invalid("wallet type invalid"));
        }
        if self.coin().is_empty() {
            return Err(invalid("coin field not set"));
        }
        if self.coin() != COIN_SKYCOIN {
            return Err(invalid("wallet coin type invalid"));
        }

        match self.meta_str(META_ENCRYPTED) {
            "true" => {
                if self.crypto_type().is_none() {
                    return Err(invalid("crypto type field not set"));
                }
                if self.secrets().is_empty() {
                    return Err(invalid("wallet is encrypted, but secrets field not set"));
                }
                if !self.seed().is_empty() {
                    return Err(invalid("seed should not be visible in encrypted wallets"));
                }
                if !self.last_seed().is_empty() {
                    return Err(invalid("lastSeed should not be visible in encrypted wallets"));
                }
                if self.entries.iter().any(|e| e.secret.is_some()) {
                    return Err(invalid("secret keys should not be visible in encrypted wallets"));
                }
            }
            "false" | "" => {
                if !self.secrets().is_empty() {
                    return Err(invalid("secrets should not be in unencrypted wallets"));
                }
                if self.seed().is_empty() {
                    return Err(invalid("seed missing in unencrypted wallet"));
                }
            }
            _ => return Err(invalid("encrypted field is not a valid bool")),
        }

        for entry in &self.entries {
            entry.verify()?;
        }
        Ok(())
    }

    /// Generate `n` more addresses, continuing the key chain
    pub fn generate_addresses(&mut self, n: u64) -> SkyWalletResult<Vec<Address>> {
        if n == 0 {
            return Err(SkyWalletError::invalid_argument(
                "address count must be positive",
            ));
        }
        if self.is_encrypted() {
            return Err(SkyWalletError::WalletLocked);
        }

        let chain_seed = Zeroizing::new(if self.last_seed().is_empty() {
            self.seed().as_bytes().to_vec()
        } else {
            hex::decode(self.last_seed())
                .map_err(|e| SkyWalletError::invalid_encoding(format!("invalid lastSeed: {}", e)))?
        });
        let count = usize::try_from(n)
            .map_err(|_| SkyWalletError::invalid_argument("address count too large"))?;

        let (next_seed, keys) = generate_deterministic_key_pairs_seed(&chain_seed, count)?;

        let mut addresses = Vec::with_capacity(keys.len());
        for (public, secret) in keys {
            let address = Address::from_pubkey(&public);
            addresses.push(address);
            self.entries.push(Entry {
                address,
                public,
                secret: Some(secret),
            });
        }
        self.meta
            .insert(META_LAST_SEED.to_string(), hex::encode(&next_seed));

        debug!(
            "Generated {} addresses for wallet {} ({} total)",
            addresses.len(),
            self.filename(),
            self.entries.len()
        );
        Ok(addresses)
    }

    /// Unlock, generate `n` addresses and lock again
    pub fn generate_addresses_with_password(
        &mut self,
        n: u64,
        password: &[u8],
    ) -> SkyWalletResult<Vec<Address>> {
        let mut generated = Vec::new();
        self.guard_update(password, |w| {
            generated = w.generate_addresses(n)?;
            Ok(())
        })?;
        Ok(generated)
    }

    /// Append an entry that was not derived from the seed
    pub fn add_entry(&mut self, entry: Entry) -> SkyWalletResult<()> {
        if self.is_encrypted() {
            return Err(SkyWalletError::WalletLocked);
        }
        if entry.secret.is_none() {
            return Err(SkyWalletError::invalid_argument(format!(
                "entry {} has no secret key",
                entry.address
            )));
        }
        entry.verify()?;
        if self.entry(&entry.address).is_some() {
            return Err(SkyWalletError::invalid_argument("duplicate address entry"));
        }

        debug!("Added address {} to wallet {}", entry.address, self.filename());
        self.entries.push(entry);
        Ok(())
    }

    /// Import a hex encoded secret key, returning its address
    pub fn add_private_key(&mut self, sec_hex: &str) -> SkyWalletResult<Address> {
        let secret = SecKey::from_hex(sec_hex.trim()).map_err(|_| {
            SkyWalletError::invalid_argument("invalid private key, must be a hex string of length 64")
        })?;
        let public = PubKey::from_sec_key(&secret)?;
        let address = Address::from_pubkey(&public);
        self.add_entry(Entry {
            address,
            public,
            secret: Some(secret),
        })?;
        Ok(address)
    }

    /// Unlock, import a secret key and lock again
    pub fn add_private_key_with_password(
        &mut self,
        sec_hex: &str,
        password: &[u8],
    ) -> SkyWalletResult<Address> {
        let mut added = None;
        self.guard_update(password, |w| {
            added = Some(w.add_private_key(sec_hex)?);
            Ok(())
        })?;
        added.ok_or_else(|| SkyWalletError::internal("private key was not added"))
    }

    /// Encrypt the wallet's secrets with the default implementation of `crypto_type`
    pub fn lock(&mut self, password: &[u8], crypto_type: CryptoType) -> SkyWalletResult<()> {
        self.lock_with(password, Arc::from(crypto_type.crypto()))
    }

    /// Encrypt the wallet's secrets with a specific crypto implementation
    pub fn lock_with(&mut self, password: &[u8], crypto: Arc<dyn WalletCrypto>) -> SkyWalletResult<()> {
        if password.is_empty() {
            return Err(SkyWalletError::MissingPassword);
        }
        if self.is_encrypted() {
            return Err(SkyWalletError::WalletLocked);
        }

        let mut secrets: BTreeMap<String, String> = BTreeMap::new();
        secrets.insert(META_SEED.to_string(), self.seed().to_string());
        secrets.insert(META_LAST_SEED.to_string(), self.last_seed().to_string());
        for entry in &self.entries {
            let secret = entry.secret.as_ref().ok_or_else(|| {
                SkyWalletError::internal(format!("missing secret key for {}", entry.address))
            })?;
            secrets.insert(entry.address.to_string(), secret.to_hex());
        }

        let plaintext = Zeroizing::new(serde_json::to_vec(&secrets)?);
        secrets.values_mut().for_each(|v| v.zeroize());
        let blob = crypto.encrypt(&plaintext, password)?;

        let mut locked = self.clone();
        locked.erase();
        locked
            .meta
            .insert(META_SECRETS.to_string(), BASE64.encode(blob));
        locked
            .meta
            .insert(META_CRYPTO_TYPE.to_string(), crypto.crypto_type().to_string());
        locked
            .meta
            .insert(META_ENCRYPTED.to_string(), "true".to_string());
        locked.crypto = Some(crypto);

        *self = locked;
        Ok(())
    }

    /// Decrypt the wallet in place
    pub fn unlock(&mut self, password: &[u8]) -> SkyWalletResult<()> {
        let unlocked = self.unlocked_copy(password)?;
        *self = unlocked;
        Ok(())
    }

    /// Decrypted copy of the wallet; `self` stays locked
    pub fn unlocked_copy(&self, password: &[u8]) -> SkyWalletResult<Wallet> {
        if !self.is_encrypted() {
            return Err(SkyWalletError::WalletNotEncrypted);
        }
        if password.is_empty() {
            return Err(SkyWalletError::MissingPassword);
        }

        let crypto = self.crypto_impl()?;
        let blob = decode_secrets(self.secrets())?;
        let plaintext = Zeroizing::new(crypto.decrypt(&blob, password).map_err(|e| {
            if matches!(e, SkyWalletError::InvalidPassword) {
                warn!("Invalid password for wallet {}", self.filename());
            }
            e
        })?);

        let mut secrets: BTreeMap<String, String> = serde_json::from_slice(&plaintext)?;
        let result = self.apply_secrets(&secrets);
        secrets.values_mut().for_each(|v| v.zeroize());
        result
    }

    fn apply_secrets(&self, secrets: &BTreeMap<String, String>) -> SkyWalletResult<Wallet> {
        let mut unlocked = self.clone();

        let seed = secrets
            .get(META_SEED)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| SkyWalletError::internal("seed missing from decrypted secrets"))?;
        unlocked.meta.insert(META_SEED.to_string(), seed.clone());
        unlocked.meta.insert(
            META_LAST_SEED.to_string(),
            secrets.get(META_LAST_SEED).cloned().unwrap_or_default(),
        );

        for entry in unlocked.entries.iter_mut() {
            let sec_hex = secrets.get(&entry.address.to_string()).ok_or_else(|| {
                SkyWalletError::internal(format!("secret key of {} missing from secrets", entry.address))
            })?;
            let secret = SecKey::from_hex(sec_hex)?;
            if PubKey::from_sec_key(&secret)? != entry.public {
                return Err(SkyWalletError::internal(format!(
                    "decrypted secret key does not match public key for {}",
                    entry.address
                )));
            }
            entry.secret = Some(secret);
        }

        unlocked.meta.insert(META_SECRETS.to_string(), String::new());
        unlocked.meta.insert(META_CRYPTO_TYPE.to_string(), String::new());
        unlocked
            .meta
            .insert(META_ENCRYPTED.to_string(), "false".to_string());
        Ok(unlocked)
    }

    fn crypto_impl(&self) -> SkyWalletResult<Arc<dyn WalletCrypto>> {
        if let Some(crypto) = &self.crypto {
            return Ok(Arc::clone(crypto));
        }
        let crypto_type = self
            .crypto_type()
            .ok_or_else(|| SkyWalletError::invalid_argument("crypto type field not set"))?;
        Ok(Arc::from(crypto_type.crypto()))
    }

    /// Run `f` against a decrypted copy of the wallet, then erase the copy
    pub fn guard_view<T, F>(&self, password: &[u8], f: F) -> SkyWalletResult<T>
    where
        F: FnOnce(&Wallet) -> SkyWalletResult<T>,
    {
        let mut unlocked = self.unlocked_copy(password)?;
        let result = f(&unlocked);
        unlocked.erase();
        result
    }

    /// Run `f` against a decrypted copy of the wallet and, if it succeeds,
    /// lock the copy again and swap it in
    pub fn guard_update<F>(&mut self, password: &[u8], f: F) -> SkyWalletResult<()>
    where
        F: FnOnce(&mut Wallet) -> SkyWalletResult<()>,
    {
        let crypto = self.crypto_impl()?;
        let mut unlocked = self.unlocked_copy(password)?;

        if let Err(e) = f(&mut unlocked) {
            unlocked.erase();
            return Err(e);
        }

        unlocked.lock_with(password, crypto)?;
        *self = unlocked;
        Ok(())
    }

    /// Clear the seed, last chain seed and every secret key
    pub fn erase(&mut self) {
        for key in [META_SEED, META_LAST_SEED] {
            if let Some(value) = self.meta.get_mut(key) {
                value.zeroize();
            }
        }
        for entry in self.entries.iter_mut() {
            entry.secret = None;
        }
    }
}

fn decode_secrets(secrets: &str) -> SkyWalletResult<Vec<u8>> {
    BASE64
        .decode(secrets)
        .map_err(|e| SkyWalletError::invalid_encoding(format!("invalid secrets: {}", e)))
}

/// Random 64-character hex seed
pub fn make_alphanumeric_seed() -> String {
    let mut entropy = Zeroizing::new([0u8; 64]);
    rand::thread_rng().fill_bytes(entropy.as_mut_slice());
    hex::encode(sha256(entropy.as_slice()))
}
