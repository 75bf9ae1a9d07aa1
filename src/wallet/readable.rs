//! JSON wallet files
//!
//! The on-disk layout matches the node's `.wlt` files:
//!
//! ```json
//! {
//!     "meta": { "coin": "skycoin", "filename": "test.wlt", ... },
//!     "entries": [
//!         { "address": "...", "public_key": "...", "secret_key": "..." }
//!     ]
//! }
//! ```
//!
//! Secret keys are written as empty strings while the wallet is locked.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroize;

use crate::{
    crypto::keys::{PubKey, SecKey},
    data_structures::address::Address,
    errors::{SkyWalletError, SkyWalletResult},
    hex_utils::HexEncodable,
    wallet::{Entry, Wallet},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadableEntry {
    pub address: String,
    pub public_key: String,
    pub secret_key: String,
}

impl Drop for ReadableEntry {
    fn drop(&mut self) {
        self.secret_key.zeroize();
    }
}

impl From<&Entry> for ReadableEntry {
    fn from(entry: &Entry) -> Self {
        ReadableEntry {
            address: entry.address.to_string(),
            public_key: entry.public.to_hex(),
            secret_key: entry.secret.as_ref().map(|s| s.to_hex()).unwrap_or_default(),
        }
    }
}

impl ReadableEntry {
    pub fn to_entry(&self) -> SkyWalletResult<Entry> {
        let address: Address = self.address.parse()?;
        let public = PubKey::from_hex(&self.public_key)?;
        let secret = if self.secret_key.is_empty() {
            None
        } else {
            Some(SecKey::from_hex(&self.secret_key)?)
        };

        let entry = Entry {
            address,
            public,
            secret,
        };
        entry.verify()?;
        Ok(entry)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadableWallet {
    pub meta: BTreeMap<String, String>,
    pub entries: Vec<ReadableEntry>,
}

impl From<&Wallet> for ReadableWallet {
    fn from(wallet: &Wallet) -> Self {
        ReadableWallet {
            meta: wallet.meta().clone(),
            entries: wallet.entries().iter().map(ReadableEntry::from).collect(),
        }
    }
}

impl ReadableWallet {
    pub fn to_wallet(&self) -> SkyWalletResult<Wallet> {
        let entries = self
            .entries
            .iter()
            .map(ReadableEntry::to_entry)
            .collect::<SkyWalletResult<Vec<_>>>()?;
        Wallet::from_parts(self.meta.clone(), entries)
    }

    pub fn from_json(json: &str) -> SkyWalletResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// JSON with four-space indentation, as the node writes it
    pub fn to_json(&self) -> SkyWalletResult<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        String::from_utf8(buf).map_err(|e| SkyWalletError::internal(e.to_string()))
    }
}

impl Wallet {
    /// Load and validate a wallet file
    pub fn load(path: impl AsRef<Path>) -> SkyWalletResult<Wallet> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let wallet = ReadableWallet::from_json(&json)?.to_wallet()?;
        debug!(
            "Loaded wallet {} with {} entries from {}",
            wallet.filename(),
            wallet.len(),
            path.display()
        );
        Ok(wallet)
    }

    /// Write the wallet to `dir/<filename>`, replacing any existing file
    pub fn save(&self, dir: impl AsRef<Path>) -> SkyWalletResult<()> {
        self.save_to(dir.as_ref().join(self.filename()))
    }

    /// Write the wallet to `path` through a temporary file and rename
    pub fn save_to(&self, path: impl AsRef<Path>) -> SkyWalletResult<()> {
        self.validate()?;
        let path = path.as_ref();
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");

        let json = ReadableWallet::from(self).to_json()?;
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, path)?;

        debug!("Saved wallet {} to {}", self.filename(), path.display());
        Ok(())
    }
}
