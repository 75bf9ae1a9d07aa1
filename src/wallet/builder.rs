//! Wallet builder module providing a fluent API for wallet construction
//!
//! The builder collects the creation method, metadata and encryption settings
//! and produces a validated [`Wallet`] in one step.

use std::sync::Arc;

use zeroize::Zeroizing;

use crate::crypto::encrypt::{CryptoType, WalletCrypto};
use crate::errors::SkyWalletError;
use crate::wallet::{make_alphanumeric_seed, Wallet, WalletOptions};

/// Errors that can occur during wallet building
#[derive(Debug, Clone)]
pub enum WalletBuildError {
    /// Error during wallet creation or address generation
    WalletCreation(String),
    /// Encryption was requested but could not be applied
    EncryptionError(String),
    /// Configuration validation error
    ConfigurationError(String),
    /// Missing required parameters
    MissingParameter(String),
}

impl std::fmt::Display for WalletBuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WalletBuildError::WalletCreation(msg) => write!(f, "Wallet creation error: {}", msg),
            WalletBuildError::EncryptionError(msg) => write!(f, "Encryption error: {}", msg),
            WalletBuildError::ConfigurationError(msg) => {
                write!(f, "Configuration error: {}", msg)
            }
            WalletBuildError::MissingParameter(param) => {
                write!(f, "Missing required parameter: {}", param)
            }
        }
    }
}

impl std::error::Error for WalletBuildError {}

impl From<SkyWalletError> for WalletBuildError {
    fn from(err: SkyWalletError) -> Self {
        match err {
            SkyWalletError::MissingPassword | SkyWalletError::WalletLocked => {
                WalletBuildError::EncryptionError(err.to_string())
            }
            other => WalletBuildError::WalletCreation(other.to_string()),
        }
    }
}

/// Wallet creation methods supported by the builder
#[derive(Clone)]
enum WalletCreationMethod {
    /// Random 64 character hex seed
    GenerateNew,
    /// Caller supplied seed
    FromSeed(Zeroizing<String>),
}

/// Builder for deterministic wallets
///
/// # Examples
///
/// ## Basic wallet creation
///
/// ```rust,no_run
/// use lightweight_skycoin_libs::wallet::WalletBuilder;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let wallet = WalletBuilder::new()
///     .generate_new()
///     .with_filename("2024_01_01_abcd.wlt")
///     .with_label("My Wallet")
///     .generate_addresses(5)
///     .build()?;
/// # Ok(())
/// # }
/// ```
///
/// ## Encrypted wallet from an existing seed
///
/// ```rust,no_run
/// use lightweight_skycoin_libs::wallet::WalletBuilder;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let wallet = WalletBuilder::new()
///     .from_seed("your seed here")
///     .with_filename("saved.wlt")
///     .encrypt_with_password("pwd")
///     .build()?;
/// assert!(wallet.is_encrypted());
/// # Ok(())
/// # }
/// ```
pub struct WalletBuilder {
    creation_method: Option<WalletCreationMethod>,
    filename: Option<String>,
    label: String,
    generate_n: u64,
    password: Option<Zeroizing<Vec<u8>>>,
    crypto: Option<Arc<dyn WalletCrypto>>,
}

impl WalletBuilder {
    /// Create a new wallet builder
    ///
    /// A creation method and a filename must be set before building.
    pub fn new() -> Self {
        Self {
            creation_method: None,
            filename: None,
            label: String::new(),
            generate_n: 0,
            password: None,
            crypto: None,
        }
    }

    /// Use a freshly generated random seed
    pub fn generate_new(mut self) -> Self {
        self.creation_method = Some(WalletCreationMethod::GenerateNew);
        self
    }

    /// Use an existing seed
    pub fn from_seed<S: Into<String>>(mut self, seed: S) -> Self {
        self.creation_method = Some(WalletCreationMethod::FromSeed(Zeroizing::new(seed.into())));
        self
    }

    /// Set the wallet file name stored in the metadata
    pub fn with_filename<S: Into<String>>(mut self, filename: S) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_label<S: Into<String>>(mut self, label: S) -> Self {
        self.label = label.into();
        self
    }

    /// Generate `n` addresses before the wallet is returned
    pub fn generate_addresses(mut self, n: u64) -> Self {
        self.generate_n = n;
        self
    }

    /// Lock the wallet with `password` once it is built
    pub fn encrypt_with_password<P: AsRef<[u8]>>(mut self, password: P) -> Self {
        self.password = Some(Zeroizing::new(password.as_ref().to_vec()));
        self
    }

    /// Choose the crypto type used when encrypting
    pub fn with_crypto_type(mut self, crypto_type: CryptoType) -> Self {
        self.crypto = Some(Arc::from(crypto_type.crypto()));
        self
    }

    /// Use a specific crypto implementation when encrypting
    pub fn with_crypto(mut self, crypto: Arc<dyn WalletCrypto>) -> Self {
        self.crypto = Some(crypto);
        self
    }

    /// Build the wallet
    ///
    /// # Errors
    ///
    /// * `MissingParameter` - If no creation method or filename was specified
    /// * `ConfigurationError` - If a crypto implementation is given without a password
    /// * `WalletCreation` - If the seed is rejected or address generation fails
    /// * `EncryptionError` - If locking the new wallet fails
    pub fn build(self) -> Result<Wallet, WalletBuildError> {
        let creation_method = self.creation_method.ok_or_else(|| {
            WalletBuildError::MissingParameter(
                "creation method (call generate_new or from_seed)".to_string(),
            )
        })?;
        let filename = self
            .filename
            .filter(|f| !f.is_empty())
            .ok_or_else(|| WalletBuildError::MissingParameter("filename".to_string()))?;

        if self.crypto.is_some() && self.password.is_none() {
            return Err(WalletBuildError::ConfigurationError(
                "crypto settings given for an unencrypted wallet".to_string(),
            ));
        }

        let seed = match creation_method {
            WalletCreationMethod::GenerateNew => make_alphanumeric_seed(),
            WalletCreationMethod::FromSeed(seed) => seed.to_string(),
        };

        let encrypt = self.password.is_some();
        let options = WalletOptions {
            label: self.label,
            seed,
            encrypt,
            password: self.password.map(|p| p.to_vec()).unwrap_or_default(),
            crypto: self.crypto,
            generate_n: self.generate_n,
        };

        Ok(Wallet::new(filename, options)?)
    }
}

impl Default for WalletBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::encrypt::Argon2XChaCha20Poly1305;

    #[test]
    fn test_builder_missing_creation_method() {
        let result = WalletBuilder::new().with_filename("a.wlt").build();
        assert!(matches!(result, Err(WalletBuildError::MissingParameter(_))));
    }

    #[test]
    fn test_builder_missing_filename() {
        let result = WalletBuilder::new().generate_new().build();
        assert!(matches!(result, Err(WalletBuildError::MissingParameter(_))));
    }

    #[test]
    fn test_builder_from_seed() {
        let wallet = WalletBuilder::new()
            .from_seed("seed")
            .with_filename("a.wlt")
            .with_label("label")
            .generate_addresses(3)
            .build()
            .unwrap();

        assert_eq!(wallet.label(), "label");
        assert_eq!(wallet.seed(), "seed");
        assert_eq!(wallet.len(), 3);
    }

    #[test]
    fn test_builder_generate_new_random_seed() {
        let a = WalletBuilder::new().generate_new().with_filename("a.wlt").build().unwrap();
        let b = WalletBuilder::new().generate_new().with_filename("b.wlt").build().unwrap();
        assert_eq!(a.seed().len(), 64);
        assert_ne!(a.seed(), b.seed());
    }

    #[test]
    fn test_builder_encrypted() {
        let wallet = WalletBuilder::new()
            .from_seed("seed")
            .with_filename("a.wlt")
            .generate_addresses(1)
            .encrypt_with_password("pwd")
            .with_crypto(Arc::new(Argon2XChaCha20Poly1305::with_params(64, 1, 1).unwrap()))
            .build()
            .unwrap();

        assert!(wallet.is_encrypted());
        assert_eq!(wallet.seed(), "");
        assert!(wallet.unlocked_copy(b"pwd").is_ok());
    }

    #[test]
    fn test_builder_crypto_without_password() {
        let result = WalletBuilder::new()
            .from_seed("seed")
            .with_filename("a.wlt")
            .with_crypto_type(CryptoType::default())
            .build();
        assert!(matches!(result, Err(WalletBuildError::ConfigurationError(_))));
    }

    #[test]
    fn test_builder_empty_password() {
        let result = WalletBuilder::new()
            .from_seed("seed")
            .with_filename("a.wlt")
            .encrypt_with_password("")
            .build();
        assert!(matches!(result, Err(WalletBuildError::EncryptionError(_))));
    }

    #[test]
    fn test_build_error_display() {
        let err = WalletBuildError::MissingParameter("filename".to_string());
        assert_eq!(err.to_string(), "Missing required parameter: filename");
    }
}
