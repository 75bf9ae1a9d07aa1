//! Error types for the Skycoin wallet and node client libraries
//!
//! All fallible operations return [`SkyWalletResult`]. Every error variant
//! belongs to exactly one [`ErrorKind`], which is what callers should match on
//! when deciding whether to retry, re-prompt for a password, or give up.

use thiserror::Error;

/// Coarse classification of every error produced by this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or out-of-domain input supplied by the caller
    InvalidArgument,
    /// Malformed hex, base58 or binary payload
    InvalidEncoding,
    /// Structurally incomplete payload
    TruncatedData,
    /// Query target absent on chain
    NotFound,
    /// Wallet unlock failure
    InvalidPassword,
    /// Secret material requested while the wallet is locked
    WalletLocked,
    /// Remote call exceeded its deadline
    Timeout,
    /// Remote unreachable
    Unavailable,
    /// Unexpected remote or local fault
    Internal,
}

impl ErrorKind {
    /// Whether a caller may retry the failed call with backoff
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Timeout | ErrorKind::Unavailable)
    }
}

/// Errors produced while parsing or validating an address
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("Invalid base58 string")]
    InvalidBase58,
    #[error("Invalid address length")]
    InvalidLength,
    #[error("Invalid checksum")]
    InvalidChecksum,
    #[error("Invalid version")]
    InvalidVersion,
    #[error("Public key invalid for address")]
    InvalidPubKey,
}

/// Errors produced while choosing outputs and building a spend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpendError {
    #[error("zero spend amount")]
    ZeroSpend,
    #[error("no unspents to spend")]
    NoUnspents,
    #[error("balance is not sufficient")]
    InsufficientBalance,
    #[error("hours are not sufficient")]
    InsufficientHours,
    #[error("Transaction has zero coinhour fee")]
    NoFee,
    #[error("Transaction coinhour fee minimum not met")]
    InsufficientFee,
    #[error("address not found in wallet")]
    UnknownAddress,
}

/// Main error type for the library
#[derive(Debug, Error)]
pub enum SkyWalletError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0}")]
    InvalidEncoding(String),

    #[error(transparent)]
    InvalidAddress(#[from] AddressError),

    #[error(transparent)]
    Spend(#[from] SpendError),

    #[error("truncated data: {0}")]
    TruncatedData(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid password")]
    InvalidPassword,

    #[error("missing password")]
    MissingPassword,

    #[error("wallet is encrypted")]
    WalletLocked,

    #[error("wallet is not encrypted")]
    WalletNotEncrypted,

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("node unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SkyWalletError {
    /// Taxonomy kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            SkyWalletError::InvalidArgument(_)
            | SkyWalletError::Spend(_)
            | SkyWalletError::MissingPassword
            | SkyWalletError::WalletNotEncrypted => ErrorKind::InvalidArgument,
            SkyWalletError::InvalidEncoding(_)
            | SkyWalletError::InvalidAddress(_)
            | SkyWalletError::Serialization(_) => ErrorKind::InvalidEncoding,
            SkyWalletError::TruncatedData(_) => ErrorKind::TruncatedData,
            SkyWalletError::NotFound(_) => ErrorKind::NotFound,
            SkyWalletError::InvalidPassword => ErrorKind::InvalidPassword,
            SkyWalletError::WalletLocked => ErrorKind::WalletLocked,
            SkyWalletError::Timeout(_) => ErrorKind::Timeout,
            SkyWalletError::Unavailable(_) => ErrorKind::Unavailable,
            SkyWalletError::Internal(_) | SkyWalletError::Io(_) => ErrorKind::Internal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        SkyWalletError::InvalidArgument(msg.into())
    }

    pub fn invalid_encoding(msg: impl Into<String>) -> Self {
        SkyWalletError::InvalidEncoding(msg.into())
    }

    pub fn truncated(msg: impl Into<String>) -> Self {
        SkyWalletError::TruncatedData(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        SkyWalletError::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        SkyWalletError::Internal(msg.into())
    }
}

impl From<hex::FromHexError> for SkyWalletError {
    fn from(err: hex::FromHexError) -> Self {
        let msg = match err {
            hex::FromHexError::OddLength => "encoding/hex: odd length hex string".to_string(),
            hex::FromHexError::InvalidHexCharacter { c, .. } => {
                format!("encoding/hex: invalid byte: {:?}", c)
            }
            hex::FromHexError::InvalidStringLength => "encoding/hex: invalid length".to_string(),
        };
        SkyWalletError::InvalidEncoding(msg)
    }
}

/// Result type alias for library operations
pub type SkyWalletResult<T> = Result<T, SkyWalletError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            SkyWalletError::invalid_argument("start").kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            SkyWalletError::from(AddressError::InvalidVersion).kind(),
            ErrorKind::InvalidEncoding
        );
        assert_eq!(SkyWalletError::WalletLocked.kind(), ErrorKind::WalletLocked);
        assert_eq!(SkyWalletError::InvalidPassword.kind(), ErrorKind::InvalidPassword);
    }

    #[test]
    fn test_retryable() {
        assert!(SkyWalletError::Timeout("block".into()).is_retryable());
        assert!(SkyWalletError::Unavailable("down".into()).is_retryable());
        assert!(!SkyWalletError::not_found("block").is_retryable());
        assert!(!SkyWalletError::invalid_argument("range").is_retryable());
    }

    #[test]
    fn test_hex_error_messages() {
        let err: SkyWalletError = hex::decode("abc").unwrap_err().into();
        assert_eq!(err.to_string(), "encoding/hex: odd length hex string");
        assert_eq!(err.kind(), ErrorKind::InvalidEncoding);
    }

    #[test]
    fn test_spend_error() {
        let err: SkyWalletError = SpendError::InsufficientHours.into();
        assert_eq!(err.to_string(), "hours are not sufficient");
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(matches!(err, SkyWalletError::Spend(SpendError::InsufficientHours)));
    }

    #[test]
    fn test_address_error_display() {
        let err: SkyWalletError = AddressError::InvalidVersion.into();
        assert_eq!(err.to_string(), "Invalid version");
    }

    #[test]
    fn test_wallet_error_display() {
        assert_eq!(SkyWalletError::WalletLocked.to_string(), "wallet is encrypted");
        assert_eq!(
            SkyWalletError::WalletNotEncrypted.to_string(),
            "wallet is not encrypted"
        );
        assert_eq!(SkyWalletError::InvalidPassword.to_string(), "invalid password");
    }
}
