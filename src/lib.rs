//! Wallet and node client libraries for Skycoin
//!
//! This crate provides deterministic wallets, the binary transaction codec
//! and a typed client for the node's REST API.
//!
//! ## Features
//!
//! - `http` (default): [`client::HttpNodeClient`], backed by reqwest
//! - `cli` (default): the `skycoin-cli` binary and [`logging::init_logging`]
//!
//! Without `http` the crate still offers wallets, the codec and the
//! [`client::NodeClient`] trait with its in-memory mock.
//!
//! ### Example
//!
//! ```rust,no_run
//! use lightweight_skycoin_libs::{Transaction, WalletBuilder};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut wallet = WalletBuilder::new()
//!     .from_seed("seed")
//!     .with_filename("example.wlt")
//!     .build()?;
//! let addresses = wallet.generate_addresses(2)?;
//!
//! let txn = Transaction::decode_raw("dc00000000...")?;
//! println!("{}", txn.hash());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod crypto;
pub mod data_structures;
pub mod errors;
pub mod hex_utils;
pub mod logging;
pub mod wallet;

pub use config::ClientConfig;
pub use data_structures::*;
pub use errors::*;
pub use hex_utils::*;
pub use wallet::{make_alphanumeric_seed, Entry, Wallet, WalletBuildError, WalletBuilder, WalletOptions};
