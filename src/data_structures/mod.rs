//! Domain types shared by the wallet engine and the node client

pub mod address;
pub mod balance;
pub mod block;
pub mod droplet;
pub mod fee;
pub mod transaction;
pub mod ux_out;

pub use address::Address;
pub use balance::{Balance, BalancePair};
pub use block::{verify_chain, Block, BlockBody, BlockHeader, ChainLink};
pub use transaction::{ReadableTransaction, ReadableTransactionOutput, Transaction, TransactionOutput};
pub use ux_out::{UxBalance, UxBody, UxHead, UxOut};
