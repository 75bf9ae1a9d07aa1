//! Blocks and hash-chain verification

use borsh::{BorshDeserialize, BorshSerialize};
use tracing::warn;

use crate::{
    crypto::hash::{merkle_root, Sha256Hash},
    data_structures::transaction::Transaction,
    errors::{SkyWalletError, SkyWalletResult},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct BlockHeader {
    pub version: u32,
    pub time: u64,
    pub bk_seq: u64,
    pub fee: u64,
    pub prev_hash: Sha256Hash,
    pub body_hash: Sha256Hash,
    pub ux_hash: Sha256Hash,
}

impl BlockHeader {
    /// Block hash: SHA256 of the encoded header
    pub fn hash(&self) -> Sha256Hash {
        // Fixed-width fields only
        Sha256Hash::digest(&borsh::to_vec(self).unwrap_or_default())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockBody {
    pub transactions: Vec<Transaction>,
}

impl BlockBody {
    /// Merkle root of the transaction ids
    pub fn hash(&self) -> Sha256Hash {
        let txids: Vec<Sha256Hash> = self.transactions.iter().map(Transaction::hash).collect();
        merkle_root(&txids)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    pub head: BlockHeader,
    pub body: BlockBody,
}

impl Block {
    pub fn hash(&self) -> Sha256Hash {
        self.head.hash()
    }

    pub fn seq(&self) -> u64 {
        self.head.bk_seq
    }

    pub fn prev_hash(&self) -> Sha256Hash {
        self.head.prev_hash
    }

    pub fn is_genesis(&self) -> bool {
        self.head.bk_seq == 0
    }
}

/// Minimal view of a block needed to check chain linkage
pub trait ChainLink {
    fn link_seq(&self) -> u64;
    fn link_hash(&self) -> Sha256Hash;
    fn link_prev_hash(&self) -> Sha256Hash;
}

impl ChainLink for Block {
    fn link_seq(&self) -> u64 {
        self.seq()
    }

    fn link_hash(&self) -> Sha256Hash {
        self.hash()
    }

    fn link_prev_hash(&self) -> Sha256Hash {
        self.prev_hash()
    }
}

/// Check that `blocks` are consecutive from `start_seq` and each one points
/// at the hash of the block before it
pub fn verify_chain<B: ChainLink>(blocks: &[B], start_seq: u64) -> SkyWalletResult<()> {
    for (i, block) in blocks.iter().enumerate() {
        let expected = start_seq + i as u64;
        if block.link_seq() != expected {
            warn!(
                "Block sequence gap: expected {}, got {}",
                expected,
                block.link_seq()
            );
            return Err(SkyWalletError::internal(format!(
                "block sequence out of order: expected {}, got {}",
                expected,
                block.link_seq()
            )));
        }

        if i > 0 {
            let prev = &blocks[i - 1];
            if block.link_prev_hash() != prev.link_hash() {
                warn!("Broken hash chain at block {}", expected);
                return Err(SkyWalletError::internal(format!(
                    "block {} previous hash {} does not match block {} hash {}",
                    expected,
                    block.link_prev_hash(),
                    prev.link_seq(),
                    prev.link_hash()
                )));
            }
        }
    }
    Ok(())
}
