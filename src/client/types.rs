//! JSON shapes returned by the node's `/api/v1` endpoints
//!
//! These mirror the node's "readable" responses field for field. Conversion
//! into domain values ([`Block`], [`UxBalance`], [`UxOut`]) happens through
//! explicit `to_*` methods so that malformed node data is reported at the
//! call that consumes it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    crypto::hash::Sha256Hash,
    data_structures::{
        address::Address,
        balance::{Balance, BalancePair},
        block::{Block, BlockBody, BlockHeader, ChainLink},
        droplet,
        transaction::ReadableTransaction,
        ux_out::{UxBalance, UxBody, UxHead, UxOut},
    },
    errors::{SkyWalletError, SkyWalletResult},
};

/// `GET /api/v1/version`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInfo {
    pub version: String,
    #[serde(default)]
    pub commit: String,
    #[serde(default)]
    pub branch: String,
}

/// `GET /api/v1/coinSupply`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinSupply {
    pub current_supply: String,
    pub total_supply: String,
    pub max_supply: String,
    pub current_coinhour_supply: String,
    pub total_coinhour_supply: String,
    pub unlocked_distribution_addresses: Vec<String>,
    pub locked_distribution_addresses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadableBlockHeader {
    pub seq: u64,
    pub block_hash: Sha256Hash,
    pub previous_block_hash: Sha256Hash,
    pub timestamp: u64,
    pub fee: u64,
    pub version: u32,
    pub tx_body_hash: Sha256Hash,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ux_hash: Option<Sha256Hash>,
}

impl ReadableBlockHeader {
    /// Domain header; when the node reports `ux_hash` the recomputed header
    /// hash must equal `block_hash`
    pub fn to_header(&self) -> SkyWalletResult<BlockHeader> {
        let header = BlockHeader {
            version: self.version,
            time: self.timestamp,
            bk_seq: self.seq,
            fee: self.fee,
            prev_hash: self.previous_block_hash,
            body_hash: self.tx_body_hash,
            ux_hash: self.ux_hash.unwrap_or_default(),
        };

        if self.ux_hash.is_some() {
            let computed = header.hash();
            if computed != self.block_hash {
                return Err(SkyWalletError::internal(format!(
                    "block {} hash mismatch: reported {}, computed {}",
                    self.seq, self.block_hash, computed
                )));
            }
        }
        Ok(header)
    }
}

impl From<&BlockHeader> for ReadableBlockHeader {
    fn from(header: &BlockHeader) -> Self {
        ReadableBlockHeader {
            seq: header.bk_seq,
            block_hash: header.hash(),
            previous_block_hash: header.prev_hash,
            timestamp: header.time,
            fee: header.fee,
            version: header.version,
            tx_body_hash: header.body_hash,
            ux_hash: Some(header.ux_hash),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadableBlockBody {
    #[serde(default)]
    pub txns: Vec<ReadableTransaction>,
}

/// `GET /api/v1/block`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadableBlock {
    pub header: ReadableBlockHeader,
    #[serde(default)]
    pub body: ReadableBlockBody,
    #[serde(default)]
    pub size: u64,
}

impl ReadableBlock {
    pub fn seq(&self) -> u64 {
        self.header.seq
    }

    pub fn hash(&self) -> Sha256Hash {
        self.header.block_hash
    }

    /// Rebuild the binary block, checking every transaction id and the body hash
    pub fn to_block(&self) -> SkyWalletResult<Block> {
        let head = self.header.to_header()?;
        let transactions = self
            .body
            .txns
            .iter()
            .map(ReadableTransaction::to_transaction)
            .collect::<SkyWalletResult<Vec<_>>>()?;
        let body = BlockBody { transactions };

        let body_hash = body.hash();
        if !body.transactions.is_empty() && body_hash != head.body_hash {
            return Err(SkyWalletError::internal(format!(
                "block {} body hash mismatch: reported {}, computed {}",
                head.bk_seq, head.body_hash, body_hash
            )));
        }
        Ok(Block { head, body })
    }
}

impl From<&Block> for ReadableBlock {
    fn from(block: &Block) -> Self {
        let txns: Vec<ReadableTransaction> = block
            .body
            .transactions
            .iter()
            .map(|t| t.to_readable())
            .collect();
        let size = block.body.transactions.iter().map(|t| t.size() as u64).sum();
        ReadableBlock {
            header: ReadableBlockHeader::from(&block.head),
            body: ReadableBlockBody { txns },
            size,
        }
    }
}

impl ChainLink for ReadableBlock {
    fn link_seq(&self) -> u64 {
        self.header.seq
    }

    fn link_hash(&self) -> Sha256Hash {
        self.header.block_hash
    }

    fn link_prev_hash(&self) -> Sha256Hash {
        self.header.previous_block_hash
    }
}

/// `GET /api/v1/blocks`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadableBlocks {
    pub blocks: Vec<ReadableBlock>,
}

/// One unspent output as listed by `GET /api/v1/outputs`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadableOutput {
    pub hash: Sha256Hash,
    pub time: u64,
    pub block_seq: u64,
    pub src_tx: Sha256Hash,
    pub address: String,
    #[serde(with = "droplet::serde_coins")]
    pub coins: u64,
    pub hours: u64,
    /// Hours accrued up to the head block time
    pub calculated_hours: u64,
}

impl ReadableOutput {
    pub fn to_ux_out(&self) -> SkyWalletResult<UxOut> {
        let ux = UxOut {
            head: UxHead {
                time: self.time,
                bk_seq: self.block_seq,
            },
            body: UxBody {
                src_transaction: self.src_tx,
                address: self.address.parse::<Address>()?,
                coins: self.coins,
                hours: self.hours,
            },
        };

        let computed = ux.hash();
        if computed != self.hash {
            return Err(SkyWalletError::internal(format!(
                "output hash mismatch: reported {}, computed {}",
                self.hash, computed
            )));
        }
        Ok(ux)
    }

    pub fn to_ux_balance(&self) -> SkyWalletResult<UxBalance> {
        let ux = self.to_ux_out()?;
        Ok(UxBalance {
            hash: self.hash,
            bk_seq: self.block_seq,
            time: self.time,
            address: ux.body.address,
            coins: self.coins,
            initial_hours: self.hours,
            hours: self.calculated_hours,
            src_transaction: self.src_tx,
        })
    }
}

/// `GET /api/v1/outputs`: confirmed unspents plus the outputs that pending
/// transactions spend and create
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadableOutputSet {
    pub head: ReadableBlockHeader,
    #[serde(default)]
    pub head_outputs: Vec<ReadableOutput>,
    #[serde(default)]
    pub outgoing_outputs: Vec<ReadableOutput>,
    #[serde(default)]
    pub incoming_outputs: Vec<ReadableOutput>,
}

impl ReadableOutputSet {
    /// Confirmed unspent outputs
    pub fn ux_outs(&self) -> SkyWalletResult<Vec<UxOut>> {
        self.head_outputs.iter().map(ReadableOutput::to_ux_out).collect()
    }

    /// Confirmed outputs that no pending transaction spends
    pub fn spendable_outputs(&self) -> Vec<ReadableOutput> {
        self.head_outputs
            .iter()
            .filter(|o| !self.outgoing_outputs.iter().any(|out| out.hash == o.hash))
            .cloned()
            .collect()
    }
}

fn sum_outputs<'a>(mut outputs: impl Iterator<Item = &'a ReadableOutput>) -> SkyWalletResult<Balance> {
    outputs.try_fold(Balance::default(), |acc, o| {
        acc.add(&Balance::new(o.coins, o.calculated_hours))
    })
}

/// Confirmed = head outputs; predicted = head outputs minus those spent by
/// pending transactions plus those pending transactions create
pub fn balance_from_outputs(outputs: &ReadableOutputSet) -> SkyWalletResult<BalancePair> {
    let confirmed = sum_outputs(outputs.head_outputs.iter())?;
    let outgoing = sum_outputs(outputs.outgoing_outputs.iter())?;
    let incoming = sum_outputs(outputs.incoming_outputs.iter())?;

    let predicted = confirmed
        .sub(&outgoing)
        .and_then(|b| b.add(&incoming))?;

    Ok(BalancePair {
        confirmed,
        predicted,
    })
}

/// Per-address balance pairs keyed by base58 address
pub fn balances_from_outputs(
    outputs: &ReadableOutputSet,
) -> SkyWalletResult<BTreeMap<String, BalancePair>> {
    let mut by_address: BTreeMap<String, ReadableOutputSet> = BTreeMap::new();
    let empty = |head: &ReadableBlockHeader| ReadableOutputSet {
        head: head.clone(),
        head_outputs: Vec::new(),
        outgoing_outputs: Vec::new(),
        incoming_outputs: Vec::new(),
    };

    for o in &outputs.head_outputs {
        by_address
            .entry(o.address.clone())
            .or_insert_with(|| empty(&outputs.head))
            .head_outputs
            .push(o.clone());
    }
    for o in &outputs.outgoing_outputs {
        by_address
            .entry(o.address.clone())
            .or_insert_with(|| empty(&outputs.head))
            .outgoing_outputs
            .push(o.clone());
    }
    for o in &outputs.incoming_outputs {
        by_address
            .entry(o.address.clone())
            .or_insert_with(|| empty(&outputs.head))
            .incoming_outputs
            .push(o.clone());
    }

    by_address
        .into_iter()
        .map(|(addr, set)| balance_from_outputs(&set).map(|b| (addr, b)))
        .collect()
}

/// `GET /api/v1/balance`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub confirmed: Balance,
    pub predicted: Balance,
    #[serde(default)]
    pub addresses: BTreeMap<String, BalancePair>,
}

impl BalanceResponse {
    pub fn pair(&self) -> BalancePair {
        BalancePair {
            confirmed: self.confirmed,
            predicted: self.predicted,
        }
    }
}

/// `GET /api/v1/uxout` and the items of `GET /api/v1/address_uxouts`
///
/// Includes spent outputs; `spent_block_seq` is zero while unspent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpentOutput {
    pub uxid: Sha256Hash,
    pub time: u64,
    pub src_block_seq: u64,
    pub src_tx: Sha256Hash,
    pub owner_address: String,
    pub coins: u64,
    pub hours: u64,
    pub spent_block_seq: u64,
    pub spent_tx: Sha256Hash,
}

impl SpentOutput {
    pub fn is_spent(&self) -> bool {
        self.spent_block_seq != 0 || !self.spent_tx.is_zero()
    }

    pub fn to_ux_out(&self) -> SkyWalletResult<UxOut> {
        Ok(UxOut {
            head: UxHead {
                time: self.time,
                bk_seq: self.src_block_seq,
            },
            body: UxBody {
                src_transaction: self.src_tx,
                address: self.owner_address.parse::<Address>()?,
                coins: self.coins,
                hours: self.hours,
            },
        })
    }
}

/// `GET /api/v1/blockchain/metadata`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockchainMetadata {
    pub head: ReadableBlockHeader,
    pub unspents: u64,
    pub unconfirmed: u64,
    #[serde(default)]
    pub time_since_last_block: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerBlockchainHeight {
    pub address: String,
    pub height: u64,
}

/// `GET /api/v1/blockchain/progress`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockchainProgress {
    pub current: u64,
    pub highest: u64,
    #[serde(default)]
    pub peers: Vec<PeerBlockchainHeight>,
}

impl BlockchainProgress {
    pub fn is_synced(&self) -> bool {
        self.current >= self.highest
    }
}

/// `GET /api/v1/health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub blockchain: BlockchainMetadata,
    pub version: BuildInfo,
    #[serde(default)]
    pub open_connections: u64,
    #[serde(default)]
    pub uptime: String,
}
