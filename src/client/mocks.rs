//! In-memory node for deterministic testing
//!
//! [`MockNodeClient`] serves a generated hash-linked chain plus whatever
//! outputs a test registers, and can be told to fail, time out or stall the
//! next call through [`MockNetworkFailureModes`].

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::{
    client::{
        check_address_arg, check_output_filters, dedup_addresses,
        range::{block_range_bounds, check_block_range},
        types::{
            balance_from_outputs, BlockchainMetadata, BlockchainProgress, BuildInfo, CoinSupply,
            HealthResponse, ReadableBlock, ReadableBlockHeader, ReadableOutput,
            ReadableOutputSet, SpentOutput,
        },
        NodeClient,
    },
    config::DEFAULT_MAX_CONCURRENT_REQUESTS,
    crypto::hash::Sha256Hash,
    data_structures::{
        address::Address,
        balance::BalancePair,
        block::{Block, BlockBody, BlockHeader},
        transaction::Transaction,
        ux_out::UxBody,
    },
    errors::{SkyWalletError, SkyWalletResult},
};

/// Genesis time of the generated chain
pub const MOCK_GENESIS_TIME: u64 = 1_426_562_704;
/// Seconds between generated blocks
pub const MOCK_BLOCK_INTERVAL: u64 = 10;

#[derive(Debug, Clone, Default)]
pub struct MockNetworkFailureModes {
    /// Fail the next call with `Internal`
    pub fail_next_call: bool,
    /// Fail the next call with `Timeout`
    pub simulate_timeout: bool,
    /// Fail the next call with `Unavailable`
    pub simulate_unavailable: bool,
    /// Return this message as `Internal` on the next call
    pub next_error_message: Option<String>,
    /// Sleep before every call; not reset
    pub delay: Option<Duration>,
}

#[derive(Debug, Default)]
struct MockState {
    blocks: Vec<ReadableBlock>,
    head_outputs: Vec<ReadableOutput>,
    outgoing_outputs: Vec<ReadableOutput>,
    incoming_outputs: Vec<ReadableOutput>,
    ux_outs: Vec<SpentOutput>,
    highest_peer_height: u64,
    next_tx: u64,
    call_count: usize,
    max_concurrent_requests: Option<usize>,
    in_flight: usize,
    peak_in_flight: usize,
}

/// Mock node implementation for deterministic testing
#[derive(Debug, Clone)]
pub struct MockNodeClient {
    state: Arc<Mutex<MockState>>,
    failure_modes: Arc<Mutex<MockNetworkFailureModes>>,
    build_info: BuildInfo,
}

impl Default for MockNodeClient {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockNodeClient {
    /// Empty node with no blocks
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            failure_modes: Arc::new(Mutex::new(MockNetworkFailureModes::default())),
            build_info: BuildInfo {
                version: "0.27.1".to_string(),
                commit: "8798b5ee43c7ce43b9b75d57a1a6cd2c1295cd1e".to_string(),
                branch: "develop".to_string(),
            },
        }
    }

    /// Node with `len` generated blocks, sequences `0..len`
    pub fn with_chain(len: u64) -> Self {
        let mock = Self::new();
        mock.extend_chain(len);
        mock
    }

    /// Append `count` empty blocks to the tip
    pub fn extend_chain(&self, count: u64) {
        let mut state = lock(&self.state);
        for _ in 0..count {
            Self::append_block(&mut state, Vec::new());
        }
    }

    /// Confirm `transactions` in a new block at the tip
    ///
    /// Every input must be a registered unspent output. Spent outputs leave
    /// the unspent set and are marked spent in the history; each output of
    /// each transaction becomes a new unspent output.
    pub fn push_block(&self, transactions: Vec<Transaction>) -> SkyWalletResult<ReadableBlock> {
        let mut state = lock(&self.state);
        for txn in &transactions {
            for input in &txn.inputs {
                if !state.head_outputs.iter().any(|o| &o.hash == input) {
                    return Err(SkyWalletError::not_found(format!("unspent output {}", input)));
                }
            }
        }

        let block = Self::append_block(&mut state, transactions.clone());
        let (seq, time) = (block.seq(), block.header.timestamp);

        for txn in &transactions {
            let txid = txn.hash();
            state.head_outputs.retain(|o| !txn.inputs.contains(&o.hash));
            state.outgoing_outputs.retain(|o| !txn.inputs.contains(&o.hash));
            state.incoming_outputs.retain(|o| o.src_tx != txid);
            for ux in state.ux_outs.iter_mut().filter(|u| txn.inputs.contains(&u.uxid)) {
                ux.spent_block_seq = seq;
                ux.spent_tx = txid;
            }

            for out in &txn.outputs {
                let output = ReadableOutput {
                    hash: out.ux_id(&txid),
                    time,
                    block_seq: seq,
                    src_tx: txid,
                    address: out.address.to_string(),
                    coins: out.coins,
                    hours: out.hours,
                    calculated_hours: out.hours,
                };
                state.ux_outs.push(Self::history_entry(&output));
                state.head_outputs.push(output);
            }
        }
        Ok(block)
    }

    fn append_block(state: &mut MockState, transactions: Vec<Transaction>) -> ReadableBlock {
        let (seq, prev_hash) = match state.blocks.last() {
            Some(tip) => (tip.seq() + 1, tip.hash()),
            None => (0, Sha256Hash::zero()),
        };
        let body = BlockBody { transactions };
        let block = Block {
            head: BlockHeader {
                version: 0,
                time: MOCK_GENESIS_TIME + seq * MOCK_BLOCK_INTERVAL,
                bk_seq: seq,
                fee: 0,
                prev_hash,
                body_hash: body.hash(),
                ux_hash: Sha256Hash::digest(&seq.to_le_bytes()),
            },
            body,
        };
        let readable = ReadableBlock::from(&block);
        state.blocks.push(readable.clone());
        readable
    }

    fn history_entry(output: &ReadableOutput) -> SpentOutput {
        SpentOutput {
            uxid: output.hash,
            time: output.time,
            src_block_seq: output.block_seq,
            src_tx: output.src_tx,
            owner_address: output.address.clone(),
            coins: output.coins,
            hours: output.hours,
            spent_block_seq: 0,
            spent_tx: Sha256Hash::zero(),
        }
    }

    /// Copy of every block, ascending
    pub fn chain(&self) -> Vec<ReadableBlock> {
        lock(&self.state).blocks.clone()
    }

    /// Register a confirmed unspent output created at the tip
    pub fn add_unspent(&self, address: &Address, coins: u64, hours: u64) -> ReadableOutput {
        let output = self.make_output(address, coins, hours);
        let mut state = lock(&self.state);
        state.ux_outs.push(Self::history_entry(&output));
        state.head_outputs.push(output.clone());
        output
    }

    /// Mark a confirmed output as spent by a pending transaction
    pub fn add_outgoing(&self, hash: &Sha256Hash) -> SkyWalletResult<()> {
        let mut state = lock(&self.state);
        let output = state
            .head_outputs
            .iter()
            .find(|o| &o.hash == hash)
            .cloned()
            .ok_or_else(|| SkyWalletError::not_found(format!("uxout {}", hash)))?;
        state.outgoing_outputs.push(output);
        Ok(())
    }

    /// Register an output that a pending transaction will create
    pub fn add_incoming(&self, address: &Address, coins: u64, hours: u64) -> ReadableOutput {
        let output = self.make_output(address, coins, hours);
        lock(&self.state).incoming_outputs.push(output.clone());
        output
    }

    pub fn set_highest_peer_height(&self, height: u64) {
        lock(&self.state).highest_peer_height = height;
    }

    /// Number of trait calls served, failed ones included
    pub fn call_count(&self) -> usize {
        lock(&self.state).call_count
    }

    /// Override the concurrency limit reported to range fetches
    pub fn set_max_concurrent_requests(&self, max: usize) {
        lock(&self.state).max_concurrent_requests = Some(max);
    }

    /// Most calls that were ever being served at the same time
    pub fn peak_in_flight(&self) -> usize {
        lock(&self.state).peak_in_flight
    }

    /// Set failure mode for testing error conditions
    pub fn set_failure_modes(&self, modes: MockNetworkFailureModes) {
        *lock(&self.failure_modes) = modes;
    }

    pub fn failure_modes(&self) -> MockNetworkFailureModes {
        lock(&self.failure_modes).clone()
    }

    /// Clear registered outputs and failure modes; the chain stays
    pub fn reset(&self) {
        let mut state = lock(&self.state);
        state.head_outputs.clear();
        state.outgoing_outputs.clear();
        state.incoming_outputs.clear();
        state.ux_outs.clear();
        state.call_count = 0;
        state.peak_in_flight = 0;
        *lock(&self.failure_modes) = MockNetworkFailureModes::default();
    }

    fn make_output(&self, address: &Address, coins: u64, hours: u64) -> ReadableOutput {
        let mut state = lock(&self.state);
        state.next_tx += 1;
        let (time, block_seq) = state
            .blocks
            .last()
            .map(|b| (b.header.timestamp, b.seq()))
            .unwrap_or((MOCK_GENESIS_TIME, 0));

        let body = UxBody {
            src_transaction: Sha256Hash::digest(&state.next_tx.to_le_bytes()),
            address: *address,
            coins,
            hours,
        };
        ReadableOutput {
            hash: body.hash(),
            time,
            block_seq,
            src_tx: body.src_transaction,
            address: address.to_string(),
            coins,
            hours,
            calculated_hours: hours,
        }
    }

    /// Count the call and apply any pending failure
    async fn check_failure(&self, operation: &str) -> SkyWalletResult<()> {
        {
            let mut state = lock(&self.state);
            state.call_count += 1;
            state.in_flight += 1;
            state.peak_in_flight = state.peak_in_flight.max(state.in_flight);
        }

        let (delay, failure) = {
            let mut modes = lock(&self.failure_modes);
            let failure = if let Some(msg) = modes.next_error_message.take() {
                Some(SkyWalletError::internal(msg))
            } else if modes.simulate_timeout {
                modes.simulate_timeout = false;
                Some(SkyWalletError::Timeout(format!("Mock timeout: {}", operation)))
            } else if modes.simulate_unavailable {
                modes.simulate_unavailable = false;
                Some(SkyWalletError::Unavailable(format!("Mock unavailable: {}", operation)))
            } else if modes.fail_next_call {
                modes.fail_next_call = false;
                Some(SkyWalletError::internal(format!("Mock failure: {}", operation)))
            } else {
                None
            };
            (modes.delay, failure)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        lock(&self.state).in_flight -= 1;
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn tip_header(state: &MockState) -> SkyWalletResult<ReadableBlockHeader> {
        state
            .blocks
            .last()
            .map(|b| b.header.clone())
            .ok_or_else(|| SkyWalletError::Unavailable("node has no blocks".to_string()))
    }

    fn output_set(&self, addresses: &[Address], hashes: &[Sha256Hash]) -> SkyWalletResult<ReadableOutputSet> {
        let state = lock(&self.state);
        let wanted_addrs: Vec<String> = addresses.iter().map(Address::to_string).collect();
        let keep = |o: &&ReadableOutput| {
            (wanted_addrs.is_empty() || wanted_addrs.contains(&o.address))
                && (hashes.is_empty() || hashes.contains(&o.hash))
        };

        Ok(ReadableOutputSet {
            head: Self::tip_header(&state)?,
            head_outputs: state.head_outputs.iter().filter(keep).cloned().collect(),
            outgoing_outputs: state.outgoing_outputs.iter().filter(keep).cloned().collect(),
            incoming_outputs: state.incoming_outputs.iter().filter(keep).cloned().collect(),
        })
    }

    fn metadata(&self) -> SkyWalletResult<BlockchainMetadata> {
        let state = lock(&self.state);
        let mut pending: Vec<Sha256Hash> = state.incoming_outputs.iter().map(|o| o.src_tx).collect();
        pending.sort();
        pending.dedup();

        Ok(BlockchainMetadata {
            head: Self::tip_header(&state)?,
            unspents: state.head_outputs.len() as u64,
            unconfirmed: pending.len() as u64,
            time_since_last_block: "10s".to_string(),
        })
    }
}

#[async_trait]
impl NodeClient for MockNodeClient {
    fn max_concurrent_requests(&self) -> usize {
        lock(&self.state)
            .max_concurrent_requests
            .unwrap_or(DEFAULT_MAX_CONCURRENT_REQUESTS)
    }

    async fn version(&self) -> SkyWalletResult<BuildInfo> {
        self.check_failure("version").await?;
        Ok(self.build_info.clone())
    }

    async fn coin_supply(&self) -> SkyWalletResult<CoinSupply> {
        self.check_failure("coin_supply").await?;
        Ok(CoinSupply {
            current_supply: "7500000.000000".to_string(),
            total_supply: "25000000.000000".to_string(),
            max_supply: "100000000.000000".to_string(),
            current_coinhour_supply: "1000000".to_string(),
            total_coinhour_supply: "2000000".to_string(),
            unlocked_distribution_addresses: Vec::new(),
            locked_distribution_addresses: Vec::new(),
        })
    }

    async fn outputs_filtered(
        &self,
        addresses: &[Address],
        hashes: &[Sha256Hash],
    ) -> SkyWalletResult<ReadableOutputSet> {
        self.check_failure("outputs").await?;
        check_output_filters(addresses, hashes)?;
        self.output_set(addresses, hashes)
    }

    async fn block_by_seq(&self, seq: u64) -> SkyWalletResult<ReadableBlock> {
        self.check_failure("block_by_seq").await?;
        let state = lock(&self.state);
        state
            .blocks
            .iter()
            .find(|b| b.seq() == seq)
            .cloned()
            .ok_or_else(|| SkyWalletError::not_found(format!("block seq {}", seq)))
    }

    async fn block_by_hash(&self, hash: &Sha256Hash) -> SkyWalletResult<ReadableBlock> {
        self.check_failure("block_by_hash").await?;
        let state = lock(&self.state);
        state
            .blocks
            .iter()
            .find(|b| &b.hash() == hash)
            .cloned()
            .ok_or_else(|| SkyWalletError::not_found(format!("block hash {}", hash)))
    }

    async fn blocks(&self, start: i64, end: i64) -> SkyWalletResult<Vec<ReadableBlock>> {
        self.check_failure("blocks").await?;
        let Some((start, end)) = block_range_bounds(start, end)? else {
            return Ok(Vec::new());
        };

        let blocks: Vec<ReadableBlock> = lock(&self.state)
            .blocks
            .iter()
            .filter(|b| (start..=end).contains(&b.seq()))
            .cloned()
            .collect();
        check_block_range(&blocks, start, end)?;
        Ok(blocks)
    }

    async fn blockchain_metadata(&self) -> SkyWalletResult<BlockchainMetadata> {
        self.check_failure("blockchain_metadata").await?;
        self.metadata()
    }

    async fn blockchain_progress(&self) -> SkyWalletResult<BlockchainProgress> {
        self.check_failure("blockchain_progress").await?;
        let state = lock(&self.state);
        let current = Self::tip_header(&state)?.seq;
        Ok(BlockchainProgress {
            current,
            highest: current.max(state.highest_peer_height),
            peers: Vec::new(),
        })
    }

    async fn balance(&self, addresses: &[Address]) -> SkyWalletResult<BalancePair> {
        self.check_failure("balance").await?;
        if addresses.is_empty() {
            return Err(SkyWalletError::invalid_argument("at least one address is required"));
        }
        let outputs = self.output_set(&dedup_addresses(addresses), &[])?;
        balance_from_outputs(&outputs)
    }

    async fn ux_out(&self, uxid: &Sha256Hash) -> SkyWalletResult<SpentOutput> {
        self.check_failure("ux_out").await?;
        lock(&self.state)
            .ux_outs
            .iter()
            .find(|u| &u.uxid == uxid)
            .cloned()
            .ok_or_else(|| SkyWalletError::not_found(format!("uxout {}", uxid)))
    }

    async fn address_ux_outs(&self, address: &str) -> SkyWalletResult<Vec<SpentOutput>> {
        self.check_failure("address_ux_outs").await?;
        let address = check_address_arg(address)?;
        address.parse::<Address>()?;
        Ok(lock(&self.state)
            .ux_outs
            .iter()
            .filter(|u| u.owner_address == address)
            .cloned()
            .collect())
    }

    async fn health(&self) -> SkyWalletResult<HealthResponse> {
        self.check_failure("health").await?;
        Ok(HealthResponse {
            blockchain: self.metadata()?,
            version: self.build_info.clone(),
            open_connections: 0,
            uptime: "1h0m0s".to_string(),
        })
    }
}
