//! Transactions and their binary codec
//!
//! Wire layout, all integers little-endian:
//!
//! ```text
//! Length u32 | Type u8 | InnerHash [32]
//! SigCount u32 | Sig [65] * SigCount
//! InCount  u32 | In  [32] * InCount
//! OutCount u32 | (Address [21] | Coins u64 | Hours u64) * OutCount
//! ```
//!
//! `Length` is the size of the whole encoding including itself. The inner
//! hash covers the encoded inputs and outputs only, so signatures can commit
//! to it before they exist.

use std::collections::HashSet;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    crypto::{
        hash::{add_sha256, Sha256Hash},
        keys::{pubkey_from_sig, sign_hash, SecKey, Sig},
    },
    data_structures::{
        address::Address,
        droplet,
        ux_out::UxBody,
    },
    errors::{SkyWalletError, SkyWalletResult},
};

/// Smallest possible encoding: header plus three empty sequences
const MIN_ENCODED_LEN: usize = 4 + 1 + 32 + 4 + 4 + 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub struct TransactionOutput {
    pub address: Address,
    pub coins: u64,
    pub hours: u64,
}

impl TransactionOutput {
    pub fn new(address: Address, coins: u64, hours: u64) -> Self {
        Self {
            address,
            coins,
            hours,
        }
    }

    /// Hash of the unspent output this creates when `txid` is confirmed
    pub fn ux_id(&self, txid: &Sha256Hash) -> Sha256Hash {
        UxBody {
            src_transaction: *txid,
            address: self.address,
            coins: self.coins,
            hours: self.hours,
        }
        .hash()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Transaction {
    pub length: u32,
    pub tx_type: u8,
    pub inner_hash: Sha256Hash,
    pub sigs: Vec<Sig>,
    pub inputs: Vec<Sha256Hash>,
    pub outputs: Vec<TransactionOutput>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a transaction from its hex encoding
    pub fn decode_raw(raw: &str) -> SkyWalletResult<Self> {
        let bytes = hex::decode(raw.trim())?;
        Self::decode(&bytes)
    }

    /// Decode a transaction from bytes, rejecting short, long or
    /// inconsistently sized payloads
    pub fn decode(bytes: &[u8]) -> SkyWalletResult<Self> {
        if bytes.len() < MIN_ENCODED_LEN {
            return Err(SkyWalletError::truncated(format!(
                "transaction needs at least {} bytes, got {}",
                MIN_ENCODED_LEN,
                bytes.len()
            )));
        }

        let mut cursor = bytes;
        // Every field accepts any bit pattern, so running out of input is the
        // only way deserialization can fail
        let txn = Transaction::deserialize(&mut cursor).map_err(|e| {
            SkyWalletError::truncated(format!("transaction body shorter than declared counts: {}", e))
        })?;

        if !cursor.is_empty() {
            return Err(SkyWalletError::truncated(format!(
                "{} trailing bytes after transaction",
                cursor.len()
            )));
        }
        if txn.length as usize != bytes.len() {
            return Err(SkyWalletError::truncated(format!(
                "declared length {} does not match encoded size {}",
                txn.length,
                bytes.len()
            )));
        }

        debug!(
            "Decoded transaction: {} sigs, {} inputs, {} outputs",
            txn.sigs.len(),
            txn.inputs.len(),
            txn.outputs.len()
        );
        Ok(txn)
    }

    /// Canonical binary encoding
    pub fn encode(&self) -> Vec<u8> {
        // Writing into a Vec cannot fail
        borsh::to_vec(self).unwrap_or_default()
    }

    pub fn encode_hex(&self) -> String {
        hex::encode(self.encode())
    }

    /// Size of the canonical encoding
    pub fn size(&self) -> usize {
        MIN_ENCODED_LEN + self.sigs.len() * Sig::LEN + self.inputs.len() * Sha256Hash::LEN
            + self.outputs.len() * (21 + 8 + 8)
    }

    /// SHA256 over the encoded inputs and outputs
    pub fn hash_inner(&self) -> Sha256Hash {
        let mut buf = borsh::to_vec(&self.inputs).unwrap_or_default();
        buf.extend(borsh::to_vec(&self.outputs).unwrap_or_default());
        Sha256Hash::digest(&buf)
    }

    /// Transaction id: SHA256 of the full encoding
    pub fn hash(&self) -> Sha256Hash {
        Sha256Hash::digest(&self.encode())
    }

    pub fn push_input(&mut self, ux_hash: Sha256Hash) {
        self.inputs.push(ux_hash);
    }

    pub fn push_output(&mut self, address: Address, coins: u64, hours: u64) {
        self.outputs.push(TransactionOutput::new(address, coins, hours));
    }

    /// Recompute Length and InnerHash after inputs, outputs or sigs changed
    pub fn update_header(&mut self) -> SkyWalletResult<()> {
        self.length = u32::try_from(self.size())
            .map_err(|_| SkyWalletError::invalid_argument("transaction too large"))?;
        self.tx_type = 0;
        self.inner_hash = self.hash_inner();
        Ok(())
    }

    /// Hash signed for input `i`
    pub fn signing_hash(&self, inner_hash: &Sha256Hash, i: usize) -> SkyWalletResult<Sha256Hash> {
        let input = self
            .inputs
            .get(i)
            .ok_or_else(|| SkyWalletError::invalid_argument(format!("no input at index {}", i)))?;
        Ok(add_sha256(inner_hash, input))
    }

    /// Sign every input with the matching key, then refresh the header
    pub fn sign_inputs(&mut self, keys: &[SecKey]) -> SkyWalletResult<()> {
        if !self.sigs.is_empty() {
            return Err(SkyWalletError::invalid_argument("transaction already signed"));
        }
        if keys.len() != self.inputs.len() {
            return Err(SkyWalletError::invalid_argument(format!(
                "expected {} keys, got {}",
                self.inputs.len(),
                keys.len()
            )));
        }

        let inner = self.hash_inner();
        let mut sigs = Vec::with_capacity(keys.len());
        for (i, key) in keys.iter().enumerate() {
            sigs.push(sign_hash(&self.signing_hash(&inner, i)?, key)?);
        }
        self.sigs = sigs;
        self.update_header()
    }

    /// Check each signature against the owner of the spent output
    pub fn verify_input_signatures(&self, owners: &[Address]) -> SkyWalletResult<()> {
        if owners.len() != self.inputs.len() || self.sigs.len() != self.inputs.len() {
            return Err(SkyWalletError::invalid_argument(
                "signature, input and owner counts differ",
            ));
        }

        for (i, owner) in owners.iter().enumerate() {
            let hash = self.signing_hash(&self.inner_hash, i)?;
            let pubkey = pubkey_from_sig(&self.sigs[i], &hash)?;
            owner.verify(&pubkey).map_err(|e| {
                SkyWalletError::invalid_argument(format!("signature {} invalid: {}", i, e))
            })?;
        }
        Ok(())
    }

    /// Structural checks a transaction must pass before it can be accepted
    pub fn verify(&self) -> SkyWalletResult<()> {
        let invalid = |msg: &str| SkyWalletError::invalid_argument(format!("invalid transaction: {}", msg));

        if self.inputs.is_empty() {
            return Err(invalid("no inputs"));
        }
        if self.outputs.is_empty() {
            return Err(invalid("no outputs"));
        }
        if self.sigs.len() != self.inputs.len() {
            return Err(invalid("invalid number of signatures"));
        }
        if self.length as usize != self.size() {
            return Err(invalid("length does not match encoded size"));
        }
        if self.inner_hash != self.hash_inner() {
            return Err(invalid("inner hash does not match computed hash"));
        }
        if self.sigs.iter().any(|s| s.is_zero()) {
            return Err(invalid("unsigned input"));
        }

        let mut seen = HashSet::with_capacity(self.inputs.len());
        if !self.inputs.iter().all(|i| seen.insert(*i)) {
            return Err(invalid("duplicate spend"));
        }

        let txid = self.hash();
        let mut ux_ids = HashSet::with_capacity(self.outputs.len());
        let mut total: u64 = 0;
        for out in &self.outputs {
            if out.coins == 0 {
                return Err(invalid("zero coin output"));
            }
            if !ux_ids.insert(out.ux_id(&txid)) {
                return Err(invalid("duplicate output"));
            }
            total = total
                .checked_add(out.coins)
                .ok_or_else(|| invalid("output coins overflow"))?;
        }
        Ok(())
    }

    /// JSON rendering used by the node API and the CLI
    pub fn to_readable(&self) -> ReadableTransaction {
        let txid = self.hash();
        ReadableTransaction {
            length: self.length,
            tx_type: self.tx_type,
            txid,
            inner_hash: self.inner_hash,
            sigs: self.sigs.clone(),
            inputs: self.inputs.clone(),
            outputs: self
                .outputs
                .iter()
                .map(|o| ReadableTransactionOutput {
                    uxid: o.ux_id(&txid),
                    dst: o.address,
                    coins: o.coins,
                    hours: o.hours,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadableTransactionOutput {
    pub uxid: Sha256Hash,
    pub dst: Address,
    #[serde(with = "droplet::serde_coins")]
    pub coins: u64,
    pub hours: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadableTransaction {
    pub length: u32,
    #[serde(rename = "type")]
    pub tx_type: u8,
    pub txid: Sha256Hash,
    pub inner_hash: Sha256Hash,
    pub sigs: Vec<Sig>,
    pub inputs: Vec<Sha256Hash>,
    pub outputs: Vec<ReadableTransactionOutput>,
}

impl ReadableTransaction {
    /// Rebuild the binary transaction, checking the reported txid
    pub fn to_transaction(&self) -> SkyWalletResult<Transaction> {
        let txn = Transaction {
            length: self.length,
            tx_type: self.tx_type,
            inner_hash: self.inner_hash,
            sigs: self.sigs.clone(),
            inputs: self.inputs.clone(),
            outputs: self
                .outputs
                .iter()
                .map(|o| TransactionOutput::new(o.dst, o.coins, o.hours))
                .collect(),
        };

        let txid = txn.hash();
        if txid != self.txid {
            return Err(SkyWalletError::invalid_encoding(format!(
                "transaction id mismatch: reported {}, computed {}",
                self.txid, txid
            )));
        }
        Ok(txn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::deterministic::generate_deterministic_key_pairs_seed;
    use crate::crypto::keys::PubKey;
    use crate::errors::ErrorKind;
    use crate::hex_utils::HexEncodable;

    const RAW_TX: &str = "2601000000a1d3345ac47f897f24084b1c6b9bd6e03fc92887050d0748bdab5e639c1fdcd401000000a2a10f07e0e06cf6ba3e793b3186388a126591ee230b3f387617f1ccb6376a3f18e094bd3f7719aa8191c00764f323872f5192da393852bd85dab70b13409d2b01010000004d78de698a33abcfff22391c043b57a56bb0efbdc4a5b975bf8e7889668896bc0400000000bae12bbf671abeb1181fc85f1c01cdfee55deb97980c9c0a00000000543600000000000000373bb3675cbf3880bba3f3de7eb078925b8a72ad0095ba0a000000001c12000000000000008829025fe45b48f29795893a642bdaa89b2bb40e40d2df03000000001c12000000000000008001532c3a705e7e62bb0bb80630ecc21a87ec09c0fc9b01000000001b12000000000000";

    #[test]
    fn test_decode_raw_fields() {
        let txn = Transaction::decode_raw(RAW_TX).unwrap();
        assert_eq!(txn.length, 294);
        assert_eq!(txn.tx_type, 0);
        assert_eq!(
            txn.inner_hash.to_hex(),
            "a1d3345ac47f897f24084b1c6b9bd6e03fc92887050d0748bdab5e639c1fdcd4"
        );
        assert_eq!(txn.sigs.len(), 1);
        assert_eq!(
            txn.inputs,
            vec![Sha256Hash::from_hex("4d78de698a33abcfff22391c043b57a56bb0efbdc4a5b975bf8e7889668896bc").unwrap()]
        );
        assert_eq!(txn.outputs.len(), 4);
        assert_eq!(txn.outputs[0].address.to_string(), "2JCPnb1212XWQn8GUsQyv4HuB5VrgGHzb7N");
        assert_eq!(txn.outputs[0].coins, 177_999_000);
        assert_eq!(txn.outputs[0].hours, 13_908);
        assert_eq!(txn.outputs[3].hours, 4_635);
    }

    #[test]
    fn test_inner_hash_matches_encoded_value() {
        let txn = Transaction::decode_raw(RAW_TX).unwrap();
        assert_eq!(txn.hash_inner(), txn.inner_hash);
        assert_eq!(txn.size(), 294);
    }

    #[test]
    fn test_encode_reproduces_input() {
        let txn = Transaction::decode_raw(RAW_TX).unwrap();
        assert_eq!(txn.encode_hex(), RAW_TX);
        assert_eq!(
            txn.hash().to_hex(),
            "a121fe93d0ddebc50e6916adebb524b5b4f087b7a35904b35586f908e3b6b09f"
        );
    }

    #[test]
    fn test_odd_length_hex() {
        let err = Transaction::decode_raw("2601000000a1d").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidEncoding);
        assert_eq!(err.to_string(), "encoding/hex: odd length hex string");
    }

    #[test]
    fn test_non_hex_characters() {
        let err = Transaction::decode_raw("zz01").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidEncoding);
    }

    #[test]
    fn test_truncated_payloads() {
        let bytes = hex::decode(RAW_TX).unwrap();
        for cut in [0, 10, 44, 100, bytes.len() - 1] {
            let err = Transaction::decode(&bytes[..cut]).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::TruncatedData, "cut at {}", cut);
        }
    }

    #[test]
    fn test_trailing_bytes() {
        let mut bytes = hex::decode(RAW_TX).unwrap();
        bytes.push(0);
        assert_eq!(Transaction::decode(&bytes).unwrap_err().kind(), ErrorKind::TruncatedData);
    }

    #[test]
    fn test_count_mismatch() {
        let mut bytes = hex::decode(RAW_TX).unwrap();
        // Bump the output count from 4 to 5
        let out_count_offset = 4 + 1 + 32 + 4 + 65 + 4 + 32;
        bytes[out_count_offset] = 5;
        assert_eq!(Transaction::decode(&bytes).unwrap_err().kind(), ErrorKind::TruncatedData);
    }

    #[test]
    fn test_length_prefix_mismatch() {
        let mut bytes = hex::decode(RAW_TX).unwrap();
        bytes[0] = 0x27;
        assert_eq!(Transaction::decode(&bytes).unwrap_err().kind(), ErrorKind::TruncatedData);
    }

    #[test]
    fn test_readable_outputs() {
        let readable = Transaction::decode_raw(RAW_TX).unwrap().to_readable();
        assert_eq!(
            readable.txid.to_hex(),
            "a121fe93d0ddebc50e6916adebb524b5b4f087b7a35904b35586f908e3b6b09f"
        );
        assert_eq!(
            readable.outputs[0].uxid.to_hex(),
            "cf3a56d79a41112dbb1b2e78a61007071cfe23f1ea5acb7674c0d5e0e432c2ce"
        );
        let json = serde_json::to_value(&readable.outputs[0]).unwrap();
        assert_eq!(json["coins"], "177.999000");
        assert_eq!(json["dst"], "2JCPnb1212XWQn8GUsQyv4HuB5VrgGHzb7N");

        let back = readable.to_transaction().unwrap();
        assert_eq!(back.encode_hex(), RAW_TX);
    }

    #[test]
    fn test_sign_and_verify_inputs() {
        let (_, keys) = generate_deterministic_key_pairs_seed(b"signer", 2).unwrap();
        let owners: Vec<Address> = keys.iter().map(|(p, _)| Address::from_pubkey(p)).collect();
        let secs: Vec<SecKey> = keys.iter().map(|(_, s)| s.clone()).collect();

        let mut txn = Transaction::new();
        txn.push_input(Sha256Hash::digest(b"ux1"));
        txn.push_input(Sha256Hash::digest(b"ux2"));
        txn.push_output(owners[0], 1_000_000, 10);
        txn.sign_inputs(&secs).unwrap();

        assert!(txn.verify().is_ok());
        assert!(txn.verify_input_signatures(&owners).is_ok());

        let swapped = vec![owners[1], owners[0]];
        assert!(txn.verify_input_signatures(&swapped).is_err());

        let decoded = Transaction::decode(&txn.encode()).unwrap();
        assert_eq!(decoded, txn);
    }

    #[test]
    fn test_verify_rejects_bad_transactions() {
        let (_, keys) = generate_deterministic_key_pairs_seed(b"verify", 1).unwrap();
        let pubkey: PubKey = keys[0].0;
        let sec = keys[0].1.clone();

        let mut no_inputs = Transaction::new();
        no_inputs.push_output(Address::from_pubkey(&pubkey), 1, 0);
        no_inputs.update_header().unwrap();
        assert!(no_inputs.verify().is_err());

        let mut zero_coins = Transaction::new();
        zero_coins.push_input(Sha256Hash::digest(b"ux"));
        zero_coins.push_output(Address::from_pubkey(&pubkey), 0, 0);
        zero_coins.sign_inputs(&[sec.clone()]).unwrap();
        assert!(zero_coins.verify().unwrap_err().to_string().contains("zero coin output"));

        let mut dup = Transaction::new();
        dup.push_input(Sha256Hash::digest(b"ux"));
        dup.push_input(Sha256Hash::digest(b"ux"));
        dup.push_output(Address::from_pubkey(&pubkey), 5, 0);
        dup.sign_inputs(&[sec.clone(), sec]).unwrap();
        assert!(dup.verify().unwrap_err().to_string().contains("duplicate spend"));
    }

    #[test]
    fn test_sign_requires_matching_key_count() {
        let mut txn = Transaction::new();
        txn.push_input(Sha256Hash::digest(b"ux"));
        assert!(txn.sign_inputs(&[]).is_err());
    }
}
