//! Shared test helpers for `coingraph-core` unit tests.
//!
//! Builder functions for blocks and transactions, so that tests across
//! modules share a single source of truth for dummy entity construction.

use bitcoin::hashes::Hash;
use bitcoin::{Amount, BlockHash, OutPoint, TxMerkleNode, Txid, Wtxid};

use crate::types::{
    Block, BlockHeight, MemPoolEntry, MemPoolTrx, PubKeyScript, ScriptType, Transaction, TxIn,
    TxOut,
};

// ==============================================================================
// Hash Helpers
// ==============================================================================

/// Create a deterministic `Txid` from a single distinguishing byte.
pub fn txid_from_byte(b: u8) -> Txid {
    let mut bytes = [0u8; 32];
    bytes[0] = b;
    Txid::from_byte_array(bytes)
}

/// Create a deterministic `BlockHash` from a single distinguishing byte.
pub fn block_hash_from_byte(b: u8) -> BlockHash {
    let mut bytes = [0u8; 32];
    bytes[31] = b;
    BlockHash::from_byte_array(bytes)
}

// ==============================================================================
// Entity Builders
// ==============================================================================

/// Build a minimal `Block` with sane defaults. Override fields after
/// construction when needed.
pub fn make_block(hash: BlockHash, height: u32, tx_ids: Vec<Txid>) -> Block {
    Block {
        hash,
        confirmations: 1,
        stripped_size: 200,
        size: 250,
        weight: 800,
        height: BlockHeight(height),
        version: 0x2000_0000,
        version_hex: Some("20000000".into()),
        merkle_root: TxMerkleNode::all_zeros(),
        time: 1_700_000_000 + u64::from(height),
        median_time: 1_700_000_000,
        nonce: 0,
        bits: "207fffff".into(),
        difficulty: 4.656542373906925e-10,
        chain_work: "0000000000000000000000000000000000000000000000000000000000000002".into(),
        n_tx: Some(tx_ids.len() as u64),
        previous_block_hash: None,
        next_block_hash: None,
        tx_ids,
    }
}

/// Build a minimal one-in one-out `Transaction`, confirmed in `block_hash`
/// when given.
pub fn make_tx(txid: Txid, block_hash: Option<BlockHash>) -> Transaction {
    Transaction {
        txid,
        hash: Wtxid::from_byte_array(txid.to_byte_array()),
        version: 2,
        size: 250,
        vsize: 140,
        weight: 560,
        locktime: 0,
        block_hash,
        time: block_hash.map(|_| 1_700_000_000),
        block_time: block_hash.map(|_| 1_700_000_000),
        confirmations: block_hash.map(|_| 1),
        inputs: vec![spending_input(txid_from_byte(0xEE), 0)],
        outputs: vec![simple_output(5_000)],
    }
}

/// A coinbase input (no prevout).
pub fn coinbase_input() -> TxIn {
    TxIn {
        coinbase: Some("03a08601".into()),
        prevout: None,
        sequence: 0xFFFF_FFFF,
        script_sig: None,
        witness: Vec::new(),
    }
}

/// A spending input referencing `funding_txid:vout`.
pub fn spending_input(funding_txid: Txid, vout: u32) -> TxIn {
    TxIn {
        coinbase: None,
        prevout: Some(OutPoint::new(funding_txid, vout)),
        sequence: 0xFFFF_FFFE,
        script_sig: None,
        witness: Vec::new(),
    }
}

/// A P2WPKH output with the given satoshi value.
pub fn simple_output(sats: u64) -> TxOut {
    TxOut {
        value: Amount::from_sat(sats),
        n: 0,
        script_pub_key: Some(PubKeyScript {
            asm: Some("0 0102030405060708090a0b0c0d0e0f1011121314".into()),
            hex: Some("00140102030405060708090a0b0c0d0e0f1011121314".into()),
            script_type: ScriptType::P2wpkh,
            req_sigs: None,
            address: None,
            addresses: None,
        }),
    }
}

/// A lone mempool transaction (no ancestors or descendants) paying `fee_sats`.
pub fn make_mempool_entry(id: Txid, fee_sats: u64, vsize: u64) -> MemPoolTrx {
    MemPoolTrx {
        id,
        entry: MemPoolEntry {
            size: None,
            vsize: Some(vsize),
            weight: Some(vsize * 4),
            fee: Some(Amount::from_sat(fee_sats)),
            modified_fee: Some(Amount::from_sat(fee_sats)),
            fees: None,
            time: 1_700_000_000,
            height: 100,
            descendant_count: 1,
            descendant_size: vsize,
            descendant_fees: Some(fee_sats),
            ancestor_count: 1,
            ancestor_size: vsize,
            ancestor_fees: Some(fee_sats),
            depends: Vec::new(),
            spent_by: Vec::new(),
            bip125_replaceable: None,
        },
    }
}
