//! Domain entities decoded from the node's JSON-RPC payloads.
//!
//! Every entity is a standalone, immutable value. Relationships between them
//! (a block's transactions, a transaction's block) are kept as identifiers
//! and resolved on demand by [`crate::resolver::Resolver`].
//!
//! Field names on the wire follow the node's verbose RPC output, so the same
//! derives serve both decoding and re-encoding for clients.

use bitcoin::{Amount, BlockHash, OutPoint, TxMerkleNode, Txid, Wtxid};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::scalar::{self, epoch_to_utc};

// ==============================================================================
// Block Height
// ==============================================================================

/// A block height, wrapped for type safety.
///
/// `#[serde(transparent)]` keeps the JSON representation a bare integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockHeight(pub u32);

impl BlockHeight {
    pub const GENESIS: BlockHeight = BlockHeight(0);

    pub fn is_genesis(self) -> bool {
        self == Self::GENESIS
    }
}

impl From<u32> for BlockHeight {
    fn from(h: u32) -> Self {
        Self(h)
    }
}

impl From<BlockHeight> for u32 {
    fn from(h: BlockHeight) -> Self {
        h.0
    }
}

impl TryFrom<u64> for BlockHeight {
    type Error = std::num::TryFromIntError;

    fn try_from(h: u64) -> Result<Self, Self::Error> {
        u32::try_from(h).map(Self)
    }
}

impl std::ops::Deref for BlockHeight {
    type Target = u32;
    fn deref(&self) -> &u32 {
        &self.0
    }
}

impl std::fmt::Display for BlockHeight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

// ==============================================================================
// Block
// ==============================================================================

/// A block as returned by `getblock <hash> 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub hash: BlockHash,
    /// Signed: the node reports `-1` for blocks off the main chain.
    #[serde(deserialize_with = "scalar::text_or_int")]
    pub confirmations: i64,
    #[serde(rename = "strippedsize", default)]
    pub stripped_size: u64,
    pub size: u64,
    #[serde(default)]
    pub weight: u64,
    pub height: BlockHeight,
    pub version: i32,
    #[serde(rename = "versionHex", default)]
    pub version_hex: Option<String>,
    #[serde(rename = "merkleroot")]
    pub merkle_root: TxMerkleNode,
    #[serde(deserialize_with = "scalar::text_or_int")]
    pub time: u64,
    #[serde(rename = "mediantime", deserialize_with = "scalar::text_or_int")]
    pub median_time: u64,
    #[serde(deserialize_with = "scalar::text_or_int")]
    pub nonce: u32,
    pub bits: String,
    pub difficulty: f64,
    #[serde(rename = "chainwork")]
    pub chain_work: String,
    #[serde(rename = "nTx", default)]
    pub n_tx: Option<u64>,
    #[serde(rename = "previousblockhash", default)]
    pub previous_block_hash: Option<BlockHash>,
    #[serde(rename = "nextblockhash", default)]
    pub next_block_hash: Option<BlockHash>,
    /// Transaction ids in block order. Empty for genesis by node convention.
    #[serde(rename = "tx", default)]
    pub tx_ids: Vec<Txid>,
}

impl Block {
    pub fn time_utc(&self) -> Option<OffsetDateTime> {
        epoch_to_utc(self.time)
    }

    pub fn median_time_utc(&self) -> Option<OffsetDateTime> {
        epoch_to_utc(self.median_time)
    }
}

// ==============================================================================
// Transaction
// ==============================================================================

/// A transaction as returned by `getrawtransaction <txid> 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub txid: Txid,
    pub hash: Wtxid,
    pub version: i32,
    pub size: u64,
    pub vsize: u64,
    #[serde(default)]
    pub weight: u64,
    pub locktime: u32,
    /// `None` for mempool transactions.
    #[serde(rename = "blockhash", default)]
    pub block_hash: Option<BlockHash>,
    #[serde(default, deserialize_with = "scalar::opt_text_or_int")]
    pub time: Option<u64>,
    #[serde(rename = "blocktime", default, deserialize_with = "scalar::opt_text_or_int")]
    pub block_time: Option<u64>,
    #[serde(default, deserialize_with = "scalar::opt_text_or_int")]
    pub confirmations: Option<u64>,
    #[serde(rename = "vin")]
    pub inputs: Vec<TxIn>,
    #[serde(rename = "vout")]
    pub outputs: Vec<TxOut>,
}

impl Transaction {
    pub fn time_utc(&self) -> Option<OffsetDateTime> {
        self.time.and_then(epoch_to_utc)
    }

    pub fn block_time_utc(&self) -> Option<OffsetDateTime> {
        self.block_time.and_then(epoch_to_utc)
    }

    /// A coinbase transaction has exactly one input, and it carries the
    /// coinbase payload instead of a prevout.
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].is_coinbase()
    }

    /// Sum of all output values.
    pub fn total_output(&self) -> Option<Amount> {
        self.outputs
            .iter()
            .try_fold(Amount::ZERO, |acc, output| acc.checked_add(output.value))
    }
}

/// A transaction input: either the coinbase payload or a reference to the
/// output being spent, never both.
///
/// On the wire the outpoint is split into `txid` and `vout`, as the node
/// reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTxIn", into = "RawTxIn")]
pub struct TxIn {
    /// Hex coinbase payload, present only on a coinbase transaction's input.
    pub coinbase: Option<String>,
    /// The outpoint being spent. `None` exactly when `coinbase` is set.
    pub prevout: Option<OutPoint>,
    pub sequence: u32,
    pub script_sig: Option<SigScript>,
    pub witness: Vec<String>,
}

impl TxIn {
    pub fn is_coinbase(&self) -> bool {
        self.coinbase.is_some()
    }
}

/// Wire shape of a `vin` entry before the coinbase/prevout split is checked.
#[derive(Serialize, Deserialize)]
struct RawTxIn {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    coinbase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    txid: Option<Txid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    vout: Option<u32>,
    #[serde(rename = "scriptSig", default, skip_serializing_if = "Option::is_none")]
    script_sig: Option<SigScript>,
    #[serde(rename = "txinwitness", default, skip_serializing_if = "Vec::is_empty")]
    witness: Vec<String>,
    #[serde(deserialize_with = "scalar::text_or_int")]
    sequence: u32,
}

impl From<TxIn> for RawTxIn {
    fn from(input: TxIn) -> Self {
        RawTxIn {
            coinbase: input.coinbase,
            txid: input.prevout.map(|p| p.txid),
            vout: input.prevout.map(|p| p.vout),
            script_sig: input.script_sig,
            witness: input.witness,
            sequence: input.sequence,
        }
    }
}

impl TryFrom<RawTxIn> for TxIn {
    type Error = String;

    fn try_from(raw: RawTxIn) -> Result<Self, Self::Error> {
        let prevout = match (&raw.coinbase, raw.txid, raw.vout) {
            (Some(_), None, _) => None,
            (None, Some(txid), Some(vout)) => Some(OutPoint::new(txid, vout)),
            (Some(_), Some(_), _) => {
                return Err("vin has both coinbase and txid".to_owned());
            }
            (None, Some(_), None) => return Err("vin.vout missing for spending input".to_owned()),
            (None, None, _) => return Err("vin has neither coinbase nor txid".to_owned()),
        };

        Ok(TxIn {
            coinbase: raw.coinbase,
            prevout,
            sequence: raw.sequence,
            script_sig: raw.script_sig,
            witness: raw.witness,
        })
    }
}

/// Unlocking script of an input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigScript {
    pub asm: String,
    pub hex: String,
}

/// A transaction output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxOut {
    #[serde(with = "scalar::btc")]
    pub value: Amount,
    pub n: u32,
    #[serde(rename = "scriptPubKey", default)]
    pub script_pub_key: Option<PubKeyScript>,
}

/// Locking script of an output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubKeyScript {
    #[serde(default)]
    pub asm: Option<String>,
    #[serde(default)]
    pub hex: Option<String>,
    #[serde(rename = "type", default = "ScriptType::unknown")]
    pub script_type: ScriptType,
    #[serde(rename = "reqSigs", default, skip_serializing_if = "Option::is_none")]
    pub req_sigs: Option<u32>,
    /// Newer nodes report a single `address`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Older nodes report an `addresses` list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addresses: Option<Vec<String>>,
}

impl PubKeyScript {
    /// Every address the node associated with this script, whichever field
    /// it used to report them.
    pub fn all_addresses(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.address.iter().map(String::as_str).collect();
        if let Some(list) = &self.addresses {
            for addr in list {
                if !out.contains(&addr.as_str()) {
                    out.push(addr.as_str());
                }
            }
        }
        out
    }
}

// ==============================================================================
// Script Type Classification
// ==============================================================================

/// Output script type as named by the node (`scriptPubKey.type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScriptType {
    #[serde(rename = "pubkey")]
    P2pk,
    #[serde(rename = "pubkeyhash")]
    P2pkh,
    #[serde(rename = "scripthash")]
    P2sh,
    #[serde(rename = "witness_v0_keyhash")]
    P2wpkh,
    #[serde(rename = "witness_v0_scripthash")]
    P2wsh,
    #[serde(rename = "witness_v1_taproot")]
    P2tr,
    #[serde(rename = "anchor")]
    Anchor,
    #[serde(rename = "multisig")]
    BareMultisig,
    #[serde(rename = "nulldata")]
    OpReturn,
    #[serde(rename = "witness_unknown")]
    WitnessUnknown,
    #[serde(rename = "nonstandard")]
    NonStandard,
    #[serde(other, rename = "unknown")]
    Unknown,
}

impl ScriptType {
    fn unknown() -> Self {
        Self::Unknown
    }
}

impl std::fmt::Display for ScriptType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::P2pk => write!(f, "p2pk"),
            Self::P2pkh => write!(f, "p2pkh"),
            Self::P2sh => write!(f, "p2sh"),
            Self::P2wpkh => write!(f, "p2wpkh"),
            Self::P2wsh => write!(f, "p2wsh"),
            Self::P2tr => write!(f, "p2tr"),
            Self::Anchor => write!(f, "anchor"),
            Self::BareMultisig => write!(f, "bare_multisig"),
            Self::OpReturn => write!(f, "op_return"),
            Self::WitnessUnknown => write!(f, "witness_unknown"),
            Self::NonStandard => write!(f, "nonstandard"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

// ==============================================================================
// Mempool
// ==============================================================================

/// One entry of `getrawmempool true`.
///
/// The node returns a map keyed by txid; the key is injected as `id` when
/// the map is flattened into a sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemPoolTrx {
    pub id: Txid,
    #[serde(flatten)]
    pub entry: MemPoolEntry,
}

impl MemPoolTrx {
    pub fn time_utc(&self) -> Option<OffsetDateTime> {
        epoch_to_utc(self.entry.time)
    }
}

/// The value side of a `getrawmempool true` map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemPoolEntry {
    /// Legacy serialized size; newer nodes only report `vsize`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vsize: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<u64>,
    /// Legacy top-level fee in BTC.
    #[serde(default, with = "scalar::btc_opt", skip_serializing_if = "Option::is_none")]
    pub fee: Option<Amount>,
    #[serde(
        rename = "modifiedfee",
        default,
        with = "scalar::btc_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub modified_fee: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fees: Option<MemPoolFees>,
    #[serde(deserialize_with = "scalar::text_or_int")]
    pub time: u64,
    #[serde(deserialize_with = "scalar::text_or_int")]
    pub height: u64,
    #[serde(rename = "descendantcount")]
    pub descendant_count: u64,
    #[serde(rename = "descendantsize")]
    pub descendant_size: u64,
    /// Legacy aggregate in satoshis.
    #[serde(rename = "descendantfees", default, skip_serializing_if = "Option::is_none")]
    pub descendant_fees: Option<u64>,
    #[serde(rename = "ancestorcount")]
    pub ancestor_count: u64,
    #[serde(rename = "ancestorsize")]
    pub ancestor_size: u64,
    /// Legacy aggregate in satoshis.
    #[serde(rename = "ancestorfees", default, skip_serializing_if = "Option::is_none")]
    pub ancestor_fees: Option<u64>,
    #[serde(default)]
    pub depends: Vec<Txid>,
    #[serde(rename = "spentby", default)]
    pub spent_by: Vec<Txid>,
    #[serde(
        rename = "bip125-replaceable",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub bip125_replaceable: Option<bool>,
}

impl MemPoolEntry {
    /// Base fee, from the nested `fees` object when present.
    pub fn base_fee(&self) -> Option<Amount> {
        self.fees.as_ref().map(|f| f.base).or(self.fee)
    }

    /// Fee with prioritisation deltas applied.
    pub fn modified_fee(&self) -> Option<Amount> {
        self.fees.as_ref().map(|f| f.modified).or(self.modified_fee)
    }

    pub fn ancestor_fee(&self) -> Option<Amount> {
        self.fees
            .as_ref()
            .map(|f| f.ancestor)
            .or(self.ancestor_fees.map(Amount::from_sat))
    }

    pub fn descendant_fee(&self) -> Option<Amount> {
        self.fees
            .as_ref()
            .map(|f| f.descendant)
            .or(self.descendant_fees.map(Amount::from_sat))
    }

    /// Virtual size, falling back to the legacy `size` field.
    pub fn virtual_size(&self) -> Option<u64> {
        self.vsize.or(self.size)
    }
}

/// Nested fee breakdown reported by newer nodes, all in BTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemPoolFees {
    #[serde(with = "scalar::btc")]
    pub base: Amount,
    #[serde(with = "scalar::btc")]
    pub modified: Amount,
    #[serde(with = "scalar::btc")]
    pub ancestor: Amount,
    #[serde(with = "scalar::btc")]
    pub descendant: Amount,
}

// ==============================================================================
// Fee Estimate
// ==============================================================================

/// Result of `estimatesmartfee`, passed through as reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeEstimate {
    /// Fee rate in BTC per kvB. Absent when the node has no estimate.
    #[serde(rename = "feerate", default, with = "scalar::btc_opt")]
    pub fee_rate: Option<Amount>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    /// Block target the estimate is actually valid for.
    pub blocks: u32,
}
