use std::collections::HashMap;

use bitcoin::{BlockHash, Txid};
use serde::de::DeserializeOwned;

use crate::error::CoreError;
use crate::types::{Block, FeeEstimate, MemPoolEntry, MemPoolTrx, Transaction};

use crate::rpc::types::ChainInfo;

/// Decode a call result into `T`, mapping any mismatch to `Decode`.
pub(super) fn decode_result<T: DeserializeOwned>(
    raw: serde_json::Value,
    what: &str,
) -> Result<T, CoreError> {
    serde_json::from_value(raw).map_err(|e| CoreError::Decode(format!("invalid {what} result: {e}")))
}

/// Decode a result that the node may legitimately leave `null`.
pub(super) fn decode_optional<T: DeserializeOwned>(
    raw: serde_json::Value,
    what: &str,
) -> Result<Option<T>, CoreError> {
    if raw.is_null() {
        return Ok(None);
    }
    decode_result(raw, what).map(Some)
}

pub(super) fn parse_block(raw: serde_json::Value) -> Result<Option<Block>, CoreError> {
    decode_optional(raw, "getblock")
}

pub(super) fn parse_block_hash(raw: serde_json::Value) -> Result<Option<BlockHash>, CoreError> {
    match raw {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(s) if s.is_empty() => Ok(None),
        serde_json::Value::String(s) => s
            .parse()
            .map(Some)
            .map_err(|e| CoreError::Decode(format!("invalid getblockhash result `{s}`: {e}"))),
        other => Err(CoreError::Decode(format!(
            "invalid getblockhash result: expected hex string, got {other}"
        ))),
    }
}

pub(super) fn parse_difficulty(raw: serde_json::Value) -> Result<f64, CoreError> {
    raw.as_f64().ok_or_else(|| {
        CoreError::Decode(format!("invalid getdifficulty result: expected number, got {raw}"))
    })
}

pub(super) fn parse_transaction(raw: serde_json::Value) -> Result<Option<Transaction>, CoreError> {
    decode_optional(raw, "getrawtransaction")
}

pub(super) fn parse_fee_estimate(raw: serde_json::Value) -> Result<Option<FeeEstimate>, CoreError> {
    decode_optional(raw, "estimatesmartfee")
}

/// Flatten the `txid -> entry` map of `getrawmempool true` into a sequence,
/// injecting each key as the entry's `id`. Order is unspecified.
pub(super) fn parse_mempool(raw: serde_json::Value) -> Result<Vec<MemPoolTrx>, CoreError> {
    if raw.is_null() {
        return Ok(Vec::new());
    }
    let entries: HashMap<Txid, MemPoolEntry> = decode_result(raw, "getrawmempool")?;
    Ok(entries
        .into_iter()
        .map(|(id, entry)| MemPoolTrx { id, entry })
        .collect())
}

pub(super) fn parse_chain_info(raw: serde_json::Value) -> Result<ChainInfo, CoreError> {
    decode_result(raw, "getblockchaininfo")
}
