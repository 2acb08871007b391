//! JSON views of core entities for HTTP clients.
//!
//! Entities serialize with the node's field names; every epoch timestamp also
//! gets an RFC 3339 sibling ending in `_utc`.

use serde::Serialize;
use serde_json::{Map, Value};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use coingraph_core::types::{Block, FeeEstimate, MemPoolTrx, Transaction};

use super::error::AppError;

pub(super) fn block(block: &Block) -> Result<Value, AppError> {
    let mut value = to_object(block)?;
    insert_utc(&mut value, "time_utc", block.time_utc());
    insert_utc(&mut value, "mediantime_utc", block.median_time_utc());
    Ok(Value::Object(value))
}

pub(super) fn transaction(tx: &Transaction) -> Result<Value, AppError> {
    let mut value = to_object(tx)?;
    insert_utc(&mut value, "time_utc", tx.time_utc());
    insert_utc(&mut value, "blocktime_utc", tx.block_time_utc());
    Ok(Value::Object(value))
}

pub(super) fn mempool_entry(entry: &MemPoolTrx) -> Result<Value, AppError> {
    let mut value = to_object(entry)?;
    insert_utc(&mut value, "time_utc", entry.time_utc());
    Ok(Value::Object(value))
}

pub(super) fn mempool(entries: &[MemPoolTrx]) -> Result<Value, AppError> {
    entries
        .iter()
        .map(mempool_entry)
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}

pub(super) fn fee_estimate(estimate: &FeeEstimate) -> Result<Value, AppError> {
    to_object(estimate).map(Value::Object)
}

fn to_object<T: Serialize>(entity: &T) -> Result<Map<String, Value>, AppError> {
    match serde_json::to_value(entity) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(AppError::Internal(format!(
            "entity serialized to a non-object: {other}"
        ))),
        Err(e) => Err(AppError::Internal(format!("serialize entity: {e}"))),
    }
}

fn insert_utc(map: &mut Map<String, Value>, key: &str, at: Option<OffsetDateTime>) {
    let formatted = at.and_then(|t| t.format(&Rfc3339).ok());
    map.insert(
        key.to_owned(),
        formatted.map(Value::String).unwrap_or(Value::Null),
    );
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bitcoin::hashes::Hash;
    use bitcoin::{Amount, Txid};
    use coingraph_core::types::MemPoolEntry;

    use super::*;

    #[test]
    fn mempool_entry_gets_id_and_utc_time() {
        let id = Txid::from_byte_array([9; 32]);
        let entry = MemPoolTrx {
            id,
            entry: MemPoolEntry {
                size: None,
                vsize: Some(141),
                weight: Some(561),
                fee: Some(Amount::from_sat(282)),
                modified_fee: None,
                fees: None,
                time: 1_231_006_505,
                height: 100,
                descendant_count: 1,
                descendant_size: 141,
                descendant_fees: None,
                ancestor_count: 1,
                ancestor_size: 141,
                ancestor_fees: None,
                depends: Vec::new(),
                spent_by: Vec::new(),
                bip125_replaceable: None,
            },
        };

        let json = mempool_entry(&entry).expect("entry must render");
        assert_eq!(json["id"], id.to_string());
        assert_eq!(json["fee"], "0.00000282");
        assert_eq!(json["vsize"], 141);
        assert_eq!(json["time_utc"], "2009-01-03T18:15:05Z");
    }

    #[test]
    fn fee_estimate_amount_is_exact_string() {
        let estimate = FeeEstimate {
            fee_rate: Some(Amount::from_str("0.00012345 BTC").expect("valid amount")),
            errors: Vec::new(),
            blocks: 2,
        };
        let json = fee_estimate(&estimate).expect("estimate must render");
        assert_eq!(json, serde_json::json!({"feerate": "0.00012345", "blocks": 2}));
    }
}
