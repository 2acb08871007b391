//! Scalar codecs shared by the RPC decoders and the query boundary.
//!
//! Upstream nodes are not consistent about how they encode numbers: some
//! fields arrive as JSON integers, some as decimal strings, and monetary
//! values arrive as JSON floats in BTC. Everything here decodes into exact
//! Rust types (`u64`, `i64`, [`Amount`]) so no value is silently rounded.

use std::fmt::Display;
use std::str::FromStr;

use bitcoin::{Amount, Denomination};
use serde::{Deserialize, Deserializer, Serializer};
use time::OffsetDateTime;

// ==============================================================================
// Text-or-Integer Scalars
// ==============================================================================

/// Representations tried, in order, when decoding an integer scalar.
///
/// `untagged` attempts the variants top to bottom, so a string always wins
/// over a number. Keep this order: permissive upstreams rely on it.
#[derive(Deserialize)]
#[serde(untagged)]
enum IntRepr {
    Text(String),
    Unsigned(u64),
    Signed(i64),
}

/// Decode an integer that may be encoded either as text or as a JSON number.
pub fn decode_int<T>(value: &serde_json::Value) -> Result<T, String>
where
    T: FromStr + TryFrom<u64> + TryFrom<i64>,
    <T as FromStr>::Err: Display,
{
    let repr = IntRepr::deserialize(value)
        .map_err(|_| format!("expected integer or integer string, got {value}"))?;
    from_repr(repr)
}

fn from_repr<T>(repr: IntRepr) -> Result<T, String>
where
    T: FromStr + TryFrom<u64> + TryFrom<i64>,
    <T as FromStr>::Err: Display,
{
    match repr {
        IntRepr::Text(s) => s
            .trim()
            .parse::<T>()
            .map_err(|e| format!("invalid integer string `{s}`: {e}")),
        IntRepr::Unsigned(n) => T::try_from(n).map_err(|_| format!("{n} out of range")),
        IntRepr::Signed(n) => T::try_from(n).map_err(|_| format!("{n} out of range")),
    }
}

/// `serde(deserialize_with)` adapter for required text-or-integer fields.
pub fn text_or_int<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + TryFrom<u64> + TryFrom<i64>,
    <T as FromStr>::Err: Display,
{
    let repr = IntRepr::deserialize(deserializer)?;
    from_repr(repr).map_err(serde::de::Error::custom)
}

/// `serde(deserialize_with)` adapter for optional text-or-integer fields.
/// Pair with `#[serde(default)]` so an absent field decodes as `None`.
pub fn opt_text_or_int<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + TryFrom<u64> + TryFrom<i64>,
    <T as FromStr>::Err: Display,
{
    match Option::<IntRepr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(repr) => from_repr(repr).map(Some).map_err(serde::de::Error::custom),
    }
}

// ==============================================================================
// BTC Amounts
// ==============================================================================

/// Parse a BTC amount from a JSON value without losing satoshi precision.
///
/// Numbers are first re-read through their shortest decimal rendering, which
/// is exact for every value with at most eight decimals. Renderings the
/// decimal parser refuses (scientific notation such as `1e-8`) fall back to
/// `Amount::from_float_in`. Strings are parsed as decimal BTC.
pub fn parse_btc_amount(value: &serde_json::Value) -> Result<Amount, String> {
    match value {
        serde_json::Value::Number(n) => {
            if let Ok(amount) = Amount::from_str_in(&n.to_string(), Denomination::Bitcoin) {
                return Ok(amount);
            }
            let parsed = n
                .as_f64()
                .ok_or_else(|| format!("invalid BTC amount `{value}`"))?;
            Amount::from_float_in(parsed, Denomination::Bitcoin)
                .map_err(|e| format!("invalid BTC amount `{value}`: {e}"))
        }
        serde_json::Value::String(s) => Amount::from_str_in(s, Denomination::Bitcoin)
            .map_err(|e| format!("invalid BTC amount `{s}`: {e}")),
        _ => Err(format!("expected numeric BTC amount, got: {value}")),
    }
}

/// Render an amount as an exact decimal BTC string.
pub fn format_btc_amount(amount: Amount) -> String {
    amount.to_string_in(Denomination::Bitcoin)
}

/// `serde(with)` codec for required BTC amounts.
pub mod btc {
    use super::*;

    pub fn serialize<S: Serializer>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_btc_amount(*amount))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        parse_btc_amount(&value).map_err(serde::de::Error::custom)
    }
}

/// `serde(with)` codec for optional BTC amounts. Pair with `#[serde(default)]`.
pub mod btc_opt {
    use super::*;

    pub fn serialize<S: Serializer>(
        amount: &Option<Amount>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match amount {
            Some(amount) => serializer.serialize_some(&format_btc_amount(*amount)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Amount>, D::Error> {
        match Option::<serde_json::Value>::deserialize(deserializer)? {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(value) => parse_btc_amount(&value)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

// ==============================================================================
// Epoch Timestamps
// ==============================================================================

/// Convert epoch seconds reported by the node into UTC calendar time.
/// Returns `None` when the value is outside the representable range.
pub fn epoch_to_utc(secs: u64) -> Option<OffsetDateTime> {
    let secs = i64::try_from(secs).ok()?;
    OffsetDateTime::from_unix_timestamp(secs).ok()
}
