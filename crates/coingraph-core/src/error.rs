use bitcoin::{BlockHash, Txid};

use crate::types::BlockHeight;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Network or HTTP failure that survived the whole retry budget.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The node answered with a JSON-RPC error object. Never retried.
    #[error("JSON-RPC server error {code}: {message}")]
    Remote { code: i64, message: String },

    #[error("decode error: {0}")]
    Decode(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error(transparent)]
    NotFound(#[from] NotFound),

    #[error("invalid rpc configuration: {0}")]
    Config(String),
}

/// Final failure of an RPC call after every attempt was used up.
#[derive(Debug, thiserror::Error)]
#[error("rpc `{method}` failed after {attempts} attempt(s): {last}")]
pub struct TransportError {
    pub method: String,
    pub attempts: u32,
    #[source]
    pub last: AttemptError,
}

/// Why a single HTTP attempt did not produce a usable JSON-RPC envelope.
#[derive(Debug, thiserror::Error)]
pub enum AttemptError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },
}

/// The round trip and decoding succeeded but the referenced entity does not
/// exist in the node's view.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotFound {
    #[error("block not found")]
    Block,

    #[error("block {0} not found")]
    BlockHash(BlockHash),

    #[error("no block at height {0}")]
    BlockHeight(BlockHeight),

    #[error("transaction {0} not found")]
    Transaction(Txid),

    #[error("transaction {0} is not in a block")]
    Unconfirmed(Txid),

    #[error("no fee estimate for a {0}-block target")]
    FeeEstimate(u16),
}

impl CoreError {
    /// `true` when the failure means the requested entity does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
