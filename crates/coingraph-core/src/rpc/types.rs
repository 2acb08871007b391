//! RPC-specific types that do not belong to the shared domain model.

use bitcoin::BlockHash;
use serde::{Deserialize, Serialize};

// ==============================================================================
// Chain Info
// ==============================================================================

/// Basic chain information from `getblockchaininfo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainInfo {
    pub chain: String,
    pub blocks: u64,
    #[serde(rename = "bestblockhash")]
    pub best_block_hash: BlockHash,
    pub pruned: bool,
}
