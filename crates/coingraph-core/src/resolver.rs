use std::sync::Arc;

use bitcoin::{BlockHash, Txid};
use futures::stream::{self, StreamExt, TryStreamExt};

use crate::error::{CoreError, NotFound};
use crate::rpc::NodeRpc;
use crate::types::{Block, BlockHeight, FeeEstimate, MemPoolTrx, Transaction};

/// Smallest confirmation target `estimatesmartfee` accepts.
pub const MIN_FEE_TARGET: i64 = 1;
/// Largest confirmation target `estimatesmartfee` accepts.
pub const MAX_FEE_TARGET: i64 = 1008;

/// Default number of transaction lookups in flight for one block.
pub const DEFAULT_FANOUT_CONCURRENCY: usize = 4;

// ==============================================================================
// Resolver
// ==============================================================================

/// Turns query fields into node RPC calls.
///
/// One operation per top-level field and one per relationship. Nothing is
/// fetched eagerly and nothing is cached: every call goes to the node, so
/// two sibling fields asking for the same entity fetch it twice.
#[derive(Clone)]
pub struct Resolver {
    rpc: Arc<dyn NodeRpc>,
    fanout_concurrency: usize,
}

impl Resolver {
    pub fn new(rpc: Arc<dyn NodeRpc>) -> Self {
        Self {
            rpc,
            fanout_concurrency: DEFAULT_FANOUT_CONCURRENCY,
        }
    }

    /// Bound the number of concurrent lookups in relationship fan-out.
    /// Zero is treated as one.
    pub fn with_fanout_concurrency(mut self, concurrency: usize) -> Self {
        self.fanout_concurrency = concurrency.max(1);
        self
    }

    pub fn fanout_concurrency(&self) -> usize {
        self.fanout_concurrency
    }

    pub fn rpc(&self) -> &dyn NodeRpc {
        self.rpc.as_ref()
    }

    // ==========================================================================
    // Top-level fields
    // ==========================================================================

    /// `block(hash?, height?)`.
    ///
    /// With a height this is `getblockhash` followed by `getblock`; with a
    /// hash it is a single `getblock`. Giving neither is a miss, giving both
    /// is rejected before any call.
    pub async fn block(
        &self,
        hash: Option<BlockHash>,
        height: Option<i64>,
    ) -> Result<Block, CoreError> {
        match (hash, height) {
            (Some(_), Some(_)) => Err(CoreError::Validation(
                "block accepts either hash or height, not both".to_owned(),
            )),
            (Some(hash), None) => self.block_by_hash(hash).await,
            (None, Some(height)) => {
                let height = u64::try_from(height)
                    .ok()
                    .and_then(|h| BlockHeight::try_from(h).ok())
                    .ok_or_else(|| {
                        CoreError::Validation(format!("block height {height} is out of range"))
                    })?;
                self.block_by_height(height).await
            }
            (None, None) => Err(NotFound::Block.into()),
        }
    }

    pub async fn block_by_hash(&self, hash: BlockHash) -> Result<Block, CoreError> {
        self.rpc
            .get_block(&hash)
            .await?
            .ok_or_else(|| NotFound::BlockHash(hash).into())
    }

    pub async fn block_by_height(&self, height: BlockHeight) -> Result<Block, CoreError> {
        let hash = self
            .rpc
            .get_block_hash(height)
            .await?
            .ok_or(NotFound::BlockHeight(height))?;
        self.block_by_hash(hash).await
    }

    pub async fn difficulty(&self) -> Result<f64, CoreError> {
        self.rpc.get_difficulty().await
    }

    pub async fn transaction(&self, txid: Txid) -> Result<Transaction, CoreError> {
        self.rpc
            .get_raw_transaction(&txid)
            .await?
            .ok_or_else(|| NotFound::Transaction(txid).into())
    }

    /// `estimatefee(blocks)`. The target must lie in `1..=1008`; anything else
    /// is rejected without contacting the node.
    pub async fn estimate_fee(&self, blocks: i64) -> Result<FeeEstimate, CoreError> {
        if !(MIN_FEE_TARGET..=MAX_FEE_TARGET).contains(&blocks) {
            return Err(CoreError::Validation(format!(
                "blocks must be between {MIN_FEE_TARGET} and {MAX_FEE_TARGET}, got {blocks}"
            )));
        }
        let target = u16::try_from(blocks)
            .map_err(|_| CoreError::Validation(format!("blocks {blocks} is out of range")))?;

        match self.rpc.estimate_smart_fee(target).await? {
            Some(estimate) if estimate.fee_rate.is_some() => Ok(estimate),
            _ => Err(NotFound::FeeEstimate(target).into()),
        }
    }

    pub async fn mempool(&self) -> Result<Vec<MemPoolTrx>, CoreError> {
        self.rpc.get_raw_mempool().await
    }

    // ==========================================================================
    // Relationships
    // ==========================================================================

    /// `block.transactions`: every transaction of `block`, in block order.
    ///
    /// The genesis block yields an empty list without any call. Otherwise one
    /// lookup per id (duplicates included), at most `fanout_concurrency` in
    /// flight. The first failure fails the whole list; lookups not yet
    /// started are never issued and in-flight ones are dropped.
    pub async fn block_transactions(&self, block: &Block) -> Result<Vec<Transaction>, CoreError> {
        if block.height.is_genesis() {
            return Ok(Vec::new());
        }

        tracing::debug!(
            block.hash = %block.hash,
            tx_count = block.tx_ids.len(),
            concurrency = self.fanout_concurrency,
            "resolving block transactions"
        );

        stream::iter(block.tx_ids.iter().copied())
            .map(|txid| self.transaction(txid))
            .buffered(self.fanout_concurrency)
            .try_collect()
            .await
    }

    /// `transaction.block`: the block containing `tx`. An unconfirmed
    /// transaction has no block and is a miss without any call.
    pub async fn transaction_block(&self, tx: &Transaction) -> Result<Block, CoreError> {
        let hash = tx.block_hash.ok_or(NotFound::Unconfirmed(tx.txid))?;
        self.block_by_hash(hash).await
    }
}
