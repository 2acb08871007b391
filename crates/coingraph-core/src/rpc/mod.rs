//! Node JSON-RPC abstraction layer.
//!
//! Defines the [`NodeRpc`] trait and provides an HTTP JSON-RPC
//! implementation ([`HttpRpcClient`]) plus a test mock (`mock::MockRpc`).

mod config;
mod http_adapter;
#[cfg(test)]
pub mod mock;
pub mod types;

pub use config::{Credentials, RetryPolicy, RpcConfig, DEFAULT_REQUEST_ID};
pub use http_adapter::HttpRpcClient;
pub use types::ChainInfo;

use async_trait::async_trait;
use bitcoin::{BlockHash, Txid};

use crate::error::CoreError;
use crate::types::{Block, BlockHeight, FeeEstimate, MemPoolTrx, Transaction};

/// The node RPC methods the gateway needs.
///
/// Implementations are expected to handle authentication, retries, and
/// response decoding internally. Lookups of a single entity return
/// `Ok(None)` when the call succeeded but the node returned no result;
/// deciding whether that is an error is the resolver's job.
#[async_trait]
pub trait NodeRpc: Send + Sync {
    /// `getblock <hash> 1`.
    async fn get_block(&self, hash: &BlockHash) -> Result<Option<Block>, CoreError>;

    /// `getblockhash <height>`.
    async fn get_block_hash(&self, height: BlockHeight) -> Result<Option<BlockHash>, CoreError>;

    /// `getdifficulty`.
    async fn get_difficulty(&self) -> Result<f64, CoreError>;

    /// `getrawtransaction <txid> 1`.
    async fn get_raw_transaction(&self, txid: &Txid) -> Result<Option<Transaction>, CoreError>;

    /// `estimatesmartfee <conf_target>`. The target is not range-checked here.
    async fn estimate_smart_fee(&self, conf_target: u16)
        -> Result<Option<FeeEstimate>, CoreError>;

    /// `getrawmempool true`, flattened into a sequence in unspecified order.
    async fn get_raw_mempool(&self) -> Result<Vec<MemPoolTrx>, CoreError>;

    /// Basic chain info (network, block count, pruning status).
    async fn get_blockchain_info(&self) -> Result<ChainInfo, CoreError>;
}
