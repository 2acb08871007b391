use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bitcoin::hashes::Hash;
use bitcoin::{BlockHash, Txid};

use crate::error::CoreError;
use crate::types::{Block, BlockHeight, FeeEstimate, MemPoolTrx, Transaction};

use super::types::ChainInfo;
use super::NodeRpc;

/// A mock node backend for testing. Returns canned entities populated via
/// the builder pattern and records every call it receives.
pub struct MockRpc {
    blocks: HashMap<BlockHash, Block>,
    heights: HashMap<BlockHeight, BlockHash>,
    transactions: HashMap<Txid, Transaction>,
    tx_errors: HashMap<Txid, (i64, String)>,
    fee_estimates: HashMap<u16, FeeEstimate>,
    mempool: Vec<MemPoolTrx>,
    difficulty: f64,
    chain_info: ChainInfo,
    calls: Mutex<Vec<String>>,
}

impl MockRpc {
    pub fn builder() -> MockRpcBuilder {
        MockRpcBuilder {
            blocks: HashMap::new(),
            heights: HashMap::new(),
            transactions: HashMap::new(),
            tx_errors: HashMap::new(),
            fee_estimates: HashMap::new(),
            mempool: Vec::new(),
            difficulty: 1.0,
            chain_info: ChainInfo {
                chain: "regtest".into(),
                blocks: 100,
                best_block_hash: BlockHash::all_zeros(),
                pruned: false,
            },
        }
    }

    /// Method names received so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// How many times `method` was called.
    pub fn call_count(&self, method: &str) -> usize {
        self.calls().iter().filter(|m| *m == method).count()
    }

    fn record(&self, method: &str) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(method.to_owned());
        }
    }
}

pub struct MockRpcBuilder {
    blocks: HashMap<BlockHash, Block>,
    heights: HashMap<BlockHeight, BlockHash>,
    transactions: HashMap<Txid, Transaction>,
    tx_errors: HashMap<Txid, (i64, String)>,
    fee_estimates: HashMap<u16, FeeEstimate>,
    mempool: Vec<MemPoolTrx>,
    difficulty: f64,
    chain_info: ChainInfo,
}

impl MockRpcBuilder {
    /// Register a block, reachable both by hash and by height.
    pub fn with_block(mut self, block: Block) -> Self {
        self.heights.insert(block.height, block.hash);
        self.blocks.insert(block.hash, block);
        self
    }

    /// Make `getblockhash` answer `hash` for `height` without registering a
    /// block, so the following `getblock` comes back empty.
    pub fn with_height(mut self, height: BlockHeight, hash: BlockHash) -> Self {
        self.heights.insert(height, hash);
        self
    }

    pub fn with_tx(mut self, tx: Transaction) -> Self {
        self.transactions.insert(tx.txid, tx);
        self
    }

    /// Make `getrawtransaction` for `txid` answer with a JSON-RPC error.
    pub fn with_tx_error(mut self, txid: Txid, code: i64, message: &str) -> Self {
        self.tx_errors.insert(txid, (code, message.to_owned()));
        self
    }

    pub fn with_fee_estimate(mut self, conf_target: u16, estimate: FeeEstimate) -> Self {
        self.fee_estimates.insert(conf_target, estimate);
        self
    }

    pub fn with_mempool_entry(mut self, entry: MemPoolTrx) -> Self {
        self.mempool.push(entry);
        self
    }

    pub fn with_difficulty(mut self, difficulty: f64) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_chain_info(mut self, info: ChainInfo) -> Self {
        self.chain_info = info;
        self
    }

    pub fn build(self) -> MockRpc {
        MockRpc {
            blocks: self.blocks,
            heights: self.heights,
            transactions: self.transactions,
            tx_errors: self.tx_errors,
            fee_estimates: self.fee_estimates,
            mempool: self.mempool,
            difficulty: self.difficulty,
            chain_info: self.chain_info,
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl NodeRpc for MockRpc {
    async fn get_block(&self, hash: &BlockHash) -> Result<Option<Block>, CoreError> {
        self.record("getblock");
        Ok(self.blocks.get(hash).cloned())
    }

    async fn get_block_hash(&self, height: BlockHeight) -> Result<Option<BlockHash>, CoreError> {
        self.record("getblockhash");
        Ok(self.heights.get(&height).copied())
    }

    async fn get_difficulty(&self) -> Result<f64, CoreError> {
        self.record("getdifficulty");
        Ok(self.difficulty)
    }

    async fn get_raw_transaction(&self, txid: &Txid) -> Result<Option<Transaction>, CoreError> {
        self.record("getrawtransaction");
        if let Some((code, message)) = self.tx_errors.get(txid) {
            return Err(CoreError::Remote {
                code: *code,
                message: message.clone(),
            });
        }
        Ok(self.transactions.get(txid).cloned())
    }

    async fn estimate_smart_fee(
        &self,
        conf_target: u16,
    ) -> Result<Option<FeeEstimate>, CoreError> {
        self.record("estimatesmartfee");
        Ok(self.fee_estimates.get(&conf_target).cloned())
    }

    async fn get_raw_mempool(&self) -> Result<Vec<MemPoolTrx>, CoreError> {
        self.record("getrawmempool");
        Ok(self.mempool.clone())
    }

    async fn get_blockchain_info(&self) -> Result<ChainInfo, CoreError> {
        self.record("getblockchaininfo");
        Ok(self.chain_info.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::*;

    #[tokio::test]
    async fn with_chain_info_overrides_defaults() {
        let custom_info = ChainInfo {
            chain: "main".into(),
            blocks: 800_000,
            best_block_hash: BlockHash::all_zeros(),
            pruned: true,
        };
        let rpc = MockRpc::builder()
            .with_chain_info(custom_info.clone())
            .build();
        let info = rpc.get_blockchain_info().await.unwrap();
        assert_eq!(info, custom_info);
    }

    #[tokio::test]
    async fn block_is_reachable_by_hash_and_height() {
        let block = make_block(block_hash_from_byte(7), 7, vec![]);
        let rpc = MockRpc::builder().with_block(block.clone()).build();

        let hash = rpc.get_block_hash(BlockHeight(7)).await.unwrap();
        assert_eq!(hash, Some(block.hash));
        assert_eq!(rpc.get_block(&block.hash).await.unwrap(), Some(block));
        assert_eq!(rpc.get_block_hash(BlockHeight(8)).await.unwrap(), None);
        assert_eq!(rpc.calls(), vec!["getblockhash", "getblock", "getblockhash"]);
    }

    #[tokio::test]
    async fn tx_error_takes_precedence() {
        let txid = txid_from_byte(3);
        let rpc = MockRpc::builder()
            .with_tx(make_tx(txid, None))
            .with_tx_error(txid, -5, "No such mempool or blockchain transaction")
            .build();

        let err = rpc.get_raw_transaction(&txid).await.unwrap_err();
        assert!(matches!(err, CoreError::Remote { code: -5, .. }));
        assert_eq!(rpc.call_count("getrawtransaction"), 1);
    }
}
