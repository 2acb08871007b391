use std::env;
use std::sync::{Arc, Once};

use coingraph_core::rpc::{HttpRpcClient, NodeRpc, RpcConfig};
use coingraph_core::types::BlockHeight;
use coingraph_core::{CoreError, Resolver};

static TRACING_INIT: Once = Once::new();

fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("coingraph_core=debug")),
            )
            .with_target(true)
            .try_init();
    });
}

fn regtest_client() -> HttpRpcClient {
    let rpc_url = env::var("COINGRAPH_TEST_RPC_URL").expect("COINGRAPH_TEST_RPC_URL must be set");
    let rpc_user =
        env::var("COINGRAPH_TEST_RPC_USER").expect("COINGRAPH_TEST_RPC_USER must be set");
    let rpc_pass =
        env::var("COINGRAPH_TEST_RPC_PASS").expect("COINGRAPH_TEST_RPC_PASS must be set");

    HttpRpcClient::new(RpcConfig::new(rpc_url).with_credentials(rpc_user, rpc_pass))
        .expect("rpc client must construct")
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires local regtest bitcoind with at least 101 mined blocks"]
async fn regtest_resolver_walks_blocks_and_transactions() {
    init_tracing();
    let rpc = Arc::new(regtest_client());

    eprintln!("[itest] checking get_blockchain_info");
    let info = rpc
        .get_blockchain_info()
        .await
        .expect("regtest get_blockchain_info must succeed");
    assert_eq!(info.chain, "regtest");
    assert!(info.blocks >= 101, "regtest must have mined setup blocks");

    let resolver = Resolver::new(rpc.clone());

    eprintln!("[itest] genesis has no resolvable transactions");
    let genesis = resolver
        .block_by_height(BlockHeight::GENESIS)
        .await
        .expect("genesis must resolve");
    assert!(genesis.previous_block_hash.is_none());
    let genesis_txs = resolver
        .block_transactions(&genesis)
        .await
        .expect("genesis transactions must resolve");
    assert!(genesis_txs.is_empty());

    eprintln!("[itest] walking block 1 -> coinbase -> block");
    let block = resolver
        .block(None, Some(1))
        .await
        .expect("block 1 must resolve");
    assert_eq!(block.height, BlockHeight(1));
    assert_eq!(block.previous_block_hash, Some(genesis.hash));

    let txs = resolver
        .block_transactions(&block)
        .await
        .expect("block 1 transactions must resolve");
    assert_eq!(txs.len(), block.tx_ids.len());
    assert!(txs[0].is_coinbase(), "first transaction must be the coinbase");
    for (tx, id) in txs.iter().zip(&block.tx_ids) {
        assert_eq!(tx.txid, *id, "transactions must come back in block order");
    }

    let containing = resolver
        .transaction_block(&txs[0])
        .await
        .expect("coinbase block must resolve");
    assert_eq!(containing.hash, block.hash);

    eprintln!("[itest] scalar fields");
    let difficulty = resolver.difficulty().await.expect("difficulty must resolve");
    assert!(difficulty > 0.0);
    let mempool = resolver.mempool().await.expect("mempool must resolve");
    for entry in &mempool {
        assert!(entry.entry.virtual_size().is_some());
    }

    eprintln!("[itest] estimatefee validation");
    let err = resolver
        .estimate_fee(0)
        .await
        .expect_err("target 0 must be rejected");
    assert!(matches!(err, CoreError::Validation(_)));
    eprintln!("[itest] integration test completed");
}
