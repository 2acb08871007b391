mod cli;
mod server;

use std::sync::Arc;

use axum::http::HeaderValue;
use clap::Parser;
use eyre::{eyre, WrapErr};

use coingraph_core::rpc::{HttpRpcClient, NodeRpc};
use coingraph_core::types::BlockHeight;
use coingraph_core::{CoreError, Resolver};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let args = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(args.default_log_filter())),
        )
        .with_file(true)
        .with_line_number(true)
        .with_level(true)
        .init();

    // Connect to the node and verify the connection succeeds before
    // starting the server.
    let client = HttpRpcClient::new(args.rpc_config()).context("configure node RPC client")?;
    let endpoint = client.url().to_owned();
    let rpc: Arc<dyn NodeRpc> = Arc::new(client);

    let chain_info = rpc.get_blockchain_info().await.map_err(|err| {
        let message = format_rpc_connect_error(&endpoint, &err.to_string());
        eyre!(message).wrap_err("while attempting to connect to the node RPC")
    })?;

    tracing::info!(
        chain = %chain_info.chain,
        blocks = chain_info.blocks,
        "connected to node"
    );
    if chain_info.pruned {
        tracing::warn!("node is pruned; old blocks and their transactions may be unavailable");
    }

    let resolver = Resolver::new(rpc).with_fanout_concurrency(args.fanout_concurrency);
    if chain_info.blocks > 0 {
        check_txindex_available(&resolver).await;
    }

    let bind_addr = format!("{}:{}", args.bind, args.port);
    let origin = HeaderValue::from_str(&format!("http://{bind_addr}"))
        .context("build CORS origin from bind address")?;
    let state = server::AppState {
        resolver,
        default_limits: args.query_limits(),
    };
    let router = server::build_router(state, origin);

    if args.bind == "0.0.0.0" {
        tracing::warn!("server is bound to 0.0.0.0; it is accessible from the network");
    }

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .context("bind TCP listener")?;

    tracing::info!("listening on http://{bind_addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("run HTTP server")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

/// Best-effort check that `getrawtransaction` can see confirmed transactions.
///
/// Without `-txindex` the node only answers for mempool transactions (and,
/// on recent versions, for blocks it is told about), so `block.transactions`
/// would fail for most blocks. The coinbase of block 1 is always confirmed,
/// which makes it a cheap probe.
async fn check_txindex_available(resolver: &Resolver) {
    let block = match resolver.block_by_height(BlockHeight(1)).await {
        Ok(block) => block,
        Err(err) => {
            tracing::debug!(error = %err, "txindex probe skipped: block 1 unavailable");
            return;
        }
    };
    let Some(coinbase) = block.tx_ids.first().copied() else {
        return;
    };

    match resolver.transaction(coinbase).await {
        Ok(_) => tracing::debug!("txindex probe succeeded"),
        Err(CoreError::Remote { code: -5, .. }) | Err(CoreError::NotFound(_)) => {
            tracing::warn!(
                "confirmed transactions are not retrievable; run the node with -txindex=1 \
                 or block.transactions queries will fail"
            );
        }
        Err(err) => tracing::debug!(error = %err, "txindex probe inconclusive"),
    }
}

fn format_rpc_connect_error(endpoint: &str, source_error: &str) -> String {
    let mut lines = vec![
        format!("could not connect to RPC endpoint `{endpoint}`"),
        format!("RPC error: {source_error}"),
    ];

    if source_error.contains("dns error") {
        lines.push(
            "hint: hostname resolution failed; verify the daemon hostname and your DNS/network"
                .into(),
        );
    } else if source_error.contains("tls")
        || source_error.contains("certificate")
        || source_error.contains("SSL")
    {
        lines.push(
            "hint: TLS handshake failed; verify certificate trust and that the endpoint uses HTTPS"
                .into(),
        );
    } else if source_error.contains("HTTP status 401") || source_error.contains("HTTP status 403")
    {
        lines.push(
            "hint: authentication failed; verify --rpc-user/--rpc-password or --rpc-cookie-file"
                .into(),
        );
    } else if source_error.contains("HTTP status 404") {
        lines.push("hint: endpoint path is invalid; verify the full daemon URL".into());
    } else if source_error.contains("error sending request for url") {
        lines.push(
            "hint: request could not be sent; verify the daemon address and that the node is running"
                .into(),
        );
    }

    lines.join("\n")
}
