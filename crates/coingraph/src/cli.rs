use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use coingraph_core::rpc::{RetryPolicy, RpcConfig};

use crate::server::QueryLimits;

/// coingraph: graph-query gateway over a Bitcoin Core compatible JSON-RPC node.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Cli {
    /// Node RPC address: `host:port` (plain HTTP) or a full http(s) URL.
    #[arg(
        short = 'd',
        long,
        default_value = "127.0.0.1:8332",
        env = "COINGRAPH_DAEMON"
    )]
    pub daemon: String,

    /// RPC username. Must be given together with the password.
    #[arg(short = 'u', long, env = "COINGRAPH_RPC_USER")]
    pub rpc_user: Option<String>,

    /// RPC password. Must be given together with the username.
    #[arg(short = 'p', long, env = "COINGRAPH_RPC_PASSWORD")]
    pub rpc_password: Option<String>,

    /// Bitcoin Core `.cookie` file, used when no username/password is given.
    #[arg(long, env = "COINGRAPH_RPC_COOKIE_FILE")]
    pub rpc_cookie_file: Option<PathBuf>,

    /// Per-attempt HTTP timeout for node calls, in seconds.
    #[arg(long, default_value = "30", env = "COINGRAPH_RPC_TIMEOUT_SECS")]
    pub rpc_timeout_secs: u64,

    /// TCP connect timeout for node calls, in seconds.
    #[arg(long, default_value = "10", env = "COINGRAPH_RPC_CONNECT_TIMEOUT_SECS")]
    pub rpc_connect_timeout_secs: u64,

    /// Total attempts per node call, including the first one.
    #[arg(long, default_value = "3", env = "COINGRAPH_RPC_RETRIES")]
    pub rpc_retries: u32,

    /// Delay before the first retry, in milliseconds. Doubles per retry.
    #[arg(long, default_value = "1000", env = "COINGRAPH_RPC_BACKOFF_MS")]
    pub rpc_backoff_ms: u64,

    /// Outbound node requests per second (unlimited when omitted).
    #[arg(long, env = "COINGRAPH_RPC_REQUESTS_PER_SECOND")]
    pub rpc_requests_per_second: Option<u32>,

    /// Maximum concurrent transaction lookups when resolving a block's
    /// transactions.
    #[arg(long, default_value = "4", env = "COINGRAPH_FANOUT_CONCURRENCY")]
    pub fanout_concurrency: usize,

    /// Default deepest relationship nesting a query may select.
    #[arg(long, default_value = "4", env = "COINGRAPH_MAX_DEPTH")]
    pub max_depth: usize,

    /// Default number of blocks and transactions one query may resolve.
    #[arg(long, default_value = "5000", env = "COINGRAPH_MAX_NODES")]
    pub max_nodes: usize,

    /// Address to bind the web server to.
    #[arg(long, default_value = "127.0.0.1", env = "COINGRAPH_BIND")]
    pub bind: String,

    /// Port to listen on.
    #[arg(long, default_value = "5050", env = "COINGRAPH_PORT")]
    pub port: u16,

    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(long, env = "COINGRAPH_DEBUG")]
    pub debug: bool,
}

impl Cli {
    /// Client configuration described by the RPC flags.
    pub fn rpc_config(&self) -> RpcConfig {
        let mut config = RpcConfig::new(self.daemon.clone()).with_retry(RetryPolicy {
            max_attempts: self.rpc_retries,
            base_delay: Duration::from_millis(self.rpc_backoff_ms),
        });
        config.user = self.rpc_user.clone();
        config.password = self.rpc_password.clone();
        config.cookie_file = self.rpc_cookie_file.clone();
        config.timeout = Duration::from_secs(self.rpc_timeout_secs);
        config.connect_timeout = Duration::from_secs(self.rpc_connect_timeout_secs);
        config.requests_per_second = self.rpc_requests_per_second;
        config
    }

    /// Query ceilings from the CLI. The server clamps them to its hard maximums.
    pub fn query_limits(&self) -> QueryLimits {
        QueryLimits {
            max_depth: self.max_depth,
            max_nodes: self.max_nodes,
        }
    }

    pub fn default_log_filter(&self) -> &'static str {
        if self.debug {
            "coingraph=debug,coingraph_core=debug,info"
        } else {
            "info"
        }
    }
}
