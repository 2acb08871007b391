use std::num::NonZeroU32;

use async_trait::async_trait;
use bitcoin::{BlockHash, Txid};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::header;
use serde_json::json;
use tracing::{debug, trace, warn};

use crate::error::{AttemptError, CoreError, TransportError};
use crate::rpc::config::{Credentials, RetryPolicy, RpcConfig};
use crate::rpc::types::ChainInfo;
use crate::rpc::NodeRpc;
use crate::types::{Block, BlockHeight, FeeEstimate, MemPoolTrx, Transaction};

use super::connection::parse_connection;
use super::parsing::{
    parse_block, parse_block_hash, parse_chain_info, parse_difficulty, parse_fee_estimate,
    parse_mempool, parse_transaction,
};
use super::protocol::{interpret_response, JsonRpcRequest, Outcome, Params, JSONRPC_VERSION};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Bitcoin Core JSON-RPC 1.0 client over HTTP(S).
///
/// Every call is a single POST carrying named parameters. Transport failures
/// are retried with exponential backoff; JSON-RPC error objects are not.
pub struct HttpRpcClient {
    client: reqwest::Client,
    url: String,
    auth: Option<Credentials>,
    limiter: Option<DirectRateLimiter>,
    retry: RetryPolicy,
    request_id: String,
}

impl HttpRpcClient {
    /// Create a new client from a fully populated [`RpcConfig`].
    ///
    /// Credentials are resolved once, here, through [`RpcConfig::credentials`].
    ///
    /// If `requests_per_second` is set, every HTTP attempt (retries included)
    /// waits for the limiter.
    pub fn new(config: RpcConfig) -> Result<Self, CoreError> {
        if config.retry.max_attempts == 0 {
            return Err(CoreError::Config(
                "rpc retry budget must allow at least one attempt".to_owned(),
            ));
        }
        let auth = config.credentials()?;
        let url = parse_connection(&config.host)?;

        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .pool_max_idle_per_host(32)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| CoreError::Config(format!("failed to build HTTP client: {e}")))?;

        let limiter = match config.requests_per_second {
            None => None,
            Some(limit) => {
                let limit = NonZeroU32::new(limit).ok_or_else(|| {
                    CoreError::Config("requests_per_second must be at least 1".to_owned())
                })?;
                Some(RateLimiter::direct(Quota::per_second(limit)))
            }
        };

        Ok(Self {
            client,
            url,
            auth,
            limiter,
            retry: config.retry,
            request_id: config.request_id,
        })
    }

    /// The normalized endpoint URL calls are posted to.
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn wait_for_rate_limit(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }

    /// Issue one call and return its raw `result`.
    ///
    /// Attempts run strictly one after another. A non-null `error` in the
    /// response is final, whatever the HTTP status. Anything else that
    /// prevents reading an envelope is retried until the budget runs out.
    pub(crate) async fn call(
        &self,
        method: &str,
        params: Params,
    ) -> Result<serde_json::Value, CoreError> {
        let req = JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION,
            id: &self.request_id,
            method,
            params: &params,
        };
        let payload = serde_json::to_vec(&req)
            .map_err(|e| CoreError::Decode(format!("encode JSON-RPC request: {e}")))?;

        let mut attempt = 1;
        loop {
            let last = match self.attempt(method, attempt, &payload).await {
                Outcome::Done(result) => return result,
                Outcome::Retry(err) => err,
            };

            if attempt >= self.retry.max_attempts {
                return Err(TransportError {
                    method: method.to_owned(),
                    attempts: attempt,
                    last,
                }
                .into());
            }

            let delay = self.retry.backoff(attempt);
            warn!(
                rpc.method = method,
                attempt,
                max_attempts = self.retry.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %last,
                "rpc attempt failed; retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn attempt(&self, method: &str, attempt: u32, payload: &[u8]) -> Outcome {
        self.wait_for_rate_limit().await;
        debug!(
            rpc.id = %self.request_id,
            rpc.method = method,
            attempt,
            "rpc call"
        );

        let mut builder = self
            .client
            .post(&self.url)
            .header(header::CONTENT_TYPE, "text/plain")
            .body(payload.to_vec());
        if let Some(creds) = &self.auth {
            builder = builder.basic_auth(&creds.user, Some(&creds.password));
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => return Outcome::Retry(AttemptError::Http(e)),
        };
        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return Outcome::Retry(AttemptError::Http(e)),
        };
        debug!(rpc.method = method, %status, body_len = body.len(), "rpc response");
        trace!(rpc.method = method, body = %body, "rpc response body");

        interpret_response(status.as_u16(), &body)
    }
}

fn params(value: serde_json::Value) -> Params {
    match value {
        serde_json::Value::Object(map) => map,
        _ => Params::new(),
    }
}

#[async_trait]
impl NodeRpc for HttpRpcClient {
    async fn get_block(&self, hash: &BlockHash) -> Result<Option<Block>, CoreError> {
        let raw = self
            .call(
                "getblock",
                params(json!({ "blockhash": hash.to_string(), "verbosity": 1 })),
            )
            .await?;
        parse_block(raw)
    }

    async fn get_block_hash(&self, height: BlockHeight) -> Result<Option<BlockHash>, CoreError> {
        let raw = self
            .call("getblockhash", params(json!({ "height": height.0 })))
            .await?;
        parse_block_hash(raw)
    }

    async fn get_difficulty(&self) -> Result<f64, CoreError> {
        let raw = self.call("getdifficulty", Params::new()).await?;
        parse_difficulty(raw)
    }

    async fn get_raw_transaction(&self, txid: &Txid) -> Result<Option<Transaction>, CoreError> {
        let raw = self
            .call(
                "getrawtransaction",
                params(json!({ "txid": txid.to_string(), "verbose": 1 })),
            )
            .await?;
        parse_transaction(raw)
    }

    async fn estimate_smart_fee(
        &self,
        conf_target: u16,
    ) -> Result<Option<FeeEstimate>, CoreError> {
        let raw = self
            .call(
                "estimatesmartfee",
                params(json!({ "conf_target": conf_target })),
            )
            .await?;
        parse_fee_estimate(raw)
    }

    async fn get_raw_mempool(&self) -> Result<Vec<MemPoolTrx>, CoreError> {
        let raw = self
            .call("getrawmempool", params(json!({ "verbose": true })))
            .await?;
        parse_mempool(raw)
    }

    async fn get_blockchain_info(&self) -> Result<ChainInfo, CoreError> {
        let raw = self.call("getblockchaininfo", Params::new()).await?;
        parse_chain_info(raw)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn new_normalizes_bare_host() {
        let client = HttpRpcClient::new(RpcConfig::new("127.0.0.1:18443")).expect("valid config");
        assert_eq!(client.url(), "http://127.0.0.1:18443");
    }

    #[test]
    fn new_rejects_zero_rate_limit() {
        let mut config = RpcConfig::new("127.0.0.1:18443");
        config.requests_per_second = Some(0);
        let err = HttpRpcClient::new(config)
            .err()
            .expect("zero rate limit must be rejected");
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn new_rejects_empty_retry_budget() {
        let config = RpcConfig::new("127.0.0.1:18443").with_retry(RetryPolicy {
            max_attempts: 0,
            base_delay: Duration::from_millis(1),
        });
        let err = HttpRpcClient::new(config)
            .err()
            .expect("zero attempts must be rejected");
        assert!(err.to_string().contains("at least one attempt"));
    }

    #[test]
    fn params_builds_named_map() {
        let map = params(json!({ "height": 7 }));
        assert_eq!(map.get("height"), Some(&json!(7)));
        assert!(params(json!(null)).is_empty());
    }
}
