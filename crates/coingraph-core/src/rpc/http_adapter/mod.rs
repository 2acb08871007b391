//! JSON-RPC 1.0 client for Bitcoin Core compatible endpoints.
//!
//! Implements [`NodeRpc`](super::NodeRpc) over HTTP using `reqwest`, with
//! basic or cookie auth, optional request rate limiting, and bounded retries
//! with exponential backoff.

mod client;
mod connection;
mod parsing;
mod protocol;

pub use client::HttpRpcClient;
