use crate::error::{AttemptError, CoreError};

/// Named parameters of a call. Order is irrelevant to the node.
pub(crate) type Params = serde_json::Map<String, serde_json::Value>;

/// JSON-RPC 1.0 marker understood by Bitcoin Core style nodes.
pub(super) const JSONRPC_VERSION: &str = "1.0";

#[derive(serde::Serialize)]
pub(super) struct JsonRpcRequest<'a> {
    pub(super) jsonrpc: &'static str,
    pub(super) id: &'a str,
    pub(super) method: &'a str,
    pub(super) params: &'a Params,
}

#[derive(serde::Deserialize)]
pub(super) struct JsonRpcResponse {
    pub(super) result: Option<serde_json::Value>,
    pub(super) error: Option<serde_json::Value>,
    #[allow(dead_code)]
    pub(super) id: Option<serde_json::Value>,
}

/// What one HTTP attempt amounted to.
#[derive(Debug)]
pub(super) enum Outcome {
    /// Final answer for the call: a result, or an error that must not be retried.
    Done(Result<serde_json::Value, CoreError>),
    /// Transport-level failure; the caller may try again.
    Retry(AttemptError),
}

/// Interpret an HTTP response body as a JSON-RPC envelope.
///
/// Legacy JSON-RPC 1.0 servers report RPC errors with HTTP 500 (or 404 for
/// unknown methods), so an error envelope wins over the status code: it is
/// an application-level rejection and is never retried. Non-2xx responses
/// without an envelope (proxies, auth failures, warm-up pages) are retried.
pub(super) fn interpret_response(status: u16, body: &str) -> Outcome {
    let success = (200..300).contains(&status);

    match serde_json::from_str::<JsonRpcResponse>(body) {
        Ok(JsonRpcResponse {
            error: Some(err), ..
        }) => Outcome::Done(Err(parse_jsonrpc_error(err))),
        Ok(decoded) if success => {
            Outcome::Done(Ok(decoded.result.unwrap_or(serde_json::Value::Null)))
        }
        Ok(_) => Outcome::Retry(AttemptError::Status {
            status,
            body: body.to_owned(),
        }),
        Err(e) if success => Outcome::Done(Err(CoreError::Decode(format!(
            "decode JSON-RPC response: {e}; body={body}"
        )))),
        Err(_) => Outcome::Retry(AttemptError::Status {
            status,
            body: body.to_owned(),
        }),
    }
}

/// Parse a JSON-RPC error value into a structured `CoreError`.
///
/// JSON-RPC defines errors as `{"code": <int>, "message": <string>}`.
/// If the error value matches that shape, we produce `Remote`;
/// otherwise we fall back to `Decode` with the raw JSON.
pub(super) fn parse_jsonrpc_error(err: serde_json::Value) -> CoreError {
    #[derive(serde::Deserialize)]
    struct JsonRpcError {
        code: i64,
        message: String,
    }

    match serde_json::from_value::<JsonRpcError>(err.clone()) {
        Ok(parsed) => CoreError::Remote {
            code: parsed.code,
            message: parsed.message,
        },
        Err(_) => CoreError::Decode(format!("non-standard JSON-RPC error: {err}")),
    }
}
