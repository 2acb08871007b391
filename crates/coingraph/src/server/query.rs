//! `POST /api/v1/query`: one top-level field plus a selection tree of
//! relationships, resolved lazily.
//!
//! A relationship that fails is rendered as `null` and reported in
//! `errors`; its siblings still resolve. Only a failing top-level field
//! turns into an HTTP error status.
//!
//! Selections deeper than `max_depth` are rejected up front. Every resolved
//! block or transaction counts against `max_nodes`; a relationship that
//! would exceed it is not fetched and reports an error instead.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use bitcoin::{BlockHash, Txid};
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use coingraph_core::scalar::decode_int;
use coingraph_core::types::{Block, Transaction};
use coingraph_core::{CoreError, Resolver};

use super::error::AppError;
use super::limits::QueryLimits;
use super::render;
use super::SharedState;

// ==============================================================================
// DTOs
// ==============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct QueryRequest {
    field: String,
    #[serde(default)]
    hash: Option<String>,
    #[serde(default)]
    height: Option<Value>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    blocks: Option<Value>,
    #[serde(default)]
    select: Selection,
    #[serde(default)]
    max_depth: Option<usize>,
    #[serde(default)]
    max_nodes: Option<usize>,
}

/// Relationship names to follow, each with its own nested selection.
#[derive(Debug, Default, Deserialize)]
#[serde(transparent)]
pub(super) struct Selection(BTreeMap<String, Selection>);

impl Selection {
    fn get(&self, relationship: &str) -> Option<&Selection> {
        self.0.get(relationship)
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub(super) struct FieldError {
    path: String,
    message: String,
}

#[derive(Serialize)]
pub(super) struct QueryResponse {
    data: Value,
    errors: Vec<FieldError>,
}

// ==============================================================================
// Selection Validation
// ==============================================================================

#[derive(Clone, Copy)]
enum Kind {
    Block,
    Transaction,
    Scalar,
}

impl Kind {
    fn relationship(self, name: &str) -> Option<Kind> {
        match (self, name) {
            (Kind::Block, "transactions") => Some(Kind::Transaction),
            (Kind::Transaction, "block") => Some(Kind::Block),
            _ => None,
        }
    }
}

/// Check relationship names and nesting. `depth_left` is how many more
/// relationship levels may follow `path`.
fn validate_selection(
    kind: Kind,
    selection: &Selection,
    path: &str,
    depth_left: usize,
) -> Result<(), AppError> {
    for (name, nested) in &selection.0 {
        let child = kind.relationship(name).ok_or_else(|| {
            AppError::BadRequest(format!("unknown relationship `{name}` at `{path}`"))
        })?;
        let child_path = format!("{path}.{name}");
        let remaining = depth_left.checked_sub(1).ok_or_else(|| {
            AppError::BadRequest(format!("selection at `{child_path}` exceeds max_depth"))
        })?;
        validate_selection(child, nested, &child_path, remaining)?;
    }
    Ok(())
}

// ==============================================================================
// Handler
// ==============================================================================

pub(super) async fn run_query(
    State(state): State<SharedState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<QueryResponse>, AppError> {
    let Json(raw) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let request: QueryRequest = serde_json::from_value(raw)
        .map_err(|e| AppError::BadRequest(format!("invalid query: {e}")))?;

    let kind = match request.field.as_str() {
        "block" => Kind::Block,
        "transaction" => Kind::Transaction,
        "difficulty" | "estimatefee" | "mempool" => Kind::Scalar,
        other => return Err(AppError::BadRequest(format!("unknown field `{other}`"))),
    };
    let limits = state
        .default_limits
        .with_overrides(request.max_depth, request.max_nodes)?;
    validate_selection(kind, &request.select, &request.field, limits.max_depth)?;

    tracing::debug!(
        field = %request.field,
        max_depth = limits.max_depth,
        max_nodes = limits.max_nodes,
        "resolving query"
    );
    let ctx = Walk::new(&state.resolver, limits);
    let data = match request.field.as_str() {
        "block" => {
            let hash = request.hash.as_deref().map(parse_block_hash).transpose()?;
            let height = request.height.as_ref().map(parse_int_arg("height")).transpose()?;
            let block = state.resolver.block(hash, height).await?;
            ctx.reserve(1);
            ctx.block(block, &request.select, "block".to_owned()).await
        }
        "transaction" => {
            let id = request
                .id
                .as_deref()
                .ok_or_else(|| AppError::BadRequest("transaction requires `id`".to_owned()))?;
            let tx = state.resolver.transaction(parse_txid(id)?).await?;
            ctx.reserve(1);
            ctx.transaction(tx, &request.select, "transaction".to_owned())
                .await
        }
        "difficulty" => Value::from(state.resolver.difficulty().await?),
        "estimatefee" => {
            let blocks = request
                .blocks
                .as_ref()
                .map(parse_int_arg("blocks"))
                .transpose()?
                .ok_or_else(|| {
                    AppError::BadRequest("estimatefee requires `blocks`".to_owned())
                })?;
            render::fee_estimate(&state.resolver.estimate_fee(blocks).await?)?
        }
        _ => render::mempool(&state.resolver.mempool().await?)?,
    };

    let errors = ctx
        .errors
        .into_inner()
        .map_err(|_| AppError::Internal("query error list poisoned".to_owned()))?;
    Ok(Json(QueryResponse { data, errors }))
}

pub(super) fn parse_block_hash(raw: &str) -> Result<BlockHash, AppError> {
    raw.parse()
        .map_err(|e| AppError::BadRequest(format!("invalid block hash: {e}")))
}

pub(super) fn parse_txid(raw: &str) -> Result<Txid, AppError> {
    raw.parse()
        .map_err(|e| AppError::BadRequest(format!("invalid txid: {e}")))
}

/// Integer arguments accept a JSON number or a decimal string.
pub(super) fn parse_int_arg(name: &'static str) -> impl Fn(&Value) -> Result<i64, AppError> {
    move |value| {
        decode_int::<i64>(value).map_err(|e| AppError::BadRequest(format!("invalid `{name}`: {e}")))
    }
}

// ==============================================================================
// Relationship Walk
// ==============================================================================

struct Walk<'a> {
    resolver: &'a Resolver,
    max_nodes: usize,
    resolved: AtomicUsize,
    errors: Mutex<Vec<FieldError>>,
}

impl<'a> Walk<'a> {
    fn new(resolver: &'a Resolver, limits: QueryLimits) -> Self {
        Self {
            resolver,
            max_nodes: limits.max_nodes,
            resolved: AtomicUsize::new(0),
            errors: Mutex::new(Vec::new()),
        }
    }

    /// Claim `count` entities from the node budget. Nothing is claimed when
    /// the budget cannot cover all of them.
    fn reserve(&self, count: usize) -> bool {
        self.resolved
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| {
                used.checked_add(count).filter(|&total| total <= self.max_nodes)
            })
            .is_ok()
    }

    fn over_budget(&self, path: String) -> Value {
        tracing::debug!(path = %path, max_nodes = self.max_nodes, "node budget exhausted");
        self.push(
            path,
            format!("query exceeds max_nodes ({} entities)", self.max_nodes),
        );
        Value::Null
    }

    fn block(&'a self, block: Block, select: &'a Selection, path: String) -> BoxFuture<'a, Value> {
        async move {
            let mut value = self.render(render::block(&block), &path);
            if let Some(nested) = select.get("transactions") {
                let field_path = format!("{path}.transactions");
                let wanted = if block.height.is_genesis() {
                    0
                } else {
                    block.tx_ids.len()
                };
                if !self.reserve(wanted) {
                    let related = self.over_budget(field_path);
                    attach(&mut value, "transactions", related);
                    return value;
                }
                let related = match self.resolver.block_transactions(&block).await {
                    Ok(txs) => Value::Array(
                        stream::iter(txs.into_iter().enumerate())
                            .map(|(i, tx)| self.transaction(tx, nested, format!("{field_path}[{i}]")))
                            .buffered(self.resolver.fanout_concurrency())
                            .collect()
                            .await,
                    ),
                    Err(err) => self.fail(field_path, &err),
                };
                attach(&mut value, "transactions", related);
            }
            value
        }
        .boxed()
    }

    fn transaction(
        &'a self,
        tx: Transaction,
        select: &'a Selection,
        path: String,
    ) -> BoxFuture<'a, Value> {
        async move {
            let mut value = self.render(render::transaction(&tx), &path);
            if let Some(nested) = select.get("block") {
                let field_path = format!("{path}.block");
                if !self.reserve(1) {
                    let related = self.over_budget(field_path);
                    attach(&mut value, "block", related);
                    return value;
                }
                let related = match self.resolver.transaction_block(&tx).await {
                    Ok(block) => self.block(block, nested, field_path).await,
                    Err(err) => self.fail(field_path, &err),
                };
                attach(&mut value, "block", related);
            }
            value
        }
        .boxed()
    }

    fn render(&self, rendered: Result<Value, AppError>, path: &str) -> Value {
        rendered.unwrap_or_else(|err| {
            self.push(path.to_owned(), err.to_string());
            Value::Null
        })
    }

    fn fail(&self, path: String, err: &CoreError) -> Value {
        tracing::debug!(path = %path, error = %err, "relationship failed");
        self.push(path, err.to_string());
        Value::Null
    }

    fn push(&self, path: String, message: String) {
        if let Ok(mut errors) = self.errors.lock() {
            errors.push(FieldError { path, message });
        }
    }
}

fn attach(value: &mut Value, key: &str, related: Value) {
    if let Value::Object(map) = value {
        map.insert(key.to_owned(), related);
    }
}
