use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use super::error::AppError;
use super::query::{parse_block_hash, parse_int_arg, parse_txid};
use super::render;
use super::SharedState;

// ==============================================================================
// DTOs
// ==============================================================================

#[derive(Deserialize)]
pub(super) struct BlockQuery {
    hash: Option<String>,
    height: Option<String>,
}

#[derive(Deserialize)]
pub(super) struct FeeQuery {
    blocks: Option<String>,
}

// ==============================================================================
// Handlers
// ==============================================================================

pub(super) async fn get_block(
    State(state): State<SharedState>,
    Query(query): Query<BlockQuery>,
) -> Result<Json<Value>, AppError> {
    let hash = query.hash.as_deref().map(parse_block_hash).transpose()?;
    let height = query
        .height
        .map(|h| parse_int_arg("height")(&Value::String(h)))
        .transpose()?;

    let block = state.resolver.block(hash, height).await?;
    Ok(Json(render::block(&block)?))
}

pub(super) async fn get_block_transactions(
    State(state): State<SharedState>,
    Path(hash): Path<String>,
) -> Result<Json<Value>, AppError> {
    let block = state.resolver.block_by_hash(parse_block_hash(&hash)?).await?;
    let txs = state.resolver.block_transactions(&block).await?;
    let rendered = txs
        .iter()
        .map(render::transaction)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(Value::Array(rendered)))
}

pub(super) async fn get_transaction(
    State(state): State<SharedState>,
    Path(txid): Path<String>,
) -> Result<Json<Value>, AppError> {
    let tx = state.resolver.transaction(parse_txid(&txid)?).await?;
    Ok(Json(render::transaction(&tx)?))
}

pub(super) async fn get_transaction_block(
    State(state): State<SharedState>,
    Path(txid): Path<String>,
) -> Result<Json<Value>, AppError> {
    let tx = state.resolver.transaction(parse_txid(&txid)?).await?;
    let block = state.resolver.transaction_block(&tx).await?;
    Ok(Json(render::block(&block)?))
}

pub(super) async fn get_difficulty(
    State(state): State<SharedState>,
) -> Result<Json<Value>, AppError> {
    let difficulty = state.resolver.difficulty().await?;
    Ok(Json(serde_json::json!({ "difficulty": difficulty })))
}

pub(super) async fn get_fee_estimate(
    State(state): State<SharedState>,
    Query(query): Query<FeeQuery>,
) -> Result<Json<Value>, AppError> {
    let blocks = query
        .blocks
        .ok_or_else(|| AppError::BadRequest("missing `blocks` query parameter".to_owned()))?;
    let blocks = parse_int_arg("blocks")(&Value::String(blocks))?;

    let estimate = state.resolver.estimate_fee(blocks).await?;
    Ok(Json(render::fee_estimate(&estimate)?))
}

pub(super) async fn get_mempool(State(state): State<SharedState>) -> Result<Json<Value>, AppError> {
    let entries = state.resolver.mempool().await?;
    Ok(Json(render::mempool(&entries)?))
}
