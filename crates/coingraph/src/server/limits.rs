use axum::extract::State;
use axum::Json;
use serde::Serialize;

use super::error::AppError;
use super::SharedState;

// ==============================================================================
// Hard Ceilings for Queries
// ==============================================================================
//
// These caps protect the node regardless of CLI configuration. Relationships
// are never deduplicated, so every nested level multiplies node calls.

pub(crate) const HARD_MAX_DEPTH: usize = 16;
pub(crate) const HARD_MAX_NODES: usize = 50_000;

/// Ceilings applied to one `/api/v1/query` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryLimits {
    /// Deepest chain of nested relationships in `select`.
    pub max_depth: usize,
    /// Most entities (blocks and transactions) one query may resolve.
    pub max_nodes: usize,
}

impl QueryLimits {
    /// Configured defaults clamped to the hard ceilings.
    pub(super) fn effective(self) -> Self {
        Self {
            max_depth: self.max_depth.min(HARD_MAX_DEPTH),
            max_nodes: self.max_nodes.min(HARD_MAX_NODES),
        }
    }

    /// Apply per-request overrides. Each must lie in `1..=` its hard ceiling.
    pub(super) fn with_overrides(
        self,
        max_depth: Option<usize>,
        max_nodes: Option<usize>,
    ) -> Result<Self, AppError> {
        validate_limit_bounds("max_depth", max_depth, HARD_MAX_DEPTH)?;
        validate_limit_bounds("max_nodes", max_nodes, HARD_MAX_NODES)?;

        let defaults = self.effective();
        Ok(Self {
            max_depth: max_depth.unwrap_or(defaults.max_depth),
            max_nodes: max_nodes.unwrap_or(defaults.max_nodes),
        })
    }
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            max_depth: 4,
            max_nodes: 5_000,
        }
    }
}

fn validate_limit_bounds(field: &str, value: Option<usize>, max: usize) -> Result<(), AppError> {
    if let Some(limit) = value {
        if limit == 0 {
            return Err(AppError::BadRequest(format!("{field} must be at least 1")));
        }
        if limit > max {
            return Err(AppError::BadRequest(format!(
                "{field} must be at most {max}"
            )));
        }
    }
    Ok(())
}

#[derive(Serialize)]
pub(super) struct LimitsResponse {
    hard_max_depth: usize,
    configured_default_depth: usize,
    effective_default_depth: usize,
    hard_max_nodes: usize,
    configured_default_nodes: usize,
    effective_default_nodes: usize,
}

pub(super) async fn get_limits(State(state): State<SharedState>) -> Json<LimitsResponse> {
    let configured = state.default_limits;
    let effective = configured.effective();

    Json(LimitsResponse {
        hard_max_depth: HARD_MAX_DEPTH,
        configured_default_depth: configured.max_depth,
        effective_default_depth: effective.max_depth,
        hard_max_nodes: HARD_MAX_NODES,
        configured_default_nodes: configured.max_nodes,
        effective_default_nodes: effective.max_nodes,
    })
}
