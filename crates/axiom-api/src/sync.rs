//! Handlers for the pull-sync endpoints peers call on us.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/get_fact_ids` | every fact id we hold |
//! | `GET`  | `/get_facts_by_id?ids=<comma-hex>` | records, decompressed |
//! | `POST` | `/get_facts_by_id` | body `{"ids":[…]}`; same response |
//! | `GET`  | `/get_chain_head` | `{block_id, height}` |
//! | `GET`  | `/get_blocks_after?height=N` | ascending; empty past head |
//! | `GET`  | `/get_peers` | known peer origin URLs |
//! | `GET`  | `/fragment_opinion?fact_id=hex` | local fragment verdict |
//! | `GET`  | `/status` | liveness summary |

use axum::{
  extract::{Query, State},
  Json,
};
use serde::{Deserialize, Serialize};

use axiom_core::{
  chain::Block,
  fact::{is_fact_id, Fact, FactStatus, FragmentState},
};

use crate::{error::ApiError, state::AppState};

// ─── Fact ids ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct FactIdsResponse {
  pub fact_ids: Vec<String>,
}

/// `GET /get_fact_ids`
pub async fn fact_ids(
  State(state): State<AppState>,
) -> Result<Json<FactIdsResponse>, ApiError> {
  let fact_ids = state.store.get_fact_ids().await?;
  Ok(Json(FactIdsResponse { fact_ids }))
}

// ─── Facts by id ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct FactsResponse {
  pub facts: Vec<Fact>,
}

#[derive(Debug, Deserialize)]
pub struct FactsByIdParams {
  /// Comma-joined fact ids.
  pub ids: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FactsByIdBody {
  pub ids: Vec<String>,
}

async fn fetch_facts(
  state: &AppState,
  ids: Vec<String>,
) -> Result<Json<FactsResponse>, ApiError> {
  if let Some(bad) = ids.iter().find(|id| !is_fact_id(id)) {
    return Err(ApiError::BadRequest(format!("malformed fact id: {bad:?}")));
  }
  let facts = state.store.get_facts_by_id(&ids).await?;
  Ok(Json(FactsResponse { facts }))
}

/// `GET /get_facts_by_id?ids=<comma-hex>`
pub async fn facts_by_id_query(
  State(state): State<AppState>,
  Query(params): Query<FactsByIdParams>,
) -> Result<Json<FactsResponse>, ApiError> {
  let ids = params
    .ids
    .ok_or_else(|| {
      ApiError::BadRequest("missing 'ids' query parameter".to_owned())
    })?
    .split(',')
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(str::to_owned)
    .collect();
  fetch_facts(&state, ids).await
}

/// `POST /get_facts_by_id` — body `{"ids":[…]}`.
pub async fn facts_by_id_body(
  State(state): State<AppState>,
  Json(body): Json<FactsByIdBody>,
) -> Result<Json<FactsResponse>, ApiError> {
  fetch_facts(&state, body.ids).await
}

// ─── Chain ───────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ChainHeadResponse {
  pub block_id: String,
  pub height:   u64,
}

/// `GET /get_chain_head`
pub async fn chain_head(
  State(state): State<AppState>,
) -> Result<Json<ChainHeadResponse>, ApiError> {
  let head = state.store.chain_head().await?;
  Ok(Json(ChainHeadResponse {
    block_id: head.block_id,
    height:   head.height,
  }))
}

#[derive(Debug, Deserialize)]
pub struct BlocksAfterParams {
  pub height: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BlocksResponse {
  pub blocks: Vec<Block>,
}

/// `GET /get_blocks_after?height=N` — blocks strictly above `N`,
/// ascending. A height at or past the head yields an empty list, not 404.
pub async fn blocks_after(
  State(state): State<AppState>,
  Query(params): Query<BlocksAfterParams>,
) -> Result<Json<BlocksResponse>, ApiError> {
  let height: u64 = params
    .height
    .as_deref()
    .ok_or_else(|| {
      ApiError::BadRequest("missing 'height' query parameter".to_owned())
    })?
    .parse()
    .map_err(|_| {
      ApiError::BadRequest("'height' must be a non-negative integer".to_owned())
    })?;
  let blocks = state.store.blocks_after(height).await?;
  Ok(Json(BlocksResponse { blocks }))
}

// ─── Peers ───────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct PeersResponse {
  pub peers: Vec<String>,
}

/// `GET /get_peers`
pub async fn peers(
  State(state): State<AppState>,
) -> Result<Json<PeersResponse>, ApiError> {
  let peers = state
    .store
    .list_peers()
    .await?
    .into_iter()
    .map(|p| p.url)
    .collect();
  Ok(Json(PeersResponse { peers }))
}

// ─── Fragment opinion ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct OpinionParams {
  pub fact_id: Option<String>,
}

/// What this node thinks about one fact, for a peer's audit pass.
#[derive(Debug, Serialize, Deserialize)]
pub struct FragmentOpinion {
  pub seen:           bool,
  pub status:         Option<FactStatus>,
  pub trust_score:    Option<i64>,
  pub fragment_state: Option<FragmentState>,
  pub fragment_score: Option<f64>,
}

impl FragmentOpinion {
  pub fn unseen() -> Self {
    Self {
      seen:           false,
      status:         None,
      trust_score:    None,
      fragment_state: None,
      fragment_score: None,
    }
  }
}

/// `GET /fragment_opinion?fact_id=hex`
pub async fn fragment_opinion(
  State(state): State<AppState>,
  Query(params): Query<OpinionParams>,
) -> Result<Json<FragmentOpinion>, ApiError> {
  let fact_id = params.fact_id.ok_or_else(|| {
    ApiError::BadRequest("missing 'fact_id' query parameter".to_owned())
  })?;
  if !is_fact_id(&fact_id) {
    return Err(ApiError::BadRequest(format!(
      "malformed fact id: {fact_id:?}"
    )));
  }

  let opinion = match state.store.get_fact(&fact_id).await? {
    Some(fact) => FragmentOpinion {
      seen:           true,
      status:         Some(fact.status),
      trust_score:    Some(fact.trust_score),
      fragment_state: Some(fact.fragment_state),
      fragment_score: Some(fact.fragment_score),
    },
    None => FragmentOpinion::unseen(),
  };
  Ok(Json(opinion))
}

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct StatusResponse {
  pub status:  &'static str,
  pub height:  u64,
  pub facts:   u64,
  pub version: &'static str,
}

/// `GET /status`
pub async fn status(
  State(state): State<AppState>,
) -> Result<Json<StatusResponse>, ApiError> {
  let stats = state.store.health_stats().await?;
  Ok(Json(StatusResponse {
    status:  "ok",
    height:  stats.chain_height,
    facts:   stats.fact_count,
    version: env!("CARGO_PKG_VERSION"),
  }))
}
