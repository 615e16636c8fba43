//! JSON HTTP interface for an Axiom node.
//!
//! Every endpoint is a pure read of the store at request time; syncs are
//! only ever initiated by the background worker, never by a handler. The
//! one side effect handlers do have: any inbound request carrying an
//! `X-Axiom-Peer` header registers the sender in the peer table, which is
//! how a pulled-from node learns about the puller.

pub mod debug;
pub mod error;
pub mod state;
pub mod sync;

use axum::{
  extract::{Request, State},
  middleware::{self, Next},
  response::Response,
  routing::get,
  Router,
};
use tracing::{debug as debug_log, warn};

use axiom_core::peer::canonical_peer_url;

pub use error::ApiError;
pub use state::{AppState, IdleTracker, NodeInfo, NodeRole};

/// Header peers use to advertise their own origin URL on every request.
pub const PEER_HEADER: &str = "x-axiom-peer";

/// Build the node's router over `state`.
pub fn router(state: AppState) -> Router {
  Router::new()
    .route("/get_fact_ids", get(sync::fact_ids))
    .route(
      "/get_facts_by_id",
      get(sync::facts_by_id_query).post(sync::facts_by_id_body),
    )
    .route("/get_chain_head", get(sync::chain_head))
    .route("/get_blocks_after", get(sync::blocks_after))
    .route("/get_peers", get(sync::peers))
    .route("/fragment_opinion", get(sync::fragment_opinion))
    .route("/status", get(sync::status))
    .route("/debug/idle_state", get(debug::idle_state))
    .layer(middleware::from_fn_with_state(
      state.clone(),
      register_caller,
    ))
    .with_state(state)
}

/// Register the sender of any request that advertises itself via
/// [`PEER_HEADER`]. Registration failures never fail the request.
async fn register_caller(
  State(state): State<AppState>,
  request: Request,
  next: Next,
) -> Response {
  let advertised = request
    .headers()
    .get(PEER_HEADER)
    .and_then(|v| v.to_str().ok())
    .map(str::trim)
    .filter(|v| !v.is_empty())
    .map(str::to_owned);

  if let Some(raw) = advertised {
    match canonical_peer_url(&raw) {
      Ok(url) if url != state.node.advertised_url => {
        match state.store.register_peer(&url).await {
          Ok(_) => debug_log!(peer = %url, "registered calling peer"),
          Err(e) => warn!(peer = %url, error = %e, "peer registration failed"),
        }
      }
      Ok(_) => {} // a request from ourselves
      Err(e) => debug_log!(%raw, error = %e, "ignoring unusable peer header"),
    }
  }

  next.run(request).await
}
