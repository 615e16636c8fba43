//! Pull-sync client: one round against one peer.
//!
//! A round is three pulls — facts, then chain, then the peer's peer list —
//! and every request carries our advertised URL in the `X-Axiom-Peer`
//! header so the peer reciprocally learns us. Each step failing is logged
//! and the round moves on; nothing here can take the node down.

use std::collections::HashSet;

use serde::Deserialize;
use tracing::{debug, info, warn};

use axiom_api::PEER_HEADER;
use axiom_core::fact::{fact_id_for, is_fact_id, Fact, NewFact};
use axiom_store::Error as StoreError;

use crate::context::NodeContext;

/// How many fact records to request per `get_facts_by_id` call.
const FACT_BATCH: usize = 50;

// Reputation nudges per sync round. Failures cost more than routine
// up-to-date rounds earn, so a flaky peer sinks over time.
const REP_FAILED_ROUND: f64 = -0.2;
const REP_UP_TO_DATE: f64 = 0.05;
const REP_NEW_DATA: f64 = 0.1;

// ─── Wire bodies ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct FactIdsBody {
  fact_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct FactsBody {
  facts: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChainHeadBody {
  block_id: String,
  height:   u64,
}

#[derive(Debug, Deserialize)]
struct BlocksBody {
  blocks: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct PeersBody {
  peers: Vec<String>,
}

// ─── Round ───────────────────────────────────────────────────────────────────

/// What one sync round against one peer accomplished.
#[derive(Debug, Default)]
pub struct SyncOutcome {
  pub new_facts:       usize,
  pub blocks_appended: usize,
  pub peers_learned:   usize,
  pub failed_steps:    usize,
}

/// Run a full pull round against `peer_url` and settle the peer's
/// reputation afterwards.
pub async fn sync_round(ctx: &NodeContext, peer_url: &str) -> SyncOutcome {
  debug!(peer = peer_url, "sync round start");
  let mut outcome = SyncOutcome::default();

  match fact_sync(ctx, peer_url).await {
    Ok(n) => outcome.new_facts = n,
    Err(e) => {
      warn!(peer = peer_url, error = %e, "fact sync failed");
      outcome.failed_steps += 1;
    }
  }

  match chain_sync(ctx, peer_url).await {
    Ok(n) => outcome.blocks_appended = n,
    Err(e) => {
      warn!(peer = peer_url, error = %e, "chain sync failed");
      outcome.failed_steps += 1;
    }
  }

  match discover_peers(ctx, peer_url).await {
    Ok(n) => outcome.peers_learned = n,
    Err(e) => {
      warn!(peer = peer_url, error = %e, "peer discovery failed");
      outcome.failed_steps += 1;
    }
  }

  let delta = if outcome.failed_steps > 0 {
    REP_FAILED_ROUND
  } else if outcome.new_facts > 0 || outcome.blocks_appended > 0 {
    REP_NEW_DATA
  } else {
    REP_UP_TO_DATE
  };
  if let Err(e) = ctx.store.adjust_peer_reputation(peer_url, delta).await {
    warn!(peer = peer_url, error = %e, "reputation update failed");
  }
  if outcome.failed_steps == 0 {
    // A successful interaction also refreshes last_seen.
    if let Err(e) = ctx.store.register_peer(peer_url).await {
      warn!(peer = peer_url, error = %e, "peer refresh failed");
    }
  }

  if outcome.new_facts > 0 || outcome.blocks_appended > 0 {
    info!(
      peer = peer_url,
      new_facts = outcome.new_facts,
      blocks = outcome.blocks_appended,
      "sync round brought new data"
    );
  }
  outcome
}

/// One initial round against every configured peer, before the first main
/// cycle. A node with no peers simply starts alone.
pub async fn bootstrap_sync(ctx: &NodeContext) {
  let peers = match ctx.store.list_peers().await {
    Ok(peers) => peers,
    Err(e) => {
      warn!(error = %e, "could not list peers for bootstrap sync");
      return;
    }
  };
  if peers.is_empty() {
    info!("no bootstrap peers; starting with a lone ledger");
    return;
  }
  info!(peers = peers.len(), "bootstrap sync");
  for peer in peers {
    if peer.url != ctx.info.advertised_url {
      sync_round(ctx, &peer.url).await;
    }
  }
}

// ─── Steps ───────────────────────────────────────────────────────────────────

async fn get_json<T: serde::de::DeserializeOwned>(
  ctx: &NodeContext,
  url: String,
) -> anyhow::Result<T> {
  let response = ctx
    .http
    .get(url)
    .header(PEER_HEADER, &ctx.info.advertised_url)
    .send()
    .await?
    .error_for_status()?;
  Ok(response.json().await?)
}

/// Pull the facts we are missing. Returns how many were newly inserted.
async fn fact_sync(
  ctx: &NodeContext,
  peer_url: &str,
) -> anyhow::Result<usize> {
  let remote: FactIdsBody =
    get_json(ctx, format!("{peer_url}/get_fact_ids")).await?;

  let local: HashSet<String> =
    ctx.store.get_fact_ids().await?.into_iter().collect();
  let missing: Vec<String> = remote
    .fact_ids
    .into_iter()
    .filter(|id| is_fact_id(id) && !local.contains(id))
    .collect();

  if missing.is_empty() {
    debug!(peer = peer_url, "ledger already up to date");
    return Ok(0);
  }
  info!(peer = peer_url, missing = missing.len(), "pulling missing facts");

  let mut inserted = 0usize;
  for chunk in missing.chunks(FACT_BATCH) {
    let response = ctx
      .http
      .post(format!("{peer_url}/get_facts_by_id"))
      .header(PEER_HEADER, &ctx.info.advertised_url)
      .json(&serde_json::json!({ "ids": chunk }))
      .send()
      .await
      .and_then(reqwest::Response::error_for_status);
    let body: FactsBody = match response {
      Ok(response) => match response.json().await {
        Ok(body) => body,
        Err(e) => {
          warn!(peer = peer_url, error = %e, "undecodable fact batch");
          continue;
        }
      },
      Err(e) => {
        warn!(peer = peer_url, error = %e, "fact batch fetch failed");
        continue;
      }
    };

    for item in body.facts {
      inserted += usize::from(ingest_remote_fact(ctx, peer_url, item).await);
    }
  }
  Ok(inserted)
}

/// Verify and insert a single fact record received from `peer_url`.
/// Returns `true` only when a new row was created.
async fn ingest_remote_fact(
  ctx: &NodeContext,
  peer_url: &str,
  item: serde_json::Value,
) -> bool {
  let fact: Fact = match serde_json::from_value(item) {
    Ok(fact) => fact,
    Err(e) => {
      warn!(peer = peer_url, error = %e, "skipping malformed fact record");
      return false;
    }
  };

  if fact_id_for(&fact.content) != fact.fact_id {
    warn!(
      peer = peer_url,
      fact_id = %fact.fact_id,
      "peer sent content that does not hash to its id; dropping"
    );
    return false;
  }

  // Remote trust claims are not portable: the fact re-enters this ledger
  // uncorroborated and earns trust locally.
  let input = NewFact {
    content:         fact.content,
    source_url:      fact.source_url,
    adl_summary:     fact.adl_summary,
    fragment_state:  fact.fragment_state,
    fragment_score:  fact.fragment_score,
    fragment_reason: fact.fragment_reason,
  };
  match ctx.store.insert_uncorroborated_fact(input).await {
    Ok(result) => result.newly_inserted,
    Err(e @ StoreError::Compression(_)) => {
      warn!(peer = peer_url, error = %e, "could not compress incoming fact");
      false
    }
    Err(e) => {
      warn!(peer = peer_url, error = %e, "could not store incoming fact");
      false
    }
  }
}

/// Extend our chain with the peer's blocks, stopping at the first block
/// that does not extend our head. Never rewrites anything.
async fn chain_sync(
  ctx: &NodeContext,
  peer_url: &str,
) -> anyhow::Result<usize> {
  let peer_head: ChainHeadBody =
    get_json(ctx, format!("{peer_url}/get_chain_head")).await?;
  let local_head = ctx.store.chain_head().await?;

  if peer_head.height <= local_head.height {
    return Ok(0);
  }
  debug!(
    peer = peer_url,
    peer_height = peer_head.height,
    peer_head = %peer_head.block_id,
    local_height = local_head.height,
    "peer chain is ahead"
  );

  let body: BlocksBody = get_json(
    ctx,
    format!("{peer_url}/get_blocks_after?height={}", local_head.height),
  )
  .await?;

  let mut appended = 0usize;
  for item in body.blocks {
    let block = match serde_json::from_value(item) {
      Ok(block) => block,
      Err(e) => {
        warn!(peer = peer_url, error = %e, "skipping malformed block");
        break;
      }
    };
    match ctx.store.append_block(block).await {
      Ok(()) => appended += 1,
      Err(StoreError::RejectedBlock(violation)) => {
        info!(
          peer = peer_url,
          reason = %violation,
          "peer block does not extend our head; stopping chain sync"
        );
        break;
      }
      Err(e) => {
        warn!(peer = peer_url, error = %e, "block append failed");
        break;
      }
    }
  }
  if appended > 0 {
    info!(peer = peer_url, appended, "extended chain from peer");
  }
  Ok(appended)
}

/// Learn the peer's peers. Returns how many URLs were registered.
async fn discover_peers(
  ctx: &NodeContext,
  peer_url: &str,
) -> anyhow::Result<usize> {
  let body: PeersBody =
    get_json(ctx, format!("{peer_url}/get_peers")).await?;

  let mut learned = 0usize;
  for url in body.peers {
    if url == ctx.info.advertised_url {
      continue;
    }
    match ctx.store.register_peer(&url).await {
      Ok(_) => learned += 1,
      Err(e) => debug!(%url, error = %e, "ignoring unusable peer url"),
    }
  }
  Ok(learned)
}
