//! Periodic health snapshot of the ledger and chain.

use tracing::{info, warn};

use crate::context::NodeContext;

/// Log a one-line summary of ledger health, and flag the pathological
/// state of a chain that commits facts nobody holds.
pub async fn run_health_snapshot(
  ctx: &NodeContext,
) -> axiom_store::Result<()> {
  let stats = ctx.store.health_stats().await?;

  if stats.block_count > 0 && stats.fact_count == 0 {
    warn!(
      blocks = stats.block_count,
      "chain has committed blocks but the fact ledger is empty"
    );
  }

  info!(
    facts = stats.fact_count,
    trusted = stats.trusted,
    uncorroborated = stats.uncorroborated,
    disputed = stats.disputed,
    blocks = stats.block_count,
    height = stats.chain_height,
    average_trust = stats.average_trust.unwrap_or(0.0),
    "health snapshot"
  );
  Ok(())
}
