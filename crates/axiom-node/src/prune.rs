//! The metacognitive prune — slow garbage collection of stale fragments.
//!
//! A fact is deleted only when it is old, never earned trust, and is
//! either a confirmed fragment or too structurally shallow to be useful
//! (an analytical summary under 10 characters). The chain keeps every
//! historical commitment; a pruned fact id in an old block simply no
//! longer resolves.

use chrono::{Duration, Utc};
use tracing::info;

use crate::context::NodeContext;

/// Facts younger than this are never prune candidates.
const PRUNE_AGE_DAYS: i64 = 90;

/// Run one prune pass; returns how many facts were deleted.
pub async fn run_prune(ctx: &NodeContext) -> axiom_store::Result<usize> {
  let cutoff = Utc::now() - Duration::days(PRUNE_AGE_DAYS);
  let deleted = ctx.store.prune_stale_facts(cutoff).await?;
  if deleted > 0 {
    info!(deleted, "pruned stale low-integrity facts");
  } else {
    info!("no facts met the prune criteria");
  }
  Ok(deleted)
}
