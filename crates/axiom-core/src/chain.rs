//! Block types and hash linkage for the commitment chain.
//!
//! A block commits an ordered list of fact ids at a height. Each block's id
//! is the SHA-256 over its parent id, height, creation timestamp, and the
//! JSON rendering of its fact ids, so the chain is tamper-evident end to
//! end. The chain only ever moves forward: a node appends blocks that extend
//! its head and never reorganises.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{fact::is_fact_id, Result};

/// The fixed id of the genesis block, created once on first startup.
pub const GENESIS_BLOCK_ID: &str = "axiom_genesis_v1";

/// The `previous_block_id` of genesis.
pub const GENESIS_PREVIOUS: &str = "";

// ─── Block ───────────────────────────────────────────────────────────────────

/// An append-only commitment to an ordered set of fact ids.
///
/// `created_at_utc` is carried as the exact RFC 3339 string it was first
/// rendered with — it participates in the hash, so reformatting it would
/// orphan the block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
  pub block_id:          String,
  pub previous_block_id: String,
  pub height:            u64,
  pub created_at_utc:    String,
  pub fact_ids:          Vec<String>,
}

/// Hash a block payload: `SHA256(previous || height || created_at ||
/// json(fact_ids))` with `height` in decimal and the fact ids as a compact
/// JSON array in committed order.
pub fn block_digest(
  previous_block_id: &str,
  height: u64,
  created_at_utc: &str,
  fact_ids: &[String],
) -> Result<String> {
  let ids_json = serde_json::to_string(fact_ids)?;
  let mut hasher = Sha256::new();
  hasher.update(previous_block_id.as_bytes());
  hasher.update(height.to_string().as_bytes());
  hasher.update(created_at_utc.as_bytes());
  hasher.update(ids_json.as_bytes());
  Ok(hex::encode(hasher.finalize()))
}

impl Block {
  /// Recompute this block's id from its own payload.
  pub fn computed_id(&self) -> Result<String> {
    block_digest(
      &self.previous_block_id,
      self.height,
      &self.created_at_utc,
      &self.fact_ids,
    )
  }
}

// ─── Validation ──────────────────────────────────────────────────────────────

/// Why a candidate block was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlockViolation {
  #[error("stored block id does not match the recomputed payload hash")]
  IdMismatch,

  #[error("previous_block_id does not match the current head")]
  ParentMismatch,

  #[error("height {candidate} does not extend head height {head}")]
  HeightMismatch { candidate: u64, head: u64 },

  #[error("fact_ids contains a malformed id: {0:?}")]
  MalformedFactId(String),
}

/// Check a candidate block against the head it must extend.
///
/// Passes iff the recomputed hash matches `block_id`, the parent link and
/// height extend the given head, and every committed fact id is well
/// formed. A block that fails here is simply not applied — there is no
/// branch resolution.
pub fn validate_against_head(
  candidate: &Block,
  head_block_id: &str,
  head_height: u64,
) -> Result<(), BlockViolation> {
  if let Some(bad) =
    candidate.fact_ids.iter().find(|id| !is_fact_id(id))
  {
    return Err(BlockViolation::MalformedFactId(bad.clone()));
  }
  let recomputed = candidate
    .computed_id()
    .map_err(|_| BlockViolation::IdMismatch)?;
  if recomputed != candidate.block_id {
    return Err(BlockViolation::IdMismatch);
  }
  if candidate.previous_block_id != head_block_id {
    return Err(BlockViolation::ParentMismatch);
  }
  if candidate.height != head_height + 1 {
    return Err(BlockViolation::HeightMismatch {
      candidate: candidate.height,
      head:      head_height,
    });
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::fact::fact_id_for;

  fn block_over(
    previous: &str,
    height: u64,
    fact_ids: Vec<String>,
  ) -> Block {
    let created_at_utc = "2026-08-01T00:00:00+00:00".to_owned();
    let block_id =
      block_digest(previous, height, &created_at_utc, &fact_ids).unwrap();
    Block {
      block_id,
      previous_block_id: previous.to_owned(),
      height,
      created_at_utc,
      fact_ids,
    }
  }

  #[test]
  fn digest_is_stable_and_order_sensitive() {
    let a = fact_id_for("A");
    let b = fact_id_for("B");
    let ab = block_digest("p", 1, "t", &[a.clone(), b.clone()]).unwrap();
    let ab2 = block_digest("p", 1, "t", &[a.clone(), b.clone()]).unwrap();
    let ba = block_digest("p", 1, "t", &[b, a]).unwrap();
    assert_eq!(ab, ab2);
    assert_ne!(ab, ba);
  }

  #[test]
  fn valid_extension_passes() {
    let block = block_over(GENESIS_BLOCK_ID, 1, vec![fact_id_for("A")]);
    assert_eq!(
      validate_against_head(&block, GENESIS_BLOCK_ID, 0),
      Ok(())
    );
  }

  #[test]
  fn tampered_id_is_rejected() {
    let mut block = block_over(GENESIS_BLOCK_ID, 1, vec![fact_id_for("A")]);
    block.block_id = fact_id_for("not the real digest");
    assert_eq!(
      validate_against_head(&block, GENESIS_BLOCK_ID, 0),
      Err(BlockViolation::IdMismatch)
    );
  }

  #[test]
  fn wrong_parent_is_rejected() {
    let block = block_over("somebody_else", 1, vec![fact_id_for("A")]);
    assert_eq!(
      validate_against_head(&block, GENESIS_BLOCK_ID, 0),
      Err(BlockViolation::ParentMismatch)
    );
  }

  #[test]
  fn skipped_height_is_rejected() {
    let block = block_over(GENESIS_BLOCK_ID, 3, vec![fact_id_for("A")]);
    assert!(matches!(
      validate_against_head(&block, GENESIS_BLOCK_ID, 0),
      Err(BlockViolation::HeightMismatch { candidate: 3, head: 0 })
    ));
  }

  #[test]
  fn malformed_fact_id_is_rejected() {
    let block = block_over(GENESIS_BLOCK_ID, 1, vec!["nope".to_owned()]);
    assert!(matches!(
      validate_against_head(&block, GENESIS_BLOCK_ID, 0),
      Err(BlockViolation::MalformedFactId(_))
    ));
  }
}
