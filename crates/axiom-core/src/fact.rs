//! Fact types — the fundamental unit of the Axiom ledger.
//!
//! A fact is an immutable textual claim addressed by the SHA-256 of its
//! canonical text. Only its corroboration status, trust score, and fragment
//! classification ever change after insertion; the content, id, and ingest
//! timestamp do not.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{Error, Result};

// ─── Identity ────────────────────────────────────────────────────────────────

/// Compute the content address of a fact: the lowercase hex SHA-256 of the
/// exact UTF-8 text.
pub fn fact_id_for(content: &str) -> String {
  hex::encode(Sha256::digest(content.as_bytes()))
}

/// `true` iff `s` is a well-formed fact id (64 lowercase hex characters).
pub fn is_fact_id(s: &str) -> bool {
  s.len() == 64
    && s
      .bytes()
      .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

// ─── Status ──────────────────────────────────────────────────────────────────

/// Corroboration status of a fact. Transitions are one-way:
/// `Uncorroborated → Trusted` on the second independent source, and any
/// state `→ Disputed` on a recorded contradiction. Nothing ever moves back
/// to `Uncorroborated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactStatus {
  Uncorroborated,
  Trusted,
  Disputed,
}

impl FactStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Uncorroborated => "uncorroborated",
      Self::Trusted => "trusted",
      Self::Disputed => "disputed",
    }
  }

  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "uncorroborated" => Ok(Self::Uncorroborated),
      "trusted" => Ok(Self::Trusted),
      "disputed" => Ok(Self::Disputed),
      other => Err(Error::UnknownStatus(other.to_owned())),
    }
  }
}

// ─── Fragment classification ─────────────────────────────────────────────────

/// Heuristic classification of a fact as a malformed or decontextualised
/// sentence fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentState {
  Unknown,
  SuspectedFragment,
  ConfirmedFragment,
  RejectedFragment,
}

impl Default for FragmentState {
  fn default() -> Self { Self::Unknown }
}

impl FragmentState {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Unknown => "unknown",
      Self::SuspectedFragment => "suspected_fragment",
      Self::ConfirmedFragment => "confirmed_fragment",
      Self::RejectedFragment => "rejected_fragment",
    }
  }

  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "unknown" => Ok(Self::Unknown),
      "suspected_fragment" => Ok(Self::SuspectedFragment),
      "confirmed_fragment" => Ok(Self::ConfirmedFragment),
      "rejected_fragment" => Ok(Self::RejectedFragment),
      other => Err(Error::UnknownFragmentState(other.to_owned())),
    }
  }
}

// ─── Relationships ───────────────────────────────────────────────────────────

/// The kind of a recorded pairwise relationship between two facts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
  /// The two facts assert incompatible claims.
  Contradicts,
  /// The two facts mention a common entity (written by the synthesizer).
  SharedEntity,
}

impl RelationKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Contradicts => "contradicts",
      Self::SharedEntity => "shared_entity",
    }
  }
}

// ─── Fact ────────────────────────────────────────────────────────────────────

/// A ledger fact as read back from the store, content decompressed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fact {
  pub fact_id:              String,
  pub content:              String,
  pub adl_summary:          String,
  pub source_url:           String,
  pub ingest_timestamp_utc: DateTime<Utc>,
  pub status:               FactStatus,
  pub trust_score:          i64,
  pub fragment_state:       FragmentState,
  pub fragment_score:       f64,
  pub fragment_reason:      Option<String>,
}

// ─── NewFact ─────────────────────────────────────────────────────────────────

/// Input to the idempotent ledger insert. The fact id and ingest timestamp
/// are always assigned by the store; callers never supply them.
#[derive(Debug, Clone)]
pub struct NewFact {
  pub content:         String,
  pub source_url:      String,
  pub adl_summary:     String,
  pub fragment_state:  FragmentState,
  pub fragment_score:  f64,
  pub fragment_reason: Option<String>,
}

impl NewFact {
  /// Convenience constructor with neutral fragment metadata.
  pub fn new(content: impl Into<String>, source_url: impl Into<String>) -> Self {
    Self {
      content:         content.into(),
      source_url:      source_url.into(),
      adl_summary:     String::new(),
      fragment_state:  FragmentState::Unknown,
      fragment_score:  0.0,
      fragment_reason: None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fact_id_is_sha256_of_content() {
    // SHA-256 of "A", independently computed.
    assert_eq!(
      fact_id_for("A"),
      "559aead08264d5795d3909718cdd05abd49572e84fe55590eef31a88a08fdffd"
    );
  }

  #[test]
  fn fact_id_shape_is_accepted() {
    assert!(is_fact_id(&fact_id_for("anything at all")));
    assert!(!is_fact_id("deadbeef"));
    assert!(!is_fact_id(&"Z".repeat(64)));
  }

  #[test]
  fn status_round_trips_and_rejects_unknown() {
    for s in ["uncorroborated", "trusted", "disputed"] {
      assert_eq!(FactStatus::parse(s).unwrap().as_str(), s);
    }
    assert!(FactStatus::parse("verified").is_err());
  }

  #[test]
  fn fragment_state_round_trips_and_rejects_unknown() {
    for s in [
      "unknown",
      "suspected_fragment",
      "confirmed_fragment",
      "rejected_fragment",
    ] {
      assert_eq!(FragmentState::parse(s).unwrap().as_str(), s);
    }
    assert!(FragmentState::parse("fragment").is_err());
  }
}
