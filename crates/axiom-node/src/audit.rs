//! The fragment audit pass.
//!
//! Re-scores a random sample of the ledger with the deterministic
//! heuristics in [`axiom_core::fragment`], then settles suspected
//! fragments by polling up to three peers for their opinion. The state
//! machine:
//!
//! - `unknown` with score ≥ 0.5 becomes `suspected_fragment`;
//! - `suspected_fragment` with score < 0.2 drops to `rejected_fragment`;
//! - `suspected_fragment` with unanimous positive peer votes becomes
//!   `confirmed_fragment`, unanimous negative votes `rejected_fragment`;
//! - mixed or absent votes leave the fact as it stands.

use tracing::{debug, info, warn};

use axiom_api::{sync::FragmentOpinion, PEER_HEADER};
use axiom_core::{
  fact::{Fact, FactStatus, FragmentState},
  fragment::{fragment_signals, FragmentSignals},
};

use crate::context::NodeContext;

/// How many facts one audit pass examines.
const AUDIT_SAMPLE: u32 = 40;

/// How many peers are polled per suspected fragment.
const OPINION_PEERS: usize = 3;

/// Score at or above which an unclassified fact becomes suspected.
const SUSPECT_THRESHOLD: f64 = 0.5;

/// Score below which a suspected fact is demoted without asking peers.
const CLEAR_THRESHOLD: f64 = 0.2;

/// A peer vouching for a fact this strongly counts as a vote against
/// fragment-hood.
const PEER_TRUST_FLOOR: i64 = 3;

// ─── Votes ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Vote {
  Positive,
  Negative,
  Abstain,
}

/// Read one peer's opinion as a vote on fragment-hood.
///
/// A peer that has never seen the fact votes positive — a claim nobody
/// else holds is itself fragment evidence. So does a peer that suspects
/// or has confirmed it. A peer that rejected it, or that trusts the fact
/// with a score of at least [`PEER_TRUST_FLOOR`], votes negative.
fn classify_opinion(opinion: &FragmentOpinion) -> Vote {
  if !opinion.seen {
    return Vote::Positive;
  }
  if matches!(
    opinion.fragment_state,
    Some(FragmentState::SuspectedFragment | FragmentState::ConfirmedFragment)
  ) {
    return Vote::Positive;
  }
  if opinion.fragment_state == Some(FragmentState::RejectedFragment) {
    return Vote::Negative;
  }
  if opinion.status == Some(FactStatus::Trusted)
    && opinion.trust_score.is_some_and(|t| t >= PEER_TRUST_FLOOR)
  {
    return Vote::Negative;
  }
  Vote::Abstain
}

/// `Some(true)` on unanimous positives, `Some(false)` on unanimous
/// negatives, `None` when mixed or nobody voted.
fn consensus(votes: &[Vote]) -> Option<bool> {
  let positives = votes.iter().filter(|v| **v == Vote::Positive).count();
  let negatives = votes.iter().filter(|v| **v == Vote::Negative).count();
  match (positives, negatives) {
    (1.., 0) => Some(true),
    (0, 1..) => Some(false),
    _ => None,
  }
}

// ─── Pass ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct AuditSummary {
  pub examined:  usize,
  pub suspected: usize,
  pub confirmed: usize,
  pub rejected:  usize,
}

/// Run one audit pass over a random sample of non-disputed facts.
pub async fn run_fragment_audit(
  ctx: &NodeContext,
) -> axiom_store::Result<AuditSummary> {
  let sample = ctx.store.sample_auditable_facts(AUDIT_SAMPLE).await?;
  let mut summary = AuditSummary { examined: sample.len(), ..Default::default() };

  for fact in sample {
    let signals = fragment_signals(&fact.content);
    match fact.fragment_state {
      FragmentState::Unknown if signals.score >= SUSPECT_THRESHOLD => {
        apply(ctx, &fact, FragmentState::SuspectedFragment, &signals).await?;
        summary.suspected += 1;
      }
      FragmentState::SuspectedFragment
        if signals.score < CLEAR_THRESHOLD =>
      {
        apply(ctx, &fact, FragmentState::RejectedFragment, &signals).await?;
        summary.rejected += 1;
      }
      FragmentState::SuspectedFragment => {
        match poll_peers(ctx, &fact.fact_id).await {
          Some(true) => {
            apply(ctx, &fact, FragmentState::ConfirmedFragment, &signals)
              .await?;
            summary.confirmed += 1;
          }
          Some(false) => {
            apply(ctx, &fact, FragmentState::RejectedFragment, &signals)
              .await?;
            summary.rejected += 1;
          }
          None => {}
        }
      }
      _ => {}
    }
  }

  info!(
    examined = summary.examined,
    suspected = summary.suspected,
    confirmed = summary.confirmed,
    rejected = summary.rejected,
    "fragment audit pass complete"
  );
  Ok(summary)
}

async fn apply(
  ctx: &NodeContext,
  fact: &Fact,
  state: FragmentState,
  signals: &FragmentSignals,
) -> axiom_store::Result<()> {
  debug!(
    fact_id = %fact.fact_id,
    from = fact.fragment_state.as_str(),
    to = state.as_str(),
    score = signals.score,
    "fragment reclassification"
  );
  ctx
    .store
    .update_fragment(
      &fact.fact_id,
      state,
      signals.score,
      signals.reason_string(),
    )
    .await
}

/// Poll up to [`OPINION_PEERS`] of our most reputable peers and reduce
/// their opinions to a consensus verdict. Unreachable peers just don't
/// vote.
async fn poll_peers(ctx: &NodeContext, fact_id: &str) -> Option<bool> {
  let peers = match ctx.store.list_peers().await {
    Ok(peers) => peers,
    Err(e) => {
      warn!(error = %e, "could not list peers for fragment opinions");
      return None;
    }
  };

  let mut votes = Vec::new();
  for peer in peers
    .iter()
    .filter(|p| p.url != ctx.info.advertised_url)
    .take(OPINION_PEERS)
  {
    match fetch_opinion(ctx, &peer.url, fact_id).await {
      Ok(opinion) => votes.push(classify_opinion(&opinion)),
      Err(e) => {
        debug!(peer = %peer.url, error = %e, "no fragment opinion");
      }
    }
  }
  consensus(&votes)
}

async fn fetch_opinion(
  ctx: &NodeContext,
  peer_url: &str,
  fact_id: &str,
) -> anyhow::Result<FragmentOpinion> {
  let response = ctx
    .http
    .get(format!("{peer_url}/fragment_opinion?fact_id={fact_id}"))
    .header(PEER_HEADER, &ctx.info.advertised_url)
    .send()
    .await?
    .error_for_status()?;
  Ok(response.json().await?)
}
