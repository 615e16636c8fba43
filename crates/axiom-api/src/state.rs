//! Shared handler state: the store handle, the node's identity, and the
//! scheduler's last-run tracker.
//!
//! The node used to be reachable through process globals; everything a
//! handler needs is now threaded through [`AppState`] explicitly.

use std::{
  collections::HashMap,
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
  },
  time::{Duration, Instant},
};

use axiom_store::LedgerStore;

// ─── Task names ──────────────────────────────────────────────────────────────

/// Stable task names shared by the scheduler (which marks them) and the
/// idle-state endpoint (which reports their ages).
pub mod task {
  pub const MAIN_CYCLE: &str = "main_cycle";
  pub const IDLE_LEARNING: &str = "idle_learning";
  pub const PATTERN_COMPILE: &str = "pattern_compile";
  pub const CODE_INTROSPECTION: &str = "code_introspection";
  pub const DATA_QUALITY: &str = "data_quality";
  pub const FRAGMENT_AUDIT: &str = "fragment_audit";
  pub const HEALTH_SNAPSHOT: &str = "health_snapshot";
  pub const SELF_CHECKS: &str = "self_checks";
}

// ─── Node identity ───────────────────────────────────────────────────────────

/// Whether this node anchors the mesh or joined it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
  /// Started without a bootstrap peer; other nodes find the mesh through it.
  Bootstrap,
  /// Joined the mesh through a configured bootstrap peer.
  Worker,
}

impl NodeRole {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Bootstrap => "bootstrap",
      Self::Worker => "worker",
    }
  }
}

/// Static facts about this node, fixed at startup.
#[derive(Debug, Clone)]
pub struct NodeInfo {
  pub port:                u16,
  pub role:                NodeRole,
  pub advertised_url:      String,
  pub db_path:             String,
  pub main_cycle_interval: Duration,
  pub idle_suite_interval: Duration,
}

// ─── Idle tracker ────────────────────────────────────────────────────────────

/// Last-run bookkeeping for the scheduler's tasks.
///
/// The scheduler marks tasks as they complete; the debug endpoint reads the
/// ages back. Also doubles as the scheduler's own throttle source, so the
/// two can never disagree.
#[derive(Debug, Default)]
pub struct IdleTracker {
  started: AtomicBool,
  marks:   Mutex<HashMap<&'static str, Instant>>,
}

impl IdleTracker {
  pub fn new() -> Self { Self::default() }

  /// Flip once when the scheduler begins running. Until then the
  /// idle-state endpoint reports the node as not initialised.
  pub fn mark_started(&self) { self.started.store(true, Ordering::Release) }

  pub fn is_started(&self) -> bool { self.started.load(Ordering::Acquire) }

  /// Record that `name` just ran.
  pub fn mark(&self, name: &'static str) {
    self
      .marks
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .insert(name, Instant::now());
  }

  /// When `name` last ran, if ever.
  pub fn last_run(&self, name: &str) -> Option<Instant> {
    self
      .marks
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .get(name)
      .copied()
  }

  /// Seconds since `name` last ran, if ever.
  pub fn age_secs(&self, name: &str) -> Option<u64> {
    self.last_run(name).map(|at| at.elapsed().as_secs())
  }
}

// ─── AppState ────────────────────────────────────────────────────────────────

/// Everything a handler can touch.
#[derive(Clone)]
pub struct AppState {
  pub store: LedgerStore,
  pub node:  Arc<NodeInfo>,
  pub idle:  Arc<IdleTracker>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tracker_ages_only_marked_tasks() {
    let tracker = IdleTracker::new();
    assert_eq!(tracker.age_secs(task::FRAGMENT_AUDIT), None);

    tracker.mark(task::FRAGMENT_AUDIT);
    let age = tracker.age_secs(task::FRAGMENT_AUDIT);
    assert!(age.is_some_and(|a| a < 2));
    assert_eq!(tracker.age_secs(task::SELF_CHECKS), None);
  }

  #[test]
  fn started_flag_flips_once() {
    let tracker = IdleTracker::new();
    assert!(!tracker.is_started());
    tracker.mark_started();
    assert!(tracker.is_started());
  }
}
