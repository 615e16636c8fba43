//! Interfaces to the external collaborators the core does not implement.
//!
//! Fact extraction, topic discovery, and the lexical-mesh analytics all
//! live outside this crate. The node only needs two seams: something that
//! hands the main cycle candidate facts, and the set of maintenance hooks
//! the idle suite drives. Both default to doing nothing, which leaves a
//! node that replicates purely by pulling from its peers.

use axiom_core::fact::NewFact;
use axiom_store::LedgerStore;

/// Source of candidate facts for the main ingestion cycle.
pub trait Extractor: Send + Sync {
  /// Collect the candidate facts for one cycle, in the order they should
  /// be committed.
  fn gather(&self) -> Vec<NewFact>;
}

/// An extractor that never produces anything; the node then grows its
/// ledger only through P2P sync.
pub struct NoExtractor;

impl Extractor for NoExtractor {
  fn gather(&self) -> Vec<NewFact> { Vec::new() }
}

/// Maintenance work the idle suite sequences but does not own.
///
/// Implementations get the store handle and decide themselves what to do
/// with it; the scheduler only guarantees ordering and throttling.
pub trait NodeHooks: Send + Sync {
  /// Rebuild derived relationship data over recently ingested facts.
  fn relationship_refresh(&self, _store: &LedgerStore) {}

  /// Refresh compiled conversation patterns.
  fn compile_conversation_patterns(&self, _store: &LedgerStore) {}

  /// Refresh the live map of modules and endpoints.
  fn introspect_code(&self) {}

  /// Sample the ledger for duplicates and shallow conflicts.
  fn sample_data_quality(&self, _store: &LedgerStore) {}

  /// Internal consistency checks.
  fn run_self_checks(&self, _store: &LedgerStore) {}
}

/// The no-op hook set.
pub struct DefaultHooks;

impl NodeHooks for DefaultHooks {}
