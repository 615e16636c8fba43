//! The node context — every handle the scheduler and its tasks share.

use std::{sync::Arc, time::Duration};

use anyhow::Context as _;
use reqwest::Client;

use axiom_api::{IdleTracker, NodeInfo};
use axiom_store::LedgerStore;

use crate::external::{Extractor, NodeHooks};

/// Hard upper bound on any single outbound P2P request.
pub const P2P_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared handles threaded through the scheduler, sync rounds, and idle
/// tasks. Cheap to clone — everything inside is reference-counted.
#[derive(Clone)]
pub struct NodeContext {
  pub store:     LedgerStore,
  pub http:      Client,
  pub info:      Arc<NodeInfo>,
  pub tracker:   Arc<IdleTracker>,
  pub extractor: Arc<dyn Extractor>,
  pub hooks:     Arc<dyn NodeHooks>,
}

impl NodeContext {
  pub fn new(
    store: LedgerStore,
    info: Arc<NodeInfo>,
    tracker: Arc<IdleTracker>,
    extractor: Arc<dyn Extractor>,
    hooks: Arc<dyn NodeHooks>,
  ) -> anyhow::Result<Self> {
    let http = Client::builder()
      .timeout(P2P_TIMEOUT)
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { store, http, info, tracker, extractor, hooks })
  }
}
