//! The node scheduler: one cooperative background worker that interleaves
//! the main ingestion cycle with the idle maintenance suite.
//!
//! The main cycle runs every `main_cycle_interval` (default 15 minutes);
//! between cycles the idle suite fires every `idle_suite_interval`
//! (default 30 seconds) and walks its task list in a fixed order, skipping
//! any task that ran more recently than its own minimum interval. Neither
//! ever overlaps the other — there is exactly one worker.

use std::{
  collections::HashMap,
  time::{Duration, Instant},
};

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use axiom_api::state::task;

use crate::{
  audit, context::NodeContext, health, prune, sync,
};

/// A repeated skip of a throttled task is only logged this often.
const SKIP_LOG_INTERVAL: Duration = Duration::from_secs(60);

struct IdleTask {
  name:         &'static str,
  min_interval: Duration,
}

/// The idle suite, in execution order. The fragment audit's half-hour
/// throttle is load-bearing (it fans out to peers); the rest are locally
/// cheap and tuned to taste.
const IDLE_TASKS: &[IdleTask] = &[
  IdleTask {
    name:         task::IDLE_LEARNING,
    min_interval: Duration::from_secs(120),
  },
  IdleTask {
    name:         task::PATTERN_COMPILE,
    min_interval: Duration::from_secs(300),
  },
  IdleTask {
    name:         task::CODE_INTROSPECTION,
    min_interval: Duration::from_secs(900),
  },
  IdleTask {
    name:         task::DATA_QUALITY,
    min_interval: Duration::from_secs(600),
  },
  IdleTask {
    name:         task::FRAGMENT_AUDIT,
    min_interval: Duration::from_secs(1800),
  },
  IdleTask {
    name:         task::HEALTH_SNAPSHOT,
    min_interval: Duration::from_secs(300),
  },
  IdleTask {
    name:         task::SELF_CHECKS,
    min_interval: Duration::from_secs(900),
  },
];

pub struct Scheduler {
  ctx:       NodeContext,
  shutdown:  watch::Receiver<bool>,
  last_skip: HashMap<&'static str, Instant>,
}

impl Scheduler {
  pub fn new(ctx: NodeContext, shutdown: watch::Receiver<bool>) -> Self {
    Self { ctx, shutdown, last_skip: HashMap::new() }
  }

  /// Drive the node until shutdown. The current task is always allowed to
  /// finish; the remainder of a suite is not.
  pub async fn run(mut self) {
    self.ctx.tracker.mark_started();
    info!("background worker started");

    loop {
      if *self.shutdown.borrow() {
        break;
      }

      let main_due = self
        .ctx
        .tracker
        .last_run(task::MAIN_CYCLE)
        .is_none_or(|at| at.elapsed() >= self.ctx.info.main_cycle_interval);
      if main_due {
        self.main_cycle().await;
      } else {
        self.idle_suite().await;
      }

      let mut shutdown = self.shutdown.clone();
      tokio::select! {
        _ = tokio::time::sleep(self.ctx.info.idle_suite_interval) => {}
        _ = shutdown.changed() => {}
      }
    }

    info!("background worker stopped");
  }

  // ── Main cycle ────────────────────────────────────────────────────────────

  /// Ingest, commit, replicate: pull candidates from the extractor, seal
  /// the newly inserted ids into one block, then run a sync round against
  /// every known peer. Finishes with the slow metacognitive prune.
  async fn main_cycle(&self) {
    let port = self.ctx.info.port;
    info!(port, "main cycle start");

    let candidates = self.ctx.extractor.gather();
    let mut new_ids = Vec::new();
    for candidate in candidates {
      match self.ctx.store.insert_uncorroborated_fact(candidate).await {
        Ok(result) if result.newly_inserted => new_ids.push(result.fact_id),
        Ok(_) => {}
        Err(e) => warn!(error = %e, "candidate fact not ingested"),
      }
    }

    if !new_ids.is_empty() {
      match self.ctx.store.create_block(new_ids).await {
        Ok(block) => info!(
          height = block.height,
          facts = block.fact_ids.len(),
          "committed block"
        ),
        Err(e) => error!(error = %e, "block commit failed"),
      }
    }

    match self.ctx.store.list_peers().await {
      Ok(peers) => {
        for peer in peers {
          if peer.url == self.ctx.info.advertised_url {
            continue;
          }
          sync::sync_round(&self.ctx, &peer.url).await;
        }
      }
      Err(e) => warn!(error = %e, "could not list peers for sync"),
    }

    if let Err(e) = prune::run_prune(&self.ctx).await {
      error!(task = "prune", error = %e, "idle task failed");
    }

    self.ctx.tracker.mark(task::MAIN_CYCLE);
    info!(port, "main cycle finished");
  }

  // ── Idle suite ────────────────────────────────────────────────────────────

  async fn idle_suite(&mut self) {
    let port = self.ctx.info.port;
    debug!(port, "idle suite start");

    for task in IDLE_TASKS {
      if *self.shutdown.borrow() {
        debug!(port, "shutdown requested; abandoning rest of suite");
        return;
      }
      let recent = self
        .ctx
        .tracker
        .last_run(task.name)
        .is_some_and(|at| at.elapsed() < task.min_interval);
      if recent {
        self.log_skip(task.name);
        continue;
      }
      self.run_task(task.name).await;
      self.ctx.tracker.mark(task.name);
    }

    debug!(port, "idle suite end");
  }

  /// Run one idle task; failures are logged with the task name and node
  /// tag, and the suite moves on.
  async fn run_task(&self, name: &'static str) {
    let port = self.ctx.info.port;
    debug!(port, task = name, "idle task start");

    let result: axiom_store::Result<()> = match name {
      task::IDLE_LEARNING => {
        self.ctx.hooks.relationship_refresh(&self.ctx.store);
        Ok(())
      }
      task::PATTERN_COMPILE => {
        self.ctx.hooks.compile_conversation_patterns(&self.ctx.store);
        Ok(())
      }
      task::CODE_INTROSPECTION => {
        self.ctx.hooks.introspect_code();
        Ok(())
      }
      task::DATA_QUALITY => {
        self.ctx.hooks.sample_data_quality(&self.ctx.store);
        Ok(())
      }
      task::FRAGMENT_AUDIT => {
        audit::run_fragment_audit(&self.ctx).await.map(|_| ())
      }
      task::HEALTH_SNAPSHOT => health::run_health_snapshot(&self.ctx).await,
      task::SELF_CHECKS => {
        self.ctx.hooks.run_self_checks(&self.ctx.store);
        Ok(())
      }
      other => {
        debug!(port, task = other, "unknown idle task");
        Ok(())
      }
    };

    if let Err(e) = result {
      error!(port, task = name, error = %e, "idle task failed");
    }
  }

  fn log_skip(&mut self, name: &'static str) {
    let noisy = self
      .last_skip
      .get(name)
      .is_some_and(|at| at.elapsed() < SKIP_LOG_INTERVAL);
    if !noisy {
      debug!(port = self.ctx.info.port, task = name, "throttled; skipping");
      self.last_skip.insert(name, Instant::now());
    }
  }
}
