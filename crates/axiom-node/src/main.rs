//! axiom-node binary.
//!
//! Opens (or creates) the node's single-file store, heals any legacy
//! plaintext content rows, starts the background scheduler, and serves
//! the P2P endpoints until ctrl-c.

mod audit;
mod config;
mod context;
mod external;
mod health;
mod prune;
mod scheduler;
mod sync;

use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use tokio::{net::TcpListener, sync::watch};
use tracing::{info, level_filters::LevelFilter, warn, Instrument as _};
use tracing_subscriber::EnvFilter;

use axiom_api::{AppState, IdleTracker, NodeInfo};
use axiom_store::LedgerStore;

use crate::{
  config::{Cli, NodeConfig},
  context::NodeContext,
  external::{DefaultHooks, NoExtractor},
  scheduler::Scheduler,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let config = NodeConfig::resolve(Cli::parse());
  info!(
    port = config.port,
    role = config.role.as_str(),
    db = %config.db_path,
    advertised = %config.advertised_url,
    "starting axiom node"
  );

  // A store that cannot open or heal itself is fatal; an inconsistent
  // ledger must not serve peers.
  let store = LedgerStore::open(&config.db_path)
    .await
    .with_context(|| format!("failed to open store at {}", config.db_path))?;
  store
    .migrate_fact_content_to_compressed()
    .await
    .context("content compression migration failed")?;

  if let Some(bootstrap) = &config.bootstrap_peer {
    match store.register_peer(bootstrap).await {
      Ok(url) => info!(peer = %url, "registered bootstrap peer"),
      Err(e) => warn!(peer = %bootstrap, error = %e, "unusable bootstrap peer"),
    }
  }

  let node_info = Arc::new(NodeInfo {
    port:                config.port,
    role:                config.role,
    advertised_url:      config.advertised_url.clone(),
    db_path:             config.db_path.clone(),
    main_cycle_interval: config.main_cycle_interval,
    idle_suite_interval: config.idle_suite_interval,
  });
  let tracker = Arc::new(IdleTracker::new());

  let ctx = NodeContext::new(
    store.clone(),
    node_info.clone(),
    tracker.clone(),
    Arc::new(NoExtractor),
    Arc::new(DefaultHooks),
  )?;

  // Catch up with the mesh once before the first main cycle.
  sync::bootstrap_sync(&ctx).await;

  let (shutdown_tx, shutdown_rx) = watch::channel(false);
  let worker_span = tracing::info_span!("worker", port = config.port);
  let worker = tokio::spawn(
    Scheduler::new(ctx, shutdown_rx).run().instrument(worker_span),
  );

  let state = AppState { store, node: node_info, idle: tracker };
  let app = axiom_api::router(state);
  let listener = TcpListener::bind(("0.0.0.0", config.port))
    .await
    .with_context(|| format!("failed to bind port {}", config.port))?;
  info!("listening on http://0.0.0.0:{}", config.port);

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  // The worker finishes its current task, then exits.
  let _ = shutdown_tx.send(true);
  let _ = worker.await;
  info!("node shut down cleanly");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!(error = %e, "could not listen for shutdown signal");
  }
}
