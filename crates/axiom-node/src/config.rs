//! Node configuration from environment variables and CLI flags.
//!
//! Flags win over environment variables (clap handles the precedence);
//! everything has a default so a bare `axiom-node` starts a bootstrap node
//! on port 8009.

use std::time::Duration;

use clap::Parser;

use axiom_api::NodeRole;

/// The port a bootstrap node conventionally listens on.
pub const DEFAULT_PORT: u16 = 8009;
const DEFAULT_MAIN_CYCLE_SECS: u64 = 900;
const DEFAULT_IDLE_SUITE_SECS: u64 = 30;

#[derive(Debug, Parser)]
#[command(author, version, about = "Run an Axiom fact-network node")]
pub struct Cli {
  /// Listen port.
  #[arg(long, env = "PORT")]
  pub port: Option<u16>,

  /// URL of a peer to join the mesh through. Without one, this node
  /// starts as a bootstrap node.
  #[arg(long, env = "BOOTSTRAP_PEER")]
  pub bootstrap_peer: Option<String>,

  /// Path to the ledger database file.
  #[arg(long, env = "AXIOM_DB_PATH")]
  pub db_path: Option<String>,

  /// Seconds between main ingestion cycles.
  #[arg(long, env = "AXIOM_MAIN_CYCLE_INTERVAL")]
  pub main_cycle_interval: Option<u64>,

  /// Seconds between idle maintenance suites.
  #[arg(long, env = "AXIOM_IDLE_SUITE_INTERVAL")]
  pub idle_suite_interval: Option<u64>,

  /// Origin URL other nodes should reach us at. Defaults to loopback on
  /// the listen port, which is right for single-host meshes.
  #[arg(long, env = "ADVERTISED_URL")]
  pub advertised_url: Option<String>,
}

/// Fully-resolved node configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
  pub port:                u16,
  pub role:                NodeRole,
  pub bootstrap_peer:      Option<String>,
  pub db_path:             String,
  pub advertised_url:      String,
  pub main_cycle_interval: Duration,
  pub idle_suite_interval: Duration,
}

impl NodeConfig {
  pub fn resolve(cli: Cli) -> Self {
    let port = cli.port.unwrap_or(DEFAULT_PORT);
    let db_path = cli.db_path.unwrap_or_else(|| default_db_path(port));
    let role = if cli.bootstrap_peer.is_some() {
      NodeRole::Worker
    } else {
      NodeRole::Bootstrap
    };
    let advertised_url = cli
      .advertised_url
      .unwrap_or_else(|| format!("http://127.0.0.1:{port}"));

    Self {
      port,
      role,
      bootstrap_peer: cli.bootstrap_peer,
      db_path,
      advertised_url,
      main_cycle_interval: Duration::from_secs(
        cli.main_cycle_interval.unwrap_or(DEFAULT_MAIN_CYCLE_SECS),
      ),
      idle_suite_interval: Duration::from_secs(
        cli.idle_suite_interval.unwrap_or(DEFAULT_IDLE_SUITE_SECS),
      ),
    }
  }
}

/// `axiom_ledger.db` on the conventional bootstrap port, suffixed with the
/// port everywhere else so several nodes can share a working directory.
fn default_db_path(port: u16) -> String {
  if port == DEFAULT_PORT {
    "axiom_ledger.db".to_owned()
  } else {
    format!("axiom_ledger_{port}.db")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn bare_cli() -> Cli {
    Cli {
      port:                None,
      bootstrap_peer:      None,
      db_path:             None,
      main_cycle_interval: None,
      idle_suite_interval: None,
      advertised_url:      None,
    }
  }

  #[test]
  fn defaults_describe_a_bootstrap_node() {
    let config = NodeConfig::resolve(bare_cli());
    assert_eq!(config.port, 8009);
    assert_eq!(config.role, NodeRole::Bootstrap);
    assert_eq!(config.db_path, "axiom_ledger.db");
    assert_eq!(config.advertised_url, "http://127.0.0.1:8009");
    assert_eq!(config.main_cycle_interval, Duration::from_secs(900));
    assert_eq!(config.idle_suite_interval, Duration::from_secs(30));
  }

  #[test]
  fn secondary_port_gets_its_own_database() {
    let cli = Cli { port: Some(8010), ..bare_cli() };
    let config = NodeConfig::resolve(cli);
    assert_eq!(config.db_path, "axiom_ledger_8010.db");
  }

  #[test]
  fn bootstrap_peer_makes_a_worker() {
    let cli = Cli {
      bootstrap_peer: Some("http://127.0.0.1:8009".to_owned()),
      ..bare_cli()
    };
    assert_eq!(NodeConfig::resolve(cli).role, NodeRole::Worker);
  }
}
