//! Error types for `axiom-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown fact status: {0:?}")]
  UnknownStatus(String),

  #[error("unknown fragment state: {0:?}")]
  UnknownFragmentState(String),

  #[error("not a fact id (64 lowercase hex chars): {0:?}")]
  MalformedFactId(String),

  #[error("not a usable peer url: {0:?}")]
  MalformedPeerUrl(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
