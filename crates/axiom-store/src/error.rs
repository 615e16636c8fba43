//! Error type for `axiom-store`.

use axiom_core::chain::BlockViolation;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] axiom_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("compression error: {0}")]
  Compression(std::io::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("refusing to create a block with no fact ids")]
  EmptyBlock,

  #[error("block rejected: {0}")]
  RejectedBlock(#[from] BlockViolation),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
