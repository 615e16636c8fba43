//! SQLite persistence for an Axiom node.
//!
//! One single-file database holds the fact ledger, the block chain, the
//! relationship table, and the peer registry. All access goes through
//! [`tokio_rusqlite`], so every statement runs on one dedicated connection
//! thread — which is also what serialises writes and makes head advancement
//! a true critical section.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{ChainHead, FactInsert, HealthStats, LedgerStore};

#[cfg(test)]
mod tests;
