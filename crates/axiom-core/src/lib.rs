//! Core types and pure logic for the Axiom fact network.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing heavier than
//! `sha2` and `serde`.

pub mod chain;
pub mod error;
pub mod fact;
pub mod fragment;
pub mod peer;

pub use error::{Error, Result};
