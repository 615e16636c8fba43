//! Encoding and decoding helpers between domain types and the plain-text
//! (or blob) representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings — a format that also compares correctly
//! as text, which the prune cutoff query relies on. Fact content is a
//! zlib-compressed blob. Corroborating sources are a compact JSON array.

use std::io::{Read as _, Write as _};

use axiom_core::fact::{Fact, FactStatus, FragmentState};
use chrono::{DateTime, Utc};
use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};

use crate::{Error, Result};

// ─── Timestamps ──────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Content compression ─────────────────────────────────────────────────────

pub fn compress_text(text: &str) -> Result<Vec<u8>> {
  let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
  encoder
    .write_all(text.as_bytes())
    .map_err(Error::Compression)?;
  encoder.finish().map_err(Error::Compression)
}

pub fn decompress_text(blob: &[u8]) -> Result<String> {
  let mut decoder = ZlibDecoder::new(blob);
  let mut text = String::new();
  decoder
    .read_to_string(&mut text)
    .map_err(Error::Compression)?;
  Ok(text)
}

// ─── Corroborating sources ───────────────────────────────────────────────────

pub fn encode_sources(sources: &[String]) -> Result<String> {
  Ok(serde_json::to_string(sources)?)
}

pub fn decode_sources(s: &str) -> Result<Vec<String>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw column values read directly from a `facts` row.
pub struct RawFact {
  pub fact_id:              String,
  pub content:              Vec<u8>,
  pub adl_summary:          String,
  pub source_url:           String,
  pub ingest_timestamp_utc: String,
  pub status:               String,
  pub trust_score:          i64,
  pub fragment_state:       String,
  pub fragment_score:       f64,
  pub fragment_reason:      Option<String>,
}

impl RawFact {
  /// Decompress and decode into a domain [`Fact`].
  pub fn into_fact(self) -> Result<Fact> {
    Ok(Fact {
      content:              decompress_text(&self.content)?,
      ingest_timestamp_utc: decode_dt(&self.ingest_timestamp_utc)?,
      status:               FactStatus::parse(&self.status)
        .map_err(Error::Core)?,
      fragment_state:       FragmentState::parse(&self.fragment_state)
        .map_err(Error::Core)?,
      fact_id:              self.fact_id,
      adl_summary:          self.adl_summary,
      source_url:           self.source_url,
      trust_score:          self.trust_score,
      fragment_score:       self.fragment_score,
      fragment_reason:      self.fragment_reason,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn compression_round_trips() {
    let text = "The treaty entered into force on 1 January 2021.";
    let blob = compress_text(text).unwrap();
    assert_ne!(blob, text.as_bytes());
    assert_eq!(decompress_text(&blob).unwrap(), text);
  }

  #[test]
  fn decompress_rejects_plaintext() {
    assert!(decompress_text(b"not a zlib stream").is_err());
  }

  #[test]
  fn sources_round_trip() {
    let sources =
      vec!["https://a.example/1".to_owned(), "https://b.example/2".to_owned()];
    let encoded = encode_sources(&sources).unwrap();
    assert_eq!(decode_sources(&encoded).unwrap(), sources);
  }
}
