//! Peer identity and URL canonicalisation.
//!
//! A peer is identified by its canonical origin URL (scheme + host + port,
//! no path, no trailing slash). Everything a node learns about a peer hangs
//! off that string.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Error, Result};

/// Reputation assigned to a peer we have only just heard of.
pub const INITIAL_REPUTATION: f64 = 0.1;

/// A known remote node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Peer {
  pub url:            String,
  pub first_seen_utc: DateTime<Utc>,
  pub last_seen_utc:  DateTime<Utc>,
  /// In [0.0, 1.0]; adjusted by the host on sync outcomes.
  pub reputation:     f64,
}

/// Reduce a peer URL to its canonical origin form.
///
/// Accepts `http://host:port`, `host:port`, or a bare port (treated as
/// loopback). Path, query, and trailing slashes are dropped.
pub fn canonical_peer_url(raw: &str) -> Result<String> {
  let trimmed = raw.trim().trim_end_matches('/');
  if trimmed.is_empty() {
    return Err(Error::MalformedPeerUrl(raw.to_owned()));
  }
  let candidate = if trimmed.starts_with("http://")
    || trimmed.starts_with("https://")
  {
    trimmed.to_owned()
  } else if trimmed.bytes().all(|b| b.is_ascii_digit()) {
    format!("http://127.0.0.1:{trimmed}")
  } else {
    format!("http://{trimmed}")
  };
  let url = Url::parse(&candidate)
    .map_err(|_| Error::MalformedPeerUrl(raw.to_owned()))?;
  if url.host_str().is_none() {
    return Err(Error::MalformedPeerUrl(raw.to_owned()));
  }
  Ok(url.origin().ascii_serialization())
}

/// Extract the registrable domain a source URL belongs to, for
/// corroboration counting. A second link from the same site is not an
/// independent source.
pub fn source_domain(source_url: &str) -> String {
  let host = Url::parse(source_url)
    .ok()
    .and_then(|u| u.host_str().map(str::to_owned))
    .unwrap_or_else(|| source_url.trim().to_owned());
  host
    .trim_start_matches("www.")
    .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn canonicalises_common_spellings() {
    assert_eq!(
      canonical_peer_url("http://example.com:8010/").unwrap(),
      "http://example.com:8010"
    );
    assert_eq!(
      canonical_peer_url("example.com:8010").unwrap(),
      "http://example.com:8010"
    );
    assert_eq!(
      canonical_peer_url("8011").unwrap(),
      "http://127.0.0.1:8011"
    );
  }

  #[test]
  fn strips_paths_and_default_ports() {
    assert_eq!(
      canonical_peer_url("http://example.com/get_peers").unwrap(),
      "http://example.com"
    );
  }

  #[test]
  fn rejects_garbage() {
    assert!(canonical_peer_url("").is_err());
    assert!(canonical_peer_url("   ").is_err());
  }

  #[test]
  fn domain_ignores_www_and_case() {
    assert_eq!(source_domain("https://www.BBC.com/news/x"), "bbc.com");
    assert_eq!(source_domain("http://archive.org/item"), "archive.org");
  }
}
