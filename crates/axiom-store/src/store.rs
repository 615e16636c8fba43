//! [`LedgerStore`] — facts, blocks, relationships, and peers in one SQLite
//! file.

use std::{collections::HashSet, path::Path};

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use tracing::warn;

use axiom_core::{
  chain::{
    block_digest, validate_against_head, Block, BlockViolation,
    GENESIS_BLOCK_ID, GENESIS_PREVIOUS,
  },
  fact::{fact_id_for, is_fact_id, Fact, FragmentState, NewFact, RelationKind},
  peer::{canonical_peer_url, source_domain, Peer, INITIAL_REPUTATION},
};

use crate::{
  encode::{
    compress_text, decode_dt, decode_sources, encode_dt, encode_sources,
    RawFact,
  },
  schema::{LATER_COLUMNS, SCHEMA},
  Error, Result,
};

const FACT_COLUMNS: &str = "fact_id, content, adl_summary, source_url, \
   ingest_timestamp_utc, status, trust_score, fragment_state, \
   fragment_score, fragment_reason";

/// Wrap a non-database error for transport out of a connection closure.
fn boxed<E>(e: E) -> tokio_rusqlite::Error
where
  E: std::error::Error + Send + Sync + 'static,
{
  tokio_rusqlite::Error::Other(Box::new(e))
}

// ─── Result rows ─────────────────────────────────────────────────────────────

/// Outcome of an idempotent fact insert.
#[derive(Debug, Clone)]
pub struct FactInsert {
  pub fact_id:        String,
  /// `false` when the content was already in the ledger.
  pub newly_inserted: bool,
}

/// The block with the maximum height.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainHead {
  pub block_id: String,
  pub height:   u64,
}

/// Counters for the periodic health snapshot.
#[derive(Debug, Clone, Default)]
pub struct HealthStats {
  pub fact_count:     u64,
  pub block_count:    u64,
  pub chain_height:   u64,
  pub trusted:        u64,
  pub disputed:       u64,
  pub uncorroborated: u64,
  pub average_trust:  Option<f64>,
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// An Axiom node's persistent state, backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted, and all
/// statements execute on its dedicated thread. That thread is the
/// single-writer discipline: `create_block` and `append_block` each run
/// their read-head / validate / insert sequence inside one transaction on
/// it, so at most one head advancement is ever in flight.
#[derive(Clone)]
pub struct LedgerStore {
  conn: tokio_rusqlite::Connection,
}

impl LedgerStore {
  /// Open (or create) a store at `path`, run schema initialisation, and
  /// ensure the genesis block exists.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    store.initialize_chain().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    store.initialize_chain().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        // Databases created before these columns existed get them added
        // here; re-running is a no-op.
        for (table, column, decl) in LATER_COLUMNS {
          if !column_exists(conn, table, column)? {
            conn
              .execute(&format!("ALTER TABLE {table} ADD COLUMN {decl}"), [])?;
          }
        }
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Facts ─────────────────────────────────────────────────────────────────

  /// Insert a candidate fact, addressed by the SHA-256 of its content.
  ///
  /// Re-inserting existing content returns the existing id with
  /// `newly_inserted == false` and changes nothing — including when two
  /// writers race on identical content. Content is compressed before it
  /// touches the database; a compression failure aborts the insert so a
  /// plaintext row can never appear.
  pub async fn insert_uncorroborated_fact(
    &self,
    input: NewFact,
  ) -> Result<FactInsert> {
    let fact_id = fact_id_for(&input.content);
    let blob = compress_text(&input.content)?;
    let now = encode_dt(Utc::now());
    let sources = encode_sources(&[input.source_url.clone()])?;

    let row_id = fact_id.clone();
    let newly_inserted = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "INSERT OR IGNORE INTO facts (
             fact_id, content, adl_summary, source_url,
             ingest_timestamp_utc, status, trust_score,
             corroborating_sources, fragment_state, fragment_score,
             fragment_reason
           ) VALUES (?1, ?2, ?3, ?4, ?5, 'uncorroborated', 1, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            row_id,
            blob,
            input.adl_summary,
            input.source_url,
            now,
            sources,
            input.fragment_state.as_str(),
            input.fragment_score,
            input.fragment_reason,
          ],
        )?;
        Ok(n > 0)
      })
      .await?;

    Ok(FactInsert { fact_id, newly_inserted })
  }

  /// Record an independent corroboration of `fact_id` from
  /// `new_source_url`.
  ///
  /// Sources are counted per registrable domain — a second link from a
  /// domain that already vouched changes nothing. A genuinely new domain
  /// bumps `trust_score`, and at 2 the status is upgraded from
  /// `uncorroborated` to `trusted`. A `disputed` fact keeps its status
  /// (but still accrues trust). Missing facts are ignored.
  pub async fn corroborate(
    &self,
    fact_id: &str,
    new_source_url: &str,
  ) -> Result<()> {
    let fact_id = fact_id.to_owned();
    let new_source_url = new_source_url.to_owned();

    self
      .conn
      .call(move |conn| {
        let row: Option<(String, String, i64, String)> = conn
          .query_row(
            "SELECT source_url, corroborating_sources, trust_score, status
             FROM facts WHERE fact_id = ?1",
            rusqlite::params![fact_id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
          )
          .optional()?;

        let Some((source_url, sources_json, trust_score, status)) = row
        else {
          return Ok(());
        };

        let mut sources =
          decode_sources(&sources_json).map_err(boxed)?;
        let mut domains: HashSet<String> = sources
          .iter()
          .map(|s| source_domain(s))
          .collect();
        domains.insert(source_domain(&source_url));

        if !domains.insert(source_domain(&new_source_url)) {
          return Ok(());
        }

        sources.push(new_source_url);
        let new_score = trust_score + 1;
        let new_status = if status == "uncorroborated" && new_score >= 2 {
          "trusted".to_owned()
        } else {
          status
        };

        conn.execute(
          "UPDATE facts
           SET trust_score = ?1, status = ?2, corroborating_sources = ?3
           WHERE fact_id = ?4",
          rusqlite::params![
            new_score,
            new_status,
            encode_sources(&sources).map_err(boxed)?,
            fact_id,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Mark two facts as contradicting each other: both become `disputed`
  /// and the pair is recorded in the relationships table.
  pub async fn mark_disputed(
    &self,
    fact_id_a: &str,
    fact_id_b: &str,
  ) -> Result<()> {
    let a = fact_id_a.to_owned();
    let b = fact_id_b.to_owned();
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "UPDATE facts SET status = 'disputed' WHERE fact_id IN (?1, ?2)",
          rusqlite::params![a, b],
        )?;
        let (lo, hi) = if a < b { (&a, &b) } else { (&b, &a) };
        tx.execute(
          "INSERT OR IGNORE INTO fact_relationships (fact_a, fact_b, kind)
           VALUES (?1, ?2, 'contradicts')",
          rusqlite::params![lo, hi],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Record a pairwise relationship (used by the external synthesizer for
  /// `shared_entity` links).
  pub async fn insert_relationship(
    &self,
    fact_id_a: &str,
    fact_id_b: &str,
    kind: RelationKind,
  ) -> Result<()> {
    let a = fact_id_a.to_owned();
    let b = fact_id_b.to_owned();
    self
      .conn
      .call(move |conn| {
        let (lo, hi) = if a < b { (&a, &b) } else { (&b, &a) };
        conn.execute(
          "INSERT OR IGNORE INTO fact_relationships (fact_a, fact_b, kind)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![lo, hi, kind.as_str()],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Every relationship row touching `fact_id`, as
  /// `(fact_a, fact_b, kind)` triples.
  pub async fn list_relationships(
    &self,
    fact_id: &str,
  ) -> Result<Vec<(String, String, String)>> {
    let id = fact_id.to_owned();
    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT fact_a, fact_b, kind FROM fact_relationships
           WHERE fact_a = ?1 OR fact_b = ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id], |r| {
            Ok((r.get(0)?, r.get(1)?, r.get(2)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  /// All fact ids, in no particular order.
  pub async fn get_fact_ids(&self) -> Result<Vec<String>> {
    let ids = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare("SELECT fact_id FROM facts")?;
        let rows = stmt
          .query_map([], |r| r.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(ids)
  }

  /// Fetch full records (content decompressed) for the given ids. Unknown
  /// ids are omitted; a row whose content fails to decode is skipped with
  /// a warning rather than poisoning the batch.
  pub async fn get_facts_by_id(
    &self,
    fact_ids: &[String],
  ) -> Result<Vec<Fact>> {
    let wanted = fact_ids.to_vec();
    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {FACT_COLUMNS} FROM facts WHERE fact_id = ?1"
        ))?;
        let mut raws = Vec::with_capacity(wanted.len());
        for id in &wanted {
          if let Some(raw) = stmt
            .query_row(rusqlite::params![id], fact_from_row)
            .optional()?
          {
            raws.push(raw);
          }
        }
        Ok(raws)
      })
      .await?;
    Ok(decode_facts(raws))
  }

  /// Fetch a single fact. Returns `None` when unknown.
  pub async fn get_fact(&self, fact_id: &str) -> Result<Option<Fact>> {
    let id = fact_id.to_owned();
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {FACT_COLUMNS} FROM facts WHERE fact_id = ?1"
              ),
              rusqlite::params![id],
              fact_from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawFact::into_fact).transpose()
  }

  /// Overwrite the three fragment-classification fields and nothing else.
  pub async fn update_fragment(
    &self,
    fact_id: &str,
    state: FragmentState,
    score: f64,
    reason: Option<String>,
  ) -> Result<()> {
    let id = fact_id.to_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE facts
           SET fragment_state = ?1, fragment_score = ?2, fragment_reason = ?3
           WHERE fact_id = ?4",
          rusqlite::params![state.as_str(), score, reason, id],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// A uniform random sample of non-disputed facts for the audit pass.
  pub async fn sample_auditable_facts(
    &self,
    limit: u32,
  ) -> Result<Vec<Fact>> {
    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {FACT_COLUMNS} FROM facts
           WHERE status != 'disputed'
           ORDER BY RANDOM() LIMIT ?1"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![limit], fact_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(decode_facts(raws))
  }

  /// Convert any plaintext `content` rows (from databases written before
  /// compression was enforced) to zlib blobs, in place. Returns how many
  /// rows were converted.
  pub async fn migrate_fact_content_to_compressed(&self) -> Result<usize> {
    let migrated = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT fact_id, content FROM facts
           WHERE typeof(content) != 'blob'",
        )?;
        let rows = stmt
          .query_map([], |r| {
            Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut migrated = 0usize;
        for (fact_id, text) in rows {
          let blob = match compress_text(&text) {
            Ok(blob) => blob,
            Err(e) => {
              warn!(%fact_id, error = %e, "could not compress legacy fact");
              continue;
            }
          };
          conn.execute(
            "UPDATE facts SET content = ?1 WHERE fact_id = ?2",
            rusqlite::params![blob, fact_id],
          )?;
          migrated += 1;
        }
        Ok(migrated)
      })
      .await?;

    if migrated > 0 {
      tracing::info!(migrated, "converted legacy facts to compressed storage");
    }
    Ok(migrated)
  }

  /// Delete stale, low-trust fragments: facts ingested before `cutoff`
  /// with `trust_score <= 2` that are either confirmed fragments or carry
  /// an analytical summary shorter than 10 characters. Their relationship
  /// rows go with them; blocks that committed them are left untouched.
  pub async fn prune_stale_facts(
    &self,
    cutoff: DateTime<Utc>,
  ) -> Result<usize> {
    let cutoff = encode_dt(cutoff);
    let deleted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let ids: Vec<String> = {
          let mut stmt = tx.prepare(
            "SELECT fact_id FROM facts
             WHERE ingest_timestamp_utc < ?1
               AND trust_score <= 2
               AND (fragment_state = 'confirmed_fragment'
                    OR length(adl_summary) < 10)",
          )?;
          let rows = stmt
            .query_map(rusqlite::params![cutoff], |r| r.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          rows
        };
        for id in &ids {
          tx.execute(
            "DELETE FROM fact_relationships
             WHERE fact_a = ?1 OR fact_b = ?1",
            rusqlite::params![id],
          )?;
          tx.execute(
            "DELETE FROM facts WHERE fact_id = ?1",
            rusqlite::params![id],
          )?;
        }
        tx.commit()?;
        Ok(ids.len())
      })
      .await?;
    Ok(deleted)
  }

  /// Counters for the health snapshot task and `/status`.
  pub async fn health_stats(&self) -> Result<HealthStats> {
    let stats = self
      .conn
      .call(|conn| {
        let count = |sql: &str| -> rusqlite::Result<u64> {
          conn.query_row(sql, [], |r| r.get::<_, i64>(0)).map(|n| n as u64)
        };
        let fact_count = count("SELECT COUNT(*) FROM facts")?;
        let block_count = count("SELECT COUNT(*) FROM blocks")?;
        let chain_height = conn
          .query_row("SELECT MAX(height) FROM blocks", [], |r| {
            r.get::<_, Option<i64>>(0)
          })?
          .unwrap_or(0) as u64;
        let trusted =
          count("SELECT COUNT(*) FROM facts WHERE status = 'trusted'")?;
        let disputed =
          count("SELECT COUNT(*) FROM facts WHERE status = 'disputed'")?;
        let uncorroborated = count(
          "SELECT COUNT(*) FROM facts WHERE status = 'uncorroborated'",
        )?;
        let average_trust = conn.query_row(
          "SELECT AVG(trust_score) FROM facts",
          [],
          |r| r.get::<_, Option<f64>>(0),
        )?;
        Ok(HealthStats {
          fact_count,
          block_count,
          chain_height,
          trusted,
          disputed,
          uncorroborated,
          average_trust,
        })
      })
      .await?;
    Ok(stats)
  }

  // ── Chain ─────────────────────────────────────────────────────────────────

  /// Insert the genesis block if the blocks table is empty. Idempotent.
  pub async fn initialize_chain(&self) -> Result<()> {
    let created = encode_dt(Utc::now());
    self
      .conn
      .call(move |conn| {
        let populated: bool = conn
          .query_row("SELECT 1 FROM blocks LIMIT 1", [], |_| Ok(true))
          .optional()?
          .unwrap_or(false);
        if populated {
          return Ok(());
        }
        conn.execute(
          "INSERT INTO blocks
             (block_id, previous_block_id, height, created_at_utc, fact_ids)
           VALUES (?1, ?2, 0, ?3, '[]')",
          rusqlite::params![GENESIS_BLOCK_ID, GENESIS_PREVIOUS, created],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// The block with the maximum height. Duplicate heights cannot occur on
  /// an intact chain; if observed, the lexicographically smallest id wins
  /// and a warning is raised.
  pub async fn chain_head(&self) -> Result<ChainHead> {
    let head = self
      .conn
      .call(|conn| {
        let head = head_row(conn)?;
        Ok(head)
      })
      .await?;
    Ok(ChainHead { block_id: head.block_id, height: head.height })
  }

  /// Commit a new block over `fact_ids` (committed order preserved),
  /// extending the current head. Refuses an empty commitment. The head
  /// read, hash computation, and insert happen in one transaction on the
  /// connection thread, so concurrent callers cannot both extend the same
  /// parent.
  pub async fn create_block(
    &self,
    fact_ids: Vec<String>,
  ) -> Result<Block> {
    if fact_ids.is_empty() {
      return Err(Error::EmptyBlock);
    }
    if let Some(bad) = fact_ids.iter().find(|id| !is_fact_id(id)) {
      return Err(Error::Core(axiom_core::Error::MalformedFactId(
        bad.clone(),
      )));
    }

    let created_at_utc = encode_dt(Utc::now());
    let block = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let head = head_row(&tx)?;
        let height = head.height + 1;
        let block_id = block_digest(
          &head.block_id,
          height,
          &created_at_utc,
          &fact_ids,
        )
        .map_err(boxed)?;
        let ids_json = serde_json::to_string(&fact_ids).map_err(boxed)?;
        tx.execute(
          "INSERT INTO blocks
             (block_id, previous_block_id, height, created_at_utc, fact_ids)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![
            block_id,
            head.block_id,
            height as i64,
            created_at_utc,
            ids_json,
          ],
        )?;
        tx.commit()?;
        Ok(Block {
          block_id,
          previous_block_id: head.block_id,
          height,
          created_at_utc,
          fact_ids,
        })
      })
      .await?;
    Ok(block)
  }

  /// Check a candidate against the current head without applying it.
  pub async fn validate_block(&self, candidate: &Block) -> Result<()> {
    let head = self.chain_head().await?;
    validate_against_head(candidate, &head.block_id, head.height)?;
    Ok(())
  }

  /// Atomically re-validate `candidate` against the current head and
  /// insert it. A block that does not extend the head is rejected —
  /// including a block this node already applied, whose parent no longer
  /// matches.
  pub async fn append_block(&self, candidate: Block) -> Result<()> {
    let verdict: std::result::Result<(), BlockViolation> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let head = head_row(&tx)?;
        if let Err(violation) =
          validate_against_head(&candidate, &head.block_id, head.height)
        {
          return Ok(Err(violation));
        }
        let ids_json =
          serde_json::to_string(&candidate.fact_ids).map_err(boxed)?;
        tx.execute(
          "INSERT INTO blocks
             (block_id, previous_block_id, height, created_at_utc, fact_ids)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![
            candidate.block_id,
            candidate.previous_block_id,
            candidate.height as i64,
            candidate.created_at_utc,
            ids_json,
          ],
        )?;
        tx.commit()?;
        Ok(Ok(()))
      })
      .await?;
    verdict.map_err(Error::RejectedBlock)
  }

  /// All blocks with `height > after`, ascending.
  pub async fn blocks_after(&self, after: u64) -> Result<Vec<Block>> {
    let blocks = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT block_id, previous_block_id, height, created_at_utc,
                  fact_ids
           FROM blocks WHERE height > ?1 ORDER BY height ASC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![after as i64], |r| {
            Ok((
              r.get::<_, String>(0)?,
              r.get::<_, String>(1)?,
              r.get::<_, i64>(2)?,
              r.get::<_, String>(3)?,
              r.get::<_, String>(4)?,
            ))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut blocks = Vec::with_capacity(rows.len());
        for (block_id, previous_block_id, height, created_at_utc, ids) in
          rows
        {
          blocks.push(Block {
            block_id,
            previous_block_id,
            height: height as u64,
            created_at_utc,
            fact_ids: serde_json::from_str(&ids).map_err(boxed)?,
          });
        }
        Ok(blocks)
      })
      .await?;
    Ok(blocks)
  }

  // ── Peers ─────────────────────────────────────────────────────────────────

  /// Register (or refresh) a peer by URL. The URL is canonicalised to its
  /// origin form first; the canonical form is returned. Re-registering
  /// only bumps `last_seen_utc`.
  pub async fn register_peer(&self, url: &str) -> Result<String> {
    let canonical = canonical_peer_url(url)?;
    let now = encode_dt(Utc::now());
    let row_url = canonical.clone();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO peers (url, first_seen_utc, last_seen_utc, reputation)
           VALUES (?1, ?2, ?2, ?3)
           ON CONFLICT(url) DO UPDATE SET last_seen_utc = excluded.last_seen_utc",
          rusqlite::params![row_url, now, INITIAL_REPUTATION],
        )?;
        Ok(())
      })
      .await?;
    Ok(canonical)
  }

  /// All known peers, most reputable first.
  pub async fn list_peers(&self) -> Result<Vec<Peer>> {
    let raws = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT url, first_seen_utc, last_seen_utc, reputation
           FROM peers ORDER BY reputation DESC, url ASC",
        )?;
        let rows = stmt
          .query_map([], |r| {
            Ok((
              r.get::<_, String>(0)?,
              r.get::<_, String>(1)?,
              r.get::<_, String>(2)?,
              r.get::<_, f64>(3)?,
            ))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(url, first_seen, last_seen, reputation)| {
        Ok(Peer {
          url,
          first_seen_utc: decode_dt(&first_seen)?,
          last_seen_utc: decode_dt(&last_seen)?,
          reputation,
        })
      })
      .collect()
  }

  /// Nudge a peer's reputation by `delta`, clamped to [0, 1].
  pub async fn adjust_peer_reputation(
    &self,
    url: &str,
    delta: f64,
  ) -> Result<()> {
    let url = url.to_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE peers
           SET reputation = MAX(0.0, MIN(1.0, reputation + ?1))
           WHERE url = ?2",
          rusqlite::params![delta, url],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

#[cfg(test)]
impl LedgerStore {
  /// Test-only escape hatch for seeding rows the public API would refuse
  /// to write (legacy plaintext content, backdated timestamps).
  pub(crate) async fn raw_execute(
    &self,
    sql: &'static str,
    params: Vec<String>,
  ) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(sql, rusqlite::params_from_iter(params))?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Row helpers ─────────────────────────────────────────────────────────────

fn fact_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawFact> {
  Ok(RawFact {
    fact_id:              row.get(0)?,
    content:              row.get(1)?,
    adl_summary:          row.get(2)?,
    source_url:           row.get(3)?,
    ingest_timestamp_utc: row.get(4)?,
    status:               row.get(5)?,
    trust_score:          row.get(6)?,
    fragment_state:       row.get(7)?,
    fragment_score:       row.get(8)?,
    fragment_reason:      row.get(9)?,
  })
}

/// Decode raw rows, dropping (with a warning) any row whose content or
/// enumerations fail to decode instead of failing the whole read.
fn decode_facts(raws: Vec<RawFact>) -> Vec<Fact> {
  raws
    .into_iter()
    .filter_map(|raw| {
      let fact_id = raw.fact_id.clone();
      match raw.into_fact() {
        Ok(fact) => Some(fact),
        Err(e) => {
          warn!(%fact_id, error = %e, "dropping undecodable fact row");
          None
        }
      }
    })
    .collect()
}

struct HeadRow {
  block_id: String,
  height:   u64,
}

/// Read the chain head inside an open connection or transaction. On the
/// (corrupt) case of several blocks at the maximum height, the
/// lexicographically smallest id is treated as head and a warning raised.
fn head_row(conn: &rusqlite::Connection) -> rusqlite::Result<HeadRow> {
  let (block_id, height): (String, i64) = conn.query_row(
    "SELECT block_id, height FROM blocks
     ORDER BY height DESC, block_id ASC LIMIT 1",
    [],
    |r| Ok((r.get(0)?, r.get(1)?)),
  )?;
  let at_height: i64 = conn.query_row(
    "SELECT COUNT(*) FROM blocks WHERE height = ?1",
    rusqlite::params![height],
    |r| r.get(0),
  )?;
  if at_height > 1 {
    warn!(
      height,
      blocks = at_height,
      "multiple blocks at head height; using lexicographically smallest id"
    );
  }
  Ok(HeadRow { block_id, height: height as u64 })
}

fn column_exists(
  conn: &rusqlite::Connection,
  table: &str,
  column: &str,
) -> rusqlite::Result<bool> {
  let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
  let names = stmt
    .query_map([], |r| r.get::<_, String>(1))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(names.iter().any(|n| n == column))
}
