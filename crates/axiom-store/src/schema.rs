//! SQL schema for the Axiom node store.
//!
//! Executed at every connection startup; idempotent thanks to
//! `CREATE TABLE IF NOT EXISTS`. Column additions for older databases are
//! applied separately (SQLite has no `ADD COLUMN IF NOT EXISTS`), so
//! migrations stay forward-only and re-runnable.

/// Full schema DDL.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Facts are content-addressed: fact_id = SHA256(content plaintext).
-- content is always a zlib-compressed BLOB; plaintext rows from older
-- databases are converted in place at startup.
CREATE TABLE IF NOT EXISTS facts (
    fact_id               TEXT PRIMARY KEY,
    content               BLOB NOT NULL,
    adl_summary           TEXT NOT NULL DEFAULT '',
    source_url            TEXT NOT NULL DEFAULT '',
    ingest_timestamp_utc  TEXT NOT NULL,
    status                TEXT NOT NULL DEFAULT 'uncorroborated',
    trust_score           INTEGER NOT NULL DEFAULT 1,
    corroborating_sources TEXT NOT NULL DEFAULT '[]',
    fragment_state        TEXT NOT NULL DEFAULT 'unknown',
    fragment_score        REAL NOT NULL DEFAULT 0.0,
    fragment_reason       TEXT
);

-- Hash-linked commitments over fact ids. Append-only: no UPDATE or DELETE
-- is ever issued against this table.
CREATE TABLE IF NOT EXISTS blocks (
    block_id          TEXT PRIMARY KEY,
    previous_block_id TEXT NOT NULL,
    height            INTEGER NOT NULL,
    created_at_utc    TEXT NOT NULL,
    fact_ids          TEXT NOT NULL    -- JSON array, committed order
);

-- Ordered pairs (fact_a < fact_b), one row per (pair, kind).
CREATE TABLE IF NOT EXISTS fact_relationships (
    fact_a TEXT NOT NULL,
    fact_b TEXT NOT NULL,
    kind   TEXT NOT NULL,    -- 'contradicts' | 'shared_entity'
    UNIQUE (fact_a, fact_b, kind)
);

CREATE TABLE IF NOT EXISTS peers (
    url            TEXT PRIMARY KEY,
    first_seen_utc TEXT NOT NULL,
    last_seen_utc  TEXT NOT NULL,
    reputation     REAL NOT NULL DEFAULT 0.1
);

CREATE INDEX IF NOT EXISTS facts_fragment_state_idx
    ON facts(fragment_state);
CREATE INDEX IF NOT EXISTS blocks_height_idx ON blocks(height);
";

/// Columns added after the first released schema. Each entry is
/// `(table, column, declaration)`; applied only when the column is missing.
pub const LATER_COLUMNS: &[(&str, &str, &str)] = &[
  (
    "facts",
    "fragment_state",
    "fragment_state TEXT NOT NULL DEFAULT 'unknown'",
  ),
  (
    "facts",
    "fragment_score",
    "fragment_score REAL NOT NULL DEFAULT 0.0",
  ),
  ("facts", "fragment_reason", "fragment_reason TEXT"),
  (
    "facts",
    "corroborating_sources",
    "corroborating_sources TEXT NOT NULL DEFAULT '[]'",
  ),
];
