//! Integration tests for `LedgerStore` against an in-memory database.

use chrono::{Duration, Utc};

use axiom_core::{
  chain::{Block, GENESIS_BLOCK_ID},
  fact::{fact_id_for, FactStatus, FragmentState, NewFact, RelationKind},
};

use crate::{encode::encode_dt, Error, LedgerStore};

async fn store() -> LedgerStore {
  LedgerStore::open_in_memory().await.expect("in-memory store")
}

fn fact(content: &str, source_url: &str) -> NewFact {
  NewFact::new(content, source_url)
}

// ─── Content addressing ──────────────────────────────────────────────────────

#[tokio::test]
async fn insert_is_content_addressed() {
  let s = store().await;

  let result = s
    .insert_uncorroborated_fact(fact("A", "https://a.example/1"))
    .await
    .unwrap();
  assert!(result.newly_inserted);
  assert_eq!(result.fact_id, fact_id_for("A"));

  let stored = s.get_fact(&result.fact_id).await.unwrap().unwrap();
  assert_eq!(stored.content, "A");
  assert_eq!(stored.status, FactStatus::Uncorroborated);
  assert_eq!(stored.trust_score, 1);
  assert_eq!(stored.fragment_state, FragmentState::Unknown);
}

#[tokio::test]
async fn reinsert_of_same_content_is_idempotent() {
  let s = store().await;

  let first = s
    .insert_uncorroborated_fact(fact("A", "https://a.example/1"))
    .await
    .unwrap();
  let second = s
    .insert_uncorroborated_fact(fact("A", "https://b.example/other"))
    .await
    .unwrap();

  assert!(first.newly_inserted);
  assert!(!second.newly_inserted);
  assert_eq!(first.fact_id, second.fact_id);
  assert_eq!(s.get_fact_ids().await.unwrap().len(), 1);

  // The original row is untouched by the losing insert.
  let stored = s.get_fact(&first.fact_id).await.unwrap().unwrap();
  assert_eq!(stored.source_url, "https://a.example/1");
}

#[tokio::test]
async fn unknown_ids_are_omitted_from_batch_reads() {
  let s = store().await;
  let known = s
    .insert_uncorroborated_fact(fact("known", ""))
    .await
    .unwrap();

  let facts = s
    .get_facts_by_id(&[known.fact_id.clone(), fact_id_for("never inserted")])
    .await
    .unwrap();
  assert_eq!(facts.len(), 1);
  assert_eq!(facts[0].fact_id, known.fact_id);
}

// ─── Corroboration ───────────────────────────────────────────────────────────

#[tokio::test]
async fn second_domain_upgrades_to_trusted() {
  let s = store().await;
  let id = s
    .insert_uncorroborated_fact(fact("claim", "https://www.bbc.com/news/1"))
    .await
    .unwrap()
    .fact_id;

  s.corroborate(&id, "https://reuters.com/article/2").await.unwrap();

  let stored = s.get_fact(&id).await.unwrap().unwrap();
  assert_eq!(stored.trust_score, 2);
  assert_eq!(stored.status, FactStatus::Trusted);
}

#[tokio::test]
async fn same_domain_does_not_corroborate() {
  let s = store().await;
  let id = s
    .insert_uncorroborated_fact(fact("claim", "https://www.bbc.com/news/1"))
    .await
    .unwrap()
    .fact_id;

  s.corroborate(&id, "https://bbc.com/news/other").await.unwrap();

  let stored = s.get_fact(&id).await.unwrap().unwrap();
  assert_eq!(stored.trust_score, 1);
  assert_eq!(stored.status, FactStatus::Uncorroborated);
}

#[tokio::test]
async fn trust_is_monotonic_across_repeat_corroboration() {
  let s = store().await;
  let id = s
    .insert_uncorroborated_fact(fact("claim", "https://a.example/1"))
    .await
    .unwrap()
    .fact_id;

  s.corroborate(&id, "https://b.example/1").await.unwrap();
  s.corroborate(&id, "https://b.example/2").await.unwrap();
  s.corroborate(&id, "https://c.example/1").await.unwrap();

  let stored = s.get_fact(&id).await.unwrap().unwrap();
  assert_eq!(stored.trust_score, 3);
  assert_eq!(stored.status, FactStatus::Trusted);
}

#[tokio::test]
async fn corroborating_a_disputed_fact_never_revives_it() {
  let s = store().await;
  let a = s
    .insert_uncorroborated_fact(fact("the vote passed.", "https://a.example"))
    .await
    .unwrap()
    .fact_id;
  let b = s
    .insert_uncorroborated_fact(fact("the vote failed.", "https://b.example"))
    .await
    .unwrap()
    .fact_id;

  s.mark_disputed(&a, &b).await.unwrap();
  s.corroborate(&a, "https://c.example/1").await.unwrap();

  let stored = s.get_fact(&a).await.unwrap().unwrap();
  assert_eq!(stored.status, FactStatus::Disputed);
  assert_eq!(stored.trust_score, 2);
}

#[tokio::test]
async fn corroborating_a_missing_fact_is_a_no_op() {
  let s = store().await;
  s.corroborate(&fact_id_for("ghost"), "https://a.example")
    .await
    .unwrap();
}

// ─── Disputes and relationships ──────────────────────────────────────────────

#[tokio::test]
async fn disputing_marks_both_and_records_the_pair() {
  let s = store().await;
  let a = s
    .insert_uncorroborated_fact(fact("x is true.", ""))
    .await
    .unwrap()
    .fact_id;
  let b = s
    .insert_uncorroborated_fact(fact("x is false.", ""))
    .await
    .unwrap()
    .fact_id;

  s.mark_disputed(&a, &b).await.unwrap();

  for id in [&a, &b] {
    let stored = s.get_fact(id).await.unwrap().unwrap();
    assert_eq!(stored.status, FactStatus::Disputed);
  }

  let rels = s.list_relationships(&a).await.unwrap();
  assert_eq!(rels.len(), 1);
  let (lo, hi, kind) = &rels[0];
  assert_eq!(kind, "contradicts");
  assert!(lo < hi);
}

#[tokio::test]
async fn relationships_dedupe_per_kind() {
  let s = store().await;
  let a = fact_id_for("a");
  let b = fact_id_for("b");

  s.insert_relationship(&a, &b, RelationKind::SharedEntity).await.unwrap();
  s.insert_relationship(&b, &a, RelationKind::SharedEntity).await.unwrap();
  s.insert_relationship(&a, &b, RelationKind::Contradicts).await.unwrap();

  assert_eq!(s.list_relationships(&a).await.unwrap().len(), 2);
}

// ─── Fragment fields ─────────────────────────────────────────────────────────

#[tokio::test]
async fn update_fragment_touches_only_fragment_fields() {
  let s = store().await;
  let id = s
    .insert_uncorroborated_fact(fact("he went there.", "https://a.example"))
    .await
    .unwrap()
    .fact_id;

  s.update_fragment(
    &id,
    FragmentState::SuspectedFragment,
    0.85,
    Some("short_sentence,pronoun_start".to_owned()),
  )
  .await
  .unwrap();

  let stored = s.get_fact(&id).await.unwrap().unwrap();
  assert_eq!(stored.fragment_state, FragmentState::SuspectedFragment);
  assert_eq!(stored.fragment_score, 0.85);
  assert_eq!(
    stored.fragment_reason.as_deref(),
    Some("short_sentence,pronoun_start")
  );
  // Everything else stands.
  assert_eq!(stored.content, "he went there.");
  assert_eq!(stored.status, FactStatus::Uncorroborated);
  assert_eq!(stored.trust_score, 1);
}

#[tokio::test]
async fn audit_sample_excludes_disputed_facts() {
  let s = store().await;
  let a = s
    .insert_uncorroborated_fact(fact("first claim.", ""))
    .await
    .unwrap()
    .fact_id;
  let b = s
    .insert_uncorroborated_fact(fact("second claim.", ""))
    .await
    .unwrap()
    .fact_id;
  s.mark_disputed(&a, &b).await.unwrap();
  s.insert_uncorroborated_fact(fact("third claim.", ""))
    .await
    .unwrap();

  let sample = s.sample_auditable_facts(10).await.unwrap();
  assert_eq!(sample.len(), 1);
  assert_eq!(sample[0].content, "third claim.");
}

// ─── Compression migration ───────────────────────────────────────────────────

#[tokio::test]
async fn migration_compresses_legacy_plaintext_rows() {
  let s = store().await;
  let content = "A plaintext row from an old ledger.";
  let id = fact_id_for(content);

  s.raw_execute(
    "INSERT INTO facts (fact_id, content, ingest_timestamp_utc)
     VALUES (?1, ?2, ?3)",
    vec![id.clone(), content.to_owned(), encode_dt(Utc::now())],
  )
  .await
  .unwrap();

  assert_eq!(s.migrate_fact_content_to_compressed().await.unwrap(), 1);

  // The row now reads back through the normal (decompressing) path.
  let stored = s.get_fact(&id).await.unwrap().unwrap();
  assert_eq!(stored.content, content);

  // Re-running finds nothing left to do.
  assert_eq!(s.migrate_fact_content_to_compressed().await.unwrap(), 0);
}

// ─── Genesis and block creation ──────────────────────────────────────────────

#[tokio::test]
async fn fresh_store_has_the_fixed_genesis_head() {
  let s = store().await;

  let head = s.chain_head().await.unwrap();
  assert_eq!(head.block_id, GENESIS_BLOCK_ID);
  assert_eq!(head.height, 0);

  assert!(s.blocks_after(0).await.unwrap().is_empty());

  // Re-initialising never duplicates genesis.
  s.initialize_chain().await.unwrap();
  let stats = s.health_stats().await.unwrap();
  assert_eq!(stats.block_count, 1);
}

#[tokio::test]
async fn first_commit_extends_genesis_in_insertion_order() {
  let s = store().await;
  let mut ids = Vec::new();
  for content in ["A", "B", "C"] {
    ids.push(
      s.insert_uncorroborated_fact(fact(content, ""))
        .await
        .unwrap()
        .fact_id,
    );
  }

  let block = s.create_block(ids.clone()).await.unwrap();
  assert_eq!(block.height, 1);
  assert_eq!(block.previous_block_id, GENESIS_BLOCK_ID);
  assert_eq!(block.fact_ids, ids);
  assert_eq!(block.computed_id().unwrap(), block.block_id);

  let head = s.chain_head().await.unwrap();
  assert_eq!(head.height, 1);
  assert_eq!(head.block_id, block.block_id);
}

#[tokio::test]
async fn empty_commitments_are_refused() {
  let s = store().await;
  let before = s.chain_head().await.unwrap();

  let err = s.create_block(Vec::new()).await.unwrap_err();
  assert!(matches!(err, Error::EmptyBlock));

  assert_eq!(s.chain_head().await.unwrap(), before);
}

#[tokio::test]
async fn malformed_fact_ids_are_refused() {
  let s = store().await;
  let err = s
    .create_block(vec!["not-a-fact-id".to_owned()])
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(_)));
}

#[tokio::test]
async fn blocks_after_is_ascending_and_empty_past_head() {
  let s = store().await;
  for content in ["A", "B", "C"] {
    let id = s
      .insert_uncorroborated_fact(fact(content, ""))
      .await
      .unwrap()
      .fact_id;
    s.create_block(vec![id]).await.unwrap();
  }

  let all = s.blocks_after(0).await.unwrap();
  assert_eq!(
    all.iter().map(|b| b.height).collect::<Vec<_>>(),
    vec![1, 2, 3]
  );

  let tail = s.blocks_after(2).await.unwrap();
  assert_eq!(tail.len(), 1);
  assert_eq!(tail[0].height, 3);

  assert!(s.blocks_after(3).await.unwrap().is_empty());
  assert!(s.blocks_after(99).await.unwrap().is_empty());
}

// ─── Chain pull between two stores ───────────────────────────────────────────

/// Build a store with one block per entry in `contents`, one fact each.
async fn store_with_chain(contents: &[&str]) -> LedgerStore {
  let s = store().await;
  for content in contents {
    let id = s
      .insert_uncorroborated_fact(fact(content, ""))
      .await
      .unwrap()
      .fact_id;
    s.create_block(vec![id]).await.unwrap();
  }
  s
}

#[tokio::test]
async fn pulled_chain_applies_in_order_to_matching_head() {
  let x = store().await;
  let y = store_with_chain(&["A", "B"]).await;

  for block in y.blocks_after(0).await.unwrap() {
    x.append_block(block).await.unwrap();
  }

  assert_eq!(x.chain_head().await.unwrap(), y.chain_head().await.unwrap());
}

#[tokio::test]
async fn diverged_peer_chain_appends_nothing() {
  // X and Y share only genesis; X has its own block at height 1, so Y's
  // block at height 1 no longer extends X's head.
  let x = store_with_chain(&["ours"]).await;
  let y = store_with_chain(&["theirs"]).await;

  let head_before = x.chain_head().await.unwrap();
  for block in y.blocks_after(0).await.unwrap() {
    let err = x.append_block(block).await.unwrap_err();
    assert!(matches!(err, Error::RejectedBlock(_)));
  }
  assert_eq!(x.chain_head().await.unwrap(), head_before);
}

#[tokio::test]
async fn validate_block_checks_without_applying() {
  let x = store().await;
  let y = store_with_chain(&["A"]).await;
  let block = y.blocks_after(0).await.unwrap().remove(0);

  x.validate_block(&block).await.unwrap();
  // Validation alone moved nothing.
  assert_eq!(x.chain_head().await.unwrap().height, 0);

  x.append_block(block.clone()).await.unwrap();
  // Now its parent no longer matches the head.
  let err = x.validate_block(&block).await.unwrap_err();
  assert!(matches!(err, Error::RejectedBlock(_)));
}

#[tokio::test]
async fn replaying_an_applied_block_is_rejected_cleanly() {
  let x = store().await;
  let y = store_with_chain(&["A"]).await;
  let blocks = y.blocks_after(0).await.unwrap();

  x.append_block(blocks[0].clone()).await.unwrap();
  let err = x.append_block(blocks[0].clone()).await.unwrap_err();
  assert!(matches!(err, Error::RejectedBlock(_)));
  assert_eq!(x.chain_head().await.unwrap().height, 1);
}

#[tokio::test]
async fn tampered_blocks_are_rejected() {
  let x = store().await;
  let y = store_with_chain(&["A"]).await;

  let mut block: Block = y.blocks_after(0).await.unwrap().remove(0);
  block.fact_ids = vec![fact_id_for("something else entirely")];

  let err = x.append_block(block).await.unwrap_err();
  assert!(matches!(err, Error::RejectedBlock(_)));
  assert_eq!(x.chain_head().await.unwrap().height, 0);
}

#[tokio::test]
async fn a_block_may_commit_facts_we_do_not_hold() {
  // Chain sync can legitimately run ahead of fact sync.
  let x = store().await;
  let y = store_with_chain(&["a fact X never pulled"]).await;

  for block in y.blocks_after(0).await.unwrap() {
    x.append_block(block).await.unwrap();
  }
  assert_eq!(x.chain_head().await.unwrap().height, 1);
  assert!(x.get_fact_ids().await.unwrap().is_empty());
}

// ─── Prune ───────────────────────────────────────────────────────────────────

/// Rewrite a fact's ingest timestamp, as if it were inserted `days` ago.
async fn backdate(s: &LedgerStore, fact_id: &str, days: i64) {
  s.raw_execute(
    "UPDATE facts SET ingest_timestamp_utc = ?1 WHERE fact_id = ?2",
    vec![
      encode_dt(Utc::now() - Duration::days(days)),
      fact_id.to_owned(),
    ],
  )
  .await
  .unwrap();
}

#[tokio::test]
async fn prune_deletes_stale_confirmed_fragments_but_spares_trusted() {
  let s = store().await;

  let doomed = s
    .insert_uncorroborated_fact(fact("he went there.", "https://a.example"))
    .await
    .unwrap()
    .fact_id;
  let spared = s
    .insert_uncorroborated_fact(fact("she stayed home.", "https://a.example"))
    .await
    .unwrap()
    .fact_id;

  for id in [&doomed, &spared] {
    s.update_fragment(id, FragmentState::ConfirmedFragment, 0.9, None)
      .await
      .unwrap();
    backdate(&s, id, 100).await;
  }
  // Two more domains take the spared fact to trust 3.
  s.corroborate(&spared, "https://b.example/1").await.unwrap();
  s.corroborate(&spared, "https://c.example/1").await.unwrap();

  s.insert_relationship(&doomed, &spared, RelationKind::SharedEntity)
    .await
    .unwrap();

  assert_eq!(s.prune_stale_facts(Utc::now() - Duration::days(90)).await.unwrap(), 1);

  assert!(s.get_fact(&doomed).await.unwrap().is_none());
  assert!(s.get_fact(&spared).await.unwrap().is_some());
  // The deleted fact's relationship rows went with it.
  assert!(s.list_relationships(&doomed).await.unwrap().is_empty());
}

#[tokio::test]
async fn prune_spares_young_and_substantive_facts() {
  let s = store().await;

  // Young confirmed fragment: age criterion fails.
  let young = s
    .insert_uncorroborated_fact(fact("they agreed.", ""))
    .await
    .unwrap()
    .fact_id;
  s.update_fragment(&young, FragmentState::ConfirmedFragment, 0.9, None)
    .await
    .unwrap();

  // Old, low trust, but unclassified with a substantive summary.
  let substantive = s
    .insert_uncorroborated_fact(NewFact {
      adl_summary: "parliament|approved|budget".to_owned(),
      ..fact("Parliament approved the 2026 budget.", "https://a.example")
    })
    .await
    .unwrap()
    .fact_id;
  backdate(&s, &substantive, 120).await;

  assert_eq!(
    s.prune_stale_facts(Utc::now() - Duration::days(90)).await.unwrap(),
    0
  );
  assert!(s.get_fact(&young).await.unwrap().is_some());
  assert!(s.get_fact(&substantive).await.unwrap().is_some());
}

#[tokio::test]
async fn prune_never_touches_blocks() {
  let s = store().await;
  let doomed = s
    .insert_uncorroborated_fact(fact("it happened", ""))
    .await
    .unwrap()
    .fact_id;
  s.create_block(vec![doomed.clone()]).await.unwrap();
  s.update_fragment(&doomed, FragmentState::ConfirmedFragment, 1.0, None)
    .await
    .unwrap();
  backdate(&s, &doomed, 365).await;

  assert_eq!(
    s.prune_stale_facts(Utc::now() - Duration::days(90)).await.unwrap(),
    1
  );

  // The commitment outlives the fact.
  let blocks = s.blocks_after(0).await.unwrap();
  assert_eq!(blocks.len(), 1);
  assert_eq!(blocks[0].fact_ids, vec![doomed.clone()]);
  assert!(s.get_fact(&doomed).await.unwrap().is_none());
  assert_eq!(s.chain_head().await.unwrap().height, 1);
}

// ─── Peers ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn peers_are_canonicalised_and_deduped() {
  let s = store().await;

  let first = s.register_peer("http://example.com:8010/").await.unwrap();
  let second = s.register_peer("example.com:8010").await.unwrap();
  assert_eq!(first, second);

  let peers = s.list_peers().await.unwrap();
  assert_eq!(peers.len(), 1);
  assert_eq!(peers[0].url, "http://example.com:8010");
  assert_eq!(peers[0].reputation, 0.1);
}

#[tokio::test]
async fn garbage_peer_urls_are_refused() {
  let s = store().await;
  assert!(s.register_peer("   ").await.is_err());
}

#[tokio::test]
async fn reputation_adjustments_clamp_to_unit_interval() {
  let s = store().await;
  let url = s.register_peer("http://example.com:8010").await.unwrap();

  s.adjust_peer_reputation(&url, 5.0).await.unwrap();
  assert_eq!(s.list_peers().await.unwrap()[0].reputation, 1.0);

  s.adjust_peer_reputation(&url, -7.0).await.unwrap();
  assert_eq!(s.list_peers().await.unwrap()[0].reputation, 0.0);
}

#[tokio::test]
async fn peers_list_most_reputable_first() {
  let s = store().await;
  let low = s.register_peer("http://low.example:1").await.unwrap();
  let high = s.register_peer("http://high.example:1").await.unwrap();
  s.adjust_peer_reputation(&high, 0.5).await.unwrap();

  let peers = s.list_peers().await.unwrap();
  assert_eq!(peers[0].url, high);
  assert_eq!(peers[1].url, low);
}

// ─── Health ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_stats_count_by_status() {
  let s = store().await;
  let a = s
    .insert_uncorroborated_fact(fact("claim a.", "https://a.example"))
    .await
    .unwrap()
    .fact_id;
  let b = s
    .insert_uncorroborated_fact(fact("claim b.", "https://a.example"))
    .await
    .unwrap()
    .fact_id;
  s.insert_uncorroborated_fact(fact("claim c.", "https://a.example"))
    .await
    .unwrap();
  s.corroborate(&a, "https://b.example").await.unwrap();
  s.mark_disputed(&b, &a).await.unwrap();

  let stats = s.health_stats().await.unwrap();
  assert_eq!(stats.fact_count, 3);
  assert_eq!(stats.disputed, 2);
  assert_eq!(stats.uncorroborated, 1);
  assert_eq!(stats.block_count, 1); // genesis
  assert_eq!(stats.chain_height, 0);
}
