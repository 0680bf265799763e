//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{SubsecRound as _, Utc};
use cir_core::{
  metadata::{CiMetadata, CiStatus, ClassificationKey, Classifier},
  store::{CiQuery, InsertOutcome, MetadataStore},
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn key(survey_id: &str) -> ClassificationKey {
  ClassificationKey::new(survey_id, Classifier::FormType("business".into()), "welsh")
}

fn record(survey_id: &str, ci_version: u32) -> CiMetadata {
  CiMetadata {
    guid: Uuid::new_v4(),
    ci_version,
    survey_id: survey_id.into(),
    classifier: Classifier::FormType("business".into()),
    language: "welsh".into(),
    data_version: "1".into(),
    schema_version: "1".into(),
    title: "NotDune".into(),
    description: Some("a test instrument".into()),
    published_at: Utc::now().trunc_subsecs(6),
    status: CiStatus::Draft,
    sds_schema: String::new(),
  }
}

/// Insert `count` consecutive versions for `survey_id`, returning them oldest
/// first.
async fn seed(s: &SqliteStore, survey_id: &str, count: u32) -> Vec<CiMetadata> {
  let mut out = Vec::new();
  for v in 1..=count {
    let r = record(survey_id, v);
    let prior = (v > 1).then(|| v - 1);
    assert_eq!(s.insert_version(&r, prior).await.unwrap(), InsertOutcome::Inserted);
    out.push(r);
  }
  out
}

// ─── Insert ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_and_read_back_by_guid() {
  let s = store().await;
  let r = record("3456", 1);

  s.insert_version(&r, None).await.unwrap();

  let fetched = s.by_guid(r.guid).await.unwrap().unwrap();
  assert_eq!(fetched, r);
}

#[tokio::test]
async fn by_guid_missing_returns_none() {
  let s = store().await;
  assert!(s.by_guid(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn insert_with_stale_expectation_conflicts() {
  let s = store().await;
  seed(&s, "3456", 2).await;

  let late = record("3456", 2);
  let outcome = s.insert_version(&late, Some(1)).await.unwrap();

  assert_eq!(outcome, InsertOutcome::Conflict { latest: Some(2) });
  assert!(s.by_guid(late.guid).await.unwrap().is_none());
}

#[tokio::test]
async fn first_insert_expecting_a_prior_conflicts() {
  let s = store().await;
  let outcome = s.insert_version(&record("3456", 2), Some(1)).await.unwrap();
  assert_eq!(outcome, InsertOutcome::Conflict { latest: None });
}

#[tokio::test]
async fn sds_schema_roundtrips_and_empty_reads_back_empty() {
  let s = store().await;

  let mut with = record("a", 1);
  with.sds_schema = "v3".into();
  let without = record("b", 1);

  s.insert_version(&with, None).await.unwrap();
  s.insert_version(&without, None).await.unwrap();

  assert_eq!(s.by_guid(with.guid).await.unwrap().unwrap().sds_schema, "v3");
  assert_eq!(s.by_guid(without.guid).await.unwrap().unwrap().sds_schema, "");
}

#[tokio::test]
async fn rewrite_without_sds_schema_keeps_stored_value() {
  let s = store().await;

  let mut original = record("a", 1);
  original.sds_schema = "v3".into();
  s.insert_version(&original, None).await.unwrap();

  let mut rewrite = original.clone();
  rewrite.sds_schema = String::new();
  rewrite.title = "Renamed".into();
  s.insert_version(&rewrite, Some(1)).await.unwrap();

  let stored = s.by_guid(original.guid).await.unwrap().unwrap();
  assert_eq!(stored.title, "Renamed");
  assert_eq!(stored.sds_schema, "v3");
}

// ─── Reads ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn latest_returns_highest_version() {
  let s = store().await;
  let seeded = seed(&s, "3456", 3).await;
  seed(&s, "other", 5).await;

  let latest = s.latest(&key("3456")).await.unwrap().unwrap();
  assert_eq!(latest.guid, seeded[2].guid);
  assert_eq!(latest.ci_version, 3);
}

#[tokio::test]
async fn latest_for_unknown_key_is_none() {
  let s = store().await;
  assert!(s.latest(&key("abcd")).await.unwrap().is_none());
}

#[tokio::test]
async fn collection_is_newest_first() {
  let s = store().await;
  seed(&s, "3456", 3).await;

  let versions: Vec<u32> = s
    .collection(&key("3456"), None)
    .await
    .unwrap()
    .iter()
    .map(|r| r.ci_version)
    .collect();
  assert_eq!(versions, vec![3, 2, 1]);
}

#[tokio::test]
async fn collection_filters_by_status() {
  let s = store().await;
  let seeded = seed(&s, "3456", 3).await;
  s.set_published(seeded[1].guid).await.unwrap();

  let published = s
    .collection(&key("3456"), Some(CiStatus::Published))
    .await
    .unwrap();
  assert_eq!(published.len(), 1);
  assert_eq!(published[0].ci_version, 2);

  let drafts = s.collection(&key("3456"), Some(CiStatus::Draft)).await.unwrap();
  assert_eq!(drafts.len(), 2);
}

#[tokio::test]
async fn by_status_all_and_by_survey_id() {
  let s = store().await;
  let a = seed(&s, "a", 2).await;
  seed(&s, "b", 1).await;
  s.set_published(a[0].guid).await.unwrap();

  assert_eq!(s.all().await.unwrap().len(), 3);
  assert_eq!(s.by_status(CiStatus::Draft).await.unwrap().len(), 2);
  assert_eq!(s.by_status(CiStatus::Published).await.unwrap().len(), 1);

  let survey_a = s.by_survey_id("a").await.unwrap();
  assert_eq!(survey_a.len(), 2);
  assert!(survey_a.iter().all(|r| r.survey_id == "a"));
  assert!(s.by_survey_id("abcd").await.unwrap().is_empty());
}

#[tokio::test]
async fn query_combines_filters() {
  let s = store().await;
  seed(&s, "a", 2).await;

  let mut welsh_other_form = record("a", 1);
  welsh_other_form.classifier = Classifier::FormType("household".into());
  s.insert_version(&welsh_other_form, None).await.unwrap();

  let mut english = record("a", 1);
  english.language = "english".into();
  s.insert_version(&english, None).await.unwrap();

  let business = s
    .query(&CiQuery {
      classifier: Some(Classifier::FormType("business".into())),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(business.len(), 3);

  let english_only = s
    .query(&CiQuery {
      survey_id: Some("a".into()),
      language: Some("english".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(english_only.len(), 1);
  assert_eq!(english_only[0].guid, english.guid);

  assert_eq!(s.query(&CiQuery::default()).await.unwrap().len(), 4);
}

// ─── Writes ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn set_published_flips_status() {
  let s = store().await;
  let r = seed(&s, "a", 1).await.remove(0);

  s.set_published(r.guid).await.unwrap();

  let stored = s.by_guid(r.guid).await.unwrap().unwrap();
  assert_eq!(stored.status, CiStatus::Published);
}

#[tokio::test]
async fn set_published_unknown_guid_errors() {
  let s = store().await;
  let err = s.set_published(Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(err, crate::Error::NotFound(_)));
}

#[tokio::test]
async fn delete_removes_only_that_record() {
  let s = store().await;
  let seeded = seed(&s, "a", 2).await;

  s.delete(seeded[0].guid).await.unwrap();

  assert!(s.by_guid(seeded[0].guid).await.unwrap().is_none());
  assert!(s.by_guid(seeded[1].guid).await.unwrap().is_some());
}

#[tokio::test]
async fn transaction_rolls_back_on_error() {
  let s = store().await;
  let r = seed(&s, "a", 1).await.remove(0);
  let guid = r.guid.to_string();

  let result = s
    .transaction(move |tx| {
      tx.execute("DELETE FROM ci_metadata WHERE guid = ?1", rusqlite::params![guid])?;
      tx.execute("INSERT INTO no_such_table VALUES (1)", [])?;
      Ok(())
    })
    .await;

  assert!(result.is_err());
  assert!(s.by_guid(r.guid).await.unwrap().is_some());
}

#[tokio::test]
async fn store_persists_across_reopen() {
  let path = std::env::temp_dir().join(format!("cir-store-{}.db", Uuid::new_v4()));

  let r = record("a", 1);
  {
    let s = SqliteStore::open(&path).await.unwrap();
    s.insert_version(&r, None).await.unwrap();
  }

  let reopened = SqliteStore::open(&path).await.unwrap();
  assert_eq!(reopened.by_guid(r.guid).await.unwrap().unwrap(), r);

  drop(reopened);
  let _ = std::fs::remove_file(&path);
}
