//! [`SqliteStore`], the SQLite implementation of [`MetadataStore`].

use std::{path::Path, time::Duration};

use cir_core::{
  metadata::{CiMetadata, CiStatus, ClassificationKey},
  store::{CiQuery, InsertOutcome, MetadataStore},
};
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use tracing::debug;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{EncodedCiMetadata, RawCiMetadata, encode_status, encode_uuid, read_row},
  schema::{COLUMNS, SCHEMA},
};

/// How long a statement waits on a locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const UPSERT: &str = "
INSERT INTO ci_metadata (
  guid, ci_version, survey_id, classifier_type, classifier_value, language,
  data_version, schema_version, title, description, published_at, status, sds_schema
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
ON CONFLICT(guid) DO UPDATE SET
  ci_version       = excluded.ci_version,
  survey_id        = excluded.survey_id,
  classifier_type  = excluded.classifier_type,
  classifier_value = excluded.classifier_value,
  language         = excluded.language,
  data_version     = excluded.data_version,
  schema_version   = excluded.schema_version,
  title            = excluded.title,
  description      = excluded.description,
  published_at     = excluded.published_at,
  status           = excluded.status,
  sds_schema       = COALESCE(excluded.sds_schema, ci_metadata.sds_schema)";

// ─── Store ───────────────────────────────────────────────────────────────────

/// CI metadata backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` inside one `IMMEDIATE` transaction.
  ///
  /// The write lock is taken before `f` runs, so reads inside `f` cannot be
  /// invalidated by another writer before commit. The transaction commits
  /// when `f` returns `Ok` and rolls back otherwise.
  pub async fn transaction<F, T>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&rusqlite::Transaction<'_>) -> rusqlite::Result<T> + Send + 'static,
    T: Send + 'static,
  {
    let out = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
      })
      .await?;
    Ok(out)
  }

  /// `SELECT` every record matching `query`, newest version first.
  async fn select(&self, query: CiQuery, limit: Option<u32>) -> Result<Vec<CiMetadata>> {
    let raws: Vec<RawCiMetadata> = self
      .conn
      .call(move |conn| {
        let mut conds: Vec<&'static str> = vec![];
        let mut params: Vec<String> = vec![];

        if let Some(survey_id) = query.survey_id {
          conds.push("survey_id = ?");
          params.push(survey_id);
        }
        if let Some(classifier) = query.classifier {
          conds.push("classifier_type = ?");
          params.push(classifier.kind().to_owned());
          conds.push("classifier_value = ?");
          params.push(classifier.value().to_owned());
        }
        if let Some(language) = query.language {
          conds.push("language = ?");
          params.push(language);
        }
        if let Some(status) = query.status {
          conds.push("status = ?");
          params.push(encode_status(status).to_owned());
        }

        let where_clause = if conds.is_empty() {
          String::new()
        } else {
          format!("WHERE {}", conds.join(" AND "))
        };
        let limit_clause = limit.map(|n| format!("LIMIT {n}")).unwrap_or_default();

        let sql = format!(
          "SELECT {COLUMNS} FROM ci_metadata {where_clause}
           ORDER BY ci_version DESC, published_at DESC {limit_clause}"
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), read_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCiMetadata::into_metadata).collect()
  }
}

// ─── MetadataStore impl ──────────────────────────────────────────────────────

impl MetadataStore for SqliteStore {
  type Error = Error;

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn latest(&self, key: &ClassificationKey) -> Result<Option<CiMetadata>> {
    let mut rows = self.select(CiQuery::for_key(key), Some(1)).await?;
    Ok(rows.pop())
  }

  async fn collection(
    &self,
    key: &ClassificationKey,
    status: Option<CiStatus>,
  ) -> Result<Vec<CiMetadata>> {
    let query = CiQuery { status, ..CiQuery::for_key(key) };
    self.select(query, None).await
  }

  async fn by_status(&self, status: CiStatus) -> Result<Vec<CiMetadata>> {
    let query = CiQuery { status: Some(status), ..Default::default() };
    self.select(query, None).await
  }

  async fn all(&self) -> Result<Vec<CiMetadata>> { self.select(CiQuery::default(), None).await }

  async fn by_guid(&self, guid: Uuid) -> Result<Option<CiMetadata>> {
    let guid_str = encode_uuid(guid);

    let raw: Option<RawCiMetadata> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {COLUMNS} FROM ci_metadata WHERE guid = ?1"),
              rusqlite::params![guid_str],
              read_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCiMetadata::into_metadata).transpose()
  }

  async fn by_survey_id(&self, survey_id: &str) -> Result<Vec<CiMetadata>> {
    let query = CiQuery {
      survey_id: Some(survey_id.to_owned()),
      ..Default::default()
    };
    self.select(query, None).await
  }

  async fn query(&self, query: &CiQuery) -> Result<Vec<CiMetadata>> {
    self.select(query.clone(), None).await
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn set_published(&self, guid: Uuid) -> Result<()> {
    let guid_str = encode_uuid(guid);
    let published = encode_status(CiStatus::Published);

    let changed = self
      .transaction(move |tx| {
        tx.execute(
          "UPDATE ci_metadata SET status = ?1 WHERE guid = ?2",
          rusqlite::params![published, guid_str],
        )
      })
      .await?;

    if changed == 0 {
      return Err(Error::NotFound(guid));
    }
    Ok(())
  }

  async fn insert_version(
    &self,
    record: &CiMetadata,
    expected_prior: Option<u32>,
  ) -> Result<InsertOutcome> {
    let row = EncodedCiMetadata::from(record);

    let outcome = self
      .transaction(move |tx| {
        let latest: Option<u32> = tx.query_row(
          "SELECT MAX(ci_version) FROM ci_metadata
           WHERE survey_id = ?1 AND classifier_type = ?2
             AND classifier_value = ?3 AND language = ?4",
          rusqlite::params![row.survey_id, row.classifier_type, row.classifier_value, row.language],
          |r| r.get(0),
        )?;

        if latest != expected_prior {
          return Ok(InsertOutcome::Conflict { latest });
        }

        tx.execute(
          UPSERT,
          rusqlite::params![
            row.guid,
            row.ci_version,
            row.survey_id,
            row.classifier_type,
            row.classifier_value,
            row.language,
            row.data_version,
            row.schema_version,
            row.title,
            row.description,
            row.published_at,
            row.status,
            row.sds_schema,
          ],
        )?;
        Ok(InsertOutcome::Inserted)
      })
      .await?;

    if let InsertOutcome::Conflict { latest } = outcome {
      debug!(
        guid = %record.guid,
        ?expected_prior,
        ?latest,
        "insert rejected: latest version moved"
      );
    }
    Ok(outcome)
  }

  async fn delete(&self, guid: Uuid) -> Result<()> {
    let guid_str = encode_uuid(guid);

    self
      .transaction(move |tx| {
        tx.execute("DELETE FROM ci_metadata WHERE guid = ?1", rusqlite::params![guid_str])
      })
      .await?;
    Ok(())
  }
}
