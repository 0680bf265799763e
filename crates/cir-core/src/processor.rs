//! [`CiProcessor`], the orchestrator behind every register use case.
//!
//! The processor owns handles to the three collaborators and runs each use
//! case as a short, strictly ordered sequence of awaited calls.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{SubsecRound as _, Utc};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::{
  Error, Result,
  location::schema_location_for,
  metadata::{CiMetadata, ClassificationKey, NewCi, PostEvent},
  store::{BlobStore, CiQuery, EventPublisher, InsertOutcome, MetadataStore},
  transaction::{transactional_create, transactional_delete_all},
  version::next_version,
};

/// How many times a publish re-reads the latest version after losing a race
/// for it before giving up.
pub const DEFAULT_MAX_VERSION_ATTEMPTS: u32 = 5;

/// Outcome of [`CiProcessor::update_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
  Published,
  AlreadyPublished,
}

impl StatusChange {
  pub fn changed(self) -> bool { matches!(self, Self::Published) }
}

/// Orchestrates publishing, querying, status updates and deletion of CIs.
pub struct CiProcessor<M, B, P> {
  metadata:             Arc<M>,
  blobs:                Arc<B>,
  publisher:            Arc<P>,
  max_version_attempts: u32,
}

impl<M, B, P> CiProcessor<M, B, P>
where
  M: MetadataStore,
  B: BlobStore,
  P: EventPublisher,
{
  pub fn new(metadata: Arc<M>, blobs: Arc<B>, publisher: Arc<P>) -> Self {
    Self {
      metadata,
      blobs,
      publisher,
      max_version_attempts: DEFAULT_MAX_VERSION_ATTEMPTS,
    }
  }

  /// Override the number of version attempts (minimum 1).
  pub fn with_max_version_attempts(mut self, attempts: u32) -> Self {
    self.max_version_attempts = attempts.max(1);
    self
  }

  // ── Publish ───────────────────────────────────────────────────────────────

  /// Publish `input` as the next version of its classification key.
  ///
  /// `schema` is the raw request body and is stored verbatim. A failure to
  /// persist aborts the whole operation. A failure to publish the event is
  /// returned as an error even though the CI is already durable.
  pub async fn publish_new_version(&self, input: NewCi, schema: Bytes) -> Result<CiMetadata> {
    let guid = Uuid::new_v4();
    let key = input.key();
    let blob_key = schema_location_for(guid);

    let mut attempt = 0;
    let record = loop {
      attempt += 1;

      let prior = self.metadata.latest(&key).await.map_err(Error::metadata)?;
      let expected_prior = prior.as_ref().map(|p| p.ci_version);
      let ci_version = next_version(prior.as_ref())?;
      let record = input.to_metadata(guid, ci_version, Utc::now().trunc_subsecs(6));

      let outcome = transactional_create(
        &*self.metadata,
        &*self.blobs,
        &record,
        expected_prior,
        schema.clone(),
        &blob_key,
      )
      .await?;

      match outcome {
        InsertOutcome::Inserted => break record,
        InsertOutcome::Conflict { latest } => {
          debug!(%key, ci_version, ?latest, attempt, "version claimed by a concurrent publish");
          if attempt >= self.max_version_attempts {
            return Err(Error::VersionConflict {
              key: key.to_string(),
              attempts: attempt,
            });
          }
        }
      }
    };

    info!(%key, guid = %record.guid, ci_version = record.ci_version, "stored new ci version");

    let event = PostEvent::from(&record);
    if let Err(e) = self.publisher.publish(&event).await {
      error!(
        guid = %record.guid,
        error = %e,
        "ci version stored but its publish event was not delivered",
      );
      return Err(Error::Publish(Box::new(e)));
    }

    Ok(record)
  }

  // ── Queries ───────────────────────────────────────────────────────────────

  /// Every version for `key`, newest first.
  pub async fn metadata_for_key(&self, key: &ClassificationKey) -> Result<Vec<CiMetadata>> {
    self.metadata.collection(key, None).await.map_err(Error::metadata)
  }

  /// Records matching `query`, newest version first. An unfiltered query
  /// returns everything.
  pub async fn query(&self, query: &CiQuery) -> Result<Vec<CiMetadata>> {
    let records = match query {
      q if q.is_unfiltered() => self.metadata.all().await,
      CiQuery { survey_id: None, classifier: None, language: None, status: Some(status) } => {
        self.metadata.by_status(*status).await
      }
      _ => self.metadata.query(query).await,
    };
    records.map_err(Error::metadata)
  }

  pub async fn by_guid(&self, guid: Uuid) -> Result<Option<CiMetadata>> {
    self.metadata.by_guid(guid).await.map_err(Error::metadata)
  }

  /// The latest record for `key` together with its schema body.
  pub async fn latest_schema(&self, key: &ClassificationKey) -> Result<(CiMetadata, Bytes)> {
    let latest = self
      .metadata
      .latest(key)
      .await
      .map_err(Error::metadata)?
      .ok_or_else(|| Error::NotFound(format!("no collection instrument found for {key}")))?;

    let schema = self.schema_by_guid(latest.guid).await?;
    Ok((latest, schema))
  }

  /// The schema body stored for `guid`, read directly from the blob store.
  pub async fn schema_by_guid(&self, guid: Uuid) -> Result<Bytes> {
    self
      .blobs
      .get(&schema_location_for(guid))
      .await
      .map_err(Error::blob)?
      .ok_or_else(|| Error::NotFound(format!("no schema found for {guid}")))
  }

  // ── Status ────────────────────────────────────────────────────────────────

  /// Flip `guid` from DRAFT to PUBLISHED. Idempotent: an already-published
  /// record is reported as such and not written again.
  pub async fn update_status(&self, guid: Uuid) -> Result<StatusChange> {
    let record = self
      .by_guid(guid)
      .await?
      .ok_or_else(|| Error::NotFound(format!("no collection instrument found for {guid}")))?;

    if record.is_published() {
      debug!(%guid, "ci already published");
      return Ok(StatusChange::AlreadyPublished);
    }

    self.metadata.set_published(guid).await.map_err(Error::metadata)?;
    info!(%guid, "ci status set to PUBLISHED");
    Ok(StatusChange::Published)
  }

  // ── Delete ────────────────────────────────────────────────────────────────

  /// Delete every version of every CI for `survey_id`, with their schemas.
  /// Returns the number of records deleted.
  pub async fn delete_survey(&self, survey_id: &str) -> Result<usize> {
    let records = self
      .metadata
      .by_survey_id(survey_id)
      .await
      .map_err(Error::metadata)?;

    if records.is_empty() {
      return Err(Error::NotFound(format!(
        "no collection instruments found for survey {survey_id}"
      )));
    }

    let deleted = transactional_delete_all(&*self.metadata, &*self.blobs, &records).await?;
    info!(survey_id, deleted, "deleted collection instruments");
    Ok(deleted)
  }
}
