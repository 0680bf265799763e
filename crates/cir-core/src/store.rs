//! The storage and notification traits, and their query types.
//!
//! Backends implement these traits (`cir-store-sqlite`, `cir-blob`,
//! `cir-pubsub`). [`crate::processor::CiProcessor`] depends only on the
//! abstractions.

use std::future::Future;

use bytes::Bytes;
use uuid::Uuid;

use crate::metadata::{CiMetadata, CiStatus, ClassificationKey, Classifier, PostEvent};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`MetadataStore::query`]. Every `None` field is
/// unconstrained, so the default query matches every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CiQuery {
  pub survey_id:  Option<String>,
  pub classifier: Option<Classifier>,
  pub language:   Option<String>,
  pub status:     Option<CiStatus>,
}

impl CiQuery {
  pub fn for_key(key: &ClassificationKey) -> Self {
    Self {
      survey_id:  Some(key.survey_id.clone()),
      classifier: Some(key.classifier.clone()),
      language:   Some(key.language.clone()),
      status:     None,
    }
  }

  pub fn is_unfiltered(&self) -> bool { *self == Self::default() }
}

/// Result of [`MetadataStore::insert_version`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
  Inserted,
  /// The key's latest version no longer matches what the caller read;
  /// nothing was written.
  Conflict { latest: Option<u32> },
}

// ─── Metadata ────────────────────────────────────────────────────────────────

/// Typed access to the CI metadata collection.
///
/// Collection reads return records ordered by `ci_version` descending, so the
/// newest version comes first. Absence is `None` or an empty `Vec`, never an
/// error.
pub trait MetadataStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// The record with the highest version for `key`.
  fn latest<'a>(
    &'a self,
    key: &'a ClassificationKey,
  ) -> impl Future<Output = Result<Option<CiMetadata>, Self::Error>> + Send + 'a;

  /// Every version for `key`, optionally restricted to one status.
  fn collection<'a>(
    &'a self,
    key: &'a ClassificationKey,
    status: Option<CiStatus>,
  ) -> impl Future<Output = Result<Vec<CiMetadata>, Self::Error>> + Send + 'a;

  fn by_status(
    &self,
    status: CiStatus,
  ) -> impl Future<Output = Result<Vec<CiMetadata>, Self::Error>> + Send + '_;

  fn all(&self) -> impl Future<Output = Result<Vec<CiMetadata>, Self::Error>> + Send + '_;

  fn by_guid(
    &self,
    guid: Uuid,
  ) -> impl Future<Output = Result<Option<CiMetadata>, Self::Error>> + Send + '_;

  fn by_survey_id<'a>(
    &'a self,
    survey_id: &'a str,
  ) -> impl Future<Output = Result<Vec<CiMetadata>, Self::Error>> + Send + 'a;

  /// Records matching any combination of [`CiQuery`] filters.
  fn query<'a>(
    &'a self,
    query: &'a CiQuery,
  ) -> impl Future<Output = Result<Vec<CiMetadata>, Self::Error>> + Send + 'a;

  /// Set the status of `guid` to PUBLISHED. Unconditional; callers check for
  /// an already-published record first.
  fn set_published(
    &self,
    guid: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Atomically write `record` if and only if the latest version stored for
  /// its key is still `expected_prior`.
  ///
  /// The write merges into any document already stored under the guid; an
  /// empty `sds_schema` is left out of the write entirely.
  fn insert_version<'a>(
    &'a self,
    record: &'a CiMetadata,
    expected_prior: Option<u32>,
  ) -> impl Future<Output = Result<InsertOutcome, Self::Error>> + Send + 'a;

  /// Delete the document for `guid` in its own transaction.
  fn delete(&self, guid: Uuid) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

// ─── Blobs ───────────────────────────────────────────────────────────────────

/// Key-addressed storage for schema bodies.
pub trait BlobStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Store `body` at `key`, replacing anything already there.
  fn put<'a>(
    &'a self,
    key: &'a str,
    body: Bytes,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// The exact bytes stored at `key`, or `None`.
  fn get<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<Bytes>, Self::Error>> + Send + 'a;

  /// Remove `key`. Fails if nothing is stored there.
  fn delete<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

// ─── Events ──────────────────────────────────────────────────────────────────

/// Publishes [`PostEvent`]s to a topic.
pub trait EventPublisher: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Make sure the target topic exists, creating it only when the publisher
  /// is allowed to.
  fn ensure_topic(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Publish one event and wait for the broker to confirm it. No retries.
  fn publish<'a>(
    &'a self,
    event: &'a PostEvent,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
