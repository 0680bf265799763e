//! The paired metadata + blob writes.
//!
//! The metadata store and the blob store cannot share one transaction, so each
//! pair is ordered so that a failure part-way leaves nothing visible:
//!
//! - create writes the blob first, then the metadata; if the metadata write
//!   fails or conflicts, the blob is removed again. A reader can never find
//!   metadata whose schema is missing.
//! - delete snapshots and removes the blob, then removes the metadata; if the
//!   metadata delete fails, the snapshot is put back.
//!
//! A process crash between the two halves can still leave an orphaned blob
//! (create) or metadata without its blob (delete).

use bytes::Bytes;
use tracing::{error, warn};

use crate::{
  Error, Result,
  location::schema_location,
  metadata::CiMetadata,
  store::{BlobStore, InsertOutcome, MetadataStore},
};

/// Write `schema` at `blob_key` and `record` into the metadata store as one
/// unit. See [`MetadataStore::insert_version`] for the meaning of
/// `expected_prior`.
///
/// On [`InsertOutcome::Conflict`] nothing remains written and the caller may
/// retry with a fresh version.
pub async fn transactional_create<M, B>(
  metadata: &M,
  blobs: &B,
  record: &CiMetadata,
  expected_prior: Option<u32>,
  schema: Bytes,
  blob_key: &str,
) -> Result<InsertOutcome>
where
  M: MetadataStore,
  B: BlobStore,
{
  blobs.put(blob_key, schema).await.map_err(Error::blob)?;

  match metadata.insert_version(record, expected_prior).await {
    Ok(InsertOutcome::Inserted) => Ok(InsertOutcome::Inserted),
    Ok(conflict @ InsertOutcome::Conflict { .. }) => {
      discard_blob(blobs, blob_key).await;
      Ok(conflict)
    }
    Err(e) => {
      discard_blob(blobs, blob_key).await;
      Err(Error::metadata(e))
    }
  }
}

async fn discard_blob<B: BlobStore>(blobs: &B, key: &str) {
  if let Err(e) = blobs.delete(key).await {
    warn!(key, error = %e, "failed to remove schema blob after aborted create");
  }
}

/// Delete every record in `records` together with its schema blob.
///
/// Each record is its own unit: a failure stops the loop and is returned, but
/// records already deleted stay deleted. Returns the number deleted.
pub async fn transactional_delete_all<M, B>(
  metadata: &M,
  blobs: &B,
  records: &[CiMetadata],
) -> Result<usize>
where
  M: MetadataStore,
  B: BlobStore,
{
  let mut deleted = 0;
  for record in records {
    delete_one(metadata, blobs, record).await?;
    deleted += 1;
  }
  Ok(deleted)
}

async fn delete_one<M, B>(metadata: &M, blobs: &B, record: &CiMetadata) -> Result<()>
where
  M: MetadataStore,
  B: BlobStore,
{
  let key = schema_location(record);

  let snapshot = blobs.get(&key).await.map_err(Error::blob)?;
  blobs.delete(&key).await.map_err(Error::blob)?;

  if let Err(e) = metadata.delete(record.guid).await {
    if let Some(body) = snapshot
      && let Err(restore) = blobs.put(&key, body).await
    {
      error!(
        guid = %record.guid,
        key = %key,
        error = %restore,
        "metadata delete failed and the schema blob could not be restored",
      );
    }
    return Err(Error::metadata(e));
  }

  Ok(())
}
