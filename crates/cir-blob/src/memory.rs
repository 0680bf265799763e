use std::{collections::HashMap, sync::Arc};

use bytes::Bytes;
use cir_core::store::BlobStore;
use tokio::sync::RwLock;

use crate::{Error, Result, validate_key};

/// In-memory blob store. Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
  objects: Arc<RwLock<HashMap<String, Bytes>>>,
}

impl MemoryBlobStore {
  pub fn new() -> Self { Self::default() }

  /// Number of stored blobs.
  pub async fn len(&self) -> usize { self.objects.read().await.len() }

  pub async fn is_empty(&self) -> bool { self.objects.read().await.is_empty() }
}

impl BlobStore for MemoryBlobStore {
  type Error = Error;

  async fn put(&self, key: &str, body: Bytes) -> Result<()> {
    validate_key(key)?;
    self.objects.write().await.insert(key.to_owned(), body);
    Ok(())
  }

  async fn get(&self, key: &str) -> Result<Option<Bytes>> {
    validate_key(key)?;
    Ok(self.objects.read().await.get(key).cloned())
  }

  async fn delete(&self, key: &str) -> Result<()> {
    validate_key(key)?;
    self
      .objects
      .write()
      .await
      .remove(key)
      .map(|_| ())
      .ok_or_else(|| Error::NotFound(key.to_owned()))
  }
}
