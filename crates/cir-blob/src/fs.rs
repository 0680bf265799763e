use std::{
  io::ErrorKind,
  path::{Path, PathBuf},
};

use bytes::Bytes;
use cir_core::store::BlobStore;
use tracing::debug;
use uuid::Uuid;

use crate::{Error, Result, validate_key};

/// Blob store rooted at a local directory, one file per key.
///
/// Writes land in a temporary sibling file first and are renamed into place,
/// so a reader never observes a partially written blob.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
  root: PathBuf,
}

impl FsBlobStore {
  /// Open a store at `root`, creating the directory if needed.
  pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
    let root = root.into();
    tokio::fs::create_dir_all(&root).await?;
    Ok(Self { root })
  }

  pub fn root(&self) -> &Path { &self.root }

  fn path_for(&self, key: &str) -> Result<PathBuf> {
    validate_key(key)?;
    Ok(self.root.join(key))
  }
}

impl BlobStore for FsBlobStore {
  type Error = Error;

  async fn put(&self, key: &str, body: Bytes) -> Result<()> {
    let path = self.path_for(key)?;
    let tmp = self.root.join(format!(".{key}.{}.tmp", Uuid::new_v4().simple()));

    tokio::fs::write(&tmp, &body).await?;
    if let Err(e) = tokio::fs::rename(&tmp, &path).await {
      let _ = tokio::fs::remove_file(&tmp).await;
      return Err(e.into());
    }

    debug!(key, bytes = body.len(), "blob written");
    Ok(())
  }

  async fn get(&self, key: &str) -> Result<Option<Bytes>> {
    let path = self.path_for(key)?;
    match tokio::fs::read(&path).await {
      Ok(data) => Ok(Some(Bytes::from(data))),
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e.into()),
    }
  }

  async fn delete(&self, key: &str) -> Result<()> {
    let path = self.path_for(key)?;
    match tokio::fs::remove_file(&path).await {
      Ok(()) => {
        debug!(key, "blob deleted");
        Ok(())
      }
      Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::NotFound(key.to_owned())),
      Err(e) => Err(e.into()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  async fn store() -> FsBlobStore {
    let root = std::env::temp_dir().join(format!("cir-blob-{}", Uuid::new_v4()));
    FsBlobStore::open(root).await.expect("open store")
  }

  async fn cleanup(store: FsBlobStore) {
    let _ = tokio::fs::remove_dir_all(store.root()).await;
  }

  #[tokio::test]
  async fn roundtrips_bytes_on_disk() {
    let store = store().await;
    let body = Bytes::from_static(b"{\"title\":\"NotDune\"}\n");

    store.put("x.json", body.clone()).await.unwrap();

    assert_eq!(store.get("x.json").await.unwrap(), Some(body.clone()));
    let on_disk = tokio::fs::read(store.root().join("x.json")).await.unwrap();
    assert_eq!(on_disk, body);

    cleanup(store).await;
  }

  #[tokio::test]
  async fn leaves_no_temp_files_behind() {
    let store = store().await;
    store.put("x.json", Bytes::from("a")).await.unwrap();
    store.put("x.json", Bytes::from("b")).await.unwrap();

    let mut entries = tokio::fs::read_dir(store.root()).await.unwrap();
    let mut names = vec![];
    while let Some(entry) = entries.next_entry().await.unwrap() {
      names.push(entry.file_name().to_string_lossy().into_owned());
    }
    assert_eq!(names, vec!["x.json".to_owned()]);

    cleanup(store).await;
  }

  #[tokio::test]
  async fn missing_blob_reads_none_and_fails_delete() {
    let store = store().await;

    assert_eq!(store.get("nope.json").await.unwrap(), None);
    assert!(matches!(store.delete("nope.json").await, Err(Error::NotFound(_))));

    cleanup(store).await;
  }

  #[tokio::test]
  async fn delete_removes_file() {
    let store = store().await;
    store.put("x.json", Bytes::from("a")).await.unwrap();

    store.delete("x.json").await.unwrap();

    assert_eq!(store.get("x.json").await.unwrap(), None);
    cleanup(store).await;
  }

  #[tokio::test]
  async fn rejects_path_traversal() {
    let store = store().await;
    let err = store.put("../escape.json", Bytes::from("a")).await.unwrap_err();
    assert!(matches!(err, Error::InvalidKey(_)));
    cleanup(store).await;
  }
}
