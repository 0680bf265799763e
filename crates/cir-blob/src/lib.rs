//! Blob storage backends for collection instrument schemas.
//!
//! [`FsBlobStore`] keeps each key as a file under a root directory.
//! [`MemoryBlobStore`] keeps everything in a map and backs tests and local
//! runs.

pub mod error;
mod fs;
mod memory;

pub use error::{Error, Result};
pub use fs::FsBlobStore;
pub use memory::MemoryBlobStore;

/// Reject keys that are empty or could address anything outside the store's
/// flat namespace.
pub(crate) fn validate_key(key: &str) -> Result<()> {
  let escapes = key.contains('/') || key.contains('\\') || key.contains("..");
  if key.is_empty() || escapes || key.starts_with('.') {
    return Err(Error::InvalidKey(key.to_owned()));
  }
  Ok(())
}
