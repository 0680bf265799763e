//! Error types for `cir-core`.

use thiserror::Error;
use uuid::Uuid;

/// A boxed backend error, as carried by the storage and publish variants.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  /// A normal negative result: no metadata, schema, or guid matched.
  #[error("{0}")]
  NotFound(String),

  /// A stored record carries a version the calculator cannot advance.
  #[error("ci {guid} has invalid version {version}")]
  InvalidVersion { guid: Uuid, version: u32 },

  /// Every attempt to claim the next version lost to a concurrent publish.
  #[error("could not claim a version for {key} after {attempts} attempts")]
  VersionConflict { key: String, attempts: u32 },

  #[error("metadata store error: {0}")]
  Metadata(#[source] BoxError),

  #[error("blob store error: {0}")]
  Blob(#[source] BoxError),

  #[error("publish error: {0}")]
  Publish(#[source] BoxError),
}

impl Error {
  pub(crate) fn metadata<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Metadata(Box::new(e))
  }

  pub(crate) fn blob<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Blob(Box::new(e))
  }

  /// `true` for the negative-result variant; everything else is a fault.
  pub fn is_not_found(&self) -> bool { matches!(self, Self::NotFound(_)) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
