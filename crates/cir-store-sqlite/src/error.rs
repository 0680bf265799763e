//! Error type for `cir-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown classifier type: {0:?}")]
  UnknownClassifier(String),

  #[error("unknown status: {0:?}")]
  UnknownStatus(String),

  /// A status update addressed a guid with no stored document.
  #[error("collection instrument not found: {0}")]
  NotFound(uuid::Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
