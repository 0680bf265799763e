//! Error types for `cir-blob`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("no blob stored at {0}")]
  NotFound(String),

  #[error("invalid blob key: {0:?}")]
  InvalidKey(String),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
