//! Error types for `cir-pubsub`.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("topic not found: {0}")]
  TopicNotFound(String),

  #[error("topic already exists: {0}")]
  TopicExists(String),

  #[error("subscription not found: {0}")]
  SubscriptionNotFound(String),

  #[error("subscription already exists: {0}")]
  SubscriptionExists(String),

  #[error("publish not confirmed within {0:?}")]
  Timeout(Duration),

  #[error("event serialisation failed: {0}")]
  Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
