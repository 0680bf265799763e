//! [`TopicPublisher`], the [`EventPublisher`] backed by a [`Broker`] topic.

use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use cir_core::{metadata::PostEvent, store::EventPublisher};
use tracing::{error, info};

use crate::{Broker, Error, Result};

/// How long a publish waits for the broker to confirm before failing.
pub const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(10);

/// Publishes [`PostEvent`]s as UTF-8 JSON to one topic.
///
/// In permissive mode a missing topic is created on first use; otherwise it
/// must already exist.
#[derive(Debug, Clone)]
pub struct TopicPublisher {
  broker:      Arc<Broker>,
  topic:       String,
  auto_create: bool,
  timeout:     Duration,
}

impl TopicPublisher {
  pub fn new(broker: Arc<Broker>, topic: impl Into<String>) -> Self {
    Self {
      broker,
      topic: topic.into(),
      auto_create: false,
      timeout: DEFAULT_PUBLISH_TIMEOUT,
    }
  }

  /// Allow the publisher to create its topic when it is missing.
  pub fn auto_create_topic(mut self, enabled: bool) -> Self {
    self.auto_create = enabled;
    self
  }

  pub fn publish_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  pub fn topic(&self) -> &str { &self.topic }
}

impl EventPublisher for TopicPublisher {
  type Error = Error;

  async fn ensure_topic(&self) -> Result<()> {
    if self.broker.topic_exists(&self.topic).await {
      return Ok(());
    }
    if !self.auto_create {
      return Err(Error::TopicNotFound(self.topic.clone()));
    }

    match self.broker.create_topic(&self.topic).await {
      Ok(()) => {
        info!(topic = %self.topic, "created missing topic");
        Ok(())
      }
      // Lost a race with another creator.
      Err(Error::TopicExists(_)) => Ok(()),
      Err(e) => Err(e),
    }
  }

  async fn publish(&self, event: &PostEvent) -> Result<()> {
    let outcome = async {
      self.ensure_topic().await?;
      let data = Bytes::from(serde_json::to_vec(event)?);

      tokio::time::timeout(self.timeout, self.broker.publish(&self.topic, data))
        .await
        .map_err(|_| Error::Timeout(self.timeout))?
    }
    .await;

    match outcome {
      Ok(message_id) => {
        info!(topic = %self.topic, %message_id, guid = %event.guid, "ci event published");
        Ok(())
      }
      Err(e) => {
        error!(topic = %self.topic, guid = %event.guid, error = %e, "failed to publish ci event");
        Err(e)
      }
    }
  }
}
