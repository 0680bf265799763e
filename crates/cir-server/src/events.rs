//! Background consumer that logs every published CI event.

use std::{sync::Arc, time::Duration};

use cir_core::metadata::PostEvent;
use cir_pubsub::Broker;
use tracing::{info, warn};

/// Messages pulled per round.
const BATCH: usize = 16;

/// Idle wait between empty pulls.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Pull one batch from `subscription`, log each event and ack the batch.
/// Returns how many messages were handled.
pub async fn drain_once(broker: &Broker, subscription: &str) -> cir_pubsub::Result<usize> {
  let messages = broker.pull(subscription, BATCH).await?;

  for message in &messages {
    match serde_json::from_slice::<PostEvent>(&message.data) {
      Ok(event) => info!(
        message_id = %message.message_id,
        delivery_attempt = message.delivery_attempt,
        guid = %event.guid,
        survey_id = %event.survey_id,
        ci_version = event.ci_version,
        "ci event received",
      ),
      Err(e) => warn!(
        message_id = %message.message_id,
        error = %e,
        "undecodable ci event",
      ),
    }
  }

  let ack_ids: Vec<String> = messages.iter().map(|m| m.ack_id.clone()).collect();
  broker.ack(subscription, &ack_ids).await?;
  Ok(messages.len())
}

/// Run [`drain_once`] forever, sleeping while the subscription is idle.
pub async fn run(broker: Arc<Broker>, subscription: String) {
  info!(%subscription, "event log consumer started");
  loop {
    match drain_once(&broker, &subscription).await {
      Ok(0) => tokio::time::sleep(POLL_INTERVAL).await,
      Ok(_) => {}
      Err(e) => {
        warn!(%subscription, error = %e, "event log pull failed");
        tokio::time::sleep(POLL_INTERVAL).await;
      }
    }
  }
}
