//! [`Broker`]: topics, pull subscriptions and ack leases.
//!
//! Every published message is copied to each subscription attached to the
//! topic at publish time. `pull` leases messages for the subscription's ack
//! deadline; a lease that expires without an `ack` puts the message back at
//! the front of the queue with its delivery attempt incremented. Several
//! expired messages go back in the order they were published.

use std::{
  collections::{HashMap, VecDeque},
  time::Duration,
};

use bytes::Bytes;
use tokio::{sync::Mutex, time::Instant};
use tracing::debug;
use uuid::Uuid;

use crate::{Error, Result};

/// Ack deadline used when a subscription does not set its own.
pub const DEFAULT_ACK_DEADLINE: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
struct Message {
  id:   String,
  /// Publish order across the broker.
  seq:  u64,
  data: Bytes,
}

/// A queued message and the number of times it has been handed out.
#[derive(Debug)]
struct Pending {
  message:  Message,
  attempts: u32,
}

#[derive(Debug)]
struct Lease {
  pending:  Pending,
  deadline: Instant,
}

#[derive(Debug)]
struct Subscription {
  ack_deadline: Duration,
  queue:        VecDeque<Pending>,
  leases:       HashMap<String, Lease>,
}

impl Subscription {
  /// Return every expired lease to the front of the queue, oldest message
  /// first.
  fn reclaim_expired(&mut self, now: Instant) {
    let expired: Vec<String> = self
      .leases
      .iter()
      .filter(|(_, lease)| lease.deadline <= now)
      .map(|(ack_id, _)| ack_id.clone())
      .collect();

    let mut reclaimed: Vec<Pending> = expired
      .iter()
      .filter_map(|ack_id| self.leases.remove(ack_id))
      .map(|lease| lease.pending)
      .collect();
    reclaimed.sort_by_key(|pending| pending.message.seq);

    for pending in reclaimed.into_iter().rev() {
      debug!(message_id = %pending.message.id, "ack deadline expired; redelivering");
      self.queue.push_front(pending);
    }
  }
}

#[derive(Debug, Default)]
struct State {
  /// Topic name → names of attached subscriptions.
  topics:        HashMap<String, Vec<String>>,
  subscriptions: HashMap<String, Subscription>,
  next_seq:      u64,
}

/// A message handed to a subscriber by [`Broker::pull`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
  /// Token for [`Broker::ack`]; unique to this delivery.
  pub ack_id:           String,
  pub message_id:       String,
  pub data:             Bytes,
  /// 1 on first delivery, incremented on each redelivery.
  pub delivery_attempt: u32,
}

/// An in-process message broker.
#[derive(Debug, Default)]
pub struct Broker {
  state: Mutex<State>,
}

impl Broker {
  pub fn new() -> Self { Self::default() }

  // ── Topics ────────────────────────────────────────────────────────────────

  pub async fn create_topic(&self, topic: &str) -> Result<()> {
    let mut state = self.state.lock().await;
    if state.topics.contains_key(topic) {
      return Err(Error::TopicExists(topic.to_owned()));
    }
    state.topics.insert(topic.to_owned(), Vec::new());
    debug!(topic, "topic created");
    Ok(())
  }

  pub async fn topic_exists(&self, topic: &str) -> bool {
    self.state.lock().await.topics.contains_key(topic)
  }

  /// Publish `data` to every subscription on `topic`. Returns the message id
  /// once the message is queued.
  pub async fn publish(&self, topic: &str, data: Bytes) -> Result<String> {
    let mut state = self.state.lock().await;
    let State { topics, subscriptions, next_seq } = &mut *state;

    let attached = topics
      .get(topic)
      .ok_or_else(|| Error::TopicNotFound(topic.to_owned()))?;

    let message = Message {
      id: Uuid::new_v4().to_string(),
      seq: *next_seq,
      data,
    };
    *next_seq += 1;
    for name in attached {
      if let Some(sub) = subscriptions.get_mut(name) {
        sub.queue.push_back(Pending {
          message:  message.clone(),
          attempts: 0,
        });
      }
    }

    debug!(topic, message_id = %message.id, fan_out = attached.len(), "message published");
    Ok(message.id)
  }

  // ── Subscriptions ─────────────────────────────────────────────────────────

  /// Attach a new pull subscription to `topic`. Only messages published
  /// after this call are delivered to it.
  pub async fn create_subscription(
    &self,
    subscription: &str,
    topic: &str,
    ack_deadline: Duration,
  ) -> Result<()> {
    let mut state = self.state.lock().await;
    if state.subscriptions.contains_key(subscription) {
      return Err(Error::SubscriptionExists(subscription.to_owned()));
    }
    let attached = state
      .topics
      .get_mut(topic)
      .ok_or_else(|| Error::TopicNotFound(topic.to_owned()))?;
    attached.push(subscription.to_owned());

    state.subscriptions.insert(subscription.to_owned(), Subscription {
      ack_deadline,
      queue: VecDeque::new(),
      leases: HashMap::new(),
    });
    debug!(subscription, topic, "subscription created");
    Ok(())
  }

  /// Lease up to `max` messages from `subscription`.
  pub async fn pull(&self, subscription: &str, max: usize) -> Result<Vec<ReceivedMessage>> {
    let mut state = self.state.lock().await;
    let sub = state
      .subscriptions
      .get_mut(subscription)
      .ok_or_else(|| Error::SubscriptionNotFound(subscription.to_owned()))?;

    let now = Instant::now();
    sub.reclaim_expired(now);

    let mut out = Vec::new();
    while out.len() < max {
      let Some(mut pending) = sub.queue.pop_front() else { break };
      pending.attempts += 1;

      let ack_id = Uuid::new_v4().to_string();
      out.push(ReceivedMessage {
        ack_id:           ack_id.clone(),
        message_id:       pending.message.id.clone(),
        data:             pending.message.data.clone(),
        delivery_attempt: pending.attempts,
      });
      sub.leases.insert(ack_id, Lease {
        pending,
        deadline: now + sub.ack_deadline,
      });
    }
    Ok(out)
  }

  /// Acknowledge delivered messages. Unknown or expired ack ids are ignored.
  /// Returns how many leases were settled.
  pub async fn ack(&self, subscription: &str, ack_ids: &[String]) -> Result<usize> {
    let mut state = self.state.lock().await;
    let sub = state
      .subscriptions
      .get_mut(subscription)
      .ok_or_else(|| Error::SubscriptionNotFound(subscription.to_owned()))?;

    let settled = ack_ids
      .iter()
      .filter(|id| sub.leases.remove(id.as_str()).is_some())
      .count();
    Ok(settled)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  async fn broker_with(sub: &str, ack_deadline: Duration) -> Broker {
    let broker = Broker::new();
    broker.create_topic("ci").await.unwrap();
    broker.create_subscription(sub, "ci", ack_deadline).await.unwrap();
    broker
  }

  #[tokio::test]
  async fn publish_to_missing_topic_fails() {
    let broker = Broker::new();
    let err = broker.publish("nope", Bytes::from("x")).await.unwrap_err();
    assert!(matches!(err, Error::TopicNotFound(t) if t == "nope"));
  }

  #[tokio::test]
  async fn duplicate_topic_is_rejected() {
    let broker = Broker::new();
    broker.create_topic("ci").await.unwrap();
    assert!(matches!(broker.create_topic("ci").await, Err(Error::TopicExists(_))));
  }

  #[tokio::test]
  async fn publish_fans_out_to_every_subscription() {
    let broker = broker_with("a", DEFAULT_ACK_DEADLINE).await;
    broker.create_subscription("b", "ci", DEFAULT_ACK_DEADLINE).await.unwrap();

    let id = broker.publish("ci", Bytes::from("hello")).await.unwrap();

    for sub in ["a", "b"] {
      let got = broker.pull(sub, 10).await.unwrap();
      assert_eq!(got.len(), 1);
      assert_eq!(got[0].message_id, id);
      assert_eq!(got[0].data, Bytes::from("hello"));
      assert_eq!(got[0].delivery_attempt, 1);
    }
  }

  #[tokio::test]
  async fn messages_before_subscription_are_not_delivered() {
    let broker = Broker::new();
    broker.create_topic("ci").await.unwrap();
    broker.publish("ci", Bytes::from("early")).await.unwrap();
    broker.create_subscription("late", "ci", DEFAULT_ACK_DEADLINE).await.unwrap();

    assert!(broker.pull("late", 10).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn pull_respects_max_and_order() {
    let broker = broker_with("s", DEFAULT_ACK_DEADLINE).await;
    for body in ["1", "2", "3"] {
      broker.publish("ci", Bytes::from(body)).await.unwrap();
    }

    let first = broker.pull("s", 2).await.unwrap();
    let bodies: Vec<_> = first.iter().map(|m| m.data.clone()).collect();
    assert_eq!(bodies, vec![Bytes::from("1"), Bytes::from("2")]);

    let rest = broker.pull("s", 10).await.unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].data, Bytes::from("3"));
  }

  #[tokio::test]
  async fn leased_messages_are_not_redelivered_before_deadline() {
    let broker = broker_with("s", DEFAULT_ACK_DEADLINE).await;
    broker.publish("ci", Bytes::from("x")).await.unwrap();

    assert_eq!(broker.pull("s", 10).await.unwrap().len(), 1);
    assert!(broker.pull("s", 10).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn unacked_message_is_redelivered_after_deadline() {
    let broker = broker_with("s", Duration::ZERO).await;
    let id = broker.publish("ci", Bytes::from("x")).await.unwrap();

    let first = broker.pull("s", 10).await.unwrap();
    assert_eq!(first[0].delivery_attempt, 1);

    let second = broker.pull("s", 10).await.unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].message_id, id);
    assert_eq!(second[0].delivery_attempt, 2);
    assert_ne!(second[0].ack_id, first[0].ack_id);
  }

  #[tokio::test]
  async fn expired_messages_are_redelivered_in_publish_order() {
    let broker = broker_with("s", Duration::ZERO).await;
    for body in ["1", "2", "3", "4"] {
      broker.publish("ci", Bytes::from(body)).await.unwrap();
    }

    assert_eq!(broker.pull("s", 3).await.unwrap().len(), 3);

    let again = broker.pull("s", 10).await.unwrap();
    let bodies: Vec<_> = again.iter().map(|m| m.data.clone()).collect();
    assert_eq!(bodies, vec![
      Bytes::from("1"),
      Bytes::from("2"),
      Bytes::from("3"),
      Bytes::from("4"),
    ]);
    let attempts: Vec<_> = again.iter().map(|m| m.delivery_attempt).collect();
    assert_eq!(attempts, vec![2, 2, 2, 1]);
  }

  #[tokio::test]
  async fn acked_message_is_gone() {
    let broker = broker_with("s", Duration::ZERO).await;
    broker.publish("ci", Bytes::from("x")).await.unwrap();

    let got = broker.pull("s", 10).await.unwrap();
    let ack_ids: Vec<String> = got.iter().map(|m| m.ack_id.clone()).collect();
    assert_eq!(broker.ack("s", &ack_ids).await.unwrap(), 1);

    assert!(broker.pull("s", 10).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn stale_ack_id_is_ignored() {
    let broker = broker_with("s", Duration::ZERO).await;
    broker.publish("ci", Bytes::from("x")).await.unwrap();

    let first = broker.pull("s", 10).await.unwrap();
    let _second = broker.pull("s", 10).await.unwrap();

    assert_eq!(broker.ack("s", &[first[0].ack_id.clone()]).await.unwrap(), 0);
  }

  #[tokio::test]
  async fn unknown_subscription_errors() {
    let broker = Broker::new();
    assert!(matches!(
      broker.pull("nope", 1).await,
      Err(Error::SubscriptionNotFound(_))
    ));
    assert!(matches!(
      broker.ack("nope", &[]).await,
      Err(Error::SubscriptionNotFound(_))
    ));
  }
}
