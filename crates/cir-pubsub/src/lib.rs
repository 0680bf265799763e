//! In-process publish/subscribe for collection instrument events.
//!
//! [`Broker`] holds named topics and pull subscriptions with
//! at-least-once delivery. [`TopicPublisher`] is the [`EventPublisher`]
//! the register uses to announce each new CI version.
//!
//! [`EventPublisher`]: cir_core::store::EventPublisher

mod broker;
pub mod error;
mod publisher;

pub use broker::{Broker, DEFAULT_ACK_DEADLINE, ReceivedMessage};
pub use error::{Error, Result};
pub use publisher::{DEFAULT_PUBLISH_TIMEOUT, TopicPublisher};
