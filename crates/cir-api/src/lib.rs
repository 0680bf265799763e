//! JSON HTTP API for the Collection Instrument Register.
//!
//! Exposes an axum [`Router`] backed by a [`CiProcessor`] over any
//! combination of metadata store, blob store and event publisher.
//! Authentication and TLS are the caller's responsibility.
//!
//! | Method   | Path                                  | Handler                |
//! |----------|---------------------------------------|------------------------|
//! | `POST`   | `/v1/publish_collection_instrument`   | [`publish::handler`]   |
//! | `GET`    | `/v1/ci_metadata`                     | [`metadata::v1`]       |
//! | `GET`    | `/v2/ci_metadata`                     | [`metadata::v2`]       |
//! | `GET`    | `/v1/retrieve_collection_instrument`  | [`retrieve::v1`]       |
//! | `GET`    | `/v2/retrieve_collection_instrument`  | [`retrieve::v2`]       |
//! | `PUT`    | `/v1/update_status`                   | [`admin::update_status`] |
//! | `DELETE` | `/v1/dev/teardown`                    | [`admin::teardown`]    |
//! | `GET`    | `/status`                             | [`health::handler`]    |

pub mod admin;
pub mod error;
pub mod etag;
pub mod health;
pub mod metadata;
pub mod params;
pub mod publish;
pub mod retrieve;

use std::sync::Arc;

use axum::{
  Router,
  routing::{delete, get, post, put},
};
use cir_core::{
  processor::CiProcessor,
  store::{BlobStore, EventPublisher, MetadataStore},
};

pub use error::ApiError;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<M, B, P> {
  pub processor:       Arc<CiProcessor<M, B, P>>,
  /// Reported by `/status`; the endpoint fails while this is unset.
  pub service_version: Option<Arc<str>>,
}

impl<M, B, P> AppState<M, B, P> {
  pub fn new(processor: CiProcessor<M, B, P>) -> Self {
    Self {
      processor:       Arc::new(processor),
      service_version: None,
    }
  }

  pub fn with_service_version(mut self, version: impl Into<Arc<str>>) -> Self {
    self.service_version = Some(version.into());
    self
  }
}

impl<M, B, P> Clone for AppState<M, B, P> {
  fn clone(&self) -> Self {
    Self {
      processor:       Arc::clone(&self.processor),
      service_version: self.service_version.clone(),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the API router for `state`.
///
/// The returned `Router<()>` can be nested or layered by the caller.
pub fn api_router<M, B, P>(state: AppState<M, B, P>) -> Router<()>
where
  M: MetadataStore + 'static,
  B: BlobStore + 'static,
  P: EventPublisher + 'static,
{
  Router::new()
    // Publish
    .route("/v1/publish_collection_instrument", post(publish::handler::<M, B, P>))
    // Metadata
    .route("/v1/ci_metadata", get(metadata::v1::<M, B, P>))
    .route("/v2/ci_metadata", get(metadata::v2::<M, B, P>))
    // Schemas
    .route("/v1/retrieve_collection_instrument", get(retrieve::v1::<M, B, P>))
    .route("/v2/retrieve_collection_instrument", get(retrieve::v2::<M, B, P>))
    // Admin
    .route("/v1/update_status", put(admin::update_status::<M, B, P>))
    .route("/v1/dev/teardown", delete(admin::teardown::<M, B, P>))
    // Health
    .route("/status", get(health::handler::<M, B, P>))
    .with_state(state)
}
