//! `GET /status`

use axum::{Json, extract::State};
use cir_core::store::{BlobStore, EventPublisher, MetadataStore};
use serde_json::{Value, json};

use crate::{ApiError, AppState};

pub async fn handler<M, B, P>(
  State(state): State<AppState<M, B, P>>,
) -> Result<Json<Value>, ApiError>
where
  M: MetadataStore + 'static,
  B: BlobStore + 'static,
  P: EventPublisher + 'static,
{
  let version = state
    .service_version
    .as_deref()
    .ok_or_else(|| ApiError::Internal("service version is not configured".into()))?;

  Ok(Json(json!({ "version": version, "status": "OK" })))
}
