//! Handlers returning stored schema bodies.
//!
//! Responses carry the bytes exactly as they were published, with
//! `Content-Type: application/json` and a strong `ETag`. A matching
//! `If-None-Match` yields `304 Not Modified`.

use axum::{
  body::Bytes,
  extract::{Query, State},
  http::{HeaderMap, StatusCode, header},
  response::{IntoResponse, Response},
};
use cir_core::store::{BlobStore, EventPublisher, MetadataStore};

use crate::{
  ApiError, AppState,
  etag::{compute_etag, matches},
  params::{GuidParams, KeyParams},
};

fn schema_response(headers: &HeaderMap, body: Bytes) -> Response {
  let etag = compute_etag(&body);

  let not_modified = headers
    .get(header::IF_NONE_MATCH)
    .and_then(|v| v.to_str().ok())
    .is_some_and(|v| matches(v, &etag));
  if not_modified {
    return (StatusCode::NOT_MODIFIED, [(header::ETAG, etag)]).into_response();
  }

  (
    [
      (header::CONTENT_TYPE, "application/json".to_owned()),
      (header::ETAG, etag),
    ],
    body,
  )
    .into_response()
}

/// `GET /v1/retrieve_collection_instrument?survey_id&form_type&language`
///
/// The schema of the latest version for the key.
pub async fn v1<M, B, P>(
  State(state): State<AppState<M, B, P>>,
  headers: HeaderMap,
  Query(params): Query<KeyParams>,
) -> Result<Response, ApiError>
where
  M: MetadataStore + 'static,
  B: BlobStore + 'static,
  P: EventPublisher + 'static,
{
  let key = params.into_key()?;
  let (_, schema) = state.processor.latest_schema(&key).await?;
  Ok(schema_response(&headers, schema))
}

/// `GET /v2/retrieve_collection_instrument?guid`
pub async fn v2<M, B, P>(
  State(state): State<AppState<M, B, P>>,
  headers: HeaderMap,
  Query(params): Query<GuidParams>,
) -> Result<Response, ApiError>
where
  M: MetadataStore + 'static,
  B: BlobStore + 'static,
  P: EventPublisher + 'static,
{
  let guid = params.parse()?;
  let schema = state.processor.schema_by_guid(guid).await?;
  Ok(schema_response(&headers, schema))
}
