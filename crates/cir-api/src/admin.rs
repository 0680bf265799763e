//! Status changes and test-environment teardown.

use axum::{
  Json,
  extract::{Query, State},
};
use cir_core::store::{BlobStore, EventPublisher, MetadataStore};
use serde_json::{Value, json};

use crate::{
  ApiError, AppState,
  params::{GuidParams, SurveyParams, required},
};

/// `PUT /v1/update_status?guid`
///
/// Idempotent: a second call for the same guid reports that the CI is
/// already published.
pub async fn update_status<M, B, P>(
  State(state): State<AppState<M, B, P>>,
  Query(params): Query<GuidParams>,
) -> Result<Json<Value>, ApiError>
where
  M: MetadataStore + 'static,
  B: BlobStore + 'static,
  P: EventPublisher + 'static,
{
  let guid = params.parse()?;
  let change = state.processor.update_status(guid).await?;

  let message = if change.changed() {
    format!("CI status has been changed to PUBLISHED for {guid}")
  } else {
    format!("CI status has already been changed to PUBLISHED for {guid}")
  };
  Ok(Json(json!({ "message": message })))
}

/// `DELETE /v1/dev/teardown?survey_id`
///
/// Removes every CI version of the survey along with its schemas.
pub async fn teardown<M, B, P>(
  State(state): State<AppState<M, B, P>>,
  Query(params): Query<SurveyParams>,
) -> Result<Json<Value>, ApiError>
where
  M: MetadataStore + 'static,
  B: BlobStore + 'static,
  P: EventPublisher + 'static,
{
  let survey_id = required("survey_id", params.survey_id)?;
  let deleted = state.processor.delete_survey(&survey_id).await?;

  Ok(Json(json!({
    "message": format!("{deleted} collection instrument(s) deleted for survey {survey_id}"),
  })))
}
