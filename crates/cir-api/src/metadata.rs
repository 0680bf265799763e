//! Handlers for the `ci_metadata` endpoints.
//!
//! | Version | Parameters | Notes |
//! |---------|------------|-------|
//! | v1 | `survey_id`, `form_type`, `language` (all required) | 400 if any is missing |
//! | v2 | any of `survey_id`, `form_type`, `language`, `status` | none means everything |
//!
//! Both return records newest version first and 404 when nothing matches.

use axum::{
  Json,
  extract::{Query, State},
};
use cir_core::{
  metadata::{CiMetadata, CiStatus, Classifier},
  store::{BlobStore, CiQuery, EventPublisher, MetadataStore},
};
use serde::Deserialize;

use crate::{ApiError, AppState, params::KeyParams};

// ─── v1 ──────────────────────────────────────────────────────────────────────

/// `GET /v1/ci_metadata?survey_id&form_type&language`
pub async fn v1<M, B, P>(
  State(state): State<AppState<M, B, P>>,
  Query(params): Query<KeyParams>,
) -> Result<Json<Vec<CiMetadata>>, ApiError>
where
  M: MetadataStore + 'static,
  B: BlobStore + 'static,
  P: EventPublisher + 'static,
{
  let key = params.into_key()?;
  let records = state.processor.metadata_for_key(&key).await?;

  if records.is_empty() {
    return Err(ApiError::NotFound(format!(
      "no collection instrument metadata found for {key}"
    )));
  }
  Ok(Json(records))
}

// ─── v2 ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct V2Params {
  pub survey_id: Option<String>,
  pub form_type: Option<String>,
  pub language:  Option<String>,
  pub status:    Option<String>,
}

impl V2Params {
  /// Blank parameters are treated as absent. An unknown `status` is a 400.
  pub fn into_query(self) -> Result<CiQuery, ApiError> {
    let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

    let status = present(self.status)
      .map(|s| {
        s.parse::<CiStatus>()
          .map_err(|_| ApiError::BadRequest(format!("invalid status: {s}")))
      })
      .transpose()?;

    Ok(CiQuery {
      survey_id: present(self.survey_id),
      classifier: present(self.form_type).map(Classifier::FormType),
      language: present(self.language),
      status,
    })
  }
}

/// `GET /v2/ci_metadata[?survey_id][&form_type][&language][&status]`
pub async fn v2<M, B, P>(
  State(state): State<AppState<M, B, P>>,
  Query(params): Query<V2Params>,
) -> Result<Json<Vec<CiMetadata>>, ApiError>
where
  M: MetadataStore + 'static,
  B: BlobStore + 'static,
  P: EventPublisher + 'static,
{
  let query = params.into_query()?;
  let records = state.processor.query(&query).await?;

  if records.is_empty() {
    return Err(ApiError::NotFound(
      "no collection instrument metadata found".into(),
    ));
  }
  Ok(Json(records))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_is_case_sensitive_uppercase() {
    let ok = V2Params { status: Some("PUBLISHED".into()), ..Default::default() };
    assert_eq!(ok.into_query().unwrap().status, Some(CiStatus::Published));

    let bad = V2Params { status: Some("published".into()), ..Default::default() };
    assert!(matches!(bad.into_query(), Err(ApiError::BadRequest(_))));
  }

  #[test]
  fn no_params_is_unfiltered() {
    assert!(V2Params::default().into_query().unwrap().is_unfiltered());
  }

  #[test]
  fn blank_params_are_ignored() {
    let params = V2Params {
      survey_id: Some("3456".into()),
      form_type: Some(" ".into()),
      ..Default::default()
    };
    let query = params.into_query().unwrap();
    assert_eq!(query.survey_id.as_deref(), Some("3456"));
    assert_eq!(query.classifier, None);
  }
}
