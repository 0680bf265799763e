//! `POST /v1/publish_collection_instrument`
//!
//! The request body is the schema document itself. Its top-level fields
//! carry the classification key and version fields; the whole body is stored
//! verbatim as the schema.

use axum::{Json, body::Bytes, extract::State};
use cir_core::{
  metadata::{CiMetadata, Classifier, NewCi},
  store::{BlobStore, EventPublisher, MetadataStore},
};
use serde::Deserialize;
use tracing::debug;

use crate::{ApiError, AppState, params::required};

/// The fields of a schema document the register reads. Anything else in the
/// body is kept in the stored schema but ignored here.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PublishBody {
  pub survey_id:      Option<String>,
  pub form_type:      Option<String>,
  pub language:       Option<String>,
  pub title:          Option<String>,
  pub schema_version: Option<String>,
  pub data_version:   Option<String>,
  pub description:    Option<String>,
  pub sds_schema:     Option<String>,
}

impl PublishBody {
  /// Validate into a [`NewCi`]. Blank required fields are rejected.
  pub fn into_new_ci(self) -> Result<NewCi, ApiError> {
    let form_type = self.form_type.ok_or_else(|| {
      ApiError::BadRequest("no classifier supplied: form_type is required".into())
    })?;

    Ok(NewCi {
      survey_id:      required("survey_id", self.survey_id)?,
      classifier:     Classifier::FormType(required("form_type", Some(form_type))?),
      language:       required("language", self.language)?,
      data_version:   required("data_version", self.data_version)?,
      schema_version: required("schema_version", self.schema_version)?,
      title:          required("title", self.title)?,
      description:    self.description,
      sds_schema:     self.sds_schema.unwrap_or_default(),
    })
  }
}

/// Parse and validate a raw request body.
pub fn parse_body(body: &[u8]) -> Result<NewCi, ApiError> {
  let parsed: PublishBody = serde_json::from_slice(body)
    .map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {e}")))?;
  parsed.into_new_ci()
}

pub async fn handler<M, B, P>(
  State(state): State<AppState<M, B, P>>,
  body: Bytes,
) -> Result<Json<CiMetadata>, ApiError>
where
  M: MetadataStore + 'static,
  B: BlobStore + 'static,
  P: EventPublisher + 'static,
{
  let input = parse_body(&body)?;
  debug!(key = %input.key(), bytes = body.len(), "publish requested");

  let record = state.processor.publish_new_version(input, body).await?;
  Ok(Json(record))
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn body(value: serde_json::Value) -> Vec<u8> { serde_json::to_vec(&value).unwrap() }

  fn valid() -> serde_json::Value {
    json!({
      "survey_id": "3456",
      "form_type": "business",
      "language": "welsh",
      "title": "NotDune",
      "schema_version": "1",
      "data_version": "1",
      "sections": [{ "id": "intro" }]
    })
  }

  #[test]
  fn parses_a_valid_document() {
    let ci = parse_body(&body(valid())).unwrap();
    assert_eq!(ci.survey_id, "3456");
    assert_eq!(ci.classifier, Classifier::FormType("business".into()));
    assert_eq!(ci.description, None);
    assert_eq!(ci.sds_schema, "");
  }

  #[test]
  fn keeps_optional_fields() {
    let mut v = valid();
    v["description"] = json!("Census");
    v["sds_schema"] = json!("v3");
    let ci = parse_body(&body(v)).unwrap();
    assert_eq!(ci.description.as_deref(), Some("Census"));
    assert_eq!(ci.sds_schema, "v3");
  }

  #[test]
  fn rejects_whitespace_required_field() {
    for field in ["survey_id", "language", "title", "schema_version", "data_version", "form_type"] {
      let mut v = valid();
      v[field] = json!("   ");
      let err = parse_body(&body(v)).unwrap_err();
      assert!(matches!(err, ApiError::BadRequest(ref m) if m.contains(field)), "{field}: {err}");
    }
  }

  #[test]
  fn rejects_missing_classifier() {
    let mut v = valid();
    v.as_object_mut().unwrap().remove("form_type");
    let err = parse_body(&body(v)).unwrap_err();
    assert!(matches!(err, ApiError::BadRequest(ref m) if m.contains("classifier")));
  }

  #[test]
  fn rejects_invalid_json() {
    assert!(matches!(parse_body(b"{not json"), Err(ApiError::BadRequest(_))));
  }
}
