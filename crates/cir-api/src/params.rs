//! Query-string parameters shared by several handlers.
//!
//! Every field is optional at the extractor level so that a missing or blank
//! parameter produces this API's JSON 400 body instead of axum's plain-text
//! rejection.

use cir_core::metadata::{ClassificationKey, Classifier};
use serde::Deserialize;
use uuid::Uuid;

use crate::ApiError;

/// `value` when present and not blank, otherwise a 400 naming `field`.
pub fn required(field: &str, value: Option<String>) -> Result<String, ApiError> {
  match value {
    Some(v) if !v.trim().is_empty() => Ok(v),
    _ => Err(ApiError::BadRequest(format!(
      "{field} is required and must not be empty"
    ))),
  }
}

/// `?survey_id=..&form_type=..&language=..`
#[derive(Debug, Default, Deserialize)]
pub struct KeyParams {
  pub survey_id: Option<String>,
  pub form_type: Option<String>,
  pub language:  Option<String>,
}

impl KeyParams {
  pub fn into_key(self) -> Result<ClassificationKey, ApiError> {
    let survey_id = required("survey_id", self.survey_id)?;
    let form_type = required("form_type", self.form_type)?;
    let language = required("language", self.language)?;
    Ok(ClassificationKey::new(
      survey_id,
      Classifier::FormType(form_type),
      language,
    ))
  }
}

/// `?guid=..`
#[derive(Debug, Default, Deserialize)]
pub struct GuidParams {
  pub guid: Option<String>,
}

impl GuidParams {
  pub fn parse(self) -> Result<Uuid, ApiError> {
    let raw = required("guid", self.guid)?;
    Uuid::parse_str(raw.trim())
      .map_err(|_| ApiError::BadRequest(format!("invalid guid: {raw}")))
  }
}

/// `?survey_id=..`
#[derive(Debug, Default, Deserialize)]
pub struct SurveyParams {
  pub survey_id: Option<String>,
}
