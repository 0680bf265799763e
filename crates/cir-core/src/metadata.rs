//! Collection instrument metadata: the versioned record that describes each
//! stored schema document, and the types derived from it.
//!
//! A record is written once when a new version is published and afterwards
//! only its `status` ever changes (DRAFT → PUBLISHED).

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Status ──────────────────────────────────────────────────────────────────

/// Lifecycle status of a CI version. Transitions only DRAFT → PUBLISHED.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum CiStatus {
  Draft,
  Published,
}

// ─── Classifier ──────────────────────────────────────────────────────────────

/// The classifier that, together with survey and language, groups CI
/// versions. Flattened into its parent, so `FormType("business")` appears on
/// the wire as `"form_type": "business"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classifier {
  FormType(String),
}

impl Classifier {
  /// The classifier type stored in the `classifier_type` column.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::FormType(_) => "form_type",
    }
  }

  pub fn value(&self) -> &str {
    match self {
      Self::FormType(v) => v,
    }
  }

  /// Rebuild a classifier from its stored type and value. Returns `None` for
  /// an unrecognised type.
  pub fn from_parts(kind: &str, value: String) -> Option<Self> {
    match kind {
      "form_type" => Some(Self::FormType(value)),
      _ => None,
    }
  }
}

impl fmt::Display for Classifier {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}={}", self.kind(), self.value())
  }
}

/// The triple that groups versions of one collection instrument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassificationKey {
  pub survey_id:  String,
  pub classifier: Classifier,
  pub language:   String,
}

impl ClassificationKey {
  pub fn new(
    survey_id: impl Into<String>,
    classifier: Classifier,
    language: impl Into<String>,
  ) -> Self {
    Self {
      survey_id: survey_id.into(),
      classifier,
      language: language.into(),
    }
  }
}

impl fmt::Display for ClassificationKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}/{}", self.survey_id, self.classifier, self.language)
  }
}

// ─── Timestamps ──────────────────────────────────────────────────────────────

/// Wire format of `published_at`, e.g. `2024-03-01T09:30:00.123456Z`.
pub const PUBLISHED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

pub fn format_published_at(dt: DateTime<Utc>) -> String {
  dt.format(PUBLISHED_AT_FORMAT).to_string()
}

pub fn parse_published_at(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
  NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.fZ").map(|n| n.and_utc())
}

/// `#[serde(with = ...)]` adapter for [`PUBLISHED_AT_FORMAT`].
pub mod published_at {
  use chrono::{DateTime, Utc};
  use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

  pub fn serialize<S: Serializer>(
    dt: &DateTime<Utc>,
    serializer: S,
  ) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&dt.format(super::PUBLISHED_AT_FORMAT))
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(
    deserializer: D,
  ) -> Result<DateTime<Utc>, D::Error> {
    let s = String::deserialize(deserializer)?;
    super::parse_published_at(&s).map_err(D::Error::custom)
  }
}

// ─── CiMetadata ──────────────────────────────────────────────────────────────

/// A versioned collection instrument record.
///
/// `sds_schema` is omitted from the serialised form when empty; every other
/// field is always present (`description` as `null` when unset).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiMetadata {
  pub guid:           Uuid,
  pub ci_version:     u32,
  pub survey_id:      String,
  #[serde(flatten)]
  pub classifier:     Classifier,
  pub language:       String,
  pub data_version:   String,
  pub schema_version: String,
  pub title:          String,
  pub description:    Option<String>,
  #[serde(with = "published_at")]
  pub published_at:   DateTime<Utc>,
  pub status:         CiStatus,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub sds_schema:     String,
}

impl CiMetadata {
  pub fn key(&self) -> ClassificationKey {
    ClassificationKey::new(
      self.survey_id.clone(),
      self.classifier.clone(),
      self.language.clone(),
    )
  }

  pub fn is_published(&self) -> bool { self.status == CiStatus::Published }
}

// ─── NewCi ───────────────────────────────────────────────────────────────────

/// Validated input for publishing a new CI version. `guid`, `ci_version`,
/// `published_at` and `status` are assigned by the processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCi {
  pub survey_id:      String,
  pub classifier:     Classifier,
  pub language:       String,
  pub data_version:   String,
  pub schema_version: String,
  pub title:          String,
  pub description:    Option<String>,
  pub sds_schema:     String,
}

impl NewCi {
  pub fn key(&self) -> ClassificationKey {
    ClassificationKey::new(
      self.survey_id.clone(),
      self.classifier.clone(),
      self.language.clone(),
    )
  }

  /// Build the DRAFT record for this input at the given version.
  pub fn to_metadata(
    &self,
    guid: Uuid,
    ci_version: u32,
    published_at: DateTime<Utc>,
  ) -> CiMetadata {
    CiMetadata {
      guid,
      ci_version,
      survey_id: self.survey_id.clone(),
      classifier: self.classifier.clone(),
      language: self.language.clone(),
      data_version: self.data_version.clone(),
      schema_version: self.schema_version.clone(),
      title: self.title.clone(),
      description: self.description.clone(),
      published_at,
      status: CiStatus::Draft,
      sds_schema: self.sds_schema.clone(),
    }
  }
}

// ─── PostEvent ───────────────────────────────────────────────────────────────

/// The notification emitted once per successful publish. Mirrors
/// [`CiMetadata`] without the internal `status` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostEvent {
  pub guid:           Uuid,
  pub ci_version:     u32,
  pub survey_id:      String,
  #[serde(flatten)]
  pub classifier:     Classifier,
  pub language:       String,
  pub data_version:   String,
  pub schema_version: String,
  pub title:          String,
  pub description:    Option<String>,
  #[serde(with = "published_at")]
  pub published_at:   DateTime<Utc>,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub sds_schema:     String,
}

impl From<&CiMetadata> for PostEvent {
  fn from(m: &CiMetadata) -> Self {
    Self {
      guid:           m.guid,
      ci_version:     m.ci_version,
      survey_id:      m.survey_id.clone(),
      classifier:     m.classifier.clone(),
      language:       m.language.clone(),
      data_version:   m.data_version.clone(),
      schema_version: m.schema_version.clone(),
      title:          m.title.clone(),
      description:    m.description.clone(),
      published_at:   m.published_at,
      sds_schema:     m.sds_schema.clone(),
    }
  }
}
