//! Encoding and decoding between [`CiMetadata`] and its SQLite row.
//!
//! UUIDs are stored as hyphenated lowercase strings, timestamps in the
//! `published_at` wire format, the classifier as a (type, value) column pair,
//! and an empty `sds_schema` as `NULL`.

use cir_core::metadata::{CiMetadata, CiStatus, Classifier, format_published_at, parse_published_at};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── CiStatus ────────────────────────────────────────────────────────────────

pub fn encode_status(status: CiStatus) -> &'static str {
  match status {
    CiStatus::Draft => "DRAFT",
    CiStatus::Published => "PUBLISHED",
  }
}

pub fn decode_status(s: &str) -> Result<CiStatus> {
  s.parse().map_err(|_| Error::UnknownStatus(s.to_owned()))
}

// ─── Write side ──────────────────────────────────────────────────────────────

/// Owned column values for one record, ready to move onto the database thread.
pub struct EncodedCiMetadata {
  pub guid:             String,
  pub ci_version:       u32,
  pub survey_id:        String,
  pub classifier_type:  &'static str,
  pub classifier_value: String,
  pub language:         String,
  pub data_version:     String,
  pub schema_version:   String,
  pub title:            String,
  pub description:      Option<String>,
  pub published_at:     String,
  pub status:           &'static str,
  /// `None` when the record's `sds_schema` is empty, so the write leaves the
  /// column alone.
  pub sds_schema:       Option<String>,
}

impl From<&CiMetadata> for EncodedCiMetadata {
  fn from(m: &CiMetadata) -> Self {
    Self {
      guid:             encode_uuid(m.guid),
      ci_version:       m.ci_version,
      survey_id:        m.survey_id.clone(),
      classifier_type:  m.classifier.kind(),
      classifier_value: m.classifier.value().to_owned(),
      language:         m.language.clone(),
      data_version:     m.data_version.clone(),
      schema_version:   m.schema_version.clone(),
      title:            m.title.clone(),
      description:      m.description.clone(),
      published_at:     format_published_at(m.published_at),
      status:           encode_status(m.status),
      sds_schema:       (!m.sds_schema.is_empty()).then(|| m.sds_schema.clone()),
    }
  }
}

// ─── Read side ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `ci_metadata` row.
pub struct RawCiMetadata {
  pub guid:             String,
  pub ci_version:       u32,
  pub survey_id:        String,
  pub classifier_type:  String,
  pub classifier_value: String,
  pub language:         String,
  pub data_version:     String,
  pub schema_version:   String,
  pub title:            String,
  pub description:      Option<String>,
  pub published_at:     String,
  pub status:           String,
  pub sds_schema:       Option<String>,
}

/// Row mapper for `SELECT` statements using [`crate::schema::COLUMNS`].
pub fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawCiMetadata> {
  Ok(RawCiMetadata {
    guid:             row.get(0)?,
    ci_version:       row.get(1)?,
    survey_id:        row.get(2)?,
    classifier_type:  row.get(3)?,
    classifier_value: row.get(4)?,
    language:         row.get(5)?,
    data_version:     row.get(6)?,
    schema_version:   row.get(7)?,
    title:            row.get(8)?,
    description:      row.get(9)?,
    published_at:     row.get(10)?,
    status:           row.get(11)?,
    sds_schema:       row.get(12)?,
  })
}

impl RawCiMetadata {
  pub fn into_metadata(self) -> Result<CiMetadata> {
    let classifier = Classifier::from_parts(&self.classifier_type, self.classifier_value)
      .ok_or_else(|| Error::UnknownClassifier(self.classifier_type.clone()))?;

    let published_at =
      parse_published_at(&self.published_at).map_err(|e| Error::DateParse(e.to_string()))?;

    Ok(CiMetadata {
      guid: decode_uuid(&self.guid)?,
      ci_version: self.ci_version,
      survey_id: self.survey_id,
      classifier,
      language: self.language,
      data_version: self.data_version,
      schema_version: self.schema_version,
      title: self.title,
      description: self.description,
      published_at,
      status: decode_status(&self.status)?,
      sds_schema: self.sds_schema.unwrap_or_default(),
    })
  }
}
