//! SQL schema for the CI metadata store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS ci_metadata (
    guid             TEXT PRIMARY KEY,
    ci_version       INTEGER NOT NULL CHECK (ci_version > 0),
    survey_id        TEXT NOT NULL,
    classifier_type  TEXT NOT NULL,   -- 'form_type'
    classifier_value TEXT NOT NULL,
    language         TEXT NOT NULL,
    data_version     TEXT NOT NULL,
    schema_version   TEXT NOT NULL,
    title            TEXT NOT NULL,
    description      TEXT,
    published_at     TEXT NOT NULL,   -- %Y-%m-%dT%H:%M:%S.%fZ
    status           TEXT NOT NULL DEFAULT 'DRAFT',   -- 'DRAFT' | 'PUBLISHED'
    sds_schema       TEXT             -- NULL when not supplied
);

-- At most one record per version of a classification key.
CREATE UNIQUE INDEX IF NOT EXISTS ci_metadata_key_version_idx
    ON ci_metadata(survey_id, classifier_type, classifier_value, language, ci_version);

CREATE INDEX IF NOT EXISTS ci_metadata_status_idx ON ci_metadata(status);

PRAGMA user_version = 1;
";

/// Column list shared by every `SELECT`; order matches [`crate::encode::read_row`].
pub const COLUMNS: &str = "guid, ci_version, survey_id, classifier_type, classifier_value, \
   language, data_version, schema_version, title, description, published_at, status, sds_schema";
