//! Blob keys for schema documents.

use uuid::Uuid;

use crate::metadata::CiMetadata;

/// The blob key holding the schema body for `metadata`: `"{guid}.json"`.
pub fn schema_location(metadata: &CiMetadata) -> String {
  schema_location_for(metadata.guid)
}

/// The blob key for a guid when only the guid is at hand.
pub fn schema_location_for(guid: Uuid) -> String { format!("{guid}.json") }
