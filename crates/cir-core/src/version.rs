//! Version numbering for CI records.
//!
//! Versions for one classification key form the contiguous sequence
//! `1, 2, 3, …`; the next version is always one past the current latest.

use crate::{Error, Result, metadata::CiMetadata};

/// Compute the version to assign after `prior`, the current latest record for
/// a classification key (or `None` if the key has no records yet).
///
/// A prior record with version `0` or `u32::MAX` cannot come from this
/// register and is reported as [`Error::InvalidVersion`].
pub fn next_version(prior: Option<&CiMetadata>) -> Result<u32> {
  let Some(prior) = prior else {
    return Ok(1);
  };

  if prior.ci_version == 0 {
    return Err(Error::InvalidVersion {
      guid:    prior.guid,
      version: prior.ci_version,
    });
  }

  prior.ci_version.checked_add(1).ok_or(Error::InvalidVersion {
    guid:    prior.guid,
    version: prior.ci_version,
  })
}
