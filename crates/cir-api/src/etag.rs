//! Strong ETags for stored schema bodies.

use sha2::{Digest, Sha256};

/// Quoted hex SHA-256 of `body`.
pub fn compute_etag(body: &[u8]) -> String {
  format!("\"{}\"", hex::encode(Sha256::digest(body)))
}

/// Whether an `If-None-Match` header value matches `etag`. Comparison is
/// weak, so `W/"abc"` matches `"abc"`.
pub fn matches(if_none_match: &str, etag: &str) -> bool {
  let etag = opaque_tag(etag);
  if_none_match
    .split(',')
    .map(str::trim)
    .any(|candidate| candidate == "*" || opaque_tag(candidate) == etag)
}

fn opaque_tag(tag: &str) -> &str { tag.strip_prefix("W/").unwrap_or(tag) }

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn etag_is_quoted_sha256_hex() {
    assert_eq!(
      compute_etag(b""),
      "\"e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855\""
    );
  }

  #[test]
  fn different_bodies_differ() {
    assert_ne!(compute_etag(b"{\"a\":1}"), compute_etag(b"{\"a\":2}"));
  }

  #[test]
  fn if_none_match_lists_and_wildcard() {
    let etag = compute_etag(b"x");
    assert!(matches(&etag, &etag));
    assert!(matches(&format!("\"other\", {etag}"), &etag));
    assert!(matches("*", &etag));
    assert!(!matches("\"other\"", &etag));
  }

  #[test]
  fn weak_validator_matches_strong_etag() {
    let etag = compute_etag(b"x");
    assert!(matches(&format!("W/{etag}"), &etag));
    assert!(matches(&format!("\"other\", W/{etag}"), &etag));
    assert!(!matches("W/\"other\"", &etag));
  }
}
