//! Runtime configuration.
//!
//! Loaded from an optional TOML file layered under `CIR_`-prefixed
//! environment variables (`CIR_PORT=9000` overrides `port`). Every field has
//! a default, so an empty configuration runs a local server.
//!
//! Environment values stay strings until a field asks for a number, so
//! `CIR_SERVICE_VERSION=1.0` reports `1.0`. List fields take a
//! comma-separated value (`CIR_PROVISIONED_TOPICS=a,b`).

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use cir_core::processor::DEFAULT_MAX_VERSION_ATTEMPTS;
use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                   String,
  pub port:                   u16,
  /// SQLite database holding CI metadata.
  pub store_path:             PathBuf,
  /// Directory holding one `{guid}.json` file per schema.
  pub blob_dir:               PathBuf,
  /// Topic every new CI version is announced on.
  pub topic:                  String,
  /// Topics declared on the broker at startup.
  #[serde(deserialize_with = "list_or_csv")]
  pub provisioned_topics:     Vec<String>,
  /// Let the publisher create `topic` when it does not exist.
  pub auto_create_topic:      bool,
  pub publish_timeout_secs:   u64,
  pub max_version_attempts:   u32,
  /// Reported by `GET /status`.
  pub service_version:        Option<String>,
  /// When set, a background consumer pulls, logs and acks every event on
  /// `topic` through this subscription.
  pub event_log_subscription: Option<String>,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                   "127.0.0.1".into(),
      port:                   8080,
      store_path:             PathBuf::from("~/.local/share/cir/cir.db"),
      blob_dir:               PathBuf::from("~/.local/share/cir/schemas"),
      topic:                  "ci-published".into(),
      provisioned_topics:     Vec::new(),
      auto_create_topic:      true,
      publish_timeout_secs:   10,
      max_version_attempts:   DEFAULT_MAX_VERSION_ATTEMPTS,
      service_version:        None,
      event_log_subscription: None,
    }
  }
}

impl ServerConfig {
  /// Read `path` (if it exists) and then the environment.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    Self::load_with(path, config::Environment::with_prefix("CIR"))
  }

  fn load_with(path: &Path, env: config::Environment) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(env)
      .build()?
      .try_deserialize()
  }

  pub fn publish_timeout(&self) -> Duration { Duration::from_secs(self.publish_timeout_secs) }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Accept either a real list (from TOML) or a comma-separated string (from
/// the environment).
fn list_or_csv<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum ListOrCsv {
    List(Vec<String>),
    Csv(String),
  }

  Ok(match ListOrCsv::deserialize(deserializer)? {
    ListOrCsv::List(items) => items,
    ListOrCsv::Csv(raw) => raw
      .split(',')
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .map(str::to_owned)
      .collect(),
  })
}
