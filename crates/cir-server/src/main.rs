//! Collection Instrument Register server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) and `CIR_*`
//! environment variables, opens the SQLite metadata store and the schema
//! directory, wires the in-process broker, and serves the HTTP API.

mod events;
mod settings;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use cir_api::{AppState, api_router};
use cir_blob::FsBlobStore;
use cir_core::{processor::CiProcessor, store::EventPublisher as _};
use cir_pubsub::{Broker, DEFAULT_ACK_DEADLINE, TopicPublisher};
use cir_store_sqlite::SqliteStore;
use clap::Parser;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::settings::ServerConfig;

#[derive(Parser)]
#[command(author, version, about = "Collection Instrument Register server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, env = "CIR_CONFIG", default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let cfg = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;

  // Metadata store.
  let store_path = expand_tilde(&cfg.store_path);
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    tokio::fs::create_dir_all(parent)
      .await
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let metadata = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  // Schema blobs.
  let blob_dir = expand_tilde(&cfg.blob_dir);
  let blobs = FsBlobStore::open(&blob_dir)
    .await
    .with_context(|| format!("failed to open blob directory {blob_dir:?}"))?;

  // Broker and publisher.
  let broker = Arc::new(Broker::new());
  for topic in &cfg.provisioned_topics {
    broker
      .create_topic(topic)
      .await
      .with_context(|| format!("failed to provision topic {topic}"))?;
  }

  let publisher = TopicPublisher::new(broker.clone(), cfg.topic.clone())
    .auto_create_topic(cfg.auto_create_topic)
    .publish_timeout(cfg.publish_timeout());
  publisher
    .ensure_topic()
    .await
    .with_context(|| format!("topic {} is not available", publisher.topic()))?;

  if let Some(subscription) = cfg.event_log_subscription.clone() {
    broker
      .create_subscription(&subscription, &cfg.topic, DEFAULT_ACK_DEADLINE)
      .await
      .with_context(|| format!("failed to subscribe {subscription} to {}", cfg.topic))?;
    tokio::spawn(events::run(broker.clone(), subscription));
  }

  // Application.
  let processor = CiProcessor::new(Arc::new(metadata), Arc::new(blobs), Arc::new(publisher))
    .with_max_version_attempts(cfg.max_version_attempts);

  let mut state = AppState::new(processor);
  match cfg.service_version.clone() {
    Some(version) => state = state.with_service_version(version),
    None => tracing::warn!("service_version is not configured; /status will fail"),
  }

  let app = api_router(state).layer(TraceLayer::new_for_http());
  let address = cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn expand_tilde_leaves_absolute_paths() {
    let p = Path::new("/var/lib/cir/cir.db");
    assert_eq!(expand_tilde(p), p);
  }

  #[test]
  fn expand_tilde_uses_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(
      expand_tilde(Path::new("~/cir/schemas")),
      PathBuf::from(home).join("cir/schemas")
    );
  }
}
