//! HTTP server assembly for Skywatch.
//!
//! Loads [`ServerConfig`] and mounts the JSON API from `skywatch-api` under
//! `/api`, wrapped in request tracing.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::Router;
use serde::Deserialize;
use skywatch_core::{
  coords::UniverseBounds, freshness::StalenessPolicy, ingest::IngestSettings,
  store::ObservationStore,
};
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` layered with
/// `SKYWATCH_*` environment variables (nested keys use `__`, e.g.
/// `SKYWATCH_STALENESS__FRESH_HOURS=12`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  pub universe:   UniverseBounds,
  pub staleness:  StalenessPolicy,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:       "127.0.0.1".to_string(),
      port:       8080,
      store_path: PathBuf::from("skywatch.db"),
      universe:   UniverseBounds::default(),
      staleness:  StalenessPolicy::default(),
    }
  }
}

impl ServerConfig {
  /// Read `path` (optional) and the environment.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("SKYWATCH")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()?
      .try_deserialize()
  }

  pub fn ingest_settings(&self) -> IngestSettings {
    IngestSettings { universe: self.universe, staleness: self.staleness }
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the complete application router.
pub fn router<S>(store: Arc<S>, config: &ServerConfig) -> Router
where
  S: ObservationStore + 'static,
{
  Router::new()
    .nest("/api", skywatch_api::api_router(store, config.ingest_settings()))
    .layer(TraceLayer::new_for_http())
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::io::Write as _;

  use axum::{body::Body, http::Request, http::StatusCode};
  use skywatch_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;

  #[test]
  fn missing_file_yields_defaults() {
    let cfg = ServerConfig::load(Path::new("/nonexistent/skywatch.toml")).unwrap();
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.universe.positions, 15);
    assert_eq!(cfg.staleness.fresh_hours, 24);
  }

  #[test]
  fn file_overrides_nested_sections() {
    let path = std::env::temp_dir().join(format!("skywatch-config-{}.toml", std::process::id()));
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "port = 9000\n\n[universe]\ngalaxies = 4\n\n[staleness]\nfresh_hours = 6")
      .unwrap();

    let cfg = ServerConfig::load(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.universe.galaxies, 4);
    assert_eq!(cfg.universe.systems, 499);
    assert_eq!(cfg.staleness.fresh_hours, 6);
    assert_eq!(cfg.staleness.medium_hours, 72);
  }

  #[tokio::test]
  async fn api_is_mounted_under_prefix() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let app = router(Arc::new(store), &ServerConfig::default());

    let req = Request::builder().uri("/api/freshness").body(Body::empty()).unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let req = Request::builder().uri("/freshness").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }
}
