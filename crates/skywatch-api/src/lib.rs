//! JSON REST API for Skywatch.
//!
//! Exposes an axum [`Router`] backed by any
//! [`skywatch_core::store::ObservationStore`]. Auth, TLS, and transport
//! concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", skywatch_api::api_router(store.clone(), settings))
//! ```

pub mod error;
pub mod freshness;
pub mod regions;
pub mod reports;
pub mod scans;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use skywatch_core::{ingest::IngestSettings, store::ObservationStore};

pub use error::ApiError;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<S> {
  pub store:    Arc<S>,
  pub settings: Arc<IngestSettings>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), settings: Arc::clone(&self.settings) }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>, settings: IngestSettings) -> Router<()>
where
  S: ObservationStore + 'static,
{
  let state = AppState { store, settings: Arc::new(settings) };
  Router::new()
    // Ingestion
    .route("/scans", post(scans::submit::<S>))
    .route("/reports", get(reports::list::<S>).post(reports::submit::<S>))
    .route("/reports/{kind}/{external_id}", get(reports::get_one::<S>))
    // Reads
    .route("/regions/{galaxy}/{system}", get(regions::get_state::<S>))
    .route("/changes", get(regions::changes::<S>))
    .route("/freshness", get(freshness::list::<S>).post(freshness::mark::<S>))
    .with_state(state)
}

// ─── Integration tests ───────────────────────────────────────────────────────
