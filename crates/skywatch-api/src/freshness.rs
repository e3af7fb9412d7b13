//! Handlers for `/freshness`.
//!
//! `GET` lists every tracked region with its staleness (`?kind=system|stats`,
//! `?galaxy=`). `POST` records an out-of-band observation, e.g. after a
//! statistics sync: `{"region": "stats:fleet"}`.

use axum::{
  Json,
  extract::{Query, State, rejection::JsonRejection},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use skywatch_core::{
  freshness::{RegionId, RegionKind, RegionStatus},
  ingest,
  store::{FreshnessFilter, ObservationStore},
};

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize, Default)]
pub struct ListParams {
  pub kind:   Option<RegionKind>,
  pub galaxy: Option<u16>,
}

/// `GET /freshness`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<RegionStatus>>, ApiError>
where
  S: ObservationStore,
{
  let filter = FreshnessFilter { kind: params.kind, galaxy: params.galaxy };
  Ok(Json(ingest::list_freshness(&*state.store, &state.settings, filter).await?))
}

#[derive(Debug, Deserialize)]
pub struct MarkBody {
  pub region:      RegionId,
  #[serde(default)]
  pub observed_at: Option<DateTime<Utc>>,
}

/// `POST /freshness`
pub async fn mark<S>(
  State(state): State<AppState<S>>,
  payload: Result<Json<MarkBody>, JsonRejection>,
) -> Result<Json<RegionStatus>, ApiError>
where
  S: ObservationStore,
{
  let Json(body) = payload?;
  let status =
    ingest::mark_observed(&*state.store, &state.settings, body.region, body.observed_at).await?;
  Ok(Json(status))
}
