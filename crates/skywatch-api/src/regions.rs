//! Handlers for region state and the change log.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/regions/{galaxy}/{system}` | Optional `?include_deleted=true` |
//! | `GET`  | `/changes` | Filters: `galaxy`, `system`, `since`, `until`, `limit`, `offset` |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use skywatch_core::{
  coords::SystemId,
  ingest::{self, RegionState},
  store::{ChangeQuery, ChangeRecord, ObservationStore},
};

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize, Default)]
pub struct StateParams {
  #[serde(default)]
  pub include_deleted: bool,
}

/// `GET /regions/{galaxy}/{system}`
pub async fn get_state<S>(
  State(state): State<AppState<S>>,
  Path((galaxy, system)): Path<(u16, u16)>,
  Query(params): Query<StateParams>,
) -> Result<Json<RegionState>, ApiError>
where
  S: ObservationStore,
{
  let region = SystemId::new(galaxy, system);
  let view =
    ingest::get_region_state(&*state.store, &state.settings, region, params.include_deleted)
      .await?;
  Ok(Json(view))
}

#[derive(Debug, Deserialize, Default)]
pub struct ChangeParams {
  pub galaxy: Option<u16>,
  pub system: Option<u16>,
  pub since:  Option<DateTime<Utc>>,
  pub until:  Option<DateTime<Utc>>,
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

/// `GET /changes[?galaxy=...][&system=...][&since=...][&until=...]`
pub async fn changes<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<ChangeParams>,
) -> Result<Json<Vec<ChangeRecord>>, ApiError>
where
  S: ObservationStore,
{
  let query = ChangeQuery {
    galaxy: params.galaxy,
    system: params.system,
    since:  params.since,
    until:  params.until,
    limit:  params.limit,
    offset: params.offset,
  };
  Ok(Json(ingest::get_changes(&*state.store, query).await?))
}
