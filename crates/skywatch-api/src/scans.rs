//! Handler for `POST /scans`.
//!
//! Body: a [`RegionScan`]; an unreadable body is a `400`. Responds `200` with the [`ScanOutcome`] when every
//! key landed, `207` when some keys failed (see `failures`; retrying the same
//! scan is safe).

use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
  http::StatusCode,
};
use skywatch_core::{
  ingest::{self, ScanOutcome},
  observation::RegionScan,
  store::ObservationStore,
};

use crate::{AppState, error::ApiError};

/// `POST /scans`
pub async fn submit<S>(
  State(state): State<AppState<S>>,
  payload: Result<Json<RegionScan>, JsonRejection>,
) -> Result<(StatusCode, Json<ScanOutcome>), ApiError>
where
  S: ObservationStore,
{
  let Json(scan) = payload?;
  let outcome = ingest::submit_region_scan(&*state.store, &state.settings, scan).await?;
  let status = if outcome.is_complete() { StatusCode::OK } else { StatusCode::MULTI_STATUS };
  Ok((status, Json(outcome)))
}
