//! Handlers for `/reports` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/reports` | Body: [`NewReport`]; `201` on first delivery, else `200` |
//! | `GET`  | `/reports` | Filters: `kind`, `galaxy`, `system`, `position`, `reported_by`, `since`, `until`, `limit`, `offset` |
//! | `GET`  | `/reports/{kind}/{external_id}` | 404 if not found |

use axum::{
  Json,
  extract::{Path, Query, State, rejection::JsonRejection},
  http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use skywatch_core::{
  ingest,
  report::{Ack, NewReport, Report, ReportFilter, ReportKind, ReportOutcome},
  store::ObservationStore,
};

use crate::{AppState, error::ApiError};

// ─── Submit ──────────────────────────────────────────────────────────────────

/// `POST /reports`
pub async fn submit<S>(
  State(state): State<AppState<S>>,
  payload: Result<Json<NewReport>, JsonRejection>,
) -> Result<(StatusCode, Json<Ack>), ApiError>
where
  S: ObservationStore,
{
  let Json(report) = payload?;
  let ack = ingest::submit_report(&*state.store, &state.settings, report).await?;
  let status = match ack.outcome {
    ReportOutcome::Inserted => StatusCode::CREATED,
    ReportOutcome::Updated | ReportOutcome::Unchanged => StatusCode::OK,
  };
  Ok((status, Json(ack)))
}

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct ListParams {
  pub kind:        Option<ReportKind>,
  pub galaxy:      Option<u16>,
  pub system:      Option<u16>,
  pub position:    Option<u8>,
  pub reported_by: Option<i64>,
  pub since:       Option<DateTime<Utc>>,
  pub until:       Option<DateTime<Utc>>,
  pub limit:       Option<usize>,
  pub offset:      Option<usize>,
}

/// `GET /reports[?kind=...][&galaxy=...][&since=...][&limit=...]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Report>>, ApiError>
where
  S: ObservationStore,
{
  let filter = ReportFilter {
    kind:        params.kind,
    galaxy:      params.galaxy,
    system:      params.system,
    position:    params.position,
    reported_by: params.reported_by,
    since:       params.since,
    until:       params.until,
    limit:       params.limit,
    offset:      params.offset,
  };
  Ok(Json(ingest::get_reports(&*state.store, filter).await?))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /reports/{kind}/{external_id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path((kind, external_id)): Path<(String, i64)>,
) -> Result<Json<Report>, ApiError>
where
  S: ObservationStore,
{
  let kind: ReportKind = kind.parse().map_err(|e: skywatch_core::Error| {
    ApiError::BadRequest(e.to_string())
  })?;
  let report = ingest::get_report(&*state.store, kind, external_id)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("report {kind}:{external_id} not found")))?;
  Ok(Json(report))
}
