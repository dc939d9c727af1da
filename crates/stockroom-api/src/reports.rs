//! Handlers for `/reports` endpoints. All accept optional `from` / `to`
//! RFC 3339 bounds.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use stockroom_core::{
  counterparty::CounterpartyKind,
  report::{CounterpartyStats, ForecastRow, ReportRange, TurnoverRow, WorkerStats},
  store::InventoryStore,
};

use crate::error::ApiError;

/// `GET /reports/turnover`
pub async fn turnover<S: InventoryStore>(
  State(store): State<Arc<S>>,
  Query(range): Query<ReportRange>,
) -> Result<Json<Vec<TurnoverRow>>, ApiError> {
  let rows = store.turnover(range).await.map_err(ApiError::from_store)?;
  Ok(Json(rows))
}

fn default_window() -> i64 { 30 }

#[derive(Debug, Deserialize)]
pub struct ForecastParams {
  #[serde(default = "default_window")]
  pub window_days: i64,
  pub as_of:       Option<DateTime<Utc>>,
}

/// `GET /reports/forecast[?window_days=30&as_of=...]`
pub async fn forecast<S: InventoryStore>(
  State(store): State<Arc<S>>,
  Query(params): Query<ForecastParams>,
) -> Result<Json<Vec<ForecastRow>>, ApiError> {
  let rows = store
    .consumption_forecast(params.window_days, params.as_of)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(rows))
}

/// `GET /reports/workers`
pub async fn workers<S: InventoryStore>(
  State(store): State<Arc<S>>,
  Query(range): Query<ReportRange>,
) -> Result<Json<Vec<WorkerStats>>, ApiError> {
  let rows = store.worker_stats(range).await.map_err(ApiError::from_store)?;
  Ok(Json(rows))
}

/// `GET /reports/counterparties/:kind`
pub async fn counterparties<S: InventoryStore>(
  State(store): State<Arc<S>>,
  Path(kind): Path<CounterpartyKind>,
  Query(range): Query<ReportRange>,
) -> Result<Json<Vec<CounterpartyStats>>, ApiError> {
  let rows = store
    .counterparty_stats(kind, range)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(rows))
}
