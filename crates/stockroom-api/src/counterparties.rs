//! Handlers for `/counterparties/:kind` endpoints, where `kind` is one of
//! `supplier`, `location` or `worker`.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use stockroom_core::{
  counterparty::{Counterparty, CounterpartyKind},
  store::InventoryStore,
};

use crate::{JsonBody, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ListParams {
  #[serde(default)]
  pub include_deleted: bool,
}

#[derive(Debug, Deserialize)]
pub struct NameBody {
  pub name: String,
}

/// `GET /counterparties/:kind[?include_deleted=true]`
pub async fn list<S: InventoryStore>(
  State(store): State<Arc<S>>,
  Path(kind): Path<CounterpartyKind>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Counterparty>>, ApiError> {
  let rows = store
    .list_counterparties(kind, params.include_deleted)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(rows))
}

/// `POST /counterparties/:kind`, body: `{"name":"..."}`
pub async fn create<S: InventoryStore>(
  State(store): State<Arc<S>>,
  Path(kind): Path<CounterpartyKind>,
  JsonBody(body): JsonBody<NameBody>,
) -> Result<impl IntoResponse, ApiError> {
  let created = store
    .create_counterparty(kind, body.name)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(created)))
}

/// `GET /counterparties/:kind/:id`
pub async fn get_one<S: InventoryStore>(
  State(store): State<Arc<S>>,
  Path((kind, id)): Path<(CounterpartyKind, i64)>,
) -> Result<Json<Counterparty>, ApiError> {
  let found = store
    .get_counterparty(kind, id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("{kind} {id} not found")))?;
  Ok(Json(found))
}

/// `PATCH /counterparties/:kind/:id`, body: `{"name":"..."}`
pub async fn rename<S: InventoryStore>(
  State(store): State<Arc<S>>,
  Path((kind, id)): Path<(CounterpartyKind, i64)>,
  JsonBody(body): JsonBody<NameBody>,
) -> Result<Json<Counterparty>, ApiError> {
  let renamed = store
    .rename_counterparty(kind, id, body.name)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(renamed))
}

/// `DELETE /counterparties/:kind/:id`
pub async fn delete<S: InventoryStore>(
  State(store): State<Arc<S>>,
  Path((kind, id)): Path<(CounterpartyKind, i64)>,
) -> Result<StatusCode, ApiError> {
  store
    .delete_counterparty(kind, id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}
