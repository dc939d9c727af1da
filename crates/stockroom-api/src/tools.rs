//! Handlers for `/tools` and `/assignments` endpoints.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use serde_json::{Value, json};
use stockroom_core::{
  store::InventoryStore,
  tool::{AssignmentQuery, NewTool, Tool, ToolAssignment, ToolReturn},
};

use crate::{JsonBody, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ListParams {
  #[serde(default)]
  pub include_deleted: bool,
}

/// `GET /tools[?include_deleted=true]`
pub async fn list<S: InventoryStore>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Tool>>, ApiError> {
  let tools = store
    .list_tools(params.include_deleted)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(tools))
}

/// `POST /tools`, body: `{"name":"Drill","total_quantity":5}`
pub async fn create<S: InventoryStore>(
  State(store): State<Arc<S>>,
  JsonBody(body): JsonBody<NewTool>,
) -> Result<impl IntoResponse, ApiError> {
  let tool = store.create_tool(body).await.map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(tool)))
}

/// `GET /tools/:id`
pub async fn get_one<S: InventoryStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<i64>,
) -> Result<Json<Tool>, ApiError> {
  let tool = store
    .get_tool(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("tool {id} not found")))?;
  Ok(Json(tool))
}

/// `DELETE /tools/:id`
pub async fn delete<S: InventoryStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
  store.delete_tool(id).await.map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}

/// `POST /tools/:id/purge`
pub async fn purge<S: InventoryStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
  let removed = store.purge_tool(id).await.map_err(ApiError::from_store)?;
  Ok(Json(json!({ "assignments_removed": removed })))
}

#[derive(Debug, Deserialize)]
pub struct TotalBody {
  pub total_quantity: i64,
}

/// `PUT /tools/:id/total`
pub async fn set_total<S: InventoryStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<i64>,
  JsonBody(body): JsonBody<TotalBody>,
) -> Result<Json<Tool>, ApiError> {
  let tool = store
    .set_tool_total_quantity(id, body.total_quantity)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(tool))
}

#[derive(Debug, Deserialize)]
pub struct AssignBody {
  pub worker_id: i64,
  pub quantity:  i64,
}

/// `POST /tools/:id/assign`
pub async fn assign<S: InventoryStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<i64>,
  JsonBody(body): JsonBody<AssignBody>,
) -> Result<impl IntoResponse, ApiError> {
  let assignment = store
    .assign_tool(id, body.worker_id, body.quantity)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(assignment)))
}

#[derive(Debug, Deserialize)]
pub struct ReturnBody {
  pub worker_id: i64,
  /// Defaults to everything the worker holds.
  pub quantity:  Option<i64>,
}

/// `POST /tools/:id/return`
pub async fn return_units<S: InventoryStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<i64>,
  JsonBody(body): JsonBody<ReturnBody>,
) -> Result<Json<ToolReturn>, ApiError> {
  let ret = store
    .return_tool(id, body.worker_id, body.quantity)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(ret))
}

/// `GET /assignments[?tool_id=..&worker_id=..&outstanding_only=true]`
pub async fn assignments<S: InventoryStore>(
  State(store): State<Arc<S>>,
  Query(query): Query<AssignmentQuery>,
) -> Result<Json<Vec<ToolAssignment>>, ApiError> {
  let rows = store
    .list_assignments(query)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(rows))
}
