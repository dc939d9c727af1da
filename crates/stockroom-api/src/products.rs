//! Handlers for `/products` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/products` | Optional `?text=...&include_deleted=true` |
//! | `POST`   | `/products` | Body: [`NewProduct`]; returns 201 |
//! | `GET`    | `/products/:id` | 404 if not found |
//! | `PATCH`  | `/products/:id` | Body: [`ProductPatch`] |
//! | `DELETE` | `/products/:id` | Soft delete; 204 |
//! | `POST`   | `/products/:id/purge` | Hard delete with cascade |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use stockroom_core::{
  product::{NewProduct, Product, ProductPatch, ProductQuery, PurgeSummary},
  store::InventoryStore,
};

use crate::{JsonBody, error::ApiError};

/// `GET /products[?text=<substring>][&include_deleted=true]`
pub async fn list<S: InventoryStore>(
  State(store): State<Arc<S>>,
  Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<Product>>, ApiError> {
  let products = store.list_products(query).await.map_err(ApiError::from_store)?;
  Ok(Json(products))
}

/// `POST /products`
pub async fn create<S: InventoryStore>(
  State(store): State<Arc<S>>,
  JsonBody(body): JsonBody<NewProduct>,
) -> Result<impl IntoResponse, ApiError> {
  let product = store.create_product(body).await.map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(product)))
}

/// `GET /products/:id`
pub async fn get_one<S: InventoryStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<i64>,
) -> Result<Json<Product>, ApiError> {
  let product = store
    .get_product(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("product {id} not found")))?;
  Ok(Json(product))
}

/// `PATCH /products/:id`
pub async fn update<S: InventoryStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<i64>,
  JsonBody(patch): JsonBody<ProductPatch>,
) -> Result<Json<Product>, ApiError> {
  let product = store
    .update_product(id, patch)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(product))
}

/// `DELETE /products/:id`
pub async fn delete<S: InventoryStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
  store.delete_product(id).await.map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}

/// `POST /products/:id/purge`
pub async fn purge<S: InventoryStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<i64>,
) -> Result<Json<PurgeSummary>, ApiError> {
  let summary = store.purge_product(id).await.map_err(ApiError::from_store)?;
  Ok(Json(summary))
}
