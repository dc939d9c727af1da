//! Handlers for `/movements` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/movements` | Filters: see [`MovementQuery`]; newest first |
//! | `POST`   | `/movements` | Body: [`CreateBody`]; returns 201 + receipt |
//! | `GET`    | `/movements/:id` | Movement with items |
//! | `DELETE` | `/movements/:id` | Reverses every item |
//! | `PUT`    | `/movements/:id/note` | Body: `{"note":"..."}` or `{"note":null}` |
//! | `PATCH`  | `/movements/:id/items/:item_id` | Body: `{"quantity":8}` |
//! | `DELETE` | `/movements/:id/items/:item_id` | Reverses the item |

use std::sync::Arc;

use axum::{
  Extension, Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Number;
use stockroom_core::{
  Error as LedgerError,
  movement::{
    Counterparties, ItemDeletion, ItemEdit, ItemRequest, Movement,
    MovementDeletion, MovementKind, MovementQuery, NewMovement,
  },
  store::InventoryStore,
};

use crate::{Actor, JsonBody, error::ApiError};

// ─── List / get ──────────────────────────────────────────────────────────────

/// `GET /movements[?kind=out&product_id=3&from=...&to=...&limit=50]`
pub async fn list<S: InventoryStore>(
  State(store): State<Arc<S>>,
  Query(query): Query<MovementQuery>,
) -> Result<Json<Vec<Movement>>, ApiError> {
  let movements = store.list_movements(query).await.map_err(ApiError::from_store)?;
  Ok(Json(movements))
}

/// `GET /movements/:id`
pub async fn get_one<S: InventoryStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<i64>,
) -> Result<Json<Movement>, ApiError> {
  let movement = store
    .get_movement(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("movement {id} not found")))?;
  Ok(Json(movement))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// One requested line. Any JSON number is accepted here so that a fractional
/// quantity is reported as an invalid delta.
#[derive(Debug, Deserialize)]
pub struct ItemLine {
  pub product_id: i64,
  pub quantity:   Number,
}

impl ItemLine {
  fn into_request(self) -> Result<ItemRequest, LedgerError> {
    let quantity = whole(&self.quantity).ok_or_else(|| {
      LedgerError::InvalidDelta {
        product_id: self.product_id,
        delta:      self.quantity.to_string(),
      }
    })?;
    Ok(ItemRequest { product_id: self.product_id, quantity })
  }
}

/// `2` but not `2.0` or `2.5`.
fn whole(n: &Number) -> Option<i64> { n.as_i64() }

/// Request body for `POST /movements`. The author is taken from the
/// authenticated actor, never from the body.
#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub kind:           MovementKind,
  pub items:          Vec<ItemLine>,
  pub supplier_id:    Option<i64>,
  pub destination_id: Option<i64>,
  pub worker_id:      Option<i64>,
  pub note:           Option<String>,
  pub date:           Option<DateTime<Utc>>,
}

impl CreateBody {
  fn into_new_movement(
    self,
    author_id: Option<i64>,
  ) -> Result<NewMovement, LedgerError> {
    let items = self
      .items
      .into_iter()
      .map(ItemLine::into_request)
      .collect::<Result<_, _>>()?;
    Ok(NewMovement {
      kind: self.kind,
      items,
      counterparties: Counterparties {
        supplier_id:    self.supplier_id,
        destination_id: self.destination_id,
        worker_id:      self.worker_id,
      },
      author_id,
      note: self.note,
      date: self.date,
    })
  }
}

/// `POST /movements`
pub async fn create<S: InventoryStore>(
  State(store): State<Arc<S>>,
  actor: Option<Extension<Actor>>,
  JsonBody(body): JsonBody<CreateBody>,
) -> Result<impl IntoResponse, ApiError> {
  let author_id = actor.map(|Extension(a)| a.id);
  let receipt = store
    .create_movement(body.into_new_movement(author_id)?)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(receipt)))
}

// ─── Narrow edits ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct NoteBody {
  pub note: Option<String>,
}

/// `PUT /movements/:id/note`
pub async fn set_note<S: InventoryStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<i64>,
  JsonBody(body): JsonBody<NoteBody>,
) -> Result<Json<Movement>, ApiError> {
  let movement = store
    .set_movement_note(id, body.note)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(movement))
}

#[derive(Debug, Deserialize)]
pub struct ItemBody {
  /// New positive magnitude; the sign stays that of the stored item.
  pub quantity: Number,
}

/// `PATCH /movements/:id/items/:item_id`
pub async fn edit_item<S: InventoryStore>(
  State(store): State<Arc<S>>,
  Path((id, item_id)): Path<(i64, i64)>,
  JsonBody(body): JsonBody<ItemBody>,
) -> Result<Json<ItemEdit>, ApiError> {
  let Some(quantity) = whole(&body.quantity) else {
    // Name the product in the rejection when the item still exists.
    let product_id = store
      .get_movement(id)
      .await
      .map_err(ApiError::from_store)?
      .and_then(|m| m.items.into_iter().find(|i| i.id == item_id))
      .and_then(|i| i.product_id)
      .unwrap_or_default();
    return Err(
      LedgerError::InvalidDelta { product_id, delta: body.quantity.to_string() }
        .into(),
    );
  };
  let edit = store
    .edit_movement_item(id, item_id, quantity)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(edit))
}

// ─── Compensating deletes ────────────────────────────────────────────────────

/// `DELETE /movements/:id/items/:item_id`
pub async fn delete_item<S: InventoryStore>(
  State(store): State<Arc<S>>,
  Path((id, item_id)): Path<(i64, i64)>,
) -> Result<Json<ItemDeletion>, ApiError> {
  let deletion = store
    .delete_movement_item(id, item_id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(deletion))
}

/// `DELETE /movements/:id`
pub async fn delete<S: InventoryStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<i64>,
) -> Result<Json<MovementDeletion>, ApiError> {
  let deletion = store.delete_movement(id).await.map_err(ApiError::from_store)?;
  Ok(Json(deletion))
}
