//! Movements: the append-style record of every stock change.
//!
//! A movement is a header (direction, date, counterparties) plus one or more
//! line items. Each line item stores a *signed* delta; once written, the sign
//! is never re-derived from the parent's direction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Direction ───────────────────────────────────────────────────────────────

/// Whether stock arrives (`in`) or leaves (`out`).
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MovementKind {
  In,
  Out,
}

impl MovementKind {
  /// Turn a caller-supplied positive magnitude into a signed delta.
  pub fn signed(self, magnitude: i64) -> i64 {
    match self {
      Self::In => magnitude,
      Self::Out => magnitude.saturating_neg(),
    }
  }
}

// ─── Stored records ──────────────────────────────────────────────────────────

/// One product-specific change within a movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementItem {
  pub id:           i64,
  pub movement_id:  i64,
  /// `None` once the product has been purged.
  pub product_id:   Option<i64>,
  /// Name and SKU as they were when the item was written.
  pub product_name: String,
  pub product_sku:  Option<String>,
  /// Signed: positive for inbound, negative for outbound.
  pub delta:        i64,
}

impl MovementItem {
  pub fn quantity(&self) -> i64 { self.delta.abs() }
}

/// A persisted movement with its line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
  pub id:               i64,
  pub kind:             MovementKind,
  /// When the stock physically moved; defaults to the time of recording.
  pub date:             DateTime<Utc>,
  pub supplier_id:      Option<i64>,
  pub supplier_name:    Option<String>,
  pub destination_id:   Option<i64>,
  pub destination_name: Option<String>,
  pub worker_id:        Option<i64>,
  pub worker_name:      Option<String>,
  /// The authenticated actor who recorded the movement, if known.
  pub author_id:        Option<i64>,
  pub note:             Option<String>,
  pub created_at:       DateTime<Utc>,
  pub items:            Vec<MovementItem>,
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// One requested line: a product and a positive magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRequest {
  pub product_id: i64,
  pub quantity:   i64,
}

/// Optional counterparty references for a new movement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counterparties {
  pub supplier_id:    Option<i64>,
  pub destination_id: Option<i64>,
  pub worker_id:      Option<i64>,
}

/// Input to [`crate::store::InventoryStore::create_movement`].
#[derive(Debug, Clone)]
pub struct NewMovement {
  pub kind:           MovementKind,
  pub items:          Vec<ItemRequest>,
  pub counterparties: Counterparties,
  pub author_id:      Option<i64>,
  pub note:           Option<String>,
  /// Defaults to the time the plan is built.
  pub date:           Option<DateTime<Utc>>,
}

impl NewMovement {
  /// A movement with no counterparties, note or explicit date.
  pub fn new(kind: MovementKind, items: Vec<ItemRequest>) -> Self {
    Self {
      kind,
      items,
      counterparties: Counterparties::default(),
      author_id: None,
      note: None,
      date: None,
    }
  }

  /// Convenience for a single-item movement.
  pub fn single(kind: MovementKind, product_id: i64, quantity: i64) -> Self {
    Self::new(kind, vec![ItemRequest { product_id, quantity }])
  }
}

/// Parameters for [`crate::store::InventoryStore::list_movements`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovementQuery {
  pub kind:           Option<MovementKind>,
  pub product_id:     Option<i64>,
  pub supplier_id:    Option<i64>,
  pub destination_id: Option<i64>,
  pub worker_id:      Option<i64>,
  /// Inclusive lower bound on `date`.
  pub from:           Option<DateTime<Utc>>,
  /// Exclusive upper bound on `date`.
  pub to:             Option<DateTime<Utc>>,
  pub limit:          Option<usize>,
  pub offset:         Option<usize>,
}

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// A product's quantity after a committed change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
  pub product_id: i64,
  pub quantity:   i64,
}

/// Result of a committed movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementReceipt {
  pub movement: Movement,
  /// One entry per distinct product touched, in ascending product id order.
  pub levels:   Vec<StockLevel>,
}

/// Result of editing a line item's quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemEdit {
  pub item:  MovementItem,
  /// `None` when the item's product has been purged.
  pub level: Option<StockLevel>,
}

/// Result of deleting a single line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDeletion {
  pub item_id:          i64,
  pub movement_id:      i64,
  /// `true` when the item was the movement's last and the header went too.
  pub movement_removed: bool,
  pub level:            Option<StockLevel>,
}

/// Result of deleting a whole movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementDeletion {
  pub movement_id:   i64,
  pub items_removed: usize,
  pub levels:        Vec<StockLevel>,
}
