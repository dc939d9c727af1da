//! Error types for `stockroom-core`.
//!
//! Every variant belongs to exactly one [`ErrorClass`]. Callers use the class
//! to decide how to present the failure; the variant carries enough detail
//! (names, requested vs. available) for an operator to correct the input.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::counterparty::CounterpartyKind;

/// The kind of catalog entity a name-uniqueness error refers to.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EntityKind {
  Product,
  Tool,
  Supplier,
  Location,
  Worker,
}

impl From<CounterpartyKind> for EntityKind {
  fn from(kind: CounterpartyKind) -> Self {
    match kind {
      CounterpartyKind::Supplier => Self::Supplier,
      CounterpartyKind::Location => Self::Location,
      CounterpartyKind::Worker => Self::Worker,
    }
  }
}

/// Broad category of a domain error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
  /// Malformed input, rejected before persistence is touched.
  Validation,
  /// A referenced entity does not exist (or is soft-deleted).
  Reference,
  /// The request is well-formed but would break a ledger invariant.
  Invariant,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Error {
  // ── Validation ──────────────────────────────────────────────────────────
  #[error("a movement needs at least one item")]
  EmptyMovement,

  /// `delta` is the requested quantity as the caller wrote it, which may not
  /// be an integer at all.
  #[error(
    "invalid quantity {delta} for product {product_id}: quantities must be \
     positive integers"
  )]
  InvalidDelta { product_id: i64, delta: String },

  #[error("invalid tool quantity: {0}")]
  InvalidToolQuantity(i64),

  #[error("invalid name: {0:?}")]
  InvalidName(String),

  #[error("report window must be at least one day, got {0}")]
  InvalidWindow(i64),

  // ── Reference ───────────────────────────────────────────────────────────
  #[error("product not found: {0}")]
  ProductNotFound(i64),

  #[error("{kind} not found: {id}")]
  CounterpartyNotFound { kind: CounterpartyKind, id: i64 },

  #[error("movement not found: {0}")]
  MovementNotFound(i64),

  #[error("movement item not found: {0}")]
  ItemNotFound(i64),

  #[error("item {item_id} does not belong to movement {movement_id}")]
  WrongMovement { item_id: i64, movement_id: i64 },

  #[error("tool not found: {0}")]
  ToolNotFound(i64),

  #[error("worker not found: {0}")]
  WorkerNotFound(i64),

  #[error("worker {worker_id} holds no outstanding assignment of tool {tool_id}")]
  NoOutstandingAssignment { tool_id: i64, worker_id: i64 },

  // ── Invariant ───────────────────────────────────────────────────────────
  #[error("a {kind} named {name:?} already exists")]
  DuplicateName { kind: EntityKind, name: String },

  #[error(
    "insufficient stock of {product:?} (id {product_id}): {available} \
     available, {requested} requested"
  )]
  InsufficientStock {
    product_id: i64,
    product:    String,
    available:  i64,
    requested:  i64,
  },

  #[error(
    "stock ceiling exceeded for {product:?} (id {product_id}): {current} on \
     hand, adding {requested} would exceed {max}"
  )]
  StockCeilingExceeded {
    product_id: i64,
    product:    String,
    current:    i64,
    requested:  i64,
    max:        i64,
  },

  #[error(
    "insufficient availability of tool {tool:?} (id {tool_id}): {available} \
     available, {requested} requested"
  )]
  InsufficientToolAvailability {
    tool_id:   i64,
    tool:      String,
    available: i64,
    requested: i64,
  },

  #[error(
    "worker {worker_id} holds {outstanding} of tool {tool_id}, cannot return \
     {requested}"
  )]
  ReturnExceedsAssigned {
    tool_id:     i64,
    worker_id:   i64,
    outstanding: i64,
    requested:   i64,
  },

  #[error(
    "cannot set total of tool {tool:?} (id {tool_id}) to {requested}: {issued} \
     currently issued"
  )]
  CannotReduceBelowIssued {
    tool_id:   i64,
    tool:      String,
    issued:    i64,
    requested: i64,
  },
}

impl Error {
  pub fn class(&self) -> ErrorClass {
    match self {
      Self::EmptyMovement
      | Self::InvalidDelta { .. }
      | Self::InvalidToolQuantity(_)
      | Self::InvalidName(_)
      | Self::InvalidWindow(_) => ErrorClass::Validation,

      Self::ProductNotFound(_)
      | Self::CounterpartyNotFound { .. }
      | Self::MovementNotFound(_)
      | Self::ItemNotFound(_)
      | Self::WrongMovement { .. }
      | Self::ToolNotFound(_)
      | Self::WorkerNotFound(_)
      | Self::NoOutstandingAssignment { .. } => ErrorClass::Reference,

      Self::DuplicateName { .. }
      | Self::InsufficientStock { .. }
      | Self::StockCeilingExceeded { .. }
      | Self::InsufficientToolAvailability { .. }
      | Self::ReturnExceedsAssigned { .. }
      | Self::CannotReduceBelowIssued { .. } => ErrorClass::Invariant,
    }
  }

  /// Stable snake_case identifier for the variant, e.g. `"insufficient_stock"`.
  pub fn code(&self) -> &'static str { self.into() }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
