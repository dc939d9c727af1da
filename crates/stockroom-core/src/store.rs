//! The `InventoryStore` trait.
//!
//! The trait is implemented by storage backends (e.g.
//! `stockroom-store-sqlite`). Higher layers (`stockroom-api`,
//! `stockroom-server`) depend on this abstraction, not on any concrete
//! backend.
//!
//! Every mutating method is one atomic unit of work: it either commits all of
//! its writes or none of them, and it re-reads the quantities it validates
//! inside that unit of work. No method retries on failure.

use std::future::Future;

use crate::{
  Error,
  counterparty::{Counterparty, CounterpartyKind},
  movement::{
    ItemDeletion, ItemEdit, Movement, MovementDeletion, MovementQuery,
    MovementReceipt, NewMovement,
  },
  product::{NewProduct, Product, ProductPatch, ProductQuery, PurgeSummary},
  report::{
    CounterpartyStats, ForecastRow, ReportRange, TurnoverRow, WorkerStats,
  },
  tool::{AssignmentQuery, NewTool, Tool, ToolAssignment, ToolReturn},
};

// ─── Error access ────────────────────────────────────────────────────────────

/// Exposes the domain error inside a backend error, if there is one.
///
/// Lets callers classify failures (validation, reference, invariant) without
/// knowing the backend's error type. Anything that is not a domain error is an
/// infrastructure failure.
pub trait LedgerFailure {
  fn ledger_error(&self) -> Option<&Error>;
}

impl LedgerFailure for Error {
  fn ledger_error(&self) -> Option<&Error> { Some(self) }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Stockroom inventory backend.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait InventoryStore: Send + Sync {
  type Error: std::error::Error + LedgerFailure + Send + Sync + 'static;

  // ── Products ──────────────────────────────────────────────────────────

  /// Create a product. A non-zero `initial_quantity` is recorded as an
  /// inbound movement in the same unit of work.
  fn create_product(
    &self,
    input: NewProduct,
  ) -> impl Future<Output = Result<Product, Self::Error>> + Send + '_;

  /// Retrieve a product (soft-deleted included). Returns `None` if not found.
  fn get_product(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Product>, Self::Error>> + Send + '_;

  fn list_products(
    &self,
    query: ProductQuery,
  ) -> impl Future<Output = Result<Vec<Product>, Self::Error>> + Send + '_;

  /// Edit descriptive fields. Never changes quantity.
  fn update_product(
    &self,
    id: i64,
    patch: ProductPatch,
  ) -> impl Future<Output = Result<Product, Self::Error>> + Send + '_;

  /// Soft delete: hides the product from new movements.
  fn delete_product(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Hard delete with cascading removal of the product's line items and of
  /// movements left without items.
  fn purge_product(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<PurgeSummary, Self::Error>> + Send + '_;

  // ── Counterparties ────────────────────────────────────────────────────

  fn create_counterparty(
    &self,
    kind: CounterpartyKind,
    name: String,
  ) -> impl Future<Output = Result<Counterparty, Self::Error>> + Send + '_;

  fn get_counterparty(
    &self,
    kind: CounterpartyKind,
    id: i64,
  ) -> impl Future<Output = Result<Option<Counterparty>, Self::Error>> + Send + '_;

  fn list_counterparties(
    &self,
    kind: CounterpartyKind,
    include_deleted: bool,
  ) -> impl Future<Output = Result<Vec<Counterparty>, Self::Error>> + Send + '_;

  /// Rename a counterparty. Names already snapshotted on movements are kept.
  fn rename_counterparty(
    &self,
    kind: CounterpartyKind,
    id: i64,
    name: String,
  ) -> impl Future<Output = Result<Counterparty, Self::Error>> + Send + '_;

  fn delete_counterparty(
    &self,
    kind: CounterpartyKind,
    id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Movements ─────────────────────────────────────────────────────────

  /// Validate, resolve and apply a movement atomically.
  fn create_movement(
    &self,
    input: NewMovement,
  ) -> impl Future<Output = Result<MovementReceipt, Self::Error>> + Send + '_;

  fn get_movement(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Movement>, Self::Error>> + Send + '_;

  /// Movements matching `query`, newest first.
  fn list_movements(
    &self,
    query: MovementQuery,
  ) -> impl Future<Output = Result<Vec<Movement>, Self::Error>> + Send + '_;

  fn set_movement_note(
    &self,
    id: i64,
    note: Option<String>,
  ) -> impl Future<Output = Result<Movement, Self::Error>> + Send + '_;

  /// Change a line item's magnitude, applying only the difference to the
  /// product's quantity.
  fn edit_movement_item(
    &self,
    movement_id: i64,
    item_id: i64,
    quantity: i64,
  ) -> impl Future<Output = Result<ItemEdit, Self::Error>> + Send + '_;

  /// Delete a line item, reversing its delta. Removes the movement header
  /// when it was the last item.
  fn delete_movement_item(
    &self,
    movement_id: i64,
    item_id: i64,
  ) -> impl Future<Output = Result<ItemDeletion, Self::Error>> + Send + '_;

  /// Delete a whole movement, reversing every item.
  fn delete_movement(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<MovementDeletion, Self::Error>> + Send + '_;

  // ── Tools ─────────────────────────────────────────────────────────────

  fn create_tool(
    &self,
    input: NewTool,
  ) -> impl Future<Output = Result<Tool, Self::Error>> + Send + '_;

  fn get_tool(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Tool>, Self::Error>> + Send + '_;

  fn list_tools(
    &self,
    include_deleted: bool,
  ) -> impl Future<Output = Result<Vec<Tool>, Self::Error>> + Send + '_;

  fn delete_tool(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Hard delete a tool together with all of its assignments.
  fn purge_tool(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Check `quantity` units of a tool out to a worker.
  fn assign_tool(
    &self,
    tool_id: i64,
    worker_id: i64,
    quantity: i64,
  ) -> impl Future<Output = Result<ToolAssignment, Self::Error>> + Send + '_;

  /// Return `quantity` units (default: all outstanding) from a worker.
  fn return_tool(
    &self,
    tool_id: i64,
    worker_id: i64,
    quantity: Option<i64>,
  ) -> impl Future<Output = Result<ToolReturn, Self::Error>> + Send + '_;

  /// Change a tool's total, preserving the issued count.
  fn set_tool_total_quantity(
    &self,
    tool_id: i64,
    total: i64,
  ) -> impl Future<Output = Result<Tool, Self::Error>> + Send + '_;

  fn list_assignments(
    &self,
    query: AssignmentQuery,
  ) -> impl Future<Output = Result<Vec<ToolAssignment>, Self::Error>> + Send + '_;

  // ── Reports ───────────────────────────────────────────────────────────

  fn turnover(
    &self,
    range: ReportRange,
  ) -> impl Future<Output = Result<Vec<TurnoverRow>, Self::Error>> + Send + '_;

  /// Consumption over the `window_days` days before `as_of` (default now),
  /// projected onto current stock.
  fn consumption_forecast(
    &self,
    window_days: i64,
    as_of: Option<chrono::DateTime<chrono::Utc>>,
  ) -> impl Future<Output = Result<Vec<ForecastRow>, Self::Error>> + Send + '_;

  fn worker_stats(
    &self,
    range: ReportRange,
  ) -> impl Future<Output = Result<Vec<WorkerStats>, Self::Error>> + Send + '_;

  /// Movement count and units moved per counterparty of `kind`, grouped by
  /// the id referenced on the movements.
  fn counterparty_stats(
    &self,
    kind: CounterpartyKind,
    range: ReportRange,
  ) -> impl Future<Output = Result<Vec<CounterpartyStats>, Self::Error>> + Send + '_;
}
