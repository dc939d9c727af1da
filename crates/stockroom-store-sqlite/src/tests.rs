//! Integration tests for `SqliteStore` against an in-memory database.

use std::time::Duration;

use chrono::{TimeZone as _, Utc};
use proptest::prelude::*;
use stockroom_core::{
  Error as LedgerError,
  counterparty::CounterpartyKind,
  movement::{ItemRequest, MovementKind, MovementQuery, NewMovement},
  product::{NewProduct, ProductPatch, ProductQuery},
  report::ReportRange,
  store::InventoryStore,
  tool::{AssignmentQuery, NewTool},
};

use crate::{Error, SqliteStore, StoreOptions};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn product(s: &SqliteStore, name: &str, initial: i64) -> i64 {
  let mut input = NewProduct::new(name, "pcs");
  input.initial_quantity = initial;
  s.create_product(input).await.unwrap().id
}

async fn quantity(s: &SqliteStore, id: i64) -> i64 {
  s.get_product(id).await.unwrap().unwrap().quantity
}

fn out(product_id: i64, quantity: i64) -> NewMovement {
  NewMovement::single(MovementKind::Out, product_id, quantity)
}

fn inbound(product_id: i64, quantity: i64) -> NewMovement {
  NewMovement::single(MovementKind::In, product_id, quantity)
}

fn ledger(err: Error) -> LedgerError {
  match err {
    Error::Ledger(e) => e,
    other => panic!("expected a ledger error, got {other:?}"),
  }
}

/// Signed sum of the live line items recorded against `product_id`.
async fn item_sum(s: &SqliteStore, product_id: i64) -> i64 {
  let query = MovementQuery { product_id: Some(product_id), ..Default::default() };
  s.list_movements(query)
    .await
    .unwrap()
    .iter()
    .flat_map(|m| &m.items)
    .filter(|i| i.product_id == Some(product_id))
    .map(|i| i.delta)
    .sum()
}

// ─── Products ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn initial_quantity_is_recorded_as_a_movement() {
  let s = store().await;
  let p = product(&s, "Bolts", 10).await;

  assert_eq!(quantity(&s, p).await, 10);
  assert_eq!(item_sum(&s, p).await, 10);

  let movements = s.list_movements(MovementQuery::default()).await.unwrap();
  assert_eq!(movements.len(), 1);
  assert_eq!(movements[0].kind, MovementKind::In);
  assert_eq!(movements[0].note.as_deref(), Some("initial stock"));
}

#[tokio::test]
async fn product_without_initial_quantity_has_no_history() {
  let s = store().await;
  let p = product(&s, "Nuts", 0).await;
  assert_eq!(quantity(&s, p).await, 0);
  assert!(s.list_movements(MovementQuery::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_live_names_are_rejected() {
  let s = store().await;
  product(&s, "Steel Bolts", 0).await;

  let err = s
    .create_product(NewProduct::new("  steel   BOLTS ", "pcs"))
    .await
    .unwrap_err();
  assert!(matches!(ledger(err), LedgerError::DuplicateName { .. }));
}

#[tokio::test]
async fn soft_deleted_name_can_be_reused() {
  let s = store().await;
  let p = product(&s, "Gloves", 0).await;
  s.delete_product(p).await.unwrap();
  product(&s, "Gloves", 0).await;

  let live = s.list_products(ProductQuery::default()).await.unwrap();
  assert_eq!(live.len(), 1);
  let all = s
    .list_products(ProductQuery { include_deleted: true, ..Default::default() })
    .await
    .unwrap();
  assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn list_products_matches_name_and_sku() {
  let s = store().await;
  let mut drill_bits = NewProduct::new("Drill bits", "box");
  drill_bits.sku = Some("DB-10".into());
  s.create_product(drill_bits).await.unwrap();
  product(&s, "Tape", 0).await;

  let by_name = s
    .list_products(ProductQuery { text: Some("DRILL".into()), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(by_name.len(), 1);

  let by_sku = s
    .list_products(ProductQuery { text: Some("db-1".into()), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(by_sku.len(), 1);
  assert_eq!(by_sku[0].name, "Drill bits");
}

#[tokio::test]
async fn update_product_never_touches_quantity() {
  let s = store().await;
  let p = product(&s, "Rope", 7).await;

  let updated = s
    .update_product(p, ProductPatch {
      name: Some("Nylon rope".into()),
      unit: Some(" m ".into()),
      sku:  Some("".into()),
    })
    .await
    .unwrap();
  assert_eq!(updated.name, "Nylon rope");
  assert_eq!(updated.unit, "m");
  assert_eq!(updated.sku, None);
  assert_eq!(updated.quantity, 7);
}

#[tokio::test]
async fn deleted_product_cannot_be_moved() {
  let s = store().await;
  let p = product(&s, "Glue", 5).await;
  s.delete_product(p).await.unwrap();

  let err = s.create_movement(out(p, 1)).await.unwrap_err();
  assert_eq!(ledger(err), LedgerError::ProductNotFound(p));
}

// ─── Scenarios ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn draining_stock_then_repeating_is_rejected() {
  let s = store().await;
  let p = product(&s, "P", 10).await;

  let receipt = s.create_movement(out(p, 10)).await.unwrap();
  assert_eq!(receipt.levels[0].quantity, 0);
  assert_eq!(quantity(&s, p).await, 0);

  let err = s.create_movement(out(p, 10)).await.unwrap_err();
  assert!(matches!(
    ledger(err),
    LedgerError::InsufficientStock { available: 0, requested: 10, .. }
  ));
  assert_eq!(quantity(&s, p).await, 0);
}

#[tokio::test]
async fn ceiling_is_enforced() {
  let s = store().await;
  let p = product(&s, "P", 65_530).await;

  let err = s.create_movement(inbound(p, 10)).await.unwrap_err();
  assert!(matches!(
    ledger(err),
    LedgerError::StockCeilingExceeded { current: 65_530, requested: 10, .. }
  ));
  assert_eq!(quantity(&s, p).await, 65_530);
}

#[tokio::test]
async fn duplicate_lines_are_checked_on_their_combined_effect() {
  let s = store().await;
  let p = product(&s, "P", 8).await;

  let bulk = NewMovement::new(MovementKind::Out, vec![
    ItemRequest { product_id: p, quantity: 5 },
    ItemRequest { product_id: p, quantity: 5 },
  ]);
  let err = s.create_movement(bulk).await.unwrap_err();
  assert!(matches!(
    ledger(err),
    LedgerError::InsufficientStock { available: 8, requested: 10, .. }
  ));
  assert_eq!(quantity(&s, p).await, 8);
}

#[tokio::test]
async fn tool_assignment_and_partial_return() {
  let s = store().await;
  let w1 = s.create_counterparty(CounterpartyKind::Worker, "W1".into()).await.unwrap();
  let w2 = s.create_counterparty(CounterpartyKind::Worker, "W2".into()).await.unwrap();
  let t = s
    .create_tool(NewTool { name: "Drill".into(), total_quantity: 5 })
    .await
    .unwrap();

  s.assign_tool(t.id, w1.id, 3).await.unwrap();
  assert_eq!(s.get_tool(t.id).await.unwrap().unwrap().available_quantity, 2);

  let err = s.assign_tool(t.id, w2.id, 3).await.unwrap_err();
  assert!(matches!(
    ledger(err),
    LedgerError::InsufficientToolAvailability { available: 2, requested: 3, .. }
  ));
  assert_eq!(s.get_tool(t.id).await.unwrap().unwrap().available_quantity, 2);

  let ret = s.return_tool(t.id, w1.id, Some(1)).await.unwrap();
  assert_eq!(ret.returned, 1);
  assert_eq!(ret.tool.available_quantity, 3);
  assert_eq!(ret.assignment.quantity, 2);
  assert!(ret.assignment.is_outstanding());
}

#[tokio::test]
async fn item_edit_applies_only_the_difference() {
  let s = store().await;
  let p = product(&s, "P", 20).await;
  let receipt = s.create_movement(out(p, 5)).await.unwrap();
  assert_eq!(quantity(&s, p).await, 15);

  let movement = receipt.movement;
  let edit = s
    .edit_movement_item(movement.id, movement.items[0].id, 8)
    .await
    .unwrap();
  assert_eq!(edit.item.delta, -8);
  assert_eq!(edit.level.map(|l| l.quantity), Some(12));
  assert_eq!(quantity(&s, p).await, 12);
  assert_eq!(item_sum(&s, p).await, 12);
}

// ─── Atomicity ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn failing_item_aborts_the_whole_movement() {
  let s = store().await;
  let a = product(&s, "A", 10).await;
  let b = product(&s, "B", 1).await;
  let c = product(&s, "C", 10).await;
  let before = s.list_movements(MovementQuery::default()).await.unwrap().len();

  let bulk = NewMovement::new(MovementKind::Out, vec![
    ItemRequest { product_id: a, quantity: 2 },
    ItemRequest { product_id: b, quantity: 2 },
    ItemRequest { product_id: c, quantity: 2 },
  ]);
  let err = s.create_movement(bulk).await.unwrap_err();
  assert!(matches!(
    ledger(err),
    LedgerError::InsufficientStock { product_id, .. } if product_id == b
  ));

  assert_eq!(quantity(&s, a).await, 10);
  assert_eq!(quantity(&s, b).await, 1);
  assert_eq!(quantity(&s, c).await, 10);
  assert_eq!(
    s.list_movements(MovementQuery::default()).await.unwrap().len(),
    before
  );
}

#[tokio::test]
async fn unknown_product_fails_before_any_write() {
  let s = store().await;
  let a = product(&s, "A", 10).await;

  let bulk = NewMovement::new(MovementKind::Out, vec![
    ItemRequest { product_id: a, quantity: 1 },
    ItemRequest { product_id: 999, quantity: 1 },
  ]);
  let err = s.create_movement(bulk).await.unwrap_err();
  assert_eq!(ledger(err), LedgerError::ProductNotFound(999));
  assert_eq!(quantity(&s, a).await, 10);
}

#[tokio::test]
async fn unknown_counterparty_is_named_by_kind() {
  let s = store().await;
  let a = product(&s, "A", 10).await;

  let mut movement = inbound(a, 1);
  movement.counterparties.supplier_id = Some(7);
  let err = ledger(s.create_movement(movement).await.unwrap_err());
  assert_eq!(err, LedgerError::CounterpartyNotFound {
    kind: CounterpartyKind::Supplier,
    id:   7,
  });
  assert_eq!(err.to_string(), "supplier not found: 7");
}

#[tokio::test]
async fn repeated_overdraw_is_rejected_identically() {
  let s = store().await;
  let p = product(&s, "P", 3).await;

  let first = ledger(s.create_movement(out(p, 4)).await.unwrap_err());
  let second = ledger(s.create_movement(out(p, 4)).await.unwrap_err());
  assert_eq!(first, second);
  assert_eq!(quantity(&s, p).await, 3);
}

#[tokio::test]
async fn malformed_requests_are_rejected() {
  let s = store().await;
  let p = product(&s, "P", 3).await;

  let empty = NewMovement::new(MovementKind::In, vec![]);
  assert_eq!(
    ledger(s.create_movement(empty).await.unwrap_err()),
    LedgerError::EmptyMovement
  );
  assert_eq!(
    ledger(s.create_movement(out(p, 0)).await.unwrap_err()),
    LedgerError::InvalidDelta { product_id: p, delta: "0".into() }
  );
  assert_eq!(
    ledger(s.create_movement(out(-1, 1)).await.unwrap_err()),
    LedgerError::ProductNotFound(-1)
  );
}

// ─── Snapshots ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn names_are_snapshotted_at_write_time() {
  let s = store().await;
  let p = product(&s, "Cable", 10).await;
  let site = s
    .create_counterparty(CounterpartyKind::Location, "Site A".into())
    .await
    .unwrap();
  let worker = s
    .create_counterparty(CounterpartyKind::Worker, "Ana".into())
    .await
    .unwrap();

  let mut movement = out(p, 2);
  movement.counterparties.destination_id = Some(site.id);
  movement.counterparties.worker_id = Some(worker.id);
  movement.author_id = Some(42);
  let id = s.create_movement(movement).await.unwrap().movement.id;

  s.rename_counterparty(CounterpartyKind::Location, site.id, "Site B".into())
    .await
    .unwrap();
  s.delete_counterparty(CounterpartyKind::Worker, worker.id).await.unwrap();
  s.update_product(p, ProductPatch { name: Some("Copper cable".into()), ..Default::default() })
    .await
    .unwrap();

  let stored = s.get_movement(id).await.unwrap().unwrap();
  assert_eq!(stored.destination_name.as_deref(), Some("Site A"));
  assert_eq!(stored.worker_name.as_deref(), Some("Ana"));
  assert_eq!(stored.author_id, Some(42));
  assert_eq!(stored.items[0].product_name, "Cable");
}

#[tokio::test]
async fn deleted_counterparty_cannot_be_referenced() {
  let s = store().await;
  let p = product(&s, "P", 0).await;
  let supplier = s
    .create_counterparty(CounterpartyKind::Supplier, "Acme".into())
    .await
    .unwrap();
  s.delete_counterparty(CounterpartyKind::Supplier, supplier.id)
    .await
    .unwrap();

  let mut movement = inbound(p, 1);
  movement.counterparties.supplier_id = Some(supplier.id);
  assert!(matches!(
    ledger(s.create_movement(movement).await.unwrap_err()),
    LedgerError::CounterpartyNotFound { kind: CounterpartyKind::Supplier, .. }
  ));
}

// ─── Edits and deletions ─────────────────────────────────────────────────────

#[tokio::test]
async fn edit_that_would_overdraw_is_rejected() {
  let s = store().await;
  let p = product(&s, "P", 10).await;
  let m = s.create_movement(out(p, 5)).await.unwrap().movement;

  let err = s
    .edit_movement_item(m.id, m.items[0].id, 11)
    .await
    .unwrap_err();
  assert!(matches!(
    ledger(err),
    LedgerError::InsufficientStock { available: 5, requested: 6, .. }
  ));
  assert_eq!(quantity(&s, p).await, 5);
  let stored = s.get_movement(m.id).await.unwrap().unwrap();
  assert_eq!(stored.items[0].delta, -5);
}

#[tokio::test]
async fn edit_checks_item_ownership() {
  let s = store().await;
  let p = product(&s, "P", 10).await;
  let first = s.create_movement(out(p, 1)).await.unwrap().movement;
  let second = s.create_movement(out(p, 1)).await.unwrap().movement;

  assert_eq!(
    ledger(
      s.edit_movement_item(second.id, first.items[0].id, 2)
        .await
        .unwrap_err()
    ),
    LedgerError::WrongMovement { item_id: first.items[0].id, movement_id: second.id }
  );
  assert_eq!(
    ledger(s.edit_movement_item(first.id, 9999, 2).await.unwrap_err()),
    LedgerError::ItemNotFound(9999)
  );
  assert_eq!(
    ledger(s.delete_movement_item(9999, first.items[0].id).await.unwrap_err()),
    LedgerError::MovementNotFound(9999)
  );
}

#[tokio::test]
async fn deleting_an_inbound_item_cannot_go_negative() {
  let s = store().await;
  let p = product(&s, "P", 0).await;
  let m = s.create_movement(inbound(p, 5)).await.unwrap().movement;
  s.create_movement(out(p, 4)).await.unwrap();

  let err = s.delete_movement_item(m.id, m.items[0].id).await.unwrap_err();
  assert!(matches!(ledger(err), LedgerError::InsufficientStock { .. }));
  assert_eq!(quantity(&s, p).await, 1);
}

#[tokio::test]
async fn deleting_the_last_item_removes_only_that_header() {
  let s = store().await;
  let a = product(&s, "A", 10).await;
  let b = product(&s, "B", 10).await;

  let single = s.create_movement(out(a, 2)).await.unwrap().movement;
  let pair = s
    .create_movement(NewMovement::new(MovementKind::Out, vec![
      ItemRequest { product_id: a, quantity: 1 },
      ItemRequest { product_id: b, quantity: 1 },
    ]))
    .await
    .unwrap()
    .movement;

  let deletion = s
    .delete_movement_item(single.id, single.items[0].id)
    .await
    .unwrap();
  assert!(deletion.movement_removed);
  assert_eq!(deletion.level.map(|l| l.quantity), Some(9));
  assert!(s.get_movement(single.id).await.unwrap().is_none());

  let deletion = s.delete_movement_item(pair.id, pair.items[1].id).await.unwrap();
  assert!(!deletion.movement_removed);
  assert_eq!(s.get_movement(pair.id).await.unwrap().unwrap().items.len(), 1);
  assert_eq!(quantity(&s, b).await, 10);
}

#[tokio::test]
async fn deleting_a_movement_reverses_every_item() {
  let s = store().await;
  let a = product(&s, "A", 10).await;
  let b = product(&s, "B", 10).await;
  let m = s
    .create_movement(NewMovement::new(MovementKind::Out, vec![
      ItemRequest { product_id: a, quantity: 3 },
      ItemRequest { product_id: b, quantity: 4 },
      ItemRequest { product_id: a, quantity: 1 },
    ]))
    .await
    .unwrap()
    .movement;
  assert_eq!(quantity(&s, a).await, 6);

  let deletion = s.delete_movement(m.id).await.unwrap();
  assert_eq!(deletion.items_removed, 3);
  assert_eq!(deletion.levels.len(), 2);
  assert_eq!(quantity(&s, a).await, 10);
  assert_eq!(quantity(&s, b).await, 10);
  assert!(s.get_movement(m.id).await.unwrap().is_none());
}

#[tokio::test]
async fn note_can_be_set_and_cleared() {
  let s = store().await;
  let p = product(&s, "P", 1).await;
  let id = s.create_movement(out(p, 1)).await.unwrap().movement.id;

  let m = s.set_movement_note(id, Some(" for site B ".into())).await.unwrap();
  assert_eq!(m.note.as_deref(), Some("for site B"));
  let m = s.set_movement_note(id, None).await.unwrap();
  assert_eq!(m.note, None);
  assert_eq!(
    ledger(s.set_movement_note(999, None).await.unwrap_err()),
    LedgerError::MovementNotFound(999)
  );
}

// ─── Purge ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn purge_removes_items_and_emptied_movements_only() {
  let s = store().await;
  let a = product(&s, "A", 10).await; // one "initial stock" movement
  let b = product(&s, "B", 10).await;

  let shared = s
    .create_movement(NewMovement::new(MovementKind::Out, vec![
      ItemRequest { product_id: a, quantity: 1 },
      ItemRequest { product_id: b, quantity: 2 },
    ]))
    .await
    .unwrap()
    .movement;
  s.create_movement(out(a, 1)).await.unwrap();

  let summary = s.purge_product(a).await.unwrap();
  assert_eq!(summary.items_removed, 3);
  assert_eq!(summary.movements_removed, 2);

  assert!(s.get_product(a).await.unwrap().is_none());
  assert_eq!(quantity(&s, b).await, 8);
  let shared = s.get_movement(shared.id).await.unwrap().unwrap();
  assert_eq!(shared.items.len(), 1);
  assert_eq!(shared.items[0].product_id, Some(b));
}

// ─── Tools ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn assigning_twice_tops_up_one_assignment() {
  let s = store().await;
  let w = s.create_counterparty(CounterpartyKind::Worker, "W".into()).await.unwrap();
  let t = s
    .create_tool(NewTool { name: "Ladder".into(), total_quantity: 4 })
    .await
    .unwrap();

  let first = s.assign_tool(t.id, w.id, 1).await.unwrap();
  let second = s.assign_tool(t.id, w.id, 2).await.unwrap();
  assert_eq!(first.id, second.id);
  assert_eq!(second.quantity, 3);

  let ret = s.return_tool(t.id, w.id, None).await.unwrap();
  assert_eq!(ret.returned, 3);
  assert!(!ret.assignment.is_outstanding());
  assert_eq!(ret.tool.available_quantity, 4);

  assert!(matches!(
    ledger(s.return_tool(t.id, w.id, None).await.unwrap_err()),
    LedgerError::NoOutstandingAssignment { .. }
  ));
}

#[tokio::test]
async fn tool_rejections() {
  let s = store().await;
  let w = s.create_counterparty(CounterpartyKind::Worker, "W".into()).await.unwrap();
  let t = s
    .create_tool(NewTool { name: "Saw".into(), total_quantity: 2 })
    .await
    .unwrap();

  assert_eq!(
    ledger(s.assign_tool(999, w.id, 1).await.unwrap_err()),
    LedgerError::ToolNotFound(999)
  );
  assert_eq!(
    ledger(s.assign_tool(t.id, 999, 1).await.unwrap_err()),
    LedgerError::WorkerNotFound(999)
  );
  assert_eq!(
    ledger(s.assign_tool(t.id, w.id, 0).await.unwrap_err()),
    LedgerError::InvalidToolQuantity(0)
  );

  s.assign_tool(t.id, w.id, 1).await.unwrap();
  assert!(matches!(
    ledger(s.return_tool(t.id, w.id, Some(2)).await.unwrap_err()),
    LedgerError::ReturnExceedsAssigned { outstanding: 1, requested: 2, .. }
  ));
  assert!(matches!(
    ledger(s.create_tool(NewTool { name: "saw".into(), total_quantity: 1 }).await.unwrap_err()),
    LedgerError::DuplicateName { .. }
  ));
}

#[tokio::test]
async fn total_changes_preserve_the_issued_count() {
  let s = store().await;
  let w = s.create_counterparty(CounterpartyKind::Worker, "W".into()).await.unwrap();
  let t = s
    .create_tool(NewTool { name: "Helmet".into(), total_quantity: 5 })
    .await
    .unwrap();
  s.assign_tool(t.id, w.id, 3).await.unwrap();

  assert!(matches!(
    ledger(s.set_tool_total_quantity(t.id, 2).await.unwrap_err()),
    LedgerError::CannotReduceBelowIssued { issued: 3, requested: 2, .. }
  ));

  let grown = s.set_tool_total_quantity(t.id, 8).await.unwrap();
  assert_eq!((grown.total_quantity, grown.available_quantity), (8, 5));
  let shrunk = s.set_tool_total_quantity(t.id, 3).await.unwrap();
  assert_eq!((shrunk.total_quantity, shrunk.available_quantity), (3, 0));
}

#[tokio::test]
async fn returns_work_on_soft_deleted_tools() {
  let s = store().await;
  let w = s.create_counterparty(CounterpartyKind::Worker, "W".into()).await.unwrap();
  let t = s
    .create_tool(NewTool { name: "Torch".into(), total_quantity: 2 })
    .await
    .unwrap();
  s.assign_tool(t.id, w.id, 2).await.unwrap();
  s.delete_tool(t.id).await.unwrap();

  assert_eq!(
    ledger(s.assign_tool(t.id, w.id, 1).await.unwrap_err()),
    LedgerError::ToolNotFound(t.id)
  );
  let ret = s.return_tool(t.id, w.id, None).await.unwrap();
  assert_eq!(ret.tool.available_quantity, 2);
  assert!(ret.tool.deleted);
}

#[tokio::test]
async fn purge_tool_drops_its_assignments() {
  let s = store().await;
  let w = s.create_counterparty(CounterpartyKind::Worker, "W".into()).await.unwrap();
  let t = s
    .create_tool(NewTool { name: "Pump".into(), total_quantity: 3 })
    .await
    .unwrap();
  s.assign_tool(t.id, w.id, 1).await.unwrap();
  s.return_tool(t.id, w.id, None).await.unwrap();
  s.assign_tool(t.id, w.id, 2).await.unwrap();

  assert_eq!(s.purge_tool(t.id).await.unwrap(), 2);
  assert!(s.get_tool(t.id).await.unwrap().is_none());
  let remaining = s
    .list_assignments(AssignmentQuery { tool_id: Some(t.id), ..Default::default() })
    .await
    .unwrap();
  assert!(remaining.is_empty());
}

// ─── Reports ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn turnover_and_counterparty_stats() {
  let s = store().await;
  let p = product(&s, "Paint", 0).await;
  let acme = s
    .create_counterparty(CounterpartyKind::Supplier, "Acme".into())
    .await
    .unwrap();

  for qty in [10, 5] {
    let mut m = inbound(p, qty);
    m.counterparties.supplier_id = Some(acme.id);
    s.create_movement(m).await.unwrap();
  }
  s.create_movement(out(p, 4)).await.unwrap();
  s.rename_counterparty(CounterpartyKind::Supplier, acme.id, "Acme Ltd".into())
    .await
    .unwrap();

  let turnover = s.turnover(ReportRange::default()).await.unwrap();
  assert_eq!(turnover.len(), 1);
  assert_eq!((turnover[0].inbound, turnover[0].outbound), (15, 4));
  assert_eq!(turnover[0].net, 11);
  assert_eq!(turnover[0].quantity, 11);

  let stats = s
    .counterparty_stats(CounterpartyKind::Supplier, ReportRange::default())
    .await
    .unwrap();
  assert_eq!(stats.len(), 1);
  assert_eq!(stats[0].name, "Acme");
  assert_eq!((stats[0].movements, stats[0].units), (2, 15));
}

#[tokio::test]
async fn counterparty_stats_follow_the_movement_direction() {
  let s = store().await;
  let p = product(&s, "Primer", 0).await;
  let acme = s
    .create_counterparty(CounterpartyKind::Supplier, "Acme".into())
    .await
    .unwrap();
  let site = s
    .create_counterparty(CounterpartyKind::Location, "Site B".into())
    .await
    .unwrap();

  let mut received = inbound(p, 10);
  received.counterparties.supplier_id = Some(acme.id);
  received.counterparties.destination_id = Some(site.id);
  s.create_movement(received).await.unwrap();

  let mut shipped = out(p, 7);
  shipped.counterparties.supplier_id = Some(acme.id);
  shipped.counterparties.destination_id = Some(site.id);
  s.create_movement(shipped).await.unwrap();

  let suppliers = s
    .counterparty_stats(CounterpartyKind::Supplier, ReportRange::default())
    .await
    .unwrap();
  assert_eq!(suppliers.len(), 1);
  assert_eq!((suppliers[0].movements, suppliers[0].units), (1, 10));

  let locations = s
    .counterparty_stats(CounterpartyKind::Location, ReportRange::default())
    .await
    .unwrap();
  assert_eq!(locations.len(), 1);
  assert_eq!((locations[0].movements, locations[0].units), (1, 7));
}

#[tokio::test]
async fn forecast_uses_the_trailing_window() {
  let s = store().await;
  let p = product(&s, "Gloves", 0).await;
  let as_of = Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap();

  let mut stock = inbound(p, 100);
  stock.date = Some(as_of - chrono::TimeDelta::days(60));
  s.create_movement(stock).await.unwrap();

  let mut old = out(p, 40);
  old.date = Some(as_of - chrono::TimeDelta::days(45));
  s.create_movement(old).await.unwrap();

  let mut recent = out(p, 20);
  recent.date = Some(as_of - chrono::TimeDelta::days(3));
  s.create_movement(recent).await.unwrap();

  let rows = s.consumption_forecast(10, Some(as_of)).await.unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].consumed, 20);
  assert_eq!(rows[0].daily_average, 2.0);
  assert_eq!(rows[0].days_remaining, Some(20.0));

  assert_eq!(
    ledger(s.consumption_forecast(0, None).await.unwrap_err()),
    LedgerError::InvalidWindow(0)
  );
}

#[tokio::test]
async fn worker_stats_count_movements_and_held_tools() {
  let s = store().await;
  let p = product(&s, "Tape", 10).await;
  let w = s.create_counterparty(CounterpartyKind::Worker, "Bo".into()).await.unwrap();
  let t = s
    .create_tool(NewTool { name: "Level".into(), total_quantity: 2 })
    .await
    .unwrap();

  let mut m = out(p, 3);
  m.counterparties.worker_id = Some(w.id);
  s.create_movement(m).await.unwrap();
  s.assign_tool(t.id, w.id, 2).await.unwrap();

  let stats = s.worker_stats(ReportRange::default()).await.unwrap();
  assert_eq!(stats.len(), 1);
  assert_eq!(stats[0].movements, 1);
  assert_eq!(stats[0].units_out, 3);
  assert_eq!(stats[0].tools_held, 2);
}

// ─── Concurrency ─────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_never_lose_updates() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("stock.db");
  let options = StoreOptions { busy_timeout: Duration::from_secs(30) };

  let first = SqliteStore::open_with(&path, options).await.unwrap();
  let second = SqliteStore::open_with(&path, options).await.unwrap();
  let p = product(&first, "Shared", 100).await;

  let mut tasks = Vec::new();
  for i in 0..40 {
    let s = if i % 2 == 0 { first.clone() } else { second.clone() };
    tasks.push(tokio::spawn(async move { s.create_movement(out(p, 5)).await }));
  }

  let mut accepted = 0;
  for task in tasks {
    match task.await.unwrap() {
      Ok(_) => accepted += 1,
      Err(err) => assert!(matches!(
        ledger(err),
        LedgerError::InsufficientStock { .. }
      )),
    }
  }

  assert_eq!(accepted, 20);
  assert_eq!(quantity(&second, p).await, 0);
  assert_eq!(item_sum(&first, p).await, 0);
}

// ─── Properties ──────────────────────────────────────────────────────────────

fn runtime() -> tokio::runtime::Runtime {
  tokio::runtime::Builder::new_current_thread()
    .enable_all()
    .build()
    .unwrap()
}

proptest! {
  #![proptest_config(ProptestConfig::with_cases(24))]

  /// Whatever is accepted or rejected, quantities stay in bounds and equal
  /// the sum of their live items.
  #[test]
  fn stock_is_conserved(
    ops in prop::collection::vec((0..3usize, any::<bool>(), 1..30_000i64), 1..25)
  ) {
    runtime().block_on(async {
      let s = store().await;
      let mut ids = Vec::new();
      for name in ["A", "B", "C"] {
        ids.push(product(&s, name, 0).await);
      }

      for (idx, is_in, qty) in ops {
        let kind = if is_in { MovementKind::In } else { MovementKind::Out };
        let bulk = NewMovement::new(kind, vec![
          ItemRequest { product_id: ids[idx], quantity: qty },
          ItemRequest { product_id: ids[(idx + 1) % 3], quantity: 1 },
        ]);
        let _ = s.create_movement(bulk).await;
      }

      for id in ids {
        let q = quantity(&s, id).await;
        assert!((0..=65_535).contains(&q));
        assert_eq!(q, item_sum(&s, id).await);
      }
    });
  }

  /// `available + outstanding == total` after any sequence of operations.
  #[test]
  fn tools_are_conserved(
    ops in prop::collection::vec((0..3u8, 0..2usize, 0..4i64), 1..30)
  ) {
    runtime().block_on(async {
      let s = store().await;
      let t = s
        .create_tool(NewTool { name: "Drill".into(), total_quantity: 5 })
        .await
        .unwrap();
      let mut workers = Vec::new();
      for name in ["W1", "W2"] {
        workers.push(
          s.create_counterparty(CounterpartyKind::Worker, name.into())
            .await
            .unwrap()
            .id,
        );
      }

      for (op, w, qty) in ops {
        let _ = match op {
          0 => s.assign_tool(t.id, workers[w], qty).await.map(drop),
          1 => s.return_tool(t.id, workers[w], Some(qty)).await.map(drop),
          _ => s.set_tool_total_quantity(t.id, qty * 2).await.map(drop),
        };
      }

      let tool = s.get_tool(t.id).await.unwrap().unwrap();
      let outstanding: i64 = s
        .list_assignments(AssignmentQuery {
          tool_id: Some(t.id),
          outstanding_only: true,
          ..Default::default()
        })
        .await
        .unwrap()
        .iter()
        .map(|a| a.quantity)
        .sum();
      assert_eq!(tool.available_quantity + outstanding, tool.total_quantity);
      assert!(tool.available_quantity >= 0);
    });
  }
}
