//! The stock mutation coordinator.
//!
//! Every function here runs against the connection of an open `IMMEDIATE`
//! transaction owned by the caller ([`crate::SqliteStore`]). Returning `Err`
//! drops the transaction and rolls back every write made so far, so the
//! functions are free to write first and fail later.
//!
//! The order is always the same: re-read the affected quantities, check every
//! net adjustment with [`quantity::check`], write the movement rows, then
//! apply `quantity = quantity + delta` and compare the returned value with the
//! expected one.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension as _, params};
use stockroom_core::{
  EntityKind, Error as LedgerError,
  counterparty::NameSnapshot,
  ledger::{self, MovementPlan, ResolvedMovement},
  movement::{
    ItemDeletion, ItemEdit, Movement, MovementItem, MovementKind,
    MovementQuery, MovementReceipt, MovementDeletion, NewMovement, StockLevel,
  },
  product::{CleanName, NewProduct, Product, PurgeSummary},
  quantity,
};

use crate::{
  Error, Result,
  catalog::{TxCatalog, clean_unit, ensure_unique_name, load_product},
  encode::{ITEM_COLUMNS, MOVEMENT_COLUMNS, RawMovement, encode_dt, item_from_row},
};

// ─── Quantity bookkeeping ────────────────────────────────────────────────────

/// An adjustment that passed the invariant check and awaits its increment.
struct PendingIncrement {
  product_id: i64,
  delta:      i64,
  expected:   i64,
}

/// Re-read each product's quantity and check its net adjustment.
///
/// Fails on the first violation in ascending product-id order. Soft-deleted
/// products are included: existing items may still be corrected.
fn validate_adjustments(
  conn: &Connection,
  adjustments: &BTreeMap<i64, i64>,
) -> Result<Vec<PendingIncrement>> {
  let mut stmt = conn.prepare_cached(
    "SELECT name, quantity FROM products WHERE id = ?1",
  )?;

  let mut pending = Vec::with_capacity(adjustments.len());
  for (&product_id, &delta) in adjustments {
    let (name, current): (String, i64) = stmt
      .query_row([product_id], |row| Ok((row.get(0)?, row.get(1)?)))
      .optional()?
      .ok_or(LedgerError::ProductNotFound(product_id))?;

    let expected = quantity::check(current, delta).map_err(|violation| {
      tracing::debug!(product_id, current, delta, "quantity check rejected");
      violation.for_product(product_id, &name)
    })?;

    pending.push(PendingIncrement { product_id, delta, expected });
  }
  Ok(pending)
}

/// Apply checked adjustments as atomic increments and verify the outcome.
fn apply_increments(
  conn: &Connection,
  pending: Vec<PendingIncrement>,
  now: DateTime<Utc>,
) -> Result<Vec<StockLevel>> {
  let now = encode_dt(now);
  let mut stmt = conn.prepare_cached(
    "UPDATE products
        SET quantity = quantity + ?1, updated_at = ?2
      WHERE id = ?3
  RETURNING quantity",
  )?;

  pending
    .into_iter()
    .map(|p| {
      let after: i64 =
        stmt.query_row(params![p.delta, now, p.product_id], |row| row.get(0))?;
      if after != p.expected {
        return Err(Error::PostCondition(format!(
          "product {} expected quantity {}, found {after}",
          p.product_id, p.expected
        )));
      }
      Ok(StockLevel { product_id: p.product_id, quantity: after })
    })
    .collect()
}

// ─── Reads ───────────────────────────────────────────────────────────────────

fn load_items(conn: &Connection, movement_id: i64) -> Result<Vec<MovementItem>> {
  let mut stmt = conn.prepare_cached(&format!(
    "SELECT {ITEM_COLUMNS} FROM movement_items WHERE movement_id = ?1 ORDER BY id"
  ))?;
  let items = stmt
    .query_map([movement_id], item_from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(items)
}

pub fn load_movement(conn: &Connection, id: i64) -> Result<Option<Movement>> {
  let raw = conn
    .query_row(
      &format!("SELECT {MOVEMENT_COLUMNS} FROM movements WHERE id = ?1"),
      [id],
      RawMovement::from_row,
    )
    .optional()?;

  match raw {
    Some(raw) => {
      let items = load_items(conn, raw.id)?;
      Ok(Some(raw.into_movement(items)?))
    }
    None => Ok(None),
  }
}

pub fn list_movements(
  conn: &Connection,
  query: &MovementQuery,
) -> Result<Vec<Movement>> {
  let kind = query.kind.map(|k| k.as_ref().to_owned());
  let from = query.from.map(encode_dt);
  let to = query.to.map(encode_dt);
  let limit = query.limit.map_or(-1, |l| l as i64);
  let offset = query.offset.unwrap_or(0) as i64;

  let mut stmt = conn.prepare(&format!(
    "SELECT {MOVEMENT_COLUMNS} FROM movements m
      WHERE (?1 IS NULL OR m.kind = ?1)
        AND (?2 IS NULL OR EXISTS (
              SELECT 1 FROM movement_items i
               WHERE i.movement_id = m.id AND i.product_id = ?2))
        AND (?3 IS NULL OR m.supplier_id = ?3)
        AND (?4 IS NULL OR m.destination_id = ?4)
        AND (?5 IS NULL OR m.worker_id = ?5)
        AND (?6 IS NULL OR m.date >= ?6)
        AND (?7 IS NULL OR m.date < ?7)
      ORDER BY m.date DESC, m.id DESC
      LIMIT ?8 OFFSET ?9"
  ))?;

  let raws = stmt
    .query_map(
      params![
        kind,
        query.product_id,
        query.supplier_id,
        query.destination_id,
        query.worker_id,
        from,
        to,
        limit,
        offset,
      ],
      RawMovement::from_row,
    )?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  raws
    .into_iter()
    .map(|raw| {
      let items = load_items(conn, raw.id)?;
      raw.into_movement(items)
    })
    .collect()
}

/// Find `item_id` and make sure it belongs to `movement_id`.
fn locate_item(
  conn: &Connection,
  movement_id: i64,
  item_id: i64,
) -> Result<MovementItem> {
  let movement_exists = conn
    .query_row("SELECT 1 FROM movements WHERE id = ?1", [movement_id], |_| {
      Ok(())
    })
    .optional()?
    .is_some();
  if !movement_exists {
    return Err(LedgerError::MovementNotFound(movement_id).into());
  }

  let item = conn
    .query_row(
      &format!("SELECT {ITEM_COLUMNS} FROM movement_items WHERE id = ?1"),
      [item_id],
      item_from_row,
    )
    .optional()?
    .ok_or(LedgerError::ItemNotFound(item_id))?;

  if item.movement_id != movement_id {
    return Err(LedgerError::WrongMovement { item_id, movement_id }.into());
  }
  Ok(item)
}

// ─── Movements ───────────────────────────────────────────────────────────────

fn insert_movement(
  conn: &Connection,
  movement: &ResolvedMovement,
  now: DateTime<Utc>,
) -> Result<i64> {
  let (supplier_id, supplier_name) = split_snapshot(movement.supplier.as_ref());
  let (destination_id, destination_name) = split_snapshot(movement.destination.as_ref());
  let (worker_id, worker_name) = split_snapshot(movement.worker.as_ref());

  conn.execute(
    "INSERT INTO movements (
       kind, date, supplier_id, supplier_name, destination_id,
       destination_name, worker_id, worker_name, author_id, note, created_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
    params![
      movement.kind.as_ref(),
      encode_dt(movement.date),
      supplier_id,
      supplier_name,
      destination_id,
      destination_name,
      worker_id,
      worker_name,
      movement.author_id,
      movement.note,
      encode_dt(now),
    ],
  )?;
  let movement_id = conn.last_insert_rowid();

  let mut stmt = conn.prepare_cached(
    "INSERT INTO movement_items
       (movement_id, product_id, product_name, product_sku, delta)
     VALUES (?1, ?2, ?3, ?4, ?5)",
  )?;
  for line in &movement.lines {
    stmt.execute(params![
      movement_id,
      line.product_id,
      line.product_name,
      line.product_sku,
      line.delta,
    ])?;
  }

  Ok(movement_id)
}

fn split_snapshot(snapshot: Option<&NameSnapshot>) -> (Option<i64>, Option<&str>) {
  match snapshot {
    Some(s) => (Some(s.id), Some(s.name.as_str())),
    None => (None, None),
  }
}

/// Resolve and apply a movement plan.
pub fn create_movement(
  conn: &Connection,
  plan: MovementPlan,
) -> Result<MovementReceipt> {
  let resolved = plan.resolve(&TxCatalog(conn))?;
  let pending = validate_adjustments(conn, &resolved.net)?;

  let now = Utc::now();
  let movement_id = insert_movement(conn, &resolved, now)?;
  let levels = apply_increments(conn, pending, now)?;

  let movement = load_movement(conn, movement_id)?.ok_or_else(|| {
    Error::PostCondition(format!("movement {movement_id} vanished after insert"))
  })?;

  tracing::info!(
    movement_id,
    kind = %movement.kind,
    items = movement.items.len(),
    products = levels.len(),
    "movement recorded"
  );
  Ok(MovementReceipt { movement, levels })
}

pub fn set_note(
  conn: &Connection,
  id: i64,
  note: Option<String>,
) -> Result<Movement> {
  let note = stockroom_core::product::non_blank(note);
  let changed = conn.execute(
    "UPDATE movements SET note = ?1 WHERE id = ?2",
    params![note, id],
  )?;
  if changed == 0 {
    return Err(LedgerError::MovementNotFound(id).into());
  }
  load_movement(conn, id)?.ok_or_else(|| LedgerError::MovementNotFound(id).into())
}

/// Change a line item's magnitude, applying only the difference.
pub fn edit_item(
  conn: &Connection,
  movement_id: i64,
  item_id: i64,
  quantity: i64,
) -> Result<ItemEdit> {
  let item = locate_item(conn, movement_id, item_id)?;
  let correction = ledger::correct_item(item.product_id, item.delta, quantity)?;

  let adjustments = match item.product_id {
    Some(product_id) => BTreeMap::from([(product_id, correction.adjustment)]),
    None => BTreeMap::new(),
  };
  let pending = validate_adjustments(conn, &adjustments)?;

  conn.execute(
    "UPDATE movement_items SET delta = ?1 WHERE id = ?2",
    params![correction.new_delta, item_id],
  )?;
  let level = apply_increments(conn, pending, Utc::now())?.into_iter().next();

  tracing::info!(
    movement_id,
    item_id,
    old_delta = item.delta,
    new_delta = correction.new_delta,
    "movement item edited"
  );
  Ok(ItemEdit {
    item: MovementItem { delta: correction.new_delta, ..item },
    level,
  })
}

/// Delete a line item, reversing its delta; drops the header if it was the
/// movement's last item.
pub fn delete_item(
  conn: &Connection,
  movement_id: i64,
  item_id: i64,
) -> Result<ItemDeletion> {
  let item = locate_item(conn, movement_id, item_id)?;
  let pending = validate_adjustments(
    conn,
    &ledger::reversal([(item.product_id, item.delta)]),
  )?;

  conn.execute("DELETE FROM movement_items WHERE id = ?1", [item_id])?;
  let remaining: i64 = conn.query_row(
    "SELECT COUNT(*) FROM movement_items WHERE movement_id = ?1",
    [movement_id],
    |row| row.get(0),
  )?;
  let movement_removed = remaining == 0;
  if movement_removed {
    conn.execute("DELETE FROM movements WHERE id = ?1", [movement_id])?;
  }

  let level = apply_increments(conn, pending, Utc::now())?.into_iter().next();

  tracing::info!(movement_id, item_id, movement_removed, "movement item deleted");
  Ok(ItemDeletion { item_id, movement_id, movement_removed, level })
}

/// Delete a whole movement, reversing every item it carries.
pub fn delete_movement(conn: &Connection, id: i64) -> Result<MovementDeletion> {
  let movement =
    load_movement(conn, id)?.ok_or(LedgerError::MovementNotFound(id))?;
  let pending = validate_adjustments(
    conn,
    &ledger::reversal(movement.items.iter().map(|i| (i.product_id, i.delta))),
  )?;

  let items_removed =
    conn.execute("DELETE FROM movement_items WHERE movement_id = ?1", [id])?;
  conn.execute("DELETE FROM movements WHERE id = ?1", [id])?;
  let levels = apply_increments(conn, pending, Utc::now())?;

  tracing::info!(movement_id = id, items_removed, "movement deleted");
  Ok(MovementDeletion { movement_id: id, items_removed, levels })
}

// ─── Products ────────────────────────────────────────────────────────────────

/// Insert a product and, when requested, its opening stock movement.
pub fn create_product(conn: &Connection, input: NewProduct) -> Result<Product> {
  let name = CleanName::parse(&input.name)?;
  let unit = clean_unit(input.unit)?;
  ensure_unique_name(conn, "products", EntityKind::Product, &name, None)?;

  let now = Utc::now();
  conn.execute(
    "INSERT INTO products
       (name, name_normalized, unit, sku, quantity, deleted, created_at, updated_at)
     VALUES (?1, ?2, ?3, ?4, 0, 0, ?5, ?5)",
    params![
      name.display,
      name.normalized,
      unit,
      stockroom_core::product::non_blank(input.sku),
      encode_dt(now),
    ],
  )?;
  let id = conn.last_insert_rowid();

  if input.initial_quantity != 0 {
    let mut opening =
      NewMovement::single(MovementKind::In, id, input.initial_quantity);
    opening.note = Some("initial stock".to_owned());
    create_movement(conn, MovementPlan::build(opening, now)?)?;
  }

  load_product(conn, id)?.ok_or_else(|| {
    Error::PostCondition(format!("product {id} vanished after insert"))
  })
}

/// Hard delete a product, its line items, and movements left empty.
pub fn purge_product(conn: &Connection, id: i64) -> Result<PurgeSummary> {
  load_product(conn, id)?.ok_or(LedgerError::ProductNotFound(id))?;

  let affected: Vec<i64> = conn
    .prepare(
      "SELECT DISTINCT movement_id FROM movement_items WHERE product_id = ?1",
    )?
    .query_map([id], |row| row.get(0))?
    .collect::<rusqlite::Result<_>>()?;

  let items_removed =
    conn.execute("DELETE FROM movement_items WHERE product_id = ?1", [id])?;

  let mut movements_removed = 0;
  for movement_id in affected {
    movements_removed += conn.execute(
      "DELETE FROM movements
        WHERE id = ?1
          AND NOT EXISTS (SELECT 1 FROM movement_items WHERE movement_id = ?1)",
      [movement_id],
    )?;
  }

  conn.execute("DELETE FROM products WHERE id = ?1", [id])?;

  tracing::info!(product_id = id, items_removed, movements_removed, "product purged");
  Ok(PurgeSummary { items_removed, movements_removed })
}
