//! Row lookups shared by the store's units of work, and the [`Catalog`]
//! implementation the movement resolver runs against.

use rusqlite::{Connection, OptionalExtension as _};
use stockroom_core::{
  EntityKind,
  counterparty::{Counterparty, CounterpartyKind},
  ledger::{Catalog, ProductSnapshot},
  product::{CleanName, Product},
  tool::Tool,
};

use crate::{
  Error, Result,
  encode::{
    COUNTERPARTY_COLUMNS, PRODUCT_COLUMNS, RawCounterparty, RawProduct,
    RawTool, TOOL_COLUMNS,
  },
  schema::counterparty_table,
};

// ─── Loaders ─────────────────────────────────────────────────────────────────

/// Load a product regardless of its deleted flag.
pub fn load_product(conn: &Connection, id: i64) -> Result<Option<Product>> {
  conn
    .query_row(
      &format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"),
      [id],
      RawProduct::from_row,
    )
    .optional()?
    .map(RawProduct::into_product)
    .transpose()
}

pub fn load_counterparty(
  conn: &Connection,
  kind: CounterpartyKind,
  id: i64,
) -> Result<Option<Counterparty>> {
  conn
    .query_row(
      &format!(
        "SELECT {COUNTERPARTY_COLUMNS} FROM {} WHERE id = ?1",
        counterparty_table(kind)
      ),
      [id],
      RawCounterparty::from_row,
    )
    .optional()?
    .map(|raw| raw.into_counterparty(kind))
    .transpose()
}

pub fn load_tool(conn: &Connection, id: i64) -> Result<Option<Tool>> {
  conn
    .query_row(
      &format!("SELECT {TOOL_COLUMNS} FROM tools WHERE id = ?1"),
      [id],
      RawTool::from_row,
    )
    .optional()?
    .map(RawTool::into_tool)
    .transpose()
}

/// Reject `name` if another live row of `table` already uses it.
///
/// `except` skips the row being renamed.
pub fn ensure_unique_name(
  conn: &Connection,
  table: &str,
  kind: EntityKind,
  name: &CleanName,
  except: Option<i64>,
) -> Result<()> {
  let taken = conn
    .query_row(
      &format!(
        "SELECT 1 FROM {table}
          WHERE name_normalized = ?1 AND deleted = 0
            AND (?2 IS NULL OR id != ?2)"
      ),
      rusqlite::params![name.normalized, except],
      |_| Ok(()),
    )
    .optional()?
    .is_some();

  if taken {
    return Err(
      stockroom_core::Error::DuplicateName {
        kind,
        name: name.display.clone(),
      }
      .into(),
    );
  }
  Ok(())
}

/// Trim a unit of measure; blank is rejected.
pub fn clean_unit(raw: String) -> Result<String> {
  let unit = raw.trim();
  if unit.is_empty() {
    return Err(stockroom_core::Error::InvalidName(raw).into());
  }
  Ok(unit.to_owned())
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

/// Resolves references through the connection of an in-flight transaction, so
/// the snapshot and the writes that follow see the same rows.
pub struct TxCatalog<'a>(pub &'a Connection);

impl Catalog for TxCatalog<'_> {
  type Error = Error;

  fn product(&self, id: i64) -> Result<Option<ProductSnapshot>, Error> {
    Ok(
      self
        .0
        .query_row(
          "SELECT id, name, sku FROM products WHERE id = ?1 AND deleted = 0",
          [id],
          |row| {
            Ok(ProductSnapshot {
              id:   row.get(0)?,
              name: row.get(1)?,
              sku:  row.get(2)?,
            })
          },
        )
        .optional()?,
    )
  }

  fn counterparty(
    &self,
    kind: CounterpartyKind,
    id: i64,
  ) -> Result<Option<String>, Error> {
    let sql = format!(
      "SELECT name FROM {} WHERE id = ?1 AND deleted = 0",
      counterparty_table(kind)
    );
    Ok(self.0.query_row(&sql, [id], |row| row.get(0)).optional()?)
  }
}
