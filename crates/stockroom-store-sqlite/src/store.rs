//! [`SqliteStore`]: the SQLite implementation of [`InventoryStore`].

use std::{path::Path, time::Duration};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, TransactionBehavior, params};

use stockroom_core::{
  EntityKind, Error as LedgerError,
  counterparty::{Counterparty, CounterpartyKind},
  ledger::MovementPlan,
  movement::{
    ItemDeletion, ItemEdit, Movement, MovementDeletion, MovementQuery,
    MovementReceipt, NewMovement,
  },
  product::{
    CleanName, NewProduct, Product, ProductPatch, ProductQuery, PurgeSummary,
    non_blank,
  },
  report::{
    CounterpartyStats, ForecastRow, ReportRange, TurnoverRow, WorkerStats,
  },
  store::InventoryStore,
  tool::{AssignmentQuery, NewTool, Tool, ToolAssignment, ToolReturn},
};

use crate::{
  Error, Result,
  catalog::{
    clean_unit, ensure_unique_name, load_counterparty, load_product, load_tool,
  },
  encode::{
    COUNTERPARTY_COLUMNS, PRODUCT_COLUMNS, RawCounterparty, RawProduct,
    encode_dt,
  },
  ledger, reports,
  schema::{SCHEMA, counterparty_table},
  tools,
};

// ─── Options ─────────────────────────────────────────────────────────────────

/// Connection settings applied when a store is opened.
#[derive(Debug, Clone, Copy)]
pub struct StoreOptions {
  /// How long a writer waits for SQLite's write lock before failing.
  pub busy_timeout: Duration,
}

impl Default for StoreOptions {
  fn default() -> Self {
    Self { busy_timeout: Duration::from_secs(5) }
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Stockroom inventory store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. Several
/// stores (or processes) may open the same file; writers serialise on
/// SQLite's write lock.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    Self::open_with(path, StoreOptions::default()).await
  }

  pub async fn open_with(
    path: impl AsRef<Path>,
    options: StoreOptions,
  ) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema(options).await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema(StoreOptions::default()).await?;
    Ok(store)
  }

  async fn init_schema(&self, options: StoreOptions) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.busy_timeout(options.busy_timeout)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` against the connection outside any explicit transaction.
  async fn read<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(conn))).await?
  }

  /// Run `f` as one unit of work inside `BEGIN IMMEDIATE ... COMMIT`.
  ///
  /// Any error rolls the transaction back. Domain rejections are logged at
  /// debug level.
  async fn write<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
  {
    let result = self
      .conn
      .call(move |conn| Ok(in_transaction(conn, f)))
      .await?;

    if let Err(Error::Ledger(rejection)) = &result {
      tracing::debug!(%rejection, code = rejection.code(), "unit of work rejected");
    }
    result
  }
}

fn in_transaction<T>(
  conn: &mut Connection,
  f: impl FnOnce(&Connection) -> Result<T>,
) -> Result<T> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  let value = f(&tx)?;
  tx.commit()?;
  Ok(value)
}

fn live_counterparty(
  conn: &Connection,
  kind: CounterpartyKind,
  id: i64,
) -> Result<Counterparty> {
  load_counterparty(conn, kind, id)?
    .filter(|c| !c.deleted)
    .ok_or_else(|| LedgerError::CounterpartyNotFound { kind, id }.into())
}

// ─── InventoryStore impl ─────────────────────────────────────────────────────

impl InventoryStore for SqliteStore {
  type Error = Error;

  // ── Products ──────────────────────────────────────────────────────────────

  async fn create_product(&self, input: NewProduct) -> Result<Product> {
    self.write(move |conn| ledger::create_product(conn, input)).await
  }

  async fn get_product(&self, id: i64) -> Result<Option<Product>> {
    self.read(move |conn| load_product(conn, id)).await
  }

  async fn list_products(&self, query: ProductQuery) -> Result<Vec<Product>> {
    let text = non_blank(query.text).map(|t| t.to_lowercase());

    self
      .read(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PRODUCT_COLUMNS} FROM products
            WHERE (?1 IS NULL
                   OR instr(name_normalized, ?1) > 0
                   OR instr(lower(coalesce(sku, '')), ?1) > 0)
              AND (?2 OR deleted = 0)
            ORDER BY name_normalized, id"
        ))?;
        let raws = stmt
          .query_map(params![text, query.include_deleted], RawProduct::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        raws.into_iter().map(RawProduct::into_product).collect()
      })
      .await
  }

  async fn update_product(&self, id: i64, patch: ProductPatch) -> Result<Product> {
    self
      .write(move |conn| {
        let product = load_product(conn, id)?
          .filter(|p| !p.deleted)
          .ok_or(LedgerError::ProductNotFound(id))?;

        let name = match patch.name {
          Some(raw) => {
            let name = CleanName::parse(&raw)?;
            ensure_unique_name(conn, "products", EntityKind::Product, &name, Some(id))?;
            name
          }
          None => CleanName {
            display:    product.name,
            normalized: product.name_normalized,
          },
        };
        let unit = match patch.unit {
          Some(raw) => clean_unit(raw)?,
          None => product.unit,
        };
        let sku = match patch.sku {
          Some(raw) => non_blank(Some(raw)),
          None => product.sku,
        };

        conn.execute(
          "UPDATE products
              SET name = ?1, name_normalized = ?2, unit = ?3, sku = ?4,
                  updated_at = ?5
            WHERE id = ?6",
          params![
            name.display,
            name.normalized,
            unit,
            sku,
            encode_dt(Utc::now()),
            id
          ],
        )?;

        load_product(conn, id)?.ok_or_else(|| LedgerError::ProductNotFound(id).into())
      })
      .await
  }

  async fn delete_product(&self, id: i64) -> Result<()> {
    self
      .write(move |conn| {
        let changed = conn.execute(
          "UPDATE products SET deleted = 1, updated_at = ?1
            WHERE id = ?2 AND deleted = 0",
          params![encode_dt(Utc::now()), id],
        )?;
        if changed == 0 {
          return Err(LedgerError::ProductNotFound(id).into());
        }
        tracing::info!(product_id = id, "product deleted");
        Ok(())
      })
      .await
  }

  async fn purge_product(&self, id: i64) -> Result<PurgeSummary> {
    self.write(move |conn| ledger::purge_product(conn, id)).await
  }

  // ── Counterparties ────────────────────────────────────────────────────────

  async fn create_counterparty(
    &self,
    kind: CounterpartyKind,
    name: String,
  ) -> Result<Counterparty> {
    self
      .write(move |conn| {
        let name = CleanName::parse(&name)?;
        let table = counterparty_table(kind);
        ensure_unique_name(conn, table, kind.into(), &name, None)?;

        conn.execute(
          &format!(
            "INSERT INTO {table} (name, name_normalized, deleted, created_at)
             VALUES (?1, ?2, 0, ?3)"
          ),
          params![name.display, name.normalized, encode_dt(Utc::now())],
        )?;
        let id = conn.last_insert_rowid();
        tracing::info!(%kind, id, "counterparty created");

        live_counterparty(conn, kind, id)
      })
      .await
  }

  async fn get_counterparty(
    &self,
    kind: CounterpartyKind,
    id: i64,
  ) -> Result<Option<Counterparty>> {
    self.read(move |conn| load_counterparty(conn, kind, id)).await
  }

  async fn list_counterparties(
    &self,
    kind: CounterpartyKind,
    include_deleted: bool,
  ) -> Result<Vec<Counterparty>> {
    self
      .read(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {COUNTERPARTY_COLUMNS} FROM {}
            WHERE (?1 OR deleted = 0)
            ORDER BY name_normalized, id",
          counterparty_table(kind)
        ))?;
        let raws = stmt
          .query_map([include_deleted], RawCounterparty::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        raws.into_iter().map(|raw| raw.into_counterparty(kind)).collect()
      })
      .await
  }

  async fn rename_counterparty(
    &self,
    kind: CounterpartyKind,
    id: i64,
    name: String,
  ) -> Result<Counterparty> {
    self
      .write(move |conn| {
        live_counterparty(conn, kind, id)?;
        let name = CleanName::parse(&name)?;
        let table = counterparty_table(kind);
        ensure_unique_name(conn, table, kind.into(), &name, Some(id))?;

        conn.execute(
          &format!("UPDATE {table} SET name = ?1, name_normalized = ?2 WHERE id = ?3"),
          params![name.display, name.normalized, id],
        )?;
        live_counterparty(conn, kind, id)
      })
      .await
  }

  async fn delete_counterparty(&self, kind: CounterpartyKind, id: i64) -> Result<()> {
    self
      .write(move |conn| {
        let changed = conn.execute(
          &format!(
            "UPDATE {} SET deleted = 1 WHERE id = ?1 AND deleted = 0",
            counterparty_table(kind)
          ),
          [id],
        )?;
        if changed == 0 {
          return Err(LedgerError::CounterpartyNotFound { kind, id }.into());
        }
        tracing::info!(%kind, id, "counterparty deleted");
        Ok(())
      })
      .await
  }

  // ── Movements ─────────────────────────────────────────────────────────────

  async fn create_movement(&self, input: NewMovement) -> Result<MovementReceipt> {
    // Shape errors are caught before the write lock is taken.
    let plan = MovementPlan::build(input, Utc::now()).inspect_err(|e| {
      tracing::debug!(rejection = %e, "movement rejected");
    })?;
    self.write(move |conn| ledger::create_movement(conn, plan)).await
  }

  async fn get_movement(&self, id: i64) -> Result<Option<Movement>> {
    self.read(move |conn| ledger::load_movement(conn, id)).await
  }

  async fn list_movements(&self, query: MovementQuery) -> Result<Vec<Movement>> {
    self.read(move |conn| ledger::list_movements(conn, &query)).await
  }

  async fn set_movement_note(
    &self,
    id: i64,
    note: Option<String>,
  ) -> Result<Movement> {
    self.write(move |conn| ledger::set_note(conn, id, note)).await
  }

  async fn edit_movement_item(
    &self,
    movement_id: i64,
    item_id: i64,
    quantity: i64,
  ) -> Result<ItemEdit> {
    self
      .write(move |conn| ledger::edit_item(conn, movement_id, item_id, quantity))
      .await
  }

  async fn delete_movement_item(
    &self,
    movement_id: i64,
    item_id: i64,
  ) -> Result<ItemDeletion> {
    self
      .write(move |conn| ledger::delete_item(conn, movement_id, item_id))
      .await
  }

  async fn delete_movement(&self, id: i64) -> Result<MovementDeletion> {
    self.write(move |conn| ledger::delete_movement(conn, id)).await
  }

  // ── Tools ─────────────────────────────────────────────────────────────────

  async fn create_tool(&self, input: NewTool) -> Result<Tool> {
    self.write(move |conn| tools::create_tool(conn, input)).await
  }

  async fn get_tool(&self, id: i64) -> Result<Option<Tool>> {
    self.read(move |conn| load_tool(conn, id)).await
  }

  async fn list_tools(&self, include_deleted: bool) -> Result<Vec<Tool>> {
    self.read(move |conn| tools::list_tools(conn, include_deleted)).await
  }

  async fn delete_tool(&self, id: i64) -> Result<()> {
    self.write(move |conn| tools::delete_tool(conn, id)).await
  }

  async fn purge_tool(&self, id: i64) -> Result<usize> {
    self.write(move |conn| tools::purge_tool(conn, id)).await
  }

  async fn assign_tool(
    &self,
    tool_id: i64,
    worker_id: i64,
    quantity: i64,
  ) -> Result<ToolAssignment> {
    self
      .write(move |conn| tools::assign(conn, tool_id, worker_id, quantity))
      .await
  }

  async fn return_tool(
    &self,
    tool_id: i64,
    worker_id: i64,
    quantity: Option<i64>,
  ) -> Result<ToolReturn> {
    self
      .write(move |conn| tools::return_units(conn, tool_id, worker_id, quantity))
      .await
  }

  async fn set_tool_total_quantity(&self, tool_id: i64, total: i64) -> Result<Tool> {
    self.write(move |conn| tools::set_total(conn, tool_id, total)).await
  }

  async fn list_assignments(
    &self,
    query: AssignmentQuery,
  ) -> Result<Vec<ToolAssignment>> {
    self.read(move |conn| tools::list_assignments(conn, &query)).await
  }

  // ── Reports ───────────────────────────────────────────────────────────────

  async fn turnover(&self, range: ReportRange) -> Result<Vec<TurnoverRow>> {
    self.read(move |conn| reports::turnover(conn, &range)).await
  }

  async fn consumption_forecast(
    &self,
    window_days: i64,
    as_of: Option<DateTime<Utc>>,
  ) -> Result<Vec<ForecastRow>> {
    let as_of = as_of.unwrap_or_else(Utc::now);
    self
      .read(move |conn| reports::consumption_forecast(conn, window_days, as_of))
      .await
  }

  async fn worker_stats(&self, range: ReportRange) -> Result<Vec<WorkerStats>> {
    self.read(move |conn| reports::worker_stats(conn, &range)).await
  }

  async fn counterparty_stats(
    &self,
    kind: CounterpartyKind,
    range: ReportRange,
  ) -> Result<Vec<CounterpartyStats>> {
    self
      .read(move |conn| reports::counterparty_stats(conn, kind, &range))
      .await
  }
}
