//! Read-only aggregate queries.
//!
//! Every query takes the optional `[from, to)` bounds as `?1` and `?2` and
//! compares them against `movements.date` lexically.

use chrono::{DateTime, TimeDelta, Utc};
use rusqlite::{Connection, params};
use stockroom_core::{
  Error as LedgerError,
  counterparty::CounterpartyKind,
  report::{CounterpartyStats, ForecastRow, ReportRange, TurnoverRow, WorkerStats},
};

use crate::{Result, encode::encode_dt, schema::movement_columns};

const IN_RANGE: &str =
  "(?1 IS NULL OR m.date >= ?1) AND (?2 IS NULL OR m.date < ?2)";

fn bounds(range: &ReportRange) -> (Option<String>, Option<String>) {
  (range.from.map(encode_dt), range.to.map(encode_dt))
}

pub fn turnover(conn: &Connection, range: &ReportRange) -> Result<Vec<TurnoverRow>> {
  let (from, to) = bounds(range);
  let mut stmt = conn.prepare(&format!(
    "SELECT p.id, p.name, p.unit,
            COALESCE(SUM(CASE WHEN r.delta > 0 THEN r.delta END), 0),
            COALESCE(SUM(CASE WHEN r.delta < 0 THEN -r.delta END), 0),
            p.quantity
       FROM products p
       LEFT JOIN (
              SELECT i.product_id, i.delta
                FROM movement_items i
                JOIN movements m ON m.id = i.movement_id
               WHERE {IN_RANGE}
            ) r ON r.product_id = p.id
      WHERE p.deleted = 0
      GROUP BY p.id
      ORDER BY p.name_normalized, p.id"
  ))?;

  let rows = stmt
    .query_map(params![from, to], |row| {
      let inbound: i64 = row.get(3)?;
      let outbound: i64 = row.get(4)?;
      Ok(TurnoverRow {
        product_id: row.get(0)?,
        name: row.get(1)?,
        unit: row.get(2)?,
        inbound,
        outbound,
        net: inbound - outbound,
        quantity: row.get(5)?,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

/// Outbound units over `[as_of - window_days, as_of)` per live product.
pub fn consumption_forecast(
  conn: &Connection,
  window_days: i64,
  as_of: DateTime<Utc>,
) -> Result<Vec<ForecastRow>> {
  let start = (window_days >= 1)
    .then(|| TimeDelta::try_days(window_days))
    .flatten()
    .and_then(|window| as_of.checked_sub_signed(window))
    .ok_or(LedgerError::InvalidWindow(window_days))?;

  let mut stmt = conn.prepare(&format!(
    "SELECT p.id, p.name, p.quantity,
            COALESCE((
              SELECT SUM(-i.delta)
                FROM movement_items i
                JOIN movements m ON m.id = i.movement_id
               WHERE i.product_id = p.id AND i.delta < 0 AND {IN_RANGE}
            ), 0)
       FROM products p
      WHERE p.deleted = 0
      ORDER BY p.name_normalized, p.id"
  ))?;

  let rows = stmt
    .query_map(params![encode_dt(start), encode_dt(as_of)], |row| {
      Ok(ForecastRow::compute(
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        window_days,
      ))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

pub fn worker_stats(conn: &Connection, range: &ReportRange) -> Result<Vec<WorkerStats>> {
  let (from, to) = bounds(range);
  let mut stmt = conn.prepare(&format!(
    "SELECT w.id, w.name,
            (SELECT COUNT(*) FROM movements m
              WHERE m.worker_id = w.id AND {IN_RANGE}),
            (SELECT COALESCE(SUM(-i.delta), 0)
               FROM movement_items i
               JOIN movements m ON m.id = i.movement_id
              WHERE m.worker_id = w.id AND i.delta < 0 AND {IN_RANGE}),
            (SELECT COALESCE(SUM(a.quantity), 0) FROM tool_assignments a
              WHERE a.worker_id = w.id AND a.returned_at IS NULL)
       FROM workers w
      WHERE w.deleted = 0
      ORDER BY w.name_normalized, w.id"
  ))?;

  let rows = stmt
    .query_map(params![from, to], |row| {
      Ok(WorkerStats {
        worker_id:  row.get(0)?,
        name:       row.get(1)?,
        movements:  row.get(2)?,
        units_out:  row.get(3)?,
        tools_held: row.get(4)?,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

/// Grouped by the counterparty id referenced on movements, so purged or
/// renamed counterparties still show up under their last snapshotted name.
/// Only movements in the kind's [`CounterpartyKind::flow`] direction count;
/// a supplier tagged on an outbound movement supplied nothing.
pub fn counterparty_stats(
  conn: &Connection,
  kind: CounterpartyKind,
  range: &ReportRange,
) -> Result<Vec<CounterpartyStats>> {
  let (from, to) = bounds(range);
  let (id_col, name_col) = movement_columns(kind);
  let mut stmt = conn.prepare(&format!(
    "SELECT g.cid,
            (SELECT n.{name_col} FROM movements n
              WHERE n.{id_col} = g.cid
              ORDER BY n.date DESC, n.id DESC LIMIT 1),
            g.movements,
            g.units
       FROM (
              SELECT m.{id_col} AS cid,
                     COUNT(DISTINCT m.id) AS movements,
                     COALESCE(SUM(ABS(i.delta)), 0) AS units
                FROM movements m
                LEFT JOIN movement_items i ON i.movement_id = m.id
               WHERE m.{id_col} IS NOT NULL AND m.kind = ?3 AND {IN_RANGE}
               GROUP BY m.{id_col}
            ) g
      ORDER BY g.units DESC, g.cid"
  ))?;

  let rows = stmt
    .query_map(params![from, to, kind.flow().as_ref()], |row| {
      Ok(CounterpartyStats {
        kind,
        id:        row.get(0)?,
        name:      row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        movements: row.get(2)?,
        units:     row.get(3)?,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}
