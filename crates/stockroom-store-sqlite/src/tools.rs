//! Tool catalog and assignment writes.
//!
//! Like [`crate::ledger`], these run inside the caller's `IMMEDIATE`
//! transaction. `available_quantity` only ever moves through relative
//! updates whose returned value is compared with the planned one.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension as _, params};
use stockroom_core::{
  EntityKind, Error as LedgerError,
  product::CleanName,
  tool::{
    self, AssignmentQuery, NewTool, Tool, ToolAssignment, ToolReturn,
  },
};

use crate::{
  Error, Result,
  catalog::{ensure_unique_name, load_tool},
  encode::{ASSIGNMENT_COLUMNS, RawAssignment, TOOL_COLUMNS, RawTool, encode_dt},
};

fn live_tool(conn: &Connection, id: i64) -> Result<Tool> {
  load_tool(conn, id)?
    .filter(|t| !t.deleted)
    .ok_or_else(|| LedgerError::ToolNotFound(id).into())
}

fn ensure_live_worker(conn: &Connection, id: i64) -> Result<()> {
  conn
    .query_row(
      "SELECT 1 FROM workers WHERE id = ?1 AND deleted = 0",
      [id],
      |_| Ok(()),
    )
    .optional()?
    .ok_or(LedgerError::WorkerNotFound(id))?;
  Ok(())
}

fn outstanding(
  conn: &Connection,
  tool_id: i64,
  worker_id: i64,
) -> Result<Option<ToolAssignment>> {
  conn
    .query_row(
      &format!(
        "SELECT {ASSIGNMENT_COLUMNS} FROM tool_assignments
          WHERE tool_id = ?1 AND worker_id = ?2 AND returned_at IS NULL"
      ),
      [tool_id, worker_id],
      RawAssignment::from_row,
    )
    .optional()?
    .map(RawAssignment::into_assignment)
    .transpose()
}

fn load_assignment(conn: &Connection, id: i64) -> Result<ToolAssignment> {
  conn
    .query_row(
      &format!("SELECT {ASSIGNMENT_COLUMNS} FROM tool_assignments WHERE id = ?1"),
      [id],
      RawAssignment::from_row,
    )?
    .into_assignment()
}

/// Shift `available_quantity` by `delta` and verify the result.
fn shift_available(
  conn: &Connection,
  tool_id: i64,
  delta: i64,
  expected: i64,
) -> Result<()> {
  let after: i64 = conn.query_row(
    "UPDATE tools
        SET available_quantity = available_quantity + ?1, updated_at = ?2
      WHERE id = ?3
  RETURNING available_quantity",
    params![delta, encode_dt(Utc::now()), tool_id],
    |row| row.get(0),
  )?;
  if after != expected {
    return Err(Error::PostCondition(format!(
      "tool {tool_id} expected {expected} available, found {after}"
    )));
  }
  Ok(())
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

pub fn create_tool(conn: &Connection, input: NewTool) -> Result<Tool> {
  let name = CleanName::parse(&input.name)?;
  let total = tool::validate_total(input.total_quantity)?;
  ensure_unique_name(conn, "tools", EntityKind::Tool, &name, None)?;

  let now = encode_dt(Utc::now());
  conn.execute(
    "INSERT INTO tools
       (name, name_normalized, total_quantity, available_quantity, deleted,
        created_at, updated_at)
     VALUES (?1, ?2, ?3, ?3, 0, ?4, ?4)",
    params![name.display, name.normalized, total, now],
  )?;
  let id = conn.last_insert_rowid();
  tracing::info!(tool_id = id, total, "tool created");

  live_tool(conn, id)
}

pub fn list_tools(conn: &Connection, include_deleted: bool) -> Result<Vec<Tool>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {TOOL_COLUMNS} FROM tools
      WHERE (?1 OR deleted = 0)
      ORDER BY name_normalized, id"
  ))?;
  let raws = stmt
    .query_map([include_deleted], RawTool::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawTool::into_tool).collect()
}

pub fn delete_tool(conn: &Connection, id: i64) -> Result<()> {
  let changed = conn.execute(
    "UPDATE tools SET deleted = 1, updated_at = ?1 WHERE id = ?2 AND deleted = 0",
    params![encode_dt(Utc::now()), id],
  )?;
  if changed == 0 {
    return Err(LedgerError::ToolNotFound(id).into());
  }
  tracing::info!(tool_id = id, "tool deleted");
  Ok(())
}

/// Remove the tool and every assignment recorded against it.
pub fn purge_tool(conn: &Connection, id: i64) -> Result<usize> {
  load_tool(conn, id)?.ok_or(LedgerError::ToolNotFound(id))?;
  let assignments =
    conn.execute("DELETE FROM tool_assignments WHERE tool_id = ?1", [id])?;
  conn.execute("DELETE FROM tools WHERE id = ?1", [id])?;
  tracing::info!(tool_id = id, assignments, "tool purged");
  Ok(assignments)
}

// ─── Assignments ─────────────────────────────────────────────────────────────

/// Issue units to a worker, topping up an outstanding assignment if the
/// worker already holds the tool.
pub fn assign(
  conn: &Connection,
  tool_id: i64,
  worker_id: i64,
  quantity: i64,
) -> Result<ToolAssignment> {
  let tool = live_tool(conn, tool_id)?;
  ensure_live_worker(conn, worker_id)?;
  let available_after = tool::plan_assignment(&tool, quantity)?;

  let assignment_id = match outstanding(conn, tool_id, worker_id)? {
    Some(existing) => {
      conn.execute(
        "UPDATE tool_assignments SET quantity = quantity + ?1 WHERE id = ?2",
        [quantity, existing.id],
      )?;
      existing.id
    }
    None => {
      conn.execute(
        "INSERT INTO tool_assignments (tool_id, worker_id, quantity, assigned_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![tool_id, worker_id, quantity, encode_dt(Utc::now())],
      )?;
      conn.last_insert_rowid()
    }
  };

  shift_available(conn, tool_id, -quantity, available_after)?;
  tracing::info!(tool_id, worker_id, quantity, available_after, "tool assigned");

  load_assignment(conn, assignment_id)
}

/// Take units back from a worker. Works on soft-deleted tools so nothing is
/// stranded.
pub fn return_units(
  conn: &Connection,
  tool_id: i64,
  worker_id: i64,
  quantity: Option<i64>,
) -> Result<ToolReturn> {
  let tool = load_tool(conn, tool_id)?.ok_or(LedgerError::ToolNotFound(tool_id))?;
  let assignment = outstanding(conn, tool_id, worker_id)?
    .ok_or(LedgerError::NoOutstandingAssignment { tool_id, worker_id })?;
  let plan = tool::plan_return(&assignment, quantity)?;

  if plan.closes() {
    conn.execute(
      "UPDATE tool_assignments SET returned_at = ?1 WHERE id = ?2",
      params![encode_dt(Utc::now()), assignment.id],
    )?;
  } else {
    conn.execute(
      "UPDATE tool_assignments SET quantity = ?1 WHERE id = ?2",
      [plan.remaining, assignment.id],
    )?;
  }

  let available_after = tool.available_quantity + plan.returned;
  if available_after > tool.total_quantity {
    return Err(Error::PostCondition(format!(
      "tool {tool_id} would have {available_after} of {} available",
      tool.total_quantity
    )));
  }
  shift_available(conn, tool_id, plan.returned, available_after)?;
  tracing::info!(tool_id, worker_id, returned = plan.returned, "tool returned");

  Ok(ToolReturn {
    assignment: load_assignment(conn, assignment.id)?,
    returned:   plan.returned,
    tool:       load_tool(conn, tool_id)?
      .ok_or(LedgerError::ToolNotFound(tool_id))?,
  })
}

/// Move total and available together so the issued count is unchanged.
pub fn set_total(conn: &Connection, tool_id: i64, total: i64) -> Result<Tool> {
  let tool = live_tool(conn, tool_id)?;
  let change = tool::plan_total(&tool, total)?;

  let (new_total, new_available): (i64, i64) = conn.query_row(
    "UPDATE tools
        SET total_quantity = total_quantity + ?1,
            available_quantity = available_quantity + ?1,
            updated_at = ?2
      WHERE id = ?3
  RETURNING total_quantity, available_quantity",
    params![change, encode_dt(Utc::now()), tool_id],
    |row| Ok((row.get(0)?, row.get(1)?)),
  )?;
  if new_total != total || new_total - new_available != tool.issued() {
    return Err(Error::PostCondition(format!(
      "tool {tool_id} total {new_total} / available {new_available} after \
       setting total {total}"
    )));
  }
  tracing::info!(tool_id, total, "tool total changed");

  live_tool(conn, tool_id)
}

pub fn list_assignments(
  conn: &Connection,
  query: &AssignmentQuery,
) -> Result<Vec<ToolAssignment>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {ASSIGNMENT_COLUMNS} FROM tool_assignments
      WHERE (?1 IS NULL OR tool_id = ?1)
        AND (?2 IS NULL OR worker_id = ?2)
        AND (NOT ?3 OR returned_at IS NULL)
      ORDER BY assigned_at DESC, id DESC"
  ))?;
  let raws = stmt
    .query_map(
      params![query.tool_id, query.worker_id, query.outstanding_only],
      RawAssignment::from_row,
    )?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawAssignment::into_assignment).collect()
}
