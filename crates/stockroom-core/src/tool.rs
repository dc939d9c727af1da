//! Tools and the tool-assignment ledger.
//!
//! A tool has a fixed `total_quantity`; `available_quantity` is what is left
//! on the shelf. The invariant is
//! `available + sum(outstanding assignments) == total`. The planning
//! functions here decide whether an assignment, return or total change keeps
//! that invariant; backends apply the result with atomic increments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  quantity::{self, MAX_QUANTITY, Violation},
};

// ─── Records ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tool {
  pub id:                 i64,
  pub name:               String,
  pub total_quantity:     i64,
  pub available_quantity: i64,
  pub deleted:            bool,
  pub created_at:         DateTime<Utc>,
  pub updated_at:         DateTime<Utc>,
}

impl Tool {
  /// Units currently checked out.
  pub fn issued(&self) -> i64 { self.total_quantity - self.available_quantity }
}

/// Input to [`crate::store::InventoryStore::create_tool`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewTool {
  pub name:           String,
  pub total_quantity: i64,
}

/// A check-out of some units of a tool to a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolAssignment {
  pub id:          i64,
  pub tool_id:     i64,
  pub worker_id:   i64,
  /// Units still held; shrinks on partial returns.
  pub quantity:    i64,
  pub assigned_at: DateTime<Utc>,
  /// `None` while the assignment is outstanding.
  pub returned_at: Option<DateTime<Utc>>,
}

impl ToolAssignment {
  pub fn is_outstanding(&self) -> bool { self.returned_at.is_none() }
}

/// Parameters for [`crate::store::InventoryStore::list_assignments`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssignmentQuery {
  pub tool_id:          Option<i64>,
  pub worker_id:        Option<i64>,
  #[serde(default)]
  pub outstanding_only: bool,
}

/// Result of a committed return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolReturn {
  pub assignment: ToolAssignment,
  pub returned:   i64,
  /// The tool after the return was applied.
  pub tool:       Tool,
}

// ─── Planning ────────────────────────────────────────────────────────────────

/// Validate a requested total for a new tool.
pub fn validate_total(total: i64) -> Result<i64> {
  if (0..=MAX_QUANTITY).contains(&total) {
    Ok(total)
  } else {
    Err(Error::InvalidToolQuantity(total))
  }
}

/// Check that `quantity` units of `tool` can be issued; returns the new
/// available count.
pub fn plan_assignment(tool: &Tool, quantity: i64) -> Result<i64> {
  if quantity < 1 {
    return Err(Error::InvalidToolQuantity(quantity));
  }
  quantity::check(tool.available_quantity, -quantity).map_err(|v| match v {
    Violation::Insufficient { available, requested } => {
      Error::InsufficientToolAvailability {
        tool_id: tool.id,
        tool: tool.name.clone(),
        available,
        requested,
      }
    }
    // Subtracting a positive amount cannot overshoot the ceiling.
    Violation::Ceiling { .. } => Error::InvalidToolQuantity(quantity),
  })
}

/// How a return affects the outstanding assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReturnPlan {
  pub returned:  i64,
  /// Units the worker still holds afterwards; zero closes the assignment.
  pub remaining: i64,
}

impl ReturnPlan {
  pub fn closes(&self) -> bool { self.remaining == 0 }
}

/// Plan the return of `requested` units (default: everything outstanding).
pub fn plan_return(
  assignment: &ToolAssignment,
  requested: Option<i64>,
) -> Result<ReturnPlan> {
  let returned = requested.unwrap_or(assignment.quantity);
  if returned < 1 {
    return Err(Error::InvalidToolQuantity(returned));
  }
  if returned > assignment.quantity {
    return Err(Error::ReturnExceedsAssigned {
      tool_id:     assignment.tool_id,
      worker_id:   assignment.worker_id,
      outstanding: assignment.quantity,
      requested:   returned,
    });
  }
  Ok(ReturnPlan {
    returned,
    remaining: assignment.quantity - returned,
  })
}

/// Check a new total for `tool`; returns the change to apply to both total and
/// available so the issued count is preserved.
pub fn plan_total(tool: &Tool, new_total: i64) -> Result<i64> {
  validate_total(new_total)?;
  let issued = tool.issued();
  if new_total < issued {
    return Err(Error::CannotReduceBelowIssued {
      tool_id:   tool.id,
      tool:      tool.name.clone(),
      issued,
      requested: new_total,
    });
  }
  Ok(new_total - tool.total_quantity)
}
