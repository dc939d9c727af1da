//! Encoding and decoding helpers between domain types and SQLite columns.
//!
//! Timestamps are stored as RFC 3339 UTC strings with a fixed microsecond
//! precision and a `Z` suffix, so lexical comparison in SQL matches
//! chronological order. Enums are stored as their lowercase names.

use chrono::{DateTime, SecondsFormat, Utc};
use stockroom_core::{
  counterparty::{Counterparty, CounterpartyKind},
  movement::{Movement, MovementItem, MovementKind},
  product::Product,
  tool::{Tool, ToolAssignment},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── MovementKind ────────────────────────────────────────────────────────────

pub fn decode_kind(s: &str) -> Result<MovementKind> {
  s.parse().map_err(|_| Error::Decode {
    column: "movements.kind",
    value:  s.to_owned(),
  })
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const PRODUCT_COLUMNS: &str =
  "id, name, name_normalized, unit, sku, quantity, deleted, created_at, updated_at";

/// Raw values read directly from a `products` row.
pub struct RawProduct {
  pub id:              i64,
  pub name:            String,
  pub name_normalized: String,
  pub unit:            String,
  pub sku:             Option<String>,
  pub quantity:        i64,
  pub deleted:         bool,
  pub created_at:      String,
  pub updated_at:      String,
}

impl RawProduct {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:              row.get(0)?,
      name:            row.get(1)?,
      name_normalized: row.get(2)?,
      unit:            row.get(3)?,
      sku:             row.get(4)?,
      quantity:        row.get(5)?,
      deleted:         row.get(6)?,
      created_at:      row.get(7)?,
      updated_at:      row.get(8)?,
    })
  }

  pub fn into_product(self) -> Result<Product> {
    Ok(Product {
      id:              self.id,
      name:            self.name,
      name_normalized: self.name_normalized,
      unit:            self.unit,
      sku:             self.sku,
      quantity:        self.quantity,
      deleted:         self.deleted,
      created_at:      decode_dt(&self.created_at)?,
      updated_at:      decode_dt(&self.updated_at)?,
    })
  }
}

pub const COUNTERPARTY_COLUMNS: &str = "id, name, deleted, created_at";

pub struct RawCounterparty {
  pub id:         i64,
  pub name:       String,
  pub deleted:    bool,
  pub created_at: String,
}

impl RawCounterparty {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      name:       row.get(1)?,
      deleted:    row.get(2)?,
      created_at: row.get(3)?,
    })
  }

  pub fn into_counterparty(self, kind: CounterpartyKind) -> Result<Counterparty> {
    Ok(Counterparty {
      id: self.id,
      kind,
      name: self.name,
      deleted: self.deleted,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub const MOVEMENT_COLUMNS: &str = "id, kind, date, supplier_id, supplier_name, \
   destination_id, destination_name, worker_id, worker_name, author_id, note, \
   created_at";

/// Raw values read from a `movements` row; items are attached separately.
pub struct RawMovement {
  pub id:               i64,
  pub kind:             String,
  pub date:             String,
  pub supplier_id:      Option<i64>,
  pub supplier_name:    Option<String>,
  pub destination_id:   Option<i64>,
  pub destination_name: Option<String>,
  pub worker_id:        Option<i64>,
  pub worker_name:      Option<String>,
  pub author_id:        Option<i64>,
  pub note:             Option<String>,
  pub created_at:       String,
}

impl RawMovement {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:               row.get(0)?,
      kind:             row.get(1)?,
      date:             row.get(2)?,
      supplier_id:      row.get(3)?,
      supplier_name:    row.get(4)?,
      destination_id:   row.get(5)?,
      destination_name: row.get(6)?,
      worker_id:        row.get(7)?,
      worker_name:      row.get(8)?,
      author_id:        row.get(9)?,
      note:             row.get(10)?,
      created_at:       row.get(11)?,
    })
  }

  pub fn into_movement(self, items: Vec<MovementItem>) -> Result<Movement> {
    Ok(Movement {
      id: self.id,
      kind: decode_kind(&self.kind)?,
      date: decode_dt(&self.date)?,
      supplier_id: self.supplier_id,
      supplier_name: self.supplier_name,
      destination_id: self.destination_id,
      destination_name: self.destination_name,
      worker_id: self.worker_id,
      worker_name: self.worker_name,
      author_id: self.author_id,
      note: self.note,
      created_at: decode_dt(&self.created_at)?,
      items,
    })
  }
}

pub const ITEM_COLUMNS: &str =
  "id, movement_id, product_id, product_name, product_sku, delta";

pub fn item_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MovementItem> {
  Ok(MovementItem {
    id:           row.get(0)?,
    movement_id:  row.get(1)?,
    product_id:   row.get(2)?,
    product_name: row.get(3)?,
    product_sku:  row.get(4)?,
    delta:        row.get(5)?,
  })
}

pub const TOOL_COLUMNS: &str = "id, name, total_quantity, available_quantity, \
   deleted, created_at, updated_at";

pub struct RawTool {
  pub id:                 i64,
  pub name:               String,
  pub total_quantity:     i64,
  pub available_quantity: i64,
  pub deleted:            bool,
  pub created_at:         String,
  pub updated_at:         String,
}

impl RawTool {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                 row.get(0)?,
      name:               row.get(1)?,
      total_quantity:     row.get(2)?,
      available_quantity: row.get(3)?,
      deleted:            row.get(4)?,
      created_at:         row.get(5)?,
      updated_at:         row.get(6)?,
    })
  }

  pub fn into_tool(self) -> Result<Tool> {
    Ok(Tool {
      id:                 self.id,
      name:               self.name,
      total_quantity:     self.total_quantity,
      available_quantity: self.available_quantity,
      deleted:            self.deleted,
      created_at:         decode_dt(&self.created_at)?,
      updated_at:         decode_dt(&self.updated_at)?,
    })
  }
}

pub const ASSIGNMENT_COLUMNS: &str =
  "id, tool_id, worker_id, quantity, assigned_at, returned_at";

pub struct RawAssignment {
  pub id:          i64,
  pub tool_id:     i64,
  pub worker_id:   i64,
  pub quantity:    i64,
  pub assigned_at: String,
  pub returned_at: Option<String>,
}

impl RawAssignment {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      tool_id:     row.get(1)?,
      worker_id:   row.get(2)?,
      quantity:    row.get(3)?,
      assigned_at: row.get(4)?,
      returned_at: row.get(5)?,
    })
  }

  pub fn into_assignment(self) -> Result<ToolAssignment> {
    Ok(ToolAssignment {
      id:          self.id,
      tool_id:     self.tool_id,
      worker_id:   self.worker_id,
      quantity:    self.quantity,
      assigned_at: decode_dt(&self.assigned_at)?,
      returned_at: decode_opt_dt(self.returned_at)?,
    })
  }
}
