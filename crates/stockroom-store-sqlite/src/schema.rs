//! SQL schema for the Stockroom SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.
//!
//! The CHECK constraints duplicate the bounds enforced by
//! `stockroom_core::quantity`; they are the last line of defence if a
//! statement ever bypasses the coordinator.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS products (
    id              INTEGER PRIMARY KEY,
    name            TEXT    NOT NULL,
    name_normalized TEXT    NOT NULL,
    unit            TEXT    NOT NULL,
    sku             TEXT,
    quantity        INTEGER NOT NULL DEFAULT 0
                    CHECK (quantity BETWEEN 0 AND 65535),
    deleted         INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT    NOT NULL,
    updated_at      TEXT    NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS products_live_name_idx
    ON products(name_normalized) WHERE deleted = 0;

CREATE TABLE IF NOT EXISTS suppliers (
    id              INTEGER PRIMARY KEY,
    name            TEXT    NOT NULL,
    name_normalized TEXT    NOT NULL,
    deleted         INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT    NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS suppliers_live_name_idx
    ON suppliers(name_normalized) WHERE deleted = 0;

CREATE TABLE IF NOT EXISTS locations (
    id              INTEGER PRIMARY KEY,
    name            TEXT    NOT NULL,
    name_normalized TEXT    NOT NULL,
    deleted         INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT    NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS locations_live_name_idx
    ON locations(name_normalized) WHERE deleted = 0;

CREATE TABLE IF NOT EXISTS workers (
    id              INTEGER PRIMARY KEY,
    name            TEXT    NOT NULL,
    name_normalized TEXT    NOT NULL,
    deleted         INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT    NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS workers_live_name_idx
    ON workers(name_normalized) WHERE deleted = 0;

-- Counterparty names are snapshotted; the ids are informational and carry no
-- foreign key so that purging a counterparty never touches history.
CREATE TABLE IF NOT EXISTS movements (
    id               INTEGER PRIMARY KEY,
    kind             TEXT    NOT NULL CHECK (kind IN ('in', 'out')),
    date             TEXT    NOT NULL,   -- RFC 3339 UTC, fixed width
    supplier_id      INTEGER,
    supplier_name    TEXT,
    destination_id   INTEGER,
    destination_name TEXT,
    worker_id        INTEGER,
    worker_name      TEXT,
    author_id        INTEGER,
    note             TEXT,
    created_at       TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS movement_items (
    id           INTEGER PRIMARY KEY,
    movement_id  INTEGER NOT NULL REFERENCES movements(id) ON DELETE CASCADE,
    product_id   INTEGER REFERENCES products(id) ON DELETE SET NULL,
    product_name TEXT    NOT NULL,
    product_sku  TEXT,
    delta        INTEGER NOT NULL CHECK (delta != 0)
);

CREATE TABLE IF NOT EXISTS tools (
    id                 INTEGER PRIMARY KEY,
    name               TEXT    NOT NULL,
    name_normalized    TEXT    NOT NULL,
    total_quantity     INTEGER NOT NULL,
    available_quantity INTEGER NOT NULL,
    deleted            INTEGER NOT NULL DEFAULT 0,
    created_at         TEXT    NOT NULL,
    updated_at         TEXT    NOT NULL,
    CHECK (available_quantity >= 0),
    CHECK (available_quantity <= total_quantity),
    CHECK (total_quantity <= 65535)
);

CREATE UNIQUE INDEX IF NOT EXISTS tools_live_name_idx
    ON tools(name_normalized) WHERE deleted = 0;

CREATE TABLE IF NOT EXISTS tool_assignments (
    id          INTEGER PRIMARY KEY,
    tool_id     INTEGER NOT NULL REFERENCES tools(id) ON DELETE CASCADE,
    worker_id   INTEGER NOT NULL REFERENCES workers(id),
    quantity    INTEGER NOT NULL CHECK (quantity > 0),
    assigned_at TEXT    NOT NULL,
    returned_at TEXT
);

-- At most one outstanding assignment per (tool, worker).
CREATE UNIQUE INDEX IF NOT EXISTS tool_assignments_outstanding_idx
    ON tool_assignments(tool_id, worker_id) WHERE returned_at IS NULL;

CREATE INDEX IF NOT EXISTS movements_date_idx         ON movements(date);
CREATE INDEX IF NOT EXISTS movement_items_movement_idx ON movement_items(movement_id);
CREATE INDEX IF NOT EXISTS movement_items_product_idx  ON movement_items(product_id);

PRAGMA user_version = 1;
";

/// Table holding counterparties of `kind`.
pub fn counterparty_table(
  kind: stockroom_core::counterparty::CounterpartyKind,
) -> &'static str {
  use stockroom_core::counterparty::CounterpartyKind;
  match kind {
    CounterpartyKind::Supplier => "suppliers",
    CounterpartyKind::Location => "locations",
    CounterpartyKind::Worker => "workers",
  }
}

/// `(id column, name column)` on `movements` referencing counterparties of
/// `kind`.
pub fn movement_columns(
  kind: stockroom_core::counterparty::CounterpartyKind,
) -> (&'static str, &'static str) {
  use stockroom_core::counterparty::CounterpartyKind;
  match kind {
    CounterpartyKind::Supplier => ("supplier_id", "supplier_name"),
    CounterpartyKind::Location => ("destination_id", "destination_name"),
    CounterpartyKind::Worker => ("worker_id", "worker_name"),
  }
}
