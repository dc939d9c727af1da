//! Counterparties: suppliers, destinations and workers referenced by
//! movements.
//!
//! Movements snapshot a counterparty's name when they are written, so a later
//! rename or soft delete never rewrites history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::movement::MovementKind;

/// The kind of counterparty a movement may reference.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CounterpartyKind {
  /// Source of inbound stock.
  Supplier,
  /// Destination of outbound stock.
  Location,
  Worker,
}

impl CounterpartyKind {
  /// The movement direction this kind is counted on in reports. Workers
  /// draw stock, so they count outbound.
  pub fn flow(self) -> MovementKind {
    match self {
      Self::Supplier => MovementKind::In,
      Self::Location | Self::Worker => MovementKind::Out,
    }
  }
}

/// A supplier, location or worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counterparty {
  pub id:         i64,
  pub kind:       CounterpartyKind,
  pub name:       String,
  pub deleted:    bool,
  pub created_at: DateTime<Utc>,
}

/// An id together with the name it had when a movement was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameSnapshot {
  pub id:   i64,
  pub name: String,
}
