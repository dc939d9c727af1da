//! Read-only rollups over the movement history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::counterparty::CounterpartyKind;

/// Half-open date window `[from, to)`; either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ReportRange {
  pub from: Option<DateTime<Utc>>,
  pub to:   Option<DateTime<Utc>>,
}

/// Inbound and outbound totals for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnoverRow {
  pub product_id: i64,
  pub name:       String,
  pub unit:       String,
  pub inbound:    i64,
  pub outbound:   i64,
  pub net:        i64,
  pub quantity:   i64,
}

/// Projected stock life for one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
  pub product_id:     i64,
  pub name:           String,
  pub quantity:       i64,
  /// Units that left during the window.
  pub consumed:       i64,
  pub daily_average:  f64,
  /// `None` when nothing was consumed during the window.
  pub days_remaining: Option<f64>,
}

impl ForecastRow {
  pub fn compute(
    product_id: i64,
    name: String,
    quantity: i64,
    consumed: i64,
    window_days: i64,
  ) -> Self {
    let daily_average = consumed as f64 / window_days.max(1) as f64;
    let days_remaining =
      (daily_average > 0.0).then(|| quantity as f64 / daily_average);
    Self {
      product_id,
      name,
      quantity,
      consumed,
      daily_average,
      days_remaining,
    }
  }
}

/// Activity of one worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStats {
  pub worker_id:  i64,
  pub name:       String,
  pub movements:  i64,
  pub units_out:  i64,
  /// Tool units currently checked out to the worker.
  pub tools_held: i64,
}

/// Activity with one supplier or destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterpartyStats {
  pub kind:      CounterpartyKind,
  pub id:        i64,
  /// The most recently snapshotted name.
  pub name:      String,
  pub movements: i64,
  pub units:     i64,
}
