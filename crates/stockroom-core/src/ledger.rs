//! The ledger transaction builder.
//!
//! Building a movement happens in two steps:
//!
//! 1. [`MovementPlan::build`] validates the shape of the request (ids, signs,
//!    magnitudes) and collapses the items into one net delta per product.
//!    This step is pure and runs before any storage is touched.
//! 2. [`MovementPlan::resolve`] looks up every product and counterparty
//!    through a [`Catalog`] and snapshots their names. Backends call it
//!    *inside* the unit of work that will apply the movement.
//!
//! The resolved movement is then handed to the backend's coordinator, which
//! re-reads quantities, runs [`crate::quantity::check`] against each net
//! delta, and writes everything or nothing.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::{
  Error, Result,
  counterparty::{CounterpartyKind, NameSnapshot},
  movement::{Counterparties, MovementKind, NewMovement},
  product::non_blank,
};

// ─── Net deltas ──────────────────────────────────────────────────────────────

/// Collapse `(product_id, signed_delta)` pairs into one net delta per product.
///
/// Products whose entries cancel out still appear (with a zero delta) so the
/// caller re-reads and reports them. Sums saturate rather than overflow; the
/// quantity checker rejects anything that large anyway.
pub fn net_deltas(
  lines: impl IntoIterator<Item = (i64, i64)>,
) -> BTreeMap<i64, i64> {
  let mut net = BTreeMap::new();
  for (product_id, delta) in lines {
    let entry: &mut i64 = net.entry(product_id).or_default();
    *entry = entry.saturating_add(delta);
  }
  net
}

// ─── Plan ────────────────────────────────────────────────────────────────────

/// A validated, not-yet-resolved line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedLine {
  pub product_id: i64,
  /// Signed according to the movement direction.
  pub delta:      i64,
}

/// A shape-validated movement request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementPlan {
  pub kind:           MovementKind,
  pub lines:          Vec<PlannedLine>,
  pub net:            BTreeMap<i64, i64>,
  pub counterparties: Counterparties,
  pub author_id:      Option<i64>,
  pub note:           Option<String>,
  pub date:           DateTime<Utc>,
}

impl MovementPlan {
  /// Validate `input` and compute per-product net deltas.
  ///
  /// Rejects empty item lists and non-positive quantities. Ids are checked
  /// later by [`Self::resolve`]. `now` is used when the request carries no
  /// explicit date.
  pub fn build(input: NewMovement, now: DateTime<Utc>) -> Result<Self> {
    if input.items.is_empty() {
      return Err(Error::EmptyMovement);
    }

    let mut lines = Vec::with_capacity(input.items.len());
    for item in &input.items {
      if item.quantity <= 0 {
        return Err(Error::InvalidDelta {
          product_id: item.product_id,
          delta:      item.quantity.to_string(),
        });
      }
      lines.push(PlannedLine {
        product_id: item.product_id,
        delta:      input.kind.signed(item.quantity),
      });
    }

    let net = net_deltas(lines.iter().map(|l| (l.product_id, l.delta)));

    Ok(Self {
      kind: input.kind,
      lines,
      net,
      counterparties: input.counterparties,
      author_id: input.author_id,
      note: non_blank(input.note),
      date: input.date.unwrap_or(now),
    })
  }

  /// Resolve every reference through `catalog`, snapshotting display names.
  ///
  /// Products are resolved in request order, so the first unknown id is the
  /// one reported. Counterparties are resolved supplier, destination, worker.
  pub fn resolve<C: Catalog>(
    self,
    catalog: &C,
  ) -> Result<ResolvedMovement, C::Error> {
    let mut snapshots: BTreeMap<i64, ProductSnapshot> = BTreeMap::new();
    for line in &self.lines {
      if snapshots.contains_key(&line.product_id) {
        continue;
      }
      let snapshot = catalog
        .product(line.product_id)?
        .ok_or(Error::ProductNotFound(line.product_id))?;
      snapshots.insert(line.product_id, snapshot);
    }

    let supplier = resolve_counterparty(
      catalog,
      CounterpartyKind::Supplier,
      self.counterparties.supplier_id,
    )?;
    let destination = resolve_counterparty(
      catalog,
      CounterpartyKind::Location,
      self.counterparties.destination_id,
    )?;
    let worker = resolve_counterparty(
      catalog,
      CounterpartyKind::Worker,
      self.counterparties.worker_id,
    )?;

    let lines = self
      .lines
      .iter()
      .map(|line| {
        let snapshot = &snapshots[&line.product_id];
        ResolvedLine {
          product_id:   line.product_id,
          product_name: snapshot.name.clone(),
          product_sku:  snapshot.sku.clone(),
          delta:        line.delta,
        }
      })
      .collect();

    Ok(ResolvedMovement {
      kind: self.kind,
      date: self.date,
      supplier,
      destination,
      worker,
      author_id: self.author_id,
      note: self.note,
      lines,
      net: self.net,
    })
  }
}

fn resolve_counterparty<C: Catalog>(
  catalog: &C,
  kind: CounterpartyKind,
  id: Option<i64>,
) -> Result<Option<NameSnapshot>, C::Error> {
  let Some(id) = id else { return Ok(None) };
  let name = catalog
    .counterparty(kind, id)?
    .ok_or(Error::CounterpartyNotFound { kind, id })?;
  Ok(Some(NameSnapshot { id, name }))
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

/// Identity fields of a product, copied into line items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSnapshot {
  pub id:   i64,
  pub name: String,
  pub sku:  Option<String>,
}

/// Read-only lookups the builder needs while resolving a plan.
///
/// Implementations must only return live (not soft-deleted) entities, and
/// should read inside the same unit of work that will apply the movement.
pub trait Catalog {
  type Error: From<Error>;

  fn product(&self, id: i64) -> Result<Option<ProductSnapshot>, Self::Error>;

  /// The current display name of a live counterparty.
  fn counterparty(
    &self,
    kind: CounterpartyKind,
    id: i64,
  ) -> Result<Option<String>, Self::Error>;
}

// ─── Resolved movement ───────────────────────────────────────────────────────

/// A line ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLine {
  pub product_id:   i64,
  pub product_name: String,
  pub product_sku:  Option<String>,
  pub delta:        i64,
}

/// A movement with all references resolved and names snapshotted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMovement {
  pub kind:        MovementKind,
  pub date:        DateTime<Utc>,
  pub supplier:    Option<NameSnapshot>,
  pub destination: Option<NameSnapshot>,
  pub worker:      Option<NameSnapshot>,
  pub author_id:   Option<i64>,
  pub note:        Option<String>,
  pub lines:       Vec<ResolvedLine>,
  pub net:         BTreeMap<i64, i64>,
}

// ─── Corrections ─────────────────────────────────────────────────────────────

/// The change needed to move a stored line item to a new magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Correction {
  /// The item's new signed delta.
  pub new_delta:  i64,
  /// What must be added to the product's quantity.
  pub adjustment: i64,
}

/// Plan an edit of a stored item from `old_delta` to magnitude `quantity`.
///
/// The sign comes from the stored delta, not from the parent movement.
pub fn correct_item(
  item_product: Option<i64>,
  old_delta: i64,
  quantity: i64,
) -> Result<Correction> {
  if quantity <= 0 {
    return Err(Error::InvalidDelta {
      product_id: item_product.unwrap_or_default(),
      delta:      quantity.to_string(),
    });
  }
  let new_delta = if old_delta < 0 { -quantity } else { quantity };
  Ok(Correction {
    new_delta,
    adjustment: new_delta - old_delta,
  })
}

/// Net quantity adjustments that undo the given `(product_id, delta)` items.
/// Items whose product was purged are skipped.
pub fn reversal(
  items: impl IntoIterator<Item = (Option<i64>, i64)>,
) -> BTreeMap<i64, i64> {
  net_deltas(
    items
      .into_iter()
      .filter_map(|(product, delta)| product.map(|p| (p, -delta))),
  )
}
