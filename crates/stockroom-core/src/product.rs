//! Products: the named stock-keeping entities whose quantities the ledger
//! maintains.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Names ───────────────────────────────────────────────────────────────────

/// A display name together with its case-folded form.
///
/// The normalised form is what uniqueness checks compare, so "Steel  Bolts"
/// and "steel bolts" collide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanName {
  pub display:    String,
  pub normalized: String,
}

impl CleanName {
  /// Trim, collapse internal whitespace, and case-fold `raw`.
  pub fn parse(raw: &str) -> Result<Self> {
    let display = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if display.is_empty() {
      return Err(Error::InvalidName(raw.to_owned()));
    }
    let normalized = display.to_lowercase();
    Ok(Self { display, normalized })
  }
}

// ─── Product ─────────────────────────────────────────────────────────────────

/// A product with its cached stock quantity.
///
/// `quantity` is derived: it always equals the signed sum of the live line
/// items recorded against the product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
  pub id:              i64,
  pub name:            String,
  pub name_normalized: String,
  pub unit:            String,
  pub sku:             Option<String>,
  pub quantity:        i64,
  pub deleted:         bool,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

/// Input to [`crate::store::InventoryStore::create_product`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
  pub name:             String,
  pub unit:             String,
  pub sku:              Option<String>,
  /// Recorded as an inbound movement in the same unit of work when non-zero.
  #[serde(default)]
  pub initial_quantity: i64,
}

impl NewProduct {
  pub fn new(name: impl Into<String>, unit: impl Into<String>) -> Self {
    Self {
      name:             name.into(),
      unit:             unit.into(),
      sku:              None,
      initial_quantity: 0,
    }
  }
}

/// Narrow edit of a product's descriptive fields. Quantity is never editable
/// directly; it only moves through the ledger.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductPatch {
  pub name: Option<String>,
  pub unit: Option<String>,
  /// An empty string clears the SKU.
  pub sku:  Option<String>,
}

/// Parameters for [`crate::store::InventoryStore::list_products`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductQuery {
  /// Case-insensitive substring match over name and SKU.
  pub text:            Option<String>,
  #[serde(default)]
  pub include_deleted: bool,
}

/// What a hard purge removed alongside the product row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeSummary {
  pub items_removed:     usize,
  pub movements_removed: usize,
}

/// Normalise an optional free-text field: blank becomes `None`.
pub fn non_blank(value: Option<String>) -> Option<String> {
  value
    .map(|v| v.trim().to_owned())
    .filter(|v| !v.is_empty())
}
