//! The quantity invariant checker.
//!
//! Every stored quantity (product stock, tool totals) lives in
//! `[0, MAX_QUANTITY]`. [`check`] is the single place that decides whether a
//! signed change keeps a quantity inside those bounds. It must be applied to
//! the *net* change for a product, never to individual line items that share
//! a target.

use crate::Error;

/// Hard ceiling on any stored quantity.
pub const MAX_QUANTITY: i64 = 65_535;

/// Why a proposed change was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
  /// `current + delta < 0`.
  Insufficient { available: i64, requested: i64 },
  /// `current + delta > MAX_QUANTITY`.
  Ceiling { current: i64, requested: i64 },
}

/// Apply `delta` to `current`, returning the new quantity or the violation.
pub fn check(current: i64, delta: i64) -> Result<i64, Violation> {
  match current.checked_add(delta) {
    Some(next) if (0..=MAX_QUANTITY).contains(&next) => Ok(next),
    Some(next) if next < 0 => Err(Violation::Insufficient {
      available: current,
      requested: delta.saturating_neg(),
    }),
    None if delta < 0 => Err(Violation::Insufficient {
      available: current,
      requested: delta.saturating_neg(),
    }),
    _ => Err(Violation::Ceiling { current, requested: delta }),
  }
}

impl Violation {
  /// Attach product context to the violation.
  pub fn for_product(self, product_id: i64, product: &str) -> Error {
    match self {
      Self::Insufficient { available, requested } => Error::InsufficientStock {
        product_id,
        product: product.to_owned(),
        available,
        requested,
      },
      Self::Ceiling { current, requested } => Error::StockCeilingExceeded {
        product_id,
        product: product.to_owned(),
        current,
        requested,
        max: MAX_QUANTITY,
      },
    }
  }
}

#[cfg(test)]
mod tests {
  use proptest::prelude::*;

  use super::*;

  #[test]
  fn accepts_exact_bounds() {
    assert_eq!(check(10, -10), Ok(0));
    assert_eq!(check(65_530, 5), Ok(MAX_QUANTITY));
    assert_eq!(check(0, 0), Ok(0));
  }

  #[test]
  fn rejects_below_zero() {
    assert_eq!(
      check(8, -10),
      Err(Violation::Insufficient { available: 8, requested: 10 })
    );
  }

  #[test]
  fn rejects_above_ceiling() {
    assert_eq!(
      check(65_530, 10),
      Err(Violation::Ceiling { current: 65_530, requested: 10 })
    );
  }

  #[test]
  fn extreme_deltas_do_not_overflow() {
    assert!(matches!(
      check(5, i64::MIN),
      Err(Violation::Insufficient { available: 5, .. })
    ));
    assert!(matches!(check(5, i64::MAX), Err(Violation::Ceiling { .. })));
  }

  #[test]
  fn violation_carries_product_context() {
    let err = check(0, -1).unwrap_err().for_product(3, "Gloves");
    assert_eq!(
      err,
      Error::InsufficientStock {
        product_id: 3,
        product:    "Gloves".into(),
        available:  0,
        requested:  1,
      }
    );
  }

  proptest! {
    #[test]
    fn accepted_results_stay_in_bounds(
      current in 0..=MAX_QUANTITY,
      delta in -200_000i64..200_000,
    ) {
      match check(current, delta) {
        Ok(next) => {
          prop_assert!((0..=MAX_QUANTITY).contains(&next));
          prop_assert_eq!(next, current + delta);
        }
        Err(Violation::Insufficient { .. }) => prop_assert!(current + delta < 0),
        Err(Violation::Ceiling { .. }) => prop_assert!(current + delta > MAX_QUANTITY),
      }
    }
  }
}
