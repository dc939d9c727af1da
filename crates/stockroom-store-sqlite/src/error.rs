//! Error type for `stockroom-store-sqlite`.

use stockroom_core::store::LedgerFailure;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A domain rejection; nothing was written.
  #[error(transparent)]
  Ledger(#[from] stockroom_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown {column} value: {value:?}")]
  Decode { column: &'static str, value: String },

  /// A row changed between the in-transaction read and the increment.
  #[error("post-condition failed: {0}")]
  PostCondition(String),
}

impl LedgerFailure for Error {
  fn ledger_error(&self) -> Option<&stockroom_core::Error> {
    match self {
      Self::Ledger(e) => Some(e),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
