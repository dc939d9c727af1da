//! SQLite backend for the Stockroom inventory ledger.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every mutation runs inside one
//! `BEGIN IMMEDIATE` transaction, which takes SQLite's write lock up front;
//! quantities are re-read and changed with `quantity = quantity + ?` inside
//! that transaction.

mod catalog;
mod encode;
mod ledger;
mod reports;
mod schema;
mod store;
mod tools;

pub mod error;

pub use error::{Error, Result};
pub use store::{SqliteStore, StoreOptions};

#[cfg(test)]
mod tests;
