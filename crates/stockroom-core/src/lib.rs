//! Core types and trait definitions for the Stockroom inventory ledger.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Everything that decides whether a stock movement is acceptable lives here;
//! storage backends only execute the plans built by [`ledger`] and [`tool`].

pub mod counterparty;
pub mod error;
pub mod ledger;
pub mod movement;
pub mod product;
pub mod quantity;
pub mod report;
pub mod store;
pub mod tool;

pub use error::{EntityKind, Error, ErrorClass, Result};
