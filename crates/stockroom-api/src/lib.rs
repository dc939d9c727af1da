//! JSON REST API for Stockroom.
//!
//! Exposes an axum [`Router`] backed by any
//! [`stockroom_core::store::InventoryStore`]. Auth, TLS, and transport
//! concerns are the caller's responsibility; an auth layer may attach an
//! [`Actor`] extension to each request, whose id is recorded as the author of
//! new movements.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", stockroom_api::api_router(store.clone()))
//! ```

pub mod counterparties;
pub mod error;
pub mod extract;
pub mod movements;
pub mod products;
pub mod reports;
pub mod tools;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, patch, post, put},
};
use stockroom_core::store::InventoryStore;

pub use error::ApiError;
pub use extract::JsonBody;

/// The authenticated caller, inserted as a request extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
  pub id: i64,
}

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: InventoryStore + 'static,
{
  Router::new()
    // Products
    .route("/products", get(products::list::<S>).post(products::create::<S>))
    .route(
      "/products/{id}",
      get(products::get_one::<S>)
        .patch(products::update::<S>)
        .delete(products::delete::<S>),
    )
    .route("/products/{id}/purge", post(products::purge::<S>))
    // Counterparties
    .route(
      "/counterparties/{kind}",
      get(counterparties::list::<S>).post(counterparties::create::<S>),
    )
    .route(
      "/counterparties/{kind}/{id}",
      get(counterparties::get_one::<S>)
        .patch(counterparties::rename::<S>)
        .delete(counterparties::delete::<S>),
    )
    // Movements
    .route("/movements", get(movements::list::<S>).post(movements::create::<S>))
    .route(
      "/movements/{id}",
      get(movements::get_one::<S>).delete(movements::delete::<S>),
    )
    .route("/movements/{id}/note", put(movements::set_note::<S>))
    .route(
      "/movements/{id}/items/{item_id}",
      patch(movements::edit_item::<S>).delete(movements::delete_item::<S>),
    )
    // Tools
    .route("/tools", get(tools::list::<S>).post(tools::create::<S>))
    .route("/tools/{id}", get(tools::get_one::<S>).delete(tools::delete::<S>))
    .route("/tools/{id}/purge", post(tools::purge::<S>))
    .route("/tools/{id}/total", put(tools::set_total::<S>))
    .route("/tools/{id}/assign", post(tools::assign::<S>))
    .route("/tools/{id}/return", post(tools::return_units::<S>))
    .route("/assignments", get(tools::assignments::<S>))
    // Reports
    .route("/reports/turnover", get(reports::turnover::<S>))
    .route("/reports/forecast", get(reports::forecast::<S>))
    .route("/reports/workers", get(reports::workers::<S>))
    .route(
      "/reports/counterparties/{kind}",
      get(reports::counterparties::<S>),
    )
    .with_state(store)
}
