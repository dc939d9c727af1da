//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Domain rejections map onto status codes by class: validation → 422,
//! reference → 404, invariant → 409. Unreadable bodies keep axum's status
//! (usually 422). Everything else is a 500 whose details are logged rather
//! than returned.

use axum::{
  Json,
  extract::rejection::JsonRejection,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use stockroom_core::{ErrorClass, store::LedgerFailure};
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error(transparent)]
  Ledger(stockroom_core::Error),

  /// The body was missing, not JSON, or not the expected shape.
  #[error(transparent)]
  Body(#[from] JsonRejection),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Classify a backend error: domain rejections keep their variant, anything
  /// else becomes an opaque store failure.
  pub fn from_store<E>(err: E) -> Self
  where
    E: std::error::Error + LedgerFailure + Send + Sync + 'static,
  {
    match err.ledger_error() {
      Some(rejection) => Self::Ledger(rejection.clone()),
      None => Self::Store(Box::new(err)),
    }
  }
}

impl From<stockroom_core::Error> for ApiError {
  fn from(err: stockroom_core::Error) -> Self { Self::Ledger(err) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, kind, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m.clone()),
      ApiError::Ledger(e) => {
        let status = match e.class() {
          ErrorClass::Validation => StatusCode::UNPROCESSABLE_ENTITY,
          ErrorClass::Reference => StatusCode::NOT_FOUND,
          ErrorClass::Invariant => StatusCode::CONFLICT,
        };
        (status, e.code(), e.to_string())
      }
      ApiError::Body(rejection) => {
        (rejection.status(), "invalid_body", rejection.body_text())
      }
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          "internal",
          "internal error; nothing was committed".to_owned(),
        )
      }
    };
    (status, Json(json!({ "error": message, "kind": kind }))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use axum::body::to_bytes;

  use super::*;

  async fn body_of(err: ApiError) -> (StatusCode, serde_json::Value) {
    let resp = err.into_response();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
  }

  #[tokio::test]
  async fn classes_map_to_status_codes() {
    let (status, body) =
      body_of(stockroom_core::Error::EmptyMovement.into()).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "empty_movement");

    let (status, _) =
      body_of(stockroom_core::Error::ToolNotFound(3).into()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = body_of(
      stockroom_core::Error::InsufficientStock {
        product_id: 1,
        product:    "Bolts".into(),
        available:  2,
        requested:  5,
      }
      .into(),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "insufficient_stock");
    assert!(body["error"].as_str().unwrap().contains("Bolts"));
  }

  #[tokio::test]
  async fn store_failures_are_opaque() {
    let err = ApiError::Store(Box::new(std::io::Error::other("disk on fire")));
    let (status, body) = body_of(err).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body["error"].as_str().unwrap().contains("disk"));
  }
}
