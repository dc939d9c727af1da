//! Error types and axum `IntoResponse` implementation for the auth layer.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unauthorized")]
  Unauthorized,
  #[error("forbidden: {0}")]
  Forbidden(&'static str),
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    match self {
      Error::Unauthorized => {
        let mut res = (
          StatusCode::UNAUTHORIZED,
          Json(json!({ "error": "unauthorized", "kind": "unauthorized" })),
        )
          .into_response();
        res.headers_mut().insert(
          header::WWW_AUTHENTICATE,
          HeaderValue::from_static("Basic realm=\"stockroom\""),
        );
        res
      }
      Error::Forbidden(reason) => (
        StatusCode::FORBIDDEN,
        Json(json!({ "error": reason, "kind": "forbidden" })),
      )
        .into_response(),
    }
  }
}
