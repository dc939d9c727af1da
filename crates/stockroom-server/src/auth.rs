//! HTTP Basic authentication and role gating for the `/api` routes.

use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  extract::{Request, State},
  http::{HeaderMap, Method, header},
  middleware::Next,
  response::Response,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use serde::Deserialize;
use stockroom_api::Actor;

use crate::error::Error;

/// What a user may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  /// Everything, including purges.
  Admin,
  /// Reads and ordinary mutations.
  Clerk,
  /// Reads only.
  Viewer,
}

/// One configured account.
#[derive(Debug, Clone, Deserialize)]
pub struct UserConfig {
  /// Recorded as the author of movements the user creates.
  pub id:            i64,
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
  pub role:          Role,
}

/// Accounts accepted by this server instance.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
  pub users: Vec<UserConfig>,
}

/// Split an `Authorization: Basic …` header into username and password.
fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
  let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
  let decoded = B64.decode(value.strip_prefix("Basic ")?).ok()?;
  let creds = String::from_utf8(decoded).ok()?;
  let (username, password) = creds.split_once(':')?;
  Some((username.to_string(), password.to_string()))
}

impl AuthConfig {
  fn find(&self, username: &str) -> Option<&UserConfig> {
    self.users.iter().find(|u| u.username == username)
  }
}

impl UserConfig {
  /// Hashes that fail to parse never match.
  fn accepts(&self, password: &str) -> bool {
    PasswordHash::new(&self.password_hash).is_ok_and(|hash| {
      Argon2::default()
        .verify_password(password.as_bytes(), &hash)
        .is_ok()
    })
  }
}

/// Verify Basic credentials from headers and return the matching user.
pub fn verify_auth<'a>(
  headers: &HeaderMap,
  config: &'a AuthConfig,
) -> Result<&'a UserConfig, Error> {
  let (username, password) =
    basic_credentials(headers).ok_or(Error::Unauthorized)?;
  config
    .find(&username)
    .filter(|user| user.accepts(&password))
    .ok_or(Error::Unauthorized)
}

/// Decide whether `role` may issue `method` against `path`.
pub fn authorize(role: Role, method: &Method, path: &str) -> Result<(), Error> {
  let read_only = matches!(*method, Method::GET | Method::HEAD);
  match role {
    Role::Viewer if !read_only => Err(Error::Forbidden("viewers are read-only")),
    Role::Admin => Ok(()),
    _ if path.ends_with("/purge") => {
      Err(Error::Forbidden("purging requires an admin"))
    }
    _ => Ok(()),
  }
}

/// Middleware: authenticate, gate by role, and attach the [`Actor`].
pub async fn require_user(
  State(auth): State<Arc<AuthConfig>>,
  mut req: Request,
  next: Next,
) -> Result<Response, Error> {
  let user = verify_auth(req.headers(), &auth).inspect_err(|_| {
    tracing::debug!(path = %req.uri().path(), "rejected credentials");
  })?;
  authorize(user.role, req.method(), req.uri().path()).inspect_err(|e| {
    tracing::info!(user = %user.username, method = %req.method(), path = %req.uri().path(), "{e}");
  })?;

  req.extensions_mut().insert(Actor { id: user.id });
  Ok(next.run(req).await)
}
