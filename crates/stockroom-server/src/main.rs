//! Stockroom server binary.
//!
//! Reads `stockroom.toml` (or the path given with `--config`) plus any
//! `STOCKROOM_*` environment overrides, opens the SQLite store, and serves the
//! JSON API over HTTP.
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for a `[[users]]` entry:
//!
//! ```sh
//! cargo run -p stockroom-server -- --hash-password
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use clap::Parser;
use rand_core::OsRng;
use stockroom_server::{AppState, ServerConfig, auth::AuthConfig};
use stockroom_store_sqlite::{SqliteStore, StoreOptions};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Stockroom inventory server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "stockroom.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  if cli.hash_password {
    println!("{}", hash_password(&read_password()?)?);
    return Ok(());
  }

  let cfg = load_config(cli.config)?;
  if cfg.users.is_empty() {
    tracing::warn!("no users configured; every /api request will be rejected");
  }

  let store_path = expand_tilde(&cfg.store_path);
  let store = SqliteStore::open_with(&store_path, StoreOptions {
    busy_timeout: Duration::from_millis(cfg.busy_timeout_ms),
  })
  .await
  .with_context(|| format!("failed to open store at {store_path:?}"))?;
  tracing::info!(path = %store_path.display(), "store opened");

  let app = stockroom_server::router(AppState {
    store: Arc::new(store),
    auth:  Arc::new(AuthConfig { users: cfg.users }),
  });

  let address = format!("{}:{}", cfg.host, cfg.port);
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;
  tracing::info!("serving on http://{address}");

  axum::serve(listener, app).await.context("server error")
}

/// File first, then `STOCKROOM_*` variables; `STOCKROOM_BUSY_TIMEOUT_MS=…`
/// overrides `busy_timeout_ms`.
fn load_config(path: PathBuf) -> anyhow::Result<ServerConfig> {
  config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(
      config::Environment::with_prefix("STOCKROOM")
        .prefix_separator("_")
        .separator("__"),
    )
    .build()
    .context("failed to read configuration")?
    .try_deserialize()
    .context("invalid configuration")
}

fn hash_password(password: &str) -> anyhow::Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))
}

fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  eprint!("Password: ");
  io::stderr().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_string())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  match (path.strip_prefix("~"), std::env::var_os("HOME")) {
    (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
    _ => path.to_path_buf(),
  }
}
