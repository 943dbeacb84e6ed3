//! carnet backend server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered with
//! `CARNET_*` environment variables, connects the configured document store
//! and serves the HTTP API until SIGINT/SIGTERM.
//!
//! # Promotion key hashes
//!
//! To generate an argon2 PHC string for `promotion_key_hashes`:
//!
//! ```sh
//! cargo run -p carnet-api --bin carnet-server -- --hash-key
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use carnet_api::{AppState, ServerConfig, StoreConfig};
use carnet_core::{memory::MemoryStore, store::DocumentStore};
use carnet_store_cosmos::CosmosStore;
use clap::Parser;
use rand_core::OsRng;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Student carnet backend")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a secret read from stdin and exit.
  #[arg(long)]
  hash_key: bool,
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

  if cli.hash_key {
    let secret = read_secret()?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(secret.as_bytes(), &salt)
      .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
      .to_string();
    println!("{hash}");
    return Ok(());
  }

  let config = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to read {}", cli.config.display()))?;
  config.validate().context("invalid configuration")?;

  match config.store.clone() {
    StoreConfig::Cosmos(cosmos) => {
      tracing::info!(endpoint = %cosmos.endpoint, database = %cosmos.database, "using cosmos db store");
      let store = CosmosStore::new(cosmos).context("failed to build cosmos client")?;
      serve(store, config).await
    }
    StoreConfig::Memory { seed_path } => {
      let store = match seed_path {
        Some(path) => MemoryStore::load(&path)
          .await
          .with_context(|| format!("failed to load seed {}", path.display()))?,
        None => MemoryStore::new(),
      };
      tracing::warn!("using in-memory store; data is lost on exit");
      serve(store, config).await
    }
  }
}

async fn serve<S>(store: S, config: ServerConfig) -> anyhow::Result<()>
where
  S: DocumentStore + 'static,
{
  let address = format!("{}:{}", config.host, config.port);
  let state = AppState::new(Arc::new(store), config);
  let app = carnet_api::router(state);

  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;
  tracing::info!("Listening on http://{address}");

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  tracing::info!("server stopped");
  Ok(())
}

async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = tokio::signal::ctrl_c().await {
      tracing::error!("failed to listen for Ctrl+C: {e}");
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    use tokio::signal::unix::{SignalKind, signal};
    match signal(SignalKind::terminate()) {
      Ok(mut sig) => {
        sig.recv().await;
      }
      Err(e) => {
        tracing::error!("failed to install SIGTERM handler: {e}");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
    _ = terminate => tracing::info!("received terminate signal, shutting down"),
  }
}

/// Read a secret from stdin.
fn read_secret() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Secret: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_string())
}
