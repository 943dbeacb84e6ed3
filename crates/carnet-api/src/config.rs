//! Runtime configuration, read once at startup from `config.toml` and
//! `CARNET_*` environment variables.

use std::path::{Path, PathBuf};

use argon2::PasswordHash;
use axum::http::HeaderValue;
use carnet_store_cosmos::CosmosConfig;
use serde::Deserialize;
use thiserror::Error;

/// Placeholder value from the deployment templates.
const PLACEHOLDER_SECRET: &str = "CAMBIA_ESTA_CLAVE";

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to load configuration: {0}")]
  Load(#[from] ::config::ConfigError),
  #[error("jwt_secret must be set")]
  MissingSecret,
  #[error("jwt_secret still has the placeholder value")]
  PlaceholderSecret,
  #[error("jwt_expires_min must be greater than zero")]
  ZeroExpiry,
  #[error("promotion_key_hashes[{index}] is not an argon2 PHC string: {reason}")]
  KeyHash { index: usize, reason: String },
  #[error("allowed origin {0:?} is not a valid header value")]
  Origin(String),
}

/// Where documents live.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
  Cosmos(CosmosConfig),
  /// In-process store, optionally seeded from a JSON file.
  Memory { seed_path: Option<PathBuf> },
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                 String,
  #[serde(default = "default_port")]
  pub port:                 u16,
  /// Reported by `/_health`.
  #[serde(default = "default_service_name")]
  pub service_name:         String,
  pub jwt_secret:           String,
  #[serde(default = "default_jwt_expires_min")]
  pub jwt_expires_min:      u64,
  /// argon2 hashes of the secret accepted by `POST /promociones/health`.
  #[serde(default)]
  pub promotion_key_hashes: Vec<String>,
  #[serde(default = "default_allowed_origins")]
  pub allowed_origins:      Vec<String>,
  pub store:                StoreConfig,
}

fn default_host() -> String { "0.0.0.0".to_owned() }

fn default_port() -> u16 { 10000 }

fn default_service_name() -> String { "alumno-backend".to_owned() }

fn default_jwt_expires_min() -> u64 { 120 }

fn default_allowed_origins() -> Vec<String> {
  [
    "https://app.carnetdigital.space",
    "https://carnetdigital.space",
    "https://www.carnetdigital.space",
    "https://edukshare-max.github.io",
    "http://localhost:5173",
    "http://127.0.0.1:3000",
  ]
  .into_iter()
  .map(str::to_owned)
  .collect()
}

impl ServerConfig {
  /// Layer the optional TOML file at `path` under `CARNET_*` environment
  /// variables. Nested keys use `__`, e.g. `CARNET_STORE__KEY`; list values
  /// are comma-separated.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let settings = ::config::Config::builder()
      .add_source(::config::File::from(path).required(false))
      .add_source(
        ::config::Environment::with_prefix("CARNET")
          .prefix_separator("_")
          .separator("__")
          .list_separator(",")
          .with_list_parse_key("allowed_origins")
          .with_list_parse_key("promotion_key_hashes")
          .try_parsing(true),
      )
      .build()?;
    Ok(settings.try_deserialize()?)
  }

  /// Reject configurations the server must not start with.
  pub fn validate(&self) -> Result<(), ConfigError> {
    let secret = self.jwt_secret.trim();
    if secret.is_empty() {
      return Err(ConfigError::MissingSecret);
    }
    if secret == PLACEHOLDER_SECRET {
      return Err(ConfigError::PlaceholderSecret);
    }
    if secret.len() < 32 {
      tracing::warn!("jwt_secret is shorter than 32 bytes");
    }
    if self.jwt_expires_min == 0 {
      return Err(ConfigError::ZeroExpiry);
    }

    for (index, hash) in self.promotion_key_hashes.iter().enumerate() {
      PasswordHash::new(hash).map_err(|e| ConfigError::KeyHash {
        index,
        reason: e.to_string(),
      })?;
    }
    if self.promotion_key_hashes.is_empty() {
      tracing::warn!("no promotion_key_hashes configured; promotion writes are disabled");
    }

    self.origin_headers().map(|_| ())
  }

  /// Allowed origins as header values. A `*` wildcard is refused: the
  /// allow-list is sent with credentials, which browsers never pair with `*`.
  pub fn origin_headers(&self) -> Result<Vec<HeaderValue>, ConfigError> {
    self
      .allowed_origins
      .iter()
      .map(|o| match o.trim() {
        "*" => Err(ConfigError::Origin(o.clone())),
        _ => HeaderValue::from_str(o).map_err(|_| ConfigError::Origin(o.clone())),
      })
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn base() -> ServerConfig {
    serde_json::from_value(serde_json::json!({
      "jwt_secret": "0123456789abcdef0123456789abcdef",
      "store": { "backend": "memory" }
    }))
    .unwrap()
  }

  #[test]
  fn defaults() {
    let cfg = base();
    assert_eq!(cfg.port, 10000);
    assert_eq!(cfg.jwt_expires_min, 120);
    assert_eq!(cfg.allowed_origins.len(), 6);
    assert!(matches!(cfg.store, StoreConfig::Memory { seed_path: None }));
    assert!(cfg.validate().is_ok());
  }

  #[test]
  fn cosmos_backend_deserializes() {
    let cfg: ServerConfig = serde_json::from_value(serde_json::json!({
      "jwt_secret": "s",
      "store": {
        "backend": "cosmos",
        "endpoint": "https://x.documents.azure.com",
        "key": "a2V5",
        "database": "SASU",
        "carnets_container": "carnets_id",
        "citas_container": "cita_id"
      }
    }))
    .unwrap();
    let StoreConfig::Cosmos(cosmos) = cfg.store else { panic!("expected cosmos") };
    assert_eq!(cosmos.database, "SASU");
  }

  #[test]
  fn rejects_bad_secrets() {
    let mut cfg = base();
    cfg.jwt_secret = "  ".into();
    assert!(matches!(cfg.validate(), Err(ConfigError::MissingSecret)));
    cfg.jwt_secret = PLACEHOLDER_SECRET.into();
    assert!(matches!(cfg.validate(), Err(ConfigError::PlaceholderSecret)));
  }

  #[test]
  fn rejects_malformed_key_hash() {
    let mut cfg = base();
    cfg.promotion_key_hashes = vec!["plaintext".into()];
    assert!(matches!(cfg.validate(), Err(ConfigError::KeyHash { index: 0, .. })));
  }

  #[test]
  fn rejects_unrepresentable_origin() {
    let mut cfg = base();
    cfg.allowed_origins = vec!["https://ok.example".into(), "bad\norigin".into()];
    assert!(matches!(cfg.validate(), Err(ConfigError::Origin(_))));
  }

  #[test]
  fn rejects_wildcard_origin() {
    let mut cfg = base();
    cfg.allowed_origins = vec!["https://ok.example".into(), "*".into()];
    assert!(matches!(cfg.validate(), Err(ConfigError::Origin(o)) if o == "*"));
  }
}
