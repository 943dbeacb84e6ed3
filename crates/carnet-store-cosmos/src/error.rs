//! Error type for `carnet-store-cosmos`.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("master key is not valid base64: {0}")]
  MasterKey(#[from] base64::DecodeError),

  #[error("document id {0:?} contains a character Cosmos DB does not allow")]
  InvalidId(String),

  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("cosmos db returned {status}: {message}")]
  Status { status: StatusCode, message: String },

  #[error("unexpected response body: {0}")]
  Body(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
