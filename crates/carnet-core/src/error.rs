//! Error types for `carnet-core`.

use thiserror::Error;

use crate::store::Container;

/// Errors raised by [`MemoryStore`](crate::memory::MemoryStore).
#[derive(Debug, Error)]
pub enum Error {
  #[error("document {id:?} already exists in {container}")]
  Conflict { container: Container, id: String },

  #[error("document has no string `id` field")]
  MissingId,

  #[error("seed file error: {0}")]
  Io(#[from] std::io::Error),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A failure below the lookup layer.
///
/// Unknown identifiers are *not* errors; they come back as `Ok(None)` or an
/// empty vector. This type only covers the store being unusable or returning
/// something that cannot be decoded.
#[derive(Debug, Error)]
pub enum LookupError {
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("malformed {container} document: {source}")]
  Decode {
    container: Container,
    #[source]
    source:    serde_json::Error,
  },
}

impl LookupError {
  pub(crate) fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    LookupError::Store(Box::new(e))
  }
}
