//! The `DocumentStore` trait and the containers it serves.
//!
//! The trait is implemented by storage backends (`MemoryStore` here,
//! `CosmosStore` in `carnet-store-cosmos`). The lookup layer and the HTTP
//! crate depend on this abstraction only.

use std::{fmt, future::Future};

use serde::Deserialize;

use crate::{document::Document, query::Query};

/// Logical collections the backend reads from or writes to. Backends map
/// these to their own physical names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
  Carnets,
  Citas,
  Promociones,
}

impl Container {
  pub fn as_str(self) -> &'static str {
    match self {
      Container::Carnets => "carnets",
      Container::Citas => "citas",
      Container::Promociones => "promociones",
    }
  }
}

impl fmt::Display for Container {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Abstraction over a managed document database.
///
/// Every call is a single attempt: no retries happen at this level or above.
/// Documents are returned exactly as stored, internal metadata included;
/// stripping is the caller's job.
pub trait DocumentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Point read by document id. `Ok(None)` is the distinguishable "not
  /// found" outcome; every other failure is an `Err`.
  fn read<'a>(
    &'a self,
    container: Container,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<Document>, Self::Error>> + Send + 'a;

  /// Run a filtered query. Results honour `query.order_by`; documents that
  /// compare equal keep their storage order.
  fn query<'a>(
    &'a self,
    container: Container,
    query: &'a Query,
  ) -> impl Future<Output = Result<Vec<Document>, Self::Error>> + Send + 'a;

  /// Create a new document and return it as stored. The document must carry
  /// a string `id`.
  fn create(
    &self,
    container: Container,
    doc: Document,
  ) -> impl Future<Output = Result<Document, Self::Error>> + Send + '_;
}
