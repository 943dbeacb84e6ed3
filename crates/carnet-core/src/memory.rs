//! [`MemoryStore`]: an in-process [`DocumentStore`].
//!
//! Used by the test suites and by the `memory` backend for local development.
//! Inserted documents receive the same metadata fields a managed document
//! database adds, so the stripping rules are exercised end to end.

use std::{collections::HashMap, future::Future, path::Path, sync::Arc};

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
  Error, Result,
  document::Document,
  query::Query,
  store::{Container, DocumentStore},
};

/// Initial contents for a [`MemoryStore`], keyed by container name.
///
/// ```json
/// { "carnets": [ { "id": "carnet:2025", "matricula": "2025", "correo": "a@x.mx" } ],
///   "citas":   [ { "matricula": "2025", "inicio": "2025-10-06T10:00:00Z" } ] }
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(transparent)]
pub struct Seed(pub HashMap<Container, Vec<Document>>);

/// A document store held entirely in memory.
///
/// Cloning is cheap; clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
  containers: Arc<RwLock<HashMap<Container, Vec<Document>>>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  /// Build a store from seed data. Documents without an `id` get a random
  /// one.
  pub async fn from_seed(seed: Seed) -> Result<Self> {
    let store = Self::new();
    for (container, docs) in seed.0 {
      for mut doc in docs {
        if !doc.contains_key("id") {
          doc.insert("id".into(), Value::String(Uuid::new_v4().to_string()));
        }
        store.insert(container, doc).await?;
      }
    }
    Ok(store)
  }

  /// Read a JSON seed file and build a store from it.
  pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
    let bytes = tokio::fs::read(path).await?;
    let seed: Seed = serde_json::from_slice(&bytes)?;
    Self::from_seed(seed).await
  }

  /// Insert a document, stamping storage metadata on it.
  pub async fn insert(&self, container: Container, mut doc: Document) -> Result<Document> {
    let id = doc
      .get("id")
      .and_then(Value::as_str)
      .ok_or(Error::MissingId)?
      .to_owned();

    let mut guard = self.containers.write().await;
    let docs = guard.entry(container).or_default();
    if docs.iter().any(|d| d.get("id").and_then(Value::as_str) == Some(&id)) {
      return Err(Error::Conflict { container, id });
    }

    stamp_metadata(&mut doc, container, &id);
    docs.push(doc.clone());
    Ok(doc)
  }

  /// Number of documents currently held in `container`.
  pub async fn count(&self, container: Container) -> usize {
    self
      .containers
      .read()
      .await
      .get(&container)
      .map_or(0, Vec::len)
  }
}

fn stamp_metadata(doc: &mut Document, container: Container, id: &str) {
  let rid = Uuid::new_v4().simple().to_string();
  doc.insert("_rid".into(), Value::String(rid[..12].to_owned()));
  doc.insert("_etag".into(), Value::String(format!("\"{}\"", Uuid::new_v4())));
  doc.insert("_ts".into(), Value::from(Utc::now().timestamp()));
  doc.insert(
    "_self".into(),
    Value::String(format!("dbs/local/colls/{container}/docs/{id}/")),
  );
  doc.insert("_attachments".into(), Value::String("attachments/".into()));
}

impl DocumentStore for MemoryStore {
  type Error = Error;

  fn read<'a>(
    &'a self,
    container: Container,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<Document>>> + Send + 'a {
    async move {
      let guard = self.containers.read().await;
      Ok(
        guard
          .get(&container)
          .and_then(|docs| {
            docs
              .iter()
              .find(|d| d.get("id").and_then(Value::as_str) == Some(id))
          })
          .cloned(),
      )
    }
  }

  fn query<'a>(
    &'a self,
    container: Container,
    query: &'a Query,
  ) -> impl Future<Output = Result<Vec<Document>>> + Send + 'a {
    async move {
      let mut matched: Vec<Document> = {
        let guard = self.containers.read().await;
        guard
          .get(&container)
          .map(|docs| {
            docs
              .iter()
              .filter(|d| query.filter.matches(d))
              .cloned()
              .collect()
          })
          .unwrap_or_default()
      };
      query.sort(&mut matched);
      Ok(matched)
    }
  }

  fn create(
    &self,
    container: Container,
    doc: Document,
  ) -> impl Future<Output = Result<Document>> + Send + '_ {
    self.insert(container, doc)
  }
}
