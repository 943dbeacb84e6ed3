//! Raw documents and the two read-only domain shapes built on top of them.
//!
//! Profiles and events are schemaless on the store side: the external system
//! of record decides which display fields exist. They are therefore kept as
//! JSON objects and only the fields this backend relies on get accessors.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A JSON object as returned by the document store.
pub type Document = Map<String, Value>;

/// Metadata fields the store adds to every document. None of them may leave
/// the lookup layer.
pub const INTERNAL_FIELDS: [&str; 5] =
  ["_rid", "_etag", "_ts", "_self", "_attachments"];

/// Remove every storage-internal field from `doc`.
pub fn strip_internal(mut doc: Document) -> Document {
  for field in INTERNAL_FIELDS {
    doc.remove(field);
  }
  doc
}

/// Returns `true` if `doc` still carries any storage-internal field.
pub fn has_internal_fields(doc: &Document) -> bool {
  INTERNAL_FIELDS.iter().any(|f| doc.contains_key(*f))
}

// ─── Profile ─────────────────────────────────────────────────────────────────

/// A student's digital ID ("carnet").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Profile(Document);

impl Profile {
  pub const MATRICULA_FIELD: &'static str = "matricula";
  pub const EMAIL_FIELD: &'static str = "correo";

  /// Wrap a store document, dropping its internal metadata.
  pub fn from_document(doc: Document) -> Self { Self(strip_internal(doc)) }

  /// Point-read key for the profile of `matricula`.
  pub fn key_for(matricula: &str) -> String { format!("carnet:{matricula}") }

  pub fn matricula(&self) -> Option<&str> {
    self.0.get(Self::MATRICULA_FIELD).and_then(Value::as_str)
  }

  /// The registered email, if the field is present and a non-empty string.
  pub fn email(&self) -> Option<&str> {
    self
      .0
      .get(Self::EMAIL_FIELD)
      .and_then(Value::as_str)
      .filter(|e| !e.trim().is_empty())
  }

  pub fn as_document(&self) -> &Document { &self.0 }
}

// ─── Event ───────────────────────────────────────────────────────────────────

/// An appointment ("cita") belonging to exactly one matricula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Event(Document);

impl Event {
  pub const MATRICULA_FIELD: &'static str = "matricula";
  pub const START_FIELD: &'static str = "inicio";

  pub fn from_document(doc: Document) -> Self { Self(strip_internal(doc)) }

  pub fn as_document(&self) -> &Document { &self.0 }
}
