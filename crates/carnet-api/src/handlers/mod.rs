pub mod health;
pub mod login;
pub mod me;
pub mod promotions;

use serde_json::{Map, Value};

/// Read a request field as trimmed text. Numbers are accepted and rendered
/// as written; anything else, or blank text, counts as absent.
pub(super) fn text_field(body: &Map<String, Value>, key: &str) -> Option<String> {
  match body.get(key)? {
    Value::String(s) => Some(s.trim().to_owned()).filter(|s| !s.is_empty()),
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}
