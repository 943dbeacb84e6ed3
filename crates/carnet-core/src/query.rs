//! A deliberately small filter language for [`DocumentStore::query`].
//!
//! Only what the lookup layer needs is expressible: equality on top-level
//! fields combined with `AND` / `OR`, and an optional single-field ordering.
//! Backends either translate a [`Query`] into their native language or
//! evaluate it in process with [`Filter::matches`] and [`Query::sort`].
//!
//! [`DocumentStore::query`]: crate::store::DocumentStore::query

use std::cmp::Ordering;

use serde_json::Value;

use crate::document::Document;

/// A boolean predicate over a document.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
  /// `doc[field] == value`. A missing field never matches.
  Eq(String, Value),
  And(Vec<Filter>),
  Or(Vec<Filter>),
}

impl Filter {
  pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
    Filter::Eq(field.into(), value.into())
  }

  pub fn matches(&self, doc: &Document) -> bool {
    match self {
      Filter::Eq(field, value) => {
        doc.get(field).is_some_and(|v| values_equal(v, value))
      }
      Filter::And(all) => all.iter().all(|f| f.matches(doc)),
      Filter::Or(any) => any.iter().any(|f| f.matches(doc)),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
  Asc,
  Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
  pub field:     String,
  pub direction: Direction,
}

/// Parameters for [`DocumentStore::query`](crate::store::DocumentStore::query).
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
  pub filter:   Filter,
  pub order_by: Option<OrderBy>,
}

impl Query {
  pub fn filter(filter: Filter) -> Self { Self { filter, order_by: None } }

  pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
    self.order_by = Some(OrderBy { field: field.into(), direction });
    self
  }

  /// Sort `docs` by the query ordering, if any.
  ///
  /// The sort is stable: documents that compare equal keep the order the
  /// store returned them in.
  pub fn sort(&self, docs: &mut [Document]) {
    let Some(order) = &self.order_by else { return };
    docs.sort_by(|a, b| {
      let ord = compare_values(a.get(&order.field), b.get(&order.field));
      match order.direction {
        Direction::Asc => ord,
        Direction::Desc => ord.reverse(),
      }
    });
  }
}

// ─── Value semantics ─────────────────────────────────────────────────────────

/// Equality as the document store applies it: numbers compare by value, so
/// `1` and `1.0` are equal.
pub fn values_equal(a: &Value, b: &Value) -> bool {
  match (a, b) {
    (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
    _ => a == b,
  }
}

/// Total order over optional JSON values following the document store's
/// cross-type ordering: undefined < null < bool < number < string. Arrays and
/// objects sort after strings and compare equal among themselves.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
  fn rank(v: Option<&Value>) -> u8 {
    match v {
      None => 0,
      Some(Value::Null) => 1,
      Some(Value::Bool(_)) => 2,
      Some(Value::Number(_)) => 3,
      Some(Value::String(_)) => 4,
      Some(Value::Array(_) | Value::Object(_)) => 5,
    }
  }

  match (a, b) {
    (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
    (Some(Value::Number(x)), Some(Value::Number(y))) => {
      let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
      x.partial_cmp(&y).unwrap_or(Ordering::Equal)
    }
    (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
    _ => rank(a).cmp(&rank(b)),
  }
}
