//! Translation of a [`Query`] into a parameterised Cosmos DB SQL statement.
//!
//! Only the filter is rendered. The gateway refuses cross-partition
//! `ORDER BY` without a client-side query plan, so ordering is applied after
//! all pages have been fetched (see [`Query::sort`]).

use carnet_core::query::{Filter, Query};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct Parameter {
  pub name:  String,
  pub value: Value,
}

/// Request body for a query (`application/query+json`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct QuerySpec {
  pub query:      String,
  pub parameters: Vec<Parameter>,
}

impl QuerySpec {
  pub(crate) fn from_query(query: &Query) -> Self {
    let mut parameters = Vec::new();
    let predicate = render(&query.filter, &mut parameters);
    Self {
      query: format!("SELECT * FROM c WHERE {predicate}"),
      parameters,
    }
  }
}

fn render(filter: &Filter, params: &mut Vec<Parameter>) -> String {
  match filter {
    Filter::Eq(field, value) => {
      let name = format!("@p{}", params.len());
      params.push(Parameter { name: name.clone(), value: value.clone() });
      format!("c[{}] = {name}", Value::String(field.clone()))
    }
    Filter::And(all) => join(all, " AND ", "true", params),
    Filter::Or(any) => join(any, " OR ", "false", params),
  }
}

fn join(
  filters: &[Filter],
  op: &str,
  empty: &str,
  params: &mut Vec<Parameter>,
) -> String {
  match filters {
    [] => empty.to_owned(),
    [single] => render(single, params),
    many => {
      let parts: Vec<String> = many.iter().map(|f| render(f, params)).collect();
      format!("({})", parts.join(op))
    }
  }
}
