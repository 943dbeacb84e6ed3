//! `GET /_health`. Liveness check that never touches the store.

use axum::{Json, extract::State};
use carnet_core::store::DocumentStore;
use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};

use crate::AppState;

pub async fn handler<S>(State(state): State<AppState<S>>) -> Json<Value>
where
  S: DocumentStore + 'static,
{
  Json(json!({
    "ok":        true,
    "service":   state.config.service_name,
    "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
  }))
}
