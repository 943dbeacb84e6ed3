//! `POST /promociones/health`: create a promotional notice.
//!
//! Authorised by a shared secret in the body (`masterKey`), checked before
//! anything else so that a bad secret never writes.

use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
};
use carnet_core::{promotion::NewPromotion, store::DocumentStore};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::{
  AppState,
  auth::verify_master_key,
  error::ApiError,
  handlers::text_field,
};

const REQUIRED: [&str; 4] = ["departamento", "enlace", "descripcion", "grupoObjetivo"];

#[derive(Debug, Serialize)]
pub struct Created {
  pub success: bool,
  pub id:      String,
  pub message: &'static str,
}

pub async fn create<S>(
  State(state): State<AppState<S>>,
  body: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<Created>, ApiError>
where
  S: DocumentStore + 'static,
{
  let Json(body) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

  let key = body.get("masterKey").and_then(Value::as_str).unwrap_or_default();
  if !verify_master_key(key, &state.config.promotion_key_hashes) {
    warn!("promotion write rejected: bad master key");
    return Err(ApiError::InvalidMasterKey);
  }

  let mut missing: Vec<&str> = REQUIRED
    .into_iter()
    .filter(|k| text_field(&body, k).is_none())
    .collect();
  let prioridad = body.get("prioridad").cloned().filter(is_present);
  if prioridad.is_none() {
    missing.push("prioridad");
  }
  if !missing.is_empty() {
    return Err(ApiError::MissingFields(format!(
      "Missing required fields: {}",
      missing.join(", ")
    )));
  }

  let field = |k: &str| text_field(&body, k).unwrap_or_default();
  let input = NewPromotion {
    departamento:         field("departamento"),
    enlace:               field("enlace"),
    descripcion:          field("descripcion"),
    grupo_objetivo:       field("grupoObjetivo"),
    matricula_especifica: text_field(&body, "matriculaEspecifica"),
    prioridad:            prioridad.unwrap_or_default(),
  };

  let notice = state
    .lookup
    .create_promotion(input)
    .await
    .map_err(|e| ApiError::unavailable("Internal server error", e))?;

  info!(id = %notice.id, grupo = %notice.grupo_objetivo, "promotion created");
  Ok(Json(Created {
    success: true,
    id:      notice.id,
    message: "Promocion creada exitosamente",
  }))
}

/// `null`, `false`, `0` and blank strings count as absent.
fn is_present(v: &Value) -> bool {
  match v {
    Value::Null | Value::Bool(false) => false,
    Value::Number(n) => n.as_f64() != Some(0.0),
    Value::String(s) => !s.trim().is_empty(),
    _ => true,
  }
}
