//! `POST /auth/login` with body `{"email": "...", "matricula": "..."}`.

use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
};
use carnet_core::store::DocumentStore;
use serde_json::{Map, Value};

use crate::{
  AppState,
  auth::{self, LoginError},
  error::ApiError,
  handlers::text_field,
  token::IssuedToken,
};

pub async fn handler<S>(
  State(state): State<AppState<S>>,
  body: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<IssuedToken>, ApiError>
where
  S: DocumentStore + 'static,
{
  let Json(body) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

  let (Some(email), Some(matricula)) =
    (text_field(&body, "email"), text_field(&body, "matricula"))
  else {
    return Err(LoginError::MissingFields.into());
  };

  let token = auth::login(&state.lookup, &state.tokens, &matricula, &email).await?;
  Ok(Json(token))
}
