//! Handlers for the authenticated `/me/*` endpoints.
//!
//! | Method | Path | On store failure |
//! |--------|------|------------------|
//! | `GET`  | `/me/carnet` | 500 |
//! | `GET`  | `/me/citas` | empty list, logged |
//! | `GET`  | `/me/promociones` | empty list, logged |

use axum::{Json, extract::State};
use carnet_core::{
  document::{Event, Profile},
  promotion::PromotionalNotice,
  store::DocumentStore,
};
use tracing::warn;

use crate::{AppState, error::ApiError, token::Identity};

/// `GET /me/carnet`
pub async fn carnet<S>(
  State(state): State<AppState<S>>,
  identity: Identity,
) -> Result<Json<Profile>, ApiError>
where
  S: DocumentStore + 'static,
{
  state
    .lookup
    .resolve_profile(&identity.matricula)
    .await
    .map_err(|e| ApiError::unavailable("Service temporarily unavailable", e))?
    .map(Json)
    .ok_or(ApiError::NotFound("Carnet not found"))
}

/// `GET /me/citas`
pub async fn citas<S>(
  State(state): State<AppState<S>>,
  identity: Identity,
) -> Json<Vec<Event>>
where
  S: DocumentStore + 'static,
{
  match state.lookup.resolve_events(&identity.matricula).await {
    Ok(events) => Json(events),
    Err(e) => {
      warn!(matricula = %identity.matricula, error = %e, "citas lookup failed; serving empty list");
      Json(Vec::new())
    }
  }
}

/// `GET /me/promociones`
pub async fn promociones<S>(
  State(state): State<AppState<S>>,
  identity: Identity,
) -> Json<Vec<PromotionalNotice>>
where
  S: DocumentStore + 'static,
{
  match state.lookup.resolve_promotions(&identity.matricula).await {
    Ok(notices) => Json(notices),
    Err(e) => {
      warn!(matricula = %identity.matricula, error = %e, "promociones lookup failed; serving empty list");
      Json(Vec::new())
    }
  }
}
