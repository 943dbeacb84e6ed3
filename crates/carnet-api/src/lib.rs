//! HTTP surface of the carnet backend.
//!
//! | Method | Path | Auth |
//! |--------|------|------|
//! | `GET`  | `/_health` | none |
//! | `POST` | `/auth/login` | none |
//! | `GET`  | `/me/carnet` | bearer |
//! | `GET`  | `/me/citas` | bearer |
//! | `GET`  | `/me/promociones` | bearer |
//! | `POST` | `/promociones/health` | `masterKey` in body |
//!
//! Everything else answers 404 `{"error":"Endpoint not found"}`.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod token;

pub use crate::config::{ServerConfig, StoreConfig};
pub use error::ApiError;

use std::sync::Arc;

use axum::{
  Router,
  extract::{DefaultBodyLimit, Request, State},
  http::{HeaderValue, Method, header},
  middleware::{self, Next},
  response::{IntoResponse, Response},
  routing::{get, post},
};
use carnet_core::{lookup::LookupService, store::DocumentStore};
use tower_http::{
  cors::{AllowOrigin, CorsLayer},
  trace::TraceLayer,
};

use token::TokenIssuer;

const BODY_LIMIT: usize = 10 * 1024 * 1024;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub lookup: LookupService<S>,
  pub tokens: Arc<TokenIssuer>,
  pub config: Arc<ServerConfig>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      lookup: self.lookup.clone(),
      tokens: Arc::clone(&self.tokens),
      config: Arc::clone(&self.config),
    }
  }
}

impl<S: DocumentStore> AppState<S> {
  /// Wire the lookup service and token issuer around an already constructed
  /// store.
  pub fn new(store: Arc<S>, config: ServerConfig) -> Self {
    let tokens = TokenIssuer::new(config.jwt_secret.as_bytes(), config.jwt_expires_min);
    Self {
      lookup: LookupService::new(store),
      tokens: Arc::new(tokens),
      config: Arc::new(config),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the application [`Router`].
///
/// Origins that fail to convert to header values, and the `*` wildcard, are
/// skipped here; [`ServerConfig::validate`] rejects them at startup.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: DocumentStore + 'static,
{
  let origins: Arc<[HeaderValue]> = state
    .config
    .allowed_origins
    .iter()
    .filter(|o| o.trim() != "*")
    .filter_map(|o| HeaderValue::from_str(o).ok())
    .collect();

  let cors = CorsLayer::new()
    .allow_origin(AllowOrigin::list(origins.iter().cloned()))
    .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
    .allow_credentials(true);

  Router::new()
    .route("/_health",            get(handlers::health::handler::<S>))
    .route("/auth/login",         post(handlers::login::handler::<S>))
    .route("/me/carnet",          get(handlers::me::carnet::<S>))
    .route("/me/citas",           get(handlers::me::citas::<S>))
    .route("/me/promociones",     get(handlers::me::promociones::<S>))
    .route("/promociones/health", post(handlers::promotions::create::<S>))
    .fallback(endpoint_not_found)
    .method_not_allowed_fallback(endpoint_not_found)
    .layer(DefaultBodyLimit::max(BODY_LIMIT))
    .layer(middleware::from_fn_with_state(origins, reject_foreign_origin))
    .layer(cors)
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

/// Requests without an `Origin` header (server-to-server, curl) pass; a
/// browser origin must be on the allow-list.
async fn reject_foreign_origin(
  State(allowed): State<Arc<[HeaderValue]>>,
  req: Request,
  next: Next,
) -> Response {
  match req.headers().get(header::ORIGIN) {
    Some(origin) if !allowed.contains(origin) => {
      tracing::warn!(?origin, "rejected cross-origin request");
      ApiError::ForbiddenOrigin.into_response()
    }
    _ => next.run(req).await,
  }
}

async fn endpoint_not_found() -> ApiError { ApiError::NotFound("Endpoint not found") }
