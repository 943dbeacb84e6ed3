//! The auth gate: credential check at login, bearer-token extractor for
//! protected routes, and the shared-secret check for the admin write.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, header, request::Parts};
use carnet_core::{LookupError, lookup::LookupService, store::DocumentStore};
use thiserror::Error;
use tracing::info;

use crate::{
  AppState,
  error::ApiError,
  token::{Identity, IssuedToken, TokenIssuer},
};

// ─── Login ───────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LoginError {
  #[error("email and matricula are required")]
  MissingFields,
  /// Unknown matricula, profile without email, or email mismatch. The
  /// caller cannot tell these apart.
  #[error("invalid credentials")]
  InvalidCredentials,
  #[error("lookup failed: {0}")]
  Lookup(#[from] LookupError),
  #[error("token signing failed: {0}")]
  Signing(#[from] jsonwebtoken::errors::Error),
}

impl From<LoginError> for ApiError {
  fn from(e: LoginError) -> Self {
    match e {
      LoginError::MissingFields => {
        ApiError::MissingFields("Email and matricula are required".to_owned())
      }
      LoginError::InvalidCredentials => ApiError::InvalidCredentials,
      LoginError::Lookup(e) => {
        ApiError::unavailable("Authentication service temporarily unavailable", e)
      }
      LoginError::Signing(e) => {
        ApiError::unavailable("Authentication service temporarily unavailable", e)
      }
    }
  }
}

/// Check `matricula` + `email` against the stored profile and issue a token.
///
/// The matricula is trimmed and compared exactly; emails are compared
/// trimmed and lowercased.
pub async fn login<S: DocumentStore>(
  lookup: &LookupService<S>,
  tokens: &TokenIssuer,
  matricula: &str,
  email: &str,
) -> Result<IssuedToken, LoginError> {
  let matricula = matricula.trim();
  let email = email.trim().to_lowercase();
  if matricula.is_empty() || email.is_empty() {
    return Err(LoginError::MissingFields);
  }

  let Some(profile) = lookup.resolve_profile(matricula).await? else {
    info!(%matricula, "login rejected: matricula not found");
    return Err(LoginError::InvalidCredentials);
  };

  let Some(stored) = profile.email() else {
    info!(%matricula, "login rejected: carnet has no email");
    return Err(LoginError::InvalidCredentials);
  };

  if stored.trim().to_lowercase() != email {
    info!(%matricula, "login rejected: email mismatch");
    return Err(LoginError::InvalidCredentials);
  }

  let token = tokens.issue(matricula, &email)?;
  info!(%matricula, "login succeeded");
  Ok(token)
}

// ─── Bearer extractor ────────────────────────────────────────────────────────

/// Pull the token out of `Authorization: Bearer <token>`.
///
/// The scheme must be exactly `Bearer` followed by a single space.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
  headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .filter(|t| !t.is_empty())
    .ok_or(ApiError::MissingToken)
}

impl<S> FromRequestParts<AppState<S>> for Identity
where
  S: DocumentStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let token = bearer_token(&parts.headers)?;
    Ok(state.tokens.verify(token)?)
  }
}

// ─── Shared secret ───────────────────────────────────────────────────────────

/// Verify `candidate` against any of the configured argon2 hashes.
///
/// More than one hash may be configured while a secret is being rotated. An
/// empty list rejects everything.
pub fn verify_master_key(candidate: &str, hashes: &[String]) -> bool {
  if candidate.is_empty() {
    return false;
  }
  hashes.iter().any(|hash| {
    PasswordHash::new(hash).is_ok_and(|parsed| {
      Argon2::default()
        .verify_password(candidate.as_bytes(), &parsed)
        .is_ok()
    })
  })
}
