//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every error renders as `{"error": "<message>"}`. Messages for
//! authentication failures are deliberately generic, and the detail behind a
//! 500 is logged but never sent to the client.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::token::TokenError;

#[derive(Debug, Error)]
pub enum ApiError {
  /// Required request fields are absent; the message names them.
  #[error("{0}")]
  MissingFields(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("invalid credentials")]
  InvalidCredentials,

  #[error("access token required")]
  MissingToken,

  #[error("token expired")]
  TokenExpired,

  #[error("invalid token")]
  InvalidToken,

  #[error("invalid master key")]
  InvalidMasterKey,

  #[error("origin not allowed")]
  ForbiddenOrigin,

  #[error("not found: {0}")]
  NotFound(&'static str),

  /// An upstream failure. `message` is what the client sees.
  #[error("{message}: {source}")]
  Unavailable {
    message: &'static str,
    #[source]
    source:  Box<dyn std::error::Error + Send + Sync>,
  },
}

impl ApiError {
  pub fn unavailable<E>(message: &'static str, source: E) -> Self
  where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
  {
    ApiError::Unavailable { message, source: source.into() }
  }
}

impl From<TokenError> for ApiError {
  fn from(e: TokenError) -> Self {
    match e {
      TokenError::Expired => ApiError::TokenExpired,
      TokenError::Invalid => ApiError::InvalidToken,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::MissingFields(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::InvalidCredentials => {
        (StatusCode::UNAUTHORIZED, "Invalid credentials".to_owned())
      }
      ApiError::MissingToken => {
        (StatusCode::UNAUTHORIZED, "Access token required".to_owned())
      }
      ApiError::TokenExpired => (StatusCode::UNAUTHORIZED, "Token expired".to_owned()),
      ApiError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token".to_owned()),
      ApiError::InvalidMasterKey => {
        (StatusCode::UNAUTHORIZED, "Master key invalida".to_owned())
      }
      ApiError::ForbiddenOrigin => {
        (StatusCode::FORBIDDEN, "Not allowed by CORS".to_owned())
      }
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, (*m).to_owned()),
      ApiError::Unavailable { message, source } => {
        tracing::error!(error = %source, "{message}");
        (StatusCode::INTERNAL_SERVER_ERROR, (*message).to_owned())
      }
    };

    let mut res = (status, Json(json!({ "error": message }))).into_response();
    if matches!(
      self,
      ApiError::MissingToken | ApiError::TokenExpired | ApiError::InvalidToken
    ) {
      res
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    }
    res
  }
}
