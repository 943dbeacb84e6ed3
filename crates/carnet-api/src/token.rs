//! Session tokens: HS256 JWTs carrying the student's matricula and email.
//!
//! Tokens are stateless. Validity is decided by signature and expiry alone;
//! rotating the secret invalidates every outstanding token.

use chrono::Utc;
use jsonwebtoken::{
  Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Payload stored in the token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
  /// Matricula.
  pub sub:   String,
  pub email: String,
  pub iat:   i64,
  pub exp:   i64,
}

/// The verified identity attached to a protected request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
  pub matricula: String,
  pub email:     String,
}

/// A freshly signed token.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
  pub access_token: String,
  pub token_type:   &'static str,
  /// Lifetime in seconds.
  pub expires_in:   i64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
  #[error("token expired")]
  Expired,
  #[error("invalid token")]
  Invalid,
}

/// Signs and verifies session tokens with a shared secret.
pub struct TokenIssuer {
  encoding:   EncodingKey,
  decoding:   DecodingKey,
  validation: Validation,
  ttl_secs:   i64,
}

impl TokenIssuer {
  pub fn new(secret: &[u8], ttl_minutes: u64) -> Self {
    let mut validation = Validation::new(Algorithm::HS256);
    // Expiry is checked against an explicit clock in `verify_at`.
    validation.validate_exp = false;
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "sub"]);

    Self {
      encoding: EncodingKey::from_secret(secret),
      decoding: DecodingKey::from_secret(secret),
      validation,
      ttl_secs: i64::try_from(ttl_minutes.saturating_mul(60)).unwrap_or(i64::MAX),
    }
  }

  pub fn issue(
    &self,
    matricula: &str,
    email: &str,
  ) -> jsonwebtoken::errors::Result<IssuedToken> {
    self.issue_at(matricula, email, Utc::now().timestamp())
  }

  /// Sign a token as if the current unix time were `now`.
  pub fn issue_at(
    &self,
    matricula: &str,
    email: &str,
    now: i64,
  ) -> jsonwebtoken::errors::Result<IssuedToken> {
    let claims = Claims {
      sub:   matricula.to_owned(),
      email: email.to_owned(),
      iat:   now,
      exp:   now.saturating_add(self.ttl_secs),
    };
    let access_token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
    Ok(IssuedToken {
      access_token,
      token_type: "bearer",
      expires_in: self.ttl_secs,
    })
  }

  pub fn verify(&self, token: &str) -> Result<Identity, TokenError> {
    self.verify_at(token, Utc::now().timestamp())
  }

  /// Verify `token` as if the current unix time were `now`.
  ///
  /// A token whose signature is valid but whose `exp` has been reached is
  /// [`TokenError::Expired`]; everything else that fails is
  /// [`TokenError::Invalid`].
  pub fn verify_at(&self, token: &str, now: i64) -> Result<Identity, TokenError> {
    let data = decode::<Claims>(token, &self.decoding, &self.validation)
      .map_err(|_| TokenError::Invalid)?;

    if now >= data.claims.exp {
      return Err(TokenError::Expired);
    }

    Ok(Identity {
      matricula: data.claims.sub,
      email:     data.claims.email,
    })
  }
}
