//! HTTP Basic-auth extractor resolving the calling [`Principal`].
//!
//! Credentials are `email:password`; the password is verified with argon2
//! against the hash stored on the principal.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use rand_core::OsRng;
use rinkside_core::{AccessEngine, principal::Principal, store::AccessStore};

use crate::error::ApiError;

/// The authenticated principal making the request. Every engine call takes it
/// explicitly; there is no ambient "current user".
#[derive(Debug, Clone)]
pub struct Requester(pub Principal);

/// Hash `password` into an argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(
    Argon2::default()
      .hash_password(password.as_bytes(), &salt)?
      .to_string(),
  )
}

/// Split a `Basic` authorization header into `(email, password)`.
pub fn basic_credentials(headers: &HeaderMap) -> Result<(String, String), ApiError> {
  let header_val = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthenticated)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(ApiError::Unauthenticated)?;

  let decoded = B64.decode(encoded).map_err(|_| ApiError::Unauthenticated)?;
  let creds = String::from_utf8(decoded).map_err(|_| ApiError::Unauthenticated)?;

  let (email, password) = creds.split_once(':').ok_or(ApiError::Unauthenticated)?;
  Ok((email.to_owned(), password.to_owned()))
}

fn verify_password(password: &str, hash: &str) -> bool {
  PasswordHash::new(hash)
    .and_then(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed))
    .is_ok()
}

impl<S> FromRequestParts<AccessEngine<S>> for Requester
where
  S: AccessStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    engine: &AccessEngine<S>,
  ) -> Result<Self, Self::Rejection> {
    let (email, password) = basic_credentials(&parts.headers)?;

    let creds = engine
      .store()
      .credentials(&email)
      .await
      .map_err(|e| ApiError::Internal(Box::new(e)))?
      .ok_or(ApiError::Unauthenticated)?;

    match creds.password_hash.as_deref() {
      Some(hash) if verify_password(&password, hash) => Ok(Requester(creds.principal)),
      _ => {
        tracing::debug!(%email, "rejected credentials");
        Err(ApiError::Unauthenticated)
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use axum::http::HeaderValue;

  use super::*;

  fn headers(value: &str) -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
    h
  }

  #[test]
  fn parses_basic_credentials() {
    let value = format!("Basic {}", B64.encode("coach@rink.example:pa:ss"));
    let (email, password) = basic_credentials(&headers(&value)).unwrap();
    assert_eq!(email, "coach@rink.example");
    assert_eq!(password, "pa:ss");
  }

  #[test]
  fn rejects_malformed_headers() {
    assert!(basic_credentials(&HeaderMap::new()).is_err());
    assert!(basic_credentials(&headers("Bearer abc")).is_err());
    assert!(basic_credentials(&headers("Basic !!!")).is_err());
    let no_colon = format!("Basic {}", B64.encode("just-a-name"));
    assert!(basic_credentials(&headers(&no_colon)).is_err());
  }

  #[test]
  fn hashes_verify() {
    let hash = hash_password("secret").unwrap();
    assert!(verify_password("secret", &hash));
    assert!(!verify_password("Secret", &hash));
    assert!(!verify_password("secret", "not-a-phc-string"));
  }
}
