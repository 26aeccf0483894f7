//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use rinkside_core::Error as CoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// Missing or wrong credentials.
  #[error("unauthenticated")]
  Unauthenticated,

  /// Authenticated, but the resolved role does not allow the operation.
  #[error("no permission")]
  Forbidden,

  #[error("not found: {0}")]
  NotFound(String),

  /// A compliance rule (guardian dependency) blocked the request.
  #[error("{0}")]
  Dependency(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("internal error: {0}")]
  Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<CoreError> for ApiError {
  fn from(e: CoreError) -> Self {
    match e {
      CoreError::SubjectNotFound(_)
      | CoreError::PrincipalNotFound(_)
      | CoreError::GrantNotFound(_)
      | CoreError::RecordNotFound { .. }
      | CoreError::InvitationNotFound => Self::NotFound(e.to_string()),
      CoreError::Unauthorized => Self::Forbidden,
      CoreError::ComplianceBlocked(reason) => Self::Dependency(reason),
      CoreError::Conflict(m) => Self::Conflict(m),
      CoreError::Invalid(m) => Self::BadRequest(m),
      CoreError::InvitationClosed => Self::BadRequest(e.to_string()),
      CoreError::BrokenOwnerPath { .. }
      | CoreError::UnknownVariant { .. }
      | CoreError::Store(_) => Self::Internal(Box::new(e)),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    match self {
      ApiError::Unauthenticated => {
        let mut res = (
          StatusCode::UNAUTHORIZED,
          Json(json!({ "error": "authentication required" })),
        )
          .into_response();
        res.headers_mut().insert(
          header::WWW_AUTHENTICATE,
          HeaderValue::from_static("Basic realm=\"rinkside\""),
        );
        res
      }
      // The body never says which role was missing.
      ApiError::Forbidden => {
        (StatusCode::FORBIDDEN, Json(json!({ "error": "no permission" }))).into_response()
      }
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, Json(json!({ "error": m }))).into_response(),
      ApiError::Dependency(m) => (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": m, "code": "DEPENDENCY_ERROR" })),
      )
        .into_response(),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, Json(json!({ "error": m }))).into_response(),
      ApiError::BadRequest(m) => {
        (StatusCode::BAD_REQUEST, Json(json!({ "error": m }))).into_response()
      }
      ApiError::Internal(e) => {
        tracing::error!(error = %e, "request failed");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          Json(json!({ "error": "internal error" })),
        )
          .into_response()
      }
    }
  }
}
