//! Handlers for `/access-grants` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/access-grants` | 201 with the new grant, 200 if an equal-or-higher grant existed |
//! | `DELETE` | `/access-grants/{id}` | Self-leave or staff ejection; 204 |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use rinkside_core::{
  AccessEngine,
  grant::{NewGrant, Role},
  store::AccessStore,
  subject::{SubjectKind, SubjectRef},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{auth::Requester, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct GrantBody {
  pub principal_id: Uuid,
  pub subject_kind: SubjectKind,
  pub subject_id:   i64,
  pub role:         Role,
}

/// `POST /access-grants`
pub async fn create<S: AccessStore + 'static>(
  State(engine): State<AccessEngine<S>>,
  Requester(me): Requester,
  Json(body): Json<GrantBody>,
) -> Result<impl IntoResponse, ApiError> {
  let input = NewGrant {
    principal_id: body.principal_id,
    subject:      SubjectRef::new(body.subject_kind, body.subject_id),
    role:         body.role,
  };
  let outcome = engine.grant(&me, input).await?;

  let status = if outcome.created {
    tracing::info!(
      grant = %outcome.grant.grant_id,
      principal = %input.principal_id,
      subject = %input.subject,
      role = %input.role,
      granted_by = %me.principal_id,
      "access granted"
    );
    StatusCode::CREATED
  } else {
    StatusCode::OK
  };
  Ok((status, Json(outcome)))
}

/// `DELETE /access-grants/{id}`
pub async fn delete<S: AccessStore + 'static>(
  State(engine): State<AccessEngine<S>>,
  Requester(me): Requester,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  let how = engine.revoke(&me, id).await?;
  tracing::info!(grant = %id, by = %me.principal_id, ?how, "access revoked");
  Ok(StatusCode::NO_CONTENT)
}
