//! Handlers for `/invitations` endpoints.
//!
//! Preview and accept are reachable without credentials: the token is the
//! capability.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use rinkside_core::{
  AccessEngine,
  invitation::{Acceptance, InvitationPreview, InviteRole},
  store::AccessStore,
  subject::SubjectRef,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  auth::{Requester, hash_password},
  error::ApiError,
};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Deserialize)]
pub struct SendBody {
  pub email:   String,
  pub role:    InviteRole,
  pub subject: SubjectRef,
}

/// `POST /invitations`
pub async fn send<S: AccessStore + 'static>(
  State(engine): State<AccessEngine<S>>,
  Requester(me): Requester,
  Json(body): Json<SendBody>,
) -> Result<impl IntoResponse, ApiError> {
  let invitation = engine
    .send_invitation(&me, body.email, body.role, body.subject)
    .await?;
  tracing::info!(
    subject = %invitation.subject,
    role = %invitation.role,
    sender = %me.principal_id,
    "invitation sent"
  );
  Ok((StatusCode::CREATED, Json(invitation)))
}

/// `GET /invitations/{token}`
pub async fn preview<S: AccessStore + 'static>(
  State(engine): State<AccessEngine<S>>,
  Path(token): Path<Uuid>,
) -> Result<Json<InvitationPreview>, ApiError> {
  Ok(Json(engine.preview_invitation(token).await?))
}

#[derive(Debug, Deserialize)]
pub struct AcceptBody {
  pub full_name: String,
  pub password:  String,
}

/// `POST /invitations/{token}/accept`
pub async fn accept<S: AccessStore + 'static>(
  State(engine): State<AccessEngine<S>>,
  Path(token): Path<Uuid>,
  Json(body): Json<AcceptBody>,
) -> Result<impl IntoResponse, ApiError> {
  if body.password.chars().count() < MIN_PASSWORD_LEN {
    return Err(ApiError::BadRequest(format!(
      "password must be at least {MIN_PASSWORD_LEN} characters"
    )));
  }
  let password_hash =
    hash_password(&body.password).map_err(|e| ApiError::Internal(e.to_string().into()))?;

  let principal = engine
    .accept_invitation(token, Acceptance { full_name: body.full_name, password_hash })
    .await?;
  tracing::info!(principal = %principal.principal_id, "invitation accepted");
  Ok((StatusCode::CREATED, Json(principal)))
}
