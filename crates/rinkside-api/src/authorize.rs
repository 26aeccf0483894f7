//! `POST /authorize`: the permission gate over HTTP, for services that own
//! dependent records.

use axum::{Json, extract::State};
use rinkside_core::{
  AccessEngine,
  grant::Role,
  record::{RecordKind, Verb},
  store::AccessStore,
  subject::SubjectRef,
};
use serde::{Deserialize, Serialize};

use crate::{auth::Requester, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct AuthorizeBody {
  pub record_kind: RecordKind,
  pub verb:        Verb,
  pub subject:     SubjectRef,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct AuthorizeResponse {
  pub allowed: bool,
  pub role:    Option<Role>,
}

/// `POST /authorize`
pub async fn handler<S: AccessStore + 'static>(
  State(engine): State<AccessEngine<S>>,
  Requester(me): Requester,
  Json(body): Json<AuthorizeBody>,
) -> Result<Json<AuthorizeResponse>, ApiError> {
  let role = engine.resolve_role(&me, body.subject).await?;
  let decision = rinkside_core::gate::decide(role, body.verb, body.record_kind);
  if !decision.is_allowed() {
    tracing::debug!(
      principal = %me.principal_id,
      subject = %body.subject,
      verb = %body.verb,
      kind = %body.record_kind,
      "authorization denied"
    );
  }
  Ok(Json(AuthorizeResponse { allowed: decision.is_allowed(), role }))
}
