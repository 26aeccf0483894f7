//! Handlers for `/subjects` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/subjects` | Body: `{"kind":"athlete","full_name":"…"}`; creator gets `COACH` |
//! | `GET`  | `/subjects/{kind}/{id}` | Subject plus the requester's role; 403 without one |
//! | `POST` | `/subjects/{kind}/{id}/archive` | Body: `{"archived":true}` |
//! | `GET`  | `/subjects/{kind}/{id}/grants` | Whole ledger for staff leads, own grants otherwise |
//! | `PUT`  | `/subjects/{kind}/{id}/members` | Body: `{"members":[1,2]}`; teams only |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use rinkside_core::{
  AccessEngine,
  grant::{AccessGrant, Role},
  store::AccessStore,
  subject::{NewSubject, Subject, SubjectKind, SubjectRef},
};
use serde::{Deserialize, Serialize};

use crate::{auth::Requester, error::ApiError};

// ─── Onboard ──────────────────────────────────────────────────────────────────

/// `POST /subjects`
pub async fn create<S: AccessStore + 'static>(
  State(engine): State<AccessEngine<S>>,
  Requester(me): Requester,
  Json(body): Json<NewSubject>,
) -> Result<impl IntoResponse, ApiError> {
  let (subject, grant) = engine.onboard(&me, body).await?;
  tracing::info!(
    subject = %subject.subject_ref(),
    principal = %me.principal_id,
    "onboarded subject"
  );
  Ok((StatusCode::CREATED, Json(Onboarded { subject, grant })))
}

#[derive(Debug, Serialize)]
pub struct Onboarded {
  pub subject: Subject,
  pub grant:   AccessGrant,
}

// ─── Get one ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SubjectView {
  pub subject: Subject,
  pub role:    Role,
}

/// `GET /subjects/{kind}/{id}`
pub async fn get_one<S: AccessStore + 'static>(
  State(engine): State<AccessEngine<S>>,
  Requester(me): Requester,
  Path((kind, id)): Path<(SubjectKind, i64)>,
) -> Result<Json<SubjectView>, ApiError> {
  let subject = engine.subject(SubjectRef::new(kind, id)).await?;
  let role = engine
    .role_on(&me, &subject)
    .await?
    .ok_or(ApiError::Forbidden)?;
  Ok(Json(SubjectView { subject, role }))
}

// ─── Archive ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ArchiveBody {
  pub archived: bool,
}

/// `POST /subjects/{kind}/{id}/archive`
pub async fn archive<S: AccessStore + 'static>(
  State(engine): State<AccessEngine<S>>,
  Requester(me): Requester,
  Path((kind, id)): Path<(SubjectKind, i64)>,
  Json(body): Json<ArchiveBody>,
) -> Result<Json<Subject>, ApiError> {
  let target = SubjectRef::new(kind, id);
  let subject = engine.set_archived(&me, target, body.archived).await?;
  tracing::info!(subject = %target, archived = body.archived, "archive flag changed");
  Ok(Json(subject))
}

// ─── Members ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MembersBody {
  /// Athlete ids; for a partner team the first is the primary partner.
  pub members: Vec<i64>,
}

/// `PUT /subjects/{kind}/{id}/members`
pub async fn set_members<S: AccessStore + 'static>(
  State(engine): State<AccessEngine<S>>,
  Requester(me): Requester,
  Path((kind, id)): Path<(SubjectKind, i64)>,
  Json(body): Json<MembersBody>,
) -> Result<Json<Subject>, ApiError> {
  let target = SubjectRef::new(kind, id);
  let subject = engine.set_members(&me, target, body.members).await?;
  tracing::info!(
    subject = %target,
    members = ?subject.member_ids(),
    principal = %me.principal_id,
    "team members replaced"
  );
  Ok(Json(subject))
}

// ─── Grants on a subject ──────────────────────────────────────────────────────

/// `GET /subjects/{kind}/{id}/grants`
///
/// Staff leads see the whole ledger; other role holders see only their own
/// grants.
pub async fn grants<S: AccessStore + 'static>(
  State(engine): State<AccessEngine<S>>,
  Requester(me): Requester,
  Path((kind, id)): Path<(SubjectKind, i64)>,
) -> Result<Json<Vec<AccessGrant>>, ApiError> {
  let grants = engine
    .visible_grants(&me, SubjectRef::new(kind, id))
    .await?;
  Ok(Json(grants))
}
