//! JSON REST API for Rinkside.
//!
//! Exposes an axum [`Router`] backed by an [`AccessEngine`] over any
//! [`AccessStore`]. Every route except invitation preview and acceptance
//! authenticates the caller with HTTP Basic credentials and hands the
//! resulting principal explicitly to the engine. TLS and tracing layers are
//! the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", rinkside_api::api_router(engine.clone()))
//! ```

pub mod auth;
pub mod authorize;
pub mod error;
pub mod grants;
pub mod invitations;
pub mod principals;
pub mod roster;
pub mod subjects;

use axum::{
  Router,
  routing::{delete, get, post, put},
};
use rinkside_core::{AccessEngine, store::AccessStore};

pub use error::ApiError;

/// Build a fully-materialised API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(engine: AccessEngine<S>) -> Router<()>
where
  S: AccessStore + 'static,
{
  Router::new()
    .route("/me", get(principals::me))
    // Subjects
    .route("/subjects", post(subjects::create::<S>))
    .route("/subjects/{kind}/{id}", get(subjects::get_one::<S>))
    .route("/subjects/{kind}/{id}/archive", post(subjects::archive::<S>))
    .route("/subjects/{kind}/{id}/grants", get(subjects::grants::<S>))
    .route("/subjects/{kind}/{id}/members", put(subjects::set_members::<S>))
    // Access
    .route("/authorize", post(authorize::handler::<S>))
    .route("/roster", get(roster::handler::<S>))
    .route("/access-grants", post(grants::create::<S>))
    .route("/access-grants/{id}", delete(grants::delete::<S>))
    // Invitations
    .route("/invitations", post(invitations::send::<S>))
    .route("/invitations/{token}", get(invitations::preview::<S>))
    .route("/invitations/{token}/accept", post(invitations::accept::<S>))
    .with_state(engine)
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
  use chrono::Utc;
  use rinkside_core::{
    grant::{NewGrant, Role},
    guardian,
    principal::{NewPrincipal, Principal, PrincipalCategory},
    subject::SubjectRef,
  };
  use rinkside_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  use super::*;

  const PASSWORD: &str = "secret-pass";

  struct Harness {
    engine: AccessEngine<SqliteStore>,
    hash:   String,
  }

  impl Harness {
    async fn new() -> Self {
      let store = SqliteStore::open_in_memory().await.unwrap();
      Self {
        engine: AccessEngine::new(Arc::new(store)),
        hash:   auth::hash_password(PASSWORD).unwrap(),
      }
    }

    async fn principal(&self, email: &str, category: PrincipalCategory) -> Principal {
      self
        .engine
        .store()
        .add_principal(NewPrincipal {
          email: email.into(),
          full_name: email.into(),
          category,
          is_superuser: false,
          password_hash: Some(self.hash.clone()),
        })
        .await
        .unwrap()
    }

    async fn call(
      &self,
      method: &str,
      uri: &str,
      as_user: Option<&str>,
      body: Option<Value>,
    ) -> (StatusCode, Value) {
      let mut builder = Request::builder().method(method).uri(uri);
      if let Some(email) = as_user {
        builder = builder.header(
          header::AUTHORIZATION,
          format!("Basic {}", B64.encode(format!("{email}:{PASSWORD}"))),
        );
      }
      let req = match body {
        Some(v) => builder
          .header(header::CONTENT_TYPE, "application/json")
          .body(Body::from(v.to_string()))
          .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
      };

      let resp = api_router(self.engine.clone()).oneshot(req).await.unwrap();
      let status = resp.status();
      let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
      let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
      (status, value)
    }

    /// Onboard an athlete as `coach` and return its id.
    async fn athlete(&self, coach: &str, name: &str, dob: Option<String>) -> i64 {
      let (status, body) = self
        .call(
          "POST",
          "/subjects",
          Some(coach),
          Some(json!({ "kind": "athlete", "full_name": name, "date_of_birth": dob })),
        )
        .await;
      assert_eq!(status, StatusCode::CREATED, "{body}");
      body["subject"]["athlete_id"].as_i64().unwrap()
    }
  }

  // ── Authentication ──────────────────────────────────────────────────────────

  #[tokio::test]
  async fn missing_or_wrong_credentials_get_401() {
    let h = Harness::new().await;
    h.principal("c@rink.example", PrincipalCategory::Coach).await;

    let req = Request::builder().uri("/me").body(Body::empty()).unwrap();
    let resp = api_router(h.engine.clone()).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
      resp.headers().get(header::WWW_AUTHENTICATE).unwrap(),
      "Basic realm=\"rinkside\""
    );

    let wrong = format!("Basic {}", B64.encode("c@rink.example:nope"));
    let req = Request::builder()
      .uri("/me")
      .header(header::AUTHORIZATION, wrong)
      .body(Body::empty())
      .unwrap();
    let resp = api_router(h.engine.clone()).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn me_returns_the_authenticated_principal() {
    let h = Harness::new().await;
    let c = h.principal("c@rink.example", PrincipalCategory::Coach).await;
    let (status, body) = h.call("GET", "/me", Some("C@Rink.example"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["principal_id"], json!(c.principal_id));
    assert_eq!(body["category"], "coach");
  }

  // ── Subjects ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn subject_view_shows_role_or_403() {
    let h = Harness::new().await;
    h.principal("c@rink.example", PrincipalCategory::Coach).await;
    h.principal("x@rink.example", PrincipalCategory::Observer).await;
    let id = h.athlete("c@rink.example", "Ada", None).await;

    let uri = format!("/subjects/athlete/{id}");
    let (status, body) = h.call("GET", &uri, Some("c@rink.example"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "COACH");
    assert_eq!(body["subject"]["kind"], "athlete");

    let (status, body) = h.call("GET", &uri, Some("x@rink.example"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({ "error": "no permission" }));

    let (status, _) = h
      .call("GET", "/subjects/group_team/99", Some("c@rink.example"), None)
      .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn archive_and_list_grants() {
    let h = Harness::new().await;
    h.principal("c@rink.example", PrincipalCategory::Coach).await;
    let id = h.athlete("c@rink.example", "Ada", None).await;

    let (status, body) = h
      .call(
        "POST",
        &format!("/subjects/athlete/{id}/archive"),
        Some("c@rink.example"),
        Some(json!({ "archived": true })),
      )
      .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["archived"], true);

    let (status, body) = h
      .call("GET", &format!("/subjects/athlete/{id}/grants"), Some("c@rink.example"), None)
      .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["role"], "COACH");
  }

  #[tokio::test]
  async fn non_staff_see_only_their_own_grants() {
    let h = Harness::new().await;
    h.principal("c@rink.example", PrincipalCategory::Coach).await;
    let col = h.principal("col@rink.example", PrincipalCategory::Coach).await;
    let v = h.principal("v@rink.example", PrincipalCategory::Observer).await;
    h.principal("x@rink.example", PrincipalCategory::Observer).await;
    let id = h.athlete("c@rink.example", "Ada", None).await;
    for (who, role) in [(&col, Role::Collaborator), (&v, Role::Viewer)] {
      h.engine
        .record_grant(NewGrant {
          principal_id: who.principal_id,
          subject: SubjectRef::athlete(id),
          role,
        })
        .await
        .unwrap();
    }
    let uri = format!("/subjects/athlete/{id}/grants");

    let (status, body) = h.call("GET", &uri, Some("v@rink.example"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1, "{body}");
    assert_eq!(body[0]["principal_id"], v.principal_id.to_string());
    assert_eq!(body[0]["role"], "VIEWER");

    let (_, body) = h.call("GET", &uri, Some("c@rink.example"), None).await;
    assert_eq!(body.as_array().unwrap().len(), 3);

    let (status, body) = h.call("GET", &uri, Some("x@rink.example"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "no permission");
  }

  #[tokio::test]
  async fn team_members_can_be_replaced() {
    let h = Harness::new().await;
    h.principal("c@rink.example", PrincipalCategory::Coach).await;
    let a = h.athlete("c@rink.example", "Ada", None).await;
    let b = h.athlete("c@rink.example", "Bo", None).await;
    let (status, body) = h
      .call(
        "POST",
        "/subjects",
        Some("c@rink.example"),
        Some(json!({ "kind": "group_team", "name": "Sync", "roster": [a, b] })),
      )
      .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let team = body["subject"]["team_id"].as_i64().unwrap();

    let uri = format!("/subjects/group_team/{team}/members");
    let (status, body) = h
      .call("PUT", &uri, Some("c@rink.example"), Some(json!({ "members": [b] })))
      .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["roster"], json!([b]));

    let (status, _) = h
      .call(
        "PUT",
        &format!("/subjects/athlete/{a}/members"),
        Some("c@rink.example"),
        Some(json!({ "members": [b] })),
      )
      .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  // ── Grants ──────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn grant_then_revoke() {
    let h = Harness::new().await;
    h.principal("c@rink.example", PrincipalCategory::Coach).await;
    let v = h.principal("v@rink.example", PrincipalCategory::Observer).await;
    let id = h.athlete("c@rink.example", "Ada", None).await;

    let grant = json!({
      "principal_id": v.principal_id,
      "subject_kind": "athlete",
      "subject_id": id,
      "role": "VIEWER",
    });
    let (status, body) = h
      .call("POST", "/access-grants", Some("c@rink.example"), Some(grant.clone()))
      .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["created"], true);
    let grant_id = body["grant"]["grant_id"].as_str().unwrap().to_owned();

    let (status, body) = h
      .call("POST", "/access-grants", Some("c@rink.example"), Some(grant.clone()))
      .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["grant"]["grant_id"], grant_id.as_str());

    // The viewer cannot hand out access.
    let (status, _) = h
      .call("POST", "/access-grants", Some("v@rink.example"), Some(grant))
      .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let uri = format!("/access-grants/{grant_id}");
    let (status, _) = h.call("DELETE", &uri, Some("v@rink.example"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = h.call("DELETE", &uri, Some("c@rink.example"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  // ── Authorize & roster ──────────────────────────────────────────────────────

  #[tokio::test]
  async fn authorize_reports_decision_and_role() {
    let h = Harness::new().await;
    h.principal("c@rink.example", PrincipalCategory::Coach).await;
    h.principal("x@rink.example", PrincipalCategory::Observer).await;
    let id = h.athlete("c@rink.example", "Ada", None).await;

    let ask = |verb: &str| {
      json!({
        "record_kind": "yearly_plan",
        "verb": verb,
        "subject": { "kind": "athlete", "id": id },
      })
    };

    let (status, body) = h
      .call("POST", "/authorize", Some("c@rink.example"), Some(ask("delete")))
      .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "allowed": true, "role": "COACH" }));

    let (_, body) = h
      .call("POST", "/authorize", Some("x@rink.example"), Some(ask("read")))
      .await;
    assert_eq!(body, json!({ "allowed": false, "role": null }));

    let (status, _) = h
      .call(
        "POST",
        "/authorize",
        Some("c@rink.example"),
        Some(json!({
          "record_kind": "goal",
          "verb": "read",
          "subject": { "kind": "partner_team", "id": 404 },
        })),
      )
      .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn roster_lists_reachable_athletes() {
    let h = Harness::new().await;
    h.principal("c@rink.example", PrincipalCategory::Coach).await;
    h.athlete("c@rink.example", "Zoe", None).await;
    h.athlete("c@rink.example", "Ada", None).await;

    let (status, body) = h
      .call("GET", "/roster?mode=operational", Some("c@rink.example"), None)
      .await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<_> = body
      .as_array()
      .unwrap()
      .iter()
      .map(|a| a["full_name"].as_str().unwrap().to_owned())
      .collect();
    assert_eq!(names, vec!["Ada", "Zoe"]);
  }

  // ── Invitations ─────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn minor_invitation_is_blocked_until_a_guardian_joins() {
    let h = Harness::new().await;
    h.principal("c@rink.example", PrincipalCategory::Coach).await;
    let dob = guardian::years_before(Utc::now().date_naive(), 13);
    let id = h
      .athlete("c@rink.example", "Kid", Some(dob.format("%Y-%m-%d").to_string()))
      .await;
    let subject = json!({ "kind": "athlete", "id": id });

    let (status, invite) = h
      .call(
        "POST",
        "/invitations",
        Some("c@rink.example"),
        Some(json!({ "email": "kid@rink.example", "role": "athlete", "subject": subject })),
      )
      .await;
    assert_eq!(status, StatusCode::CREATED);
    let token = invite["token"].as_str().unwrap().to_owned();

    let (status, body) = h.call("GET", &format!("/invitations/{token}"), None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "DEPENDENCY_ERROR");

    let (_, guardian_invite) = h
      .call(
        "POST",
        "/invitations",
        Some("c@rink.example"),
        Some(json!({ "email": "mum@rink.example", "role": "guardian", "subject": subject })),
      )
      .await;
    let guardian_token = guardian_invite["token"].as_str().unwrap();
    let (status, _) = h
      .call(
        "POST",
        &format!("/invitations/{guardian_token}/accept"),
        None,
        Some(json!({ "full_name": "Mum", "password": "short" })),
      )
      .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, body) = h
      .call(
        "POST",
        &format!("/invitations/{guardian_token}/accept"),
        None,
        Some(json!({ "full_name": "Mum", "password": PASSWORD })),
      )
      .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["category"], "guardian");

    let (status, body) = h.call("GET", &format!("/invitations/{token}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["subject_name"], "Kid");

    let (status, _) = h
      .call(
        "POST",
        &format!("/invitations/{token}/accept"),
        None,
        Some(json!({ "full_name": "Kid", "password": PASSWORD })),
      )
      .await;
    assert_eq!(status, StatusCode::CREATED);

    // The new account can log in and owns its athlete record.
    let (status, body) = h
      .call("GET", &format!("/subjects/athlete/{id}"), Some("kid@rink.example"), None)
      .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "OWNER");
  }
}
