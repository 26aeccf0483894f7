//! The `AccessStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `rinkside-store-sqlite`).
//! [`crate::AccessEngine`] and the API layer depend on this abstraction, not on
//! any concrete backend. Every method is a plain read or a small write; the
//! access decisions themselves are made in this crate, not in the store.

use std::future::Future;

use uuid::Uuid;

use crate::{
  grant::{AccessGrant, NewGrant, Role},
  invitation::{Invitation, NewInvitation},
  principal::{Credentials, NewPrincipal, Principal},
  subject::{Athlete, NewSubject, Subject, SubjectRef},
};

/// Abstraction over the persisted principals, subjects, grant ledger and
/// invitations.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait AccessStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Principals ────────────────────────────────────────────────────────

  fn add_principal(
    &self,
    input: NewPrincipal,
  ) -> impl Future<Output = Result<Principal, Self::Error>> + Send + '_;

  fn get_principal(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Principal>, Self::Error>> + Send + '_;

  /// Look up a principal and its password hash by email (case-insensitive).
  fn credentials<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<Credentials>, Self::Error>> + Send + 'a;

  // ── Subjects ──────────────────────────────────────────────────────────

  /// Create a subject and its first grant in one transaction. Member athletes
  /// referenced by team variants must exist.
  fn onboard_subject(
    &self,
    input: NewSubject,
    owner: Uuid,
    role: Role,
  ) -> impl Future<Output = Result<(Subject, AccessGrant), Self::Error>> + Send + '_;

  /// Retrieve a subject by identity. Returns `None` if not found.
  fn get_subject(
    &self,
    subject: SubjectRef,
  ) -> impl Future<Output = Result<Option<Subject>, Self::Error>> + Send + '_;

  /// Every partner or group team that lists `athlete_id` as a member.
  fn teams_containing(
    &self,
    athlete_id: i64,
  ) -> impl Future<Output = Result<Vec<SubjectRef>, Self::Error>> + Send + '_;

  /// Load the athletes with the given ids; unknown ids are skipped.
  fn athletes(
    &self,
    ids: Vec<i64>,
  ) -> impl Future<Output = Result<Vec<Athlete>, Self::Error>> + Send + '_;

  /// The athlete whose own account is `principal`, if any.
  fn athlete_for_account(
    &self,
    principal: Uuid,
  ) -> impl Future<Output = Result<Option<Athlete>, Self::Error>> + Send + '_;

  /// Set the archive flag. Returns `false` if the subject does not exist.
  fn set_archived(
    &self,
    subject: SubjectRef,
    archived: bool,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Replace the partners of a partner team. Returns `false` if the team does
  /// not exist.
  fn set_partners(
    &self,
    team_id: i64,
    primary: i64,
    secondary: Option<i64>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Replace the roster of a group team in one transaction. Returns `false`
  /// if the team does not exist.
  fn set_roster(
    &self,
    team_id: i64,
    roster: Vec<i64>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Grant ledger ──────────────────────────────────────────────────────

  /// Insert a grant unless the identical `(principal, subject, role)` fact
  /// already exists; either way return the stored row and whether it was
  /// created by this call.
  fn upsert_grant(
    &self,
    input: NewGrant,
  ) -> impl Future<Output = Result<(AccessGrant, bool), Self::Error>> + Send + '_;

  fn get_grant(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<AccessGrant>, Self::Error>> + Send + '_;

  fn grants_for_principal(
    &self,
    principal: Uuid,
  ) -> impl Future<Output = Result<Vec<AccessGrant>, Self::Error>> + Send + '_;

  fn grants_for_subject(
    &self,
    subject: SubjectRef,
  ) -> impl Future<Output = Result<Vec<AccessGrant>, Self::Error>> + Send + '_;

  /// Grants held by `principal` on any of `subjects`.
  fn grants_between(
    &self,
    principal: Uuid,
    subjects: Vec<SubjectRef>,
  ) -> impl Future<Output = Result<Vec<AccessGrant>, Self::Error>> + Send + '_;

  /// Delete a grant. Returns `false` if no row was deleted, which makes a
  /// repeated delete a harmless no-op.
  fn delete_grant(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Invitations ───────────────────────────────────────────────────────

  fn add_invitation(
    &self,
    input: NewInvitation,
  ) -> impl Future<Output = Result<Invitation, Self::Error>> + Send + '_;

  fn get_invitation(
    &self,
    token: Uuid,
  ) -> impl Future<Output = Result<Option<Invitation>, Self::Error>> + Send + '_;

  /// In one transaction: create the invited account, link it to the athlete
  /// or record the invited grant, and mark the invitation accepted.
  ///
  /// Returns `None` if the invitation was already accepted.
  fn redeem_invitation(
    &self,
    token: Uuid,
    account: NewPrincipal,
  ) -> impl Future<Output = Result<Option<Principal>, Self::Error>> + Send + '_;
}
