//! [`AccessEngine`]: role resolution, authorization and roster queries over
//! any [`AccessStore`].
//!
//! The engine holds nothing but a handle to the store and a clock, so one
//! instance is shared by every request and resolutions for different
//! principals never contend on anything but the store itself.

use std::{collections::BTreeSet, sync::Arc};

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::{
  Error, Result,
  gate::{self, Decision},
  grant::{AccessGrant, Role},
  principal::{Principal, PrincipalCategory},
  record::{self, RecordKind, RecordLocator, Verb},
  resolve::{self, Evidence},
  roster::{self, RosterMode},
  store::AccessStore,
  subject::{Athlete, NewSubject, Subject, SubjectRef},
};

/// Role recorded for the principal who onboards a new subject.
pub const ONBOARDING_ROLE: Role = Role::Coach;

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct AccessEngine<S> {
  store: Arc<S>,
  clock: Clock,
}

impl<S> Clone for AccessEngine<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), clock: Arc::clone(&self.clock) }
  }
}

impl<S: AccessStore> AccessEngine<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self { store, clock: Arc::new(Utc::now) }
  }

  /// Replace the wall clock, e.g. to pin "today" in tests.
  pub fn with_clock<F>(mut self, clock: F) -> Self
  where
    F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
  {
    self.clock = Arc::new(clock);
    self
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn now(&self) -> DateTime<Utc> { (self.clock)() }

  pub fn today(&self) -> NaiveDate { self.now().date_naive() }

  // ── Registry lookups ──────────────────────────────────────────────────

  pub async fn principal(&self, id: Uuid) -> Result<Principal> {
    self
      .store
      .get_principal(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::PrincipalNotFound(id))
  }

  /// Resolve a subject identity, failing with `SubjectNotFound`.
  pub async fn subject(&self, subject: SubjectRef) -> Result<Subject> {
    self
      .store
      .get_subject(subject)
      .await
      .map_err(Error::store)?
      .ok_or(Error::SubjectNotFound(subject))
  }

  // ── Role resolution ───────────────────────────────────────────────────

  /// Gather ledger evidence for `principal` on `subject`. Team grants are
  /// only looked up when they could matter: the subject is an athlete and
  /// no direct grant exists.
  async fn evidence(&self, principal: &Principal, subject: &Subject) -> Result<Evidence> {
    let me = principal.principal_id;
    let direct: Vec<Role> = self
      .store
      .grants_between(me, vec![subject.subject_ref()])
      .await
      .map_err(Error::store)?
      .into_iter()
      .map(|g| g.role)
      .collect();

    let via_teams = match subject {
      Subject::Athlete(a) if direct.is_empty() => {
        let teams = self
          .store
          .teams_containing(a.athlete_id)
          .await
          .map_err(Error::store)?;
        if teams.is_empty() {
          Vec::new()
        } else {
          self
            .store
            .grants_between(me, teams)
            .await
            .map_err(Error::store)?
            .into_iter()
            .map(|g| g.role)
            .collect()
        }
      }
      _ => Vec::new(),
    };

    Ok(Evidence { direct, via_teams })
  }

  /// The single effective role of `principal` on an already-loaded subject.
  pub async fn role_on(
    &self,
    principal: &Principal,
    subject: &Subject,
  ) -> Result<Option<Role>> {
    if let Some(role) = resolve::intrinsic_role(principal, subject) {
      return Ok(Some(role));
    }
    let evidence = self.evidence(principal, subject).await?;
    Ok(resolve::resolve_role(principal, subject, &evidence))
  }

  /// The single effective role of `principal` on `subject`, or `None`.
  pub async fn resolve_role(
    &self,
    principal: &Principal,
    subject: SubjectRef,
  ) -> Result<Option<Role>> {
    let subject = self.subject(subject).await?;
    self.role_on(principal, &subject).await
  }

  // ── Authorization ─────────────────────────────────────────────────────

  /// The authorization check every CRUD handler calls once it has followed
  /// its record to the owning subject.
  pub async fn authorize(
    &self,
    principal: &Principal,
    kind: RecordKind,
    verb: Verb,
    subject: SubjectRef,
  ) -> Result<Decision> {
    let role = self.resolve_role(principal, subject).await?;
    Ok(gate::decide(role, verb, kind))
  }

  /// Like [`Self::authorize`] but fails with `Unauthorized` on deny.
  pub async fn require(
    &self,
    principal: &Principal,
    kind: RecordKind,
    verb: Verb,
    subject: SubjectRef,
  ) -> Result<Role> {
    self
      .authorize(principal, kind, verb, subject)
      .await?
      .role()
      .ok_or(Error::Unauthorized)
  }

  /// Authorize an operation on an existing record, walking the record's
  /// owner path through `locator` to find its subject.
  pub async fn authorize_record<L: RecordLocator>(
    &self,
    principal: &Principal,
    locator: &L,
    kind: RecordKind,
    record_id: i64,
    verb: Verb,
  ) -> Result<Decision> {
    let subject = record::owning_subject(locator, kind, record_id).await?;
    self.authorize(principal, kind, verb, subject).await
  }

  // ── Roster ────────────────────────────────────────────────────────────

  /// Every individual athlete reachable through the principal's grants,
  /// directly or as a member of a granted team, plus their own athlete
  /// record. Active athletes first, then by name.
  pub async fn accessible_athletes(
    &self,
    principal: &Principal,
    mode: RosterMode,
  ) -> Result<Vec<Athlete>> {
    let me = principal.principal_id;
    let grants = self
      .store
      .grants_for_principal(me)
      .await
      .map_err(Error::store)?;

    let mut subjects = Vec::new();
    for subject_ref in roster::subjects_for(&grants, mode) {
      // Subjects are never hard-deleted; still, skip a missing row rather
      // than failing the whole roster.
      if let Some(subject) = self
        .store
        .get_subject(subject_ref)
        .await
        .map_err(Error::store)?
      {
        subjects.push(subject);
      }
    }

    let own = self
      .store
      .athlete_for_account(me)
      .await
      .map_err(Error::store)?
      .map(|a| a.athlete_id);

    let ids = roster::expand(&subjects, own);
    let mut athletes = self
      .store
      .athletes(ids.into_iter().collect())
      .await
      .map_err(Error::store)?;
    roster::sort_roster(&mut athletes);
    Ok(athletes)
  }

  // ── Subject lifecycle ─────────────────────────────────────────────────

  /// Create a subject and the creator's `COACH` grant atomically.
  ///
  /// Only coach accounts (or the superuser) onboard. Team members must exist
  /// and the creator must be allowed to edit each of them, so nobody gains
  /// indirect access to an athlete by wrapping them in a new team.
  pub async fn onboard(
    &self,
    requester: &Principal,
    input: NewSubject,
  ) -> Result<(Subject, AccessGrant)> {
    if !requester.is_superuser && requester.category != PrincipalCategory::Coach {
      return Err(Error::Unauthorized);
    }

    if input.name().trim().is_empty() {
      return Err(Error::Invalid("name must not be empty".into()));
    }
    let members = distinct_members(&input.member_ids())?;
    self.require_editable(requester, members).await?;

    self
      .store
      .onboard_subject(input, requester.principal_id, ONBOARDING_ROLE)
      .await
      .map_err(Error::store)
  }

  /// Soft-retire (or restore) a subject. Needs delete authority on it.
  pub async fn set_archived(
    &self,
    requester: &Principal,
    subject: SubjectRef,
    archived: bool,
  ) -> Result<Subject> {
    self
      .require(requester, RecordKind::SubjectProfile, Verb::Delete, subject)
      .await?;
    if !self
      .store
      .set_archived(subject, archived)
      .await
      .map_err(Error::store)?
    {
      return Err(Error::SubjectNotFound(subject));
    }
    self.subject(subject).await
  }

  /// Replace the members of a team. The first id of a partner team is the
  /// primary partner.
  ///
  /// Needs update authority on the team. Athletes joining the team are held
  /// to the onboarding rule: the requester must be able to edit each of them.
  /// Removing an athlete ends any access that reached them through the team.
  pub async fn set_members(
    &self,
    requester: &Principal,
    team: SubjectRef,
    members: Vec<i64>,
  ) -> Result<Subject> {
    let current = self.subject(team).await?;
    self
      .require(requester, RecordKind::SubjectProfile, Verb::Update, team)
      .await?;

    let wanted = distinct_members(&members)?;
    let partners = match &current {
      Subject::Athlete(_) => {
        return Err(Error::Invalid("athletes have no members".into()));
      }
      Subject::PartnerTeam(_) => match members.as_slice() {
        [primary] => Some((*primary, None)),
        [primary, secondary] => Some((*primary, Some(*secondary))),
        _ => {
          return Err(Error::Invalid("a partner team has one or two partners".into()));
        }
      },
      Subject::GroupTeam(_) => None,
    };

    let existing: BTreeSet<i64> = current.member_ids().into_iter().collect();
    self
      .require_editable(requester, wanted.difference(&existing).copied())
      .await?;

    let found = match partners {
      Some((primary, secondary)) => self.store.set_partners(team.id, primary, secondary).await,
      None => self.store.set_roster(team.id, members).await,
    }
    .map_err(Error::store)?;
    if !found {
      return Err(Error::SubjectNotFound(team));
    }
    self.subject(team).await
  }

  /// Fails unless every athlete in `ids` exists and `requester` may edit it.
  async fn require_editable(
    &self,
    requester: &Principal,
    ids: impl IntoIterator<Item = i64>,
  ) -> Result<()> {
    for id in ids {
      self
        .require(requester, RecordKind::SubjectProfile, Verb::Update, SubjectRef::athlete(id))
        .await?;
    }
    Ok(())
  }
}

fn distinct_members(members: &[i64]) -> Result<BTreeSet<i64>> {
  let distinct: BTreeSet<i64> = members.iter().copied().collect();
  if distinct.len() != members.len() {
    return Err(Error::Invalid("a team cannot list the same athlete twice".into()));
  }
  Ok(distinct)
}
