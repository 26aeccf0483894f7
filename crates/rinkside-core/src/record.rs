//! Dependent record kinds and the single table that classifies them.
//!
//! Records themselves (goals, logs, plans, results) live in external stores.
//! This module only knows, per kind, how the permission gate treats it and how
//! to walk from a record to the subject that owns it. Adding a record kind
//! means adding one row to [`RecordKind::policy`].

use std::future::Future;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{Error, Result, subject::SubjectRef};

// ─── Verb ────────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Verb {
  Read,
  Create,
  Update,
  Delete,
}

// ─── RecordKind ──────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecordKind {
  Goal,
  SessionLog,
  InjuryLog,
  MeetingLog,
  CompetitionResult,
  SkaterTest,
  Program,
  YearlyPlan,
  Macrocycle,
  WeeklyPlan,
  AthleteSeason,
  TeamTrip,
  ItineraryItem,
  HousingAssignment,
  AthleteProfile,
  /// The athlete or team record itself (name, archive flag, membership).
  SubjectProfile,
}

/// Where a record's owning subject is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerPath {
  /// The record stores its owner's [`SubjectRef`] directly.
  Subject,
  /// The record hangs off a parent record of the given kind.
  Via(RecordKind),
}

/// Gate and ownership classification for one record kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordPolicy {
  /// Guardians may create and update records of this kind.
  pub family_writable:            bool,
  /// Collaborators may create (not just edit) records of this kind.
  pub collaborator_may_originate: bool,
  pub owner:                      OwnerPath,
}

const fn row(
  family_writable: bool,
  collaborator_may_originate: bool,
  owner: OwnerPath,
) -> RecordPolicy {
  RecordPolicy { family_writable, collaborator_may_originate, owner }
}

impl RecordKind {
  pub const fn policy(self) -> RecordPolicy {
    use OwnerPath::{Subject as S, Via};
    use RecordKind as K;

    #[rustfmt::skip]
    let policy = match self {
      //                          family  collab  owner
      K::Goal              => row(true,   true,   S),
      K::SessionLog        => row(true,   true,   Via(K::AthleteSeason)),
      K::InjuryLog         => row(true,   true,   S),
      K::MeetingLog        => row(false,  true,   S),
      K::CompetitionResult => row(true,   true,   S),
      K::SkaterTest        => row(true,   true,   S),
      K::Program           => row(false,  true,   S),
      K::YearlyPlan        => row(false,  false,  S),
      K::Macrocycle        => row(false,  true,   Via(K::YearlyPlan)),
      K::WeeklyPlan        => row(false,  true,   Via(K::AthleteSeason)),
      K::AthleteSeason     => row(false,  true,   S),
      K::TeamTrip          => row(false,  true,   S),
      K::ItineraryItem     => row(false,  true,   Via(K::TeamTrip)),
      K::HousingAssignment => row(false,  true,   Via(K::TeamTrip)),
      K::AthleteProfile    => row(false,  true,   S),
      K::SubjectProfile    => row(false,  true,   S),
    };
    policy
  }
}

// ─── Owner lookup ────────────────────────────────────────────────────────────

/// One hop of the walk from a record towards its subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
  Subject(SubjectRef),
  /// Id of the parent record; its kind is given by the [`OwnerPath`].
  Parent(i64),
}

/// Looks up the owner reference stored on a record. Implemented by whatever
/// store holds the dependent records.
pub trait RecordLocator: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Return the owner reference stored on record `id` of `kind`, or `None`
  /// if no such record exists.
  fn owner_of(
    &self,
    kind: RecordKind,
    id: i64,
  ) -> impl Future<Output = Result<Option<Owner>, Self::Error>> + Send + '_;
}

/// Longest parent chain the walker follows before giving up.
pub const MAX_OWNER_HOPS: usize = 4;

/// Follow `kind`'s owner path from record `id` to the subject that owns it.
///
/// Each hop must match the path declared in [`RecordKind::policy`]; a record
/// that stores a subject where a parent is expected (or the reverse) is
/// reported as [`Error::BrokenOwnerPath`] rather than trusted.
pub async fn owning_subject<L: RecordLocator>(
  locator: &L,
  kind: RecordKind,
  id: i64,
) -> Result<SubjectRef> {
  let (mut kind, mut id) = (kind, id);
  for _ in 0..MAX_OWNER_HOPS {
    let owner = locator
      .owner_of(kind, id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::RecordNotFound { kind, id })?;

    match (kind.policy().owner, owner) {
      (OwnerPath::Subject, Owner::Subject(subject)) => return Ok(subject),
      (OwnerPath::Via(parent), Owner::Parent(parent_id)) => {
        kind = parent;
        id = parent_id;
      }
      _ => return Err(Error::BrokenOwnerPath { kind, id }),
    }
  }
  Err(Error::BrokenOwnerPath { kind, id })
}
