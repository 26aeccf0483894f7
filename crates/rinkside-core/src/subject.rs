//! Subjects: the coachable entities that grants and dependent records point
//! at.
//!
//! The variant set is closed. Every dependent record (goal, log, plan, result)
//! refers to its owner through a [`SubjectRef`], never through a typed foreign
//! key, so adding a record kind never touches this module.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use uuid::Uuid;

// ─── Identity ────────────────────────────────────────────────────────────────

/// Discriminator of a [`Subject`] variant.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SubjectKind {
  /// A single person.
  Athlete,
  /// A pair or dance couple.
  PartnerTeam,
  /// A roster-based team, e.g. synchronized skating.
  GroupTeam,
}

impl SubjectKind {
  pub fn is_team(self) -> bool { !matches!(self, Self::Athlete) }
}

/// The stable `(kind, id)` identity of a subject. Ids are never reused, so a
/// stale reference can never resolve to a different subject.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct SubjectRef {
  pub kind: SubjectKind,
  pub id:   i64,
}

impl SubjectRef {
  pub fn new(kind: SubjectKind, id: i64) -> Self { Self { kind, id } }

  pub fn athlete(id: i64) -> Self { Self::new(SubjectKind::Athlete, id) }
}

impl fmt::Display for SubjectRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.kind, self.id)
  }
}

// ─── Variants ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Athlete {
  pub athlete_id:    i64,
  pub full_name:     String,
  /// The athlete's own login, once an invitation for it has been accepted.
  pub account:       Option<Uuid>,
  pub date_of_birth: Option<NaiveDate>,
  pub archived:      bool,
  pub created_at:    DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerTeam {
  pub team_id:    i64,
  pub name:       String,
  pub primary:    i64,
  pub secondary:  Option<i64>,
  pub archived:   bool,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupTeam {
  pub team_id:    i64,
  pub name:       String,
  /// Athlete ids, in ascending order.
  pub roster:     Vec<i64>,
  pub archived:   bool,
  pub created_at: DateTime<Utc>,
}

/// A coachable entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Subject {
  Athlete(Athlete),
  PartnerTeam(PartnerTeam),
  GroupTeam(GroupTeam),
}

impl Subject {
  pub fn kind(&self) -> SubjectKind {
    match self {
      Self::Athlete(_) => SubjectKind::Athlete,
      Self::PartnerTeam(_) => SubjectKind::PartnerTeam,
      Self::GroupTeam(_) => SubjectKind::GroupTeam,
    }
  }

  pub fn subject_ref(&self) -> SubjectRef {
    let id = match self {
      Self::Athlete(a) => a.athlete_id,
      Self::PartnerTeam(t) => t.team_id,
      Self::GroupTeam(t) => t.team_id,
    };
    SubjectRef::new(self.kind(), id)
  }

  /// The individual athletes this subject stands for: itself, the one or two
  /// partners, or the roster.
  pub fn member_ids(&self) -> Vec<i64> {
    match self {
      Self::Athlete(a) => vec![a.athlete_id],
      Self::PartnerTeam(t) => {
        std::iter::once(t.primary).chain(t.secondary).collect()
      }
      Self::GroupTeam(t) => t.roster.clone(),
    }
  }

  pub fn is_archived(&self) -> bool {
    match self {
      Self::Athlete(a) => a.archived,
      Self::PartnerTeam(t) => t.archived,
      Self::GroupTeam(t) => t.archived,
    }
  }

  pub fn as_athlete(&self) -> Option<&Athlete> {
    match self {
      Self::Athlete(a) => Some(a),
      _ => None,
    }
  }

  pub fn display_name(&self) -> &str {
    match self {
      Self::Athlete(a) => &a.full_name,
      Self::PartnerTeam(t) => &t.name,
      Self::GroupTeam(t) => &t.name,
    }
  }
}

// ─── NewSubject ──────────────────────────────────────────────────────────────

/// Input to [`crate::store::AccessStore::onboard_subject`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NewSubject {
  Athlete {
    full_name:     String,
    date_of_birth: Option<NaiveDate>,
  },
  PartnerTeam {
    name:      String,
    primary:   i64,
    secondary: Option<i64>,
  },
  GroupTeam {
    name:   String,
    #[serde(default)]
    roster: Vec<i64>,
  },
}

impl NewSubject {
  pub fn kind(&self) -> SubjectKind {
    match self {
      Self::Athlete { .. } => SubjectKind::Athlete,
      Self::PartnerTeam { .. } => SubjectKind::PartnerTeam,
      Self::GroupTeam { .. } => SubjectKind::GroupTeam,
    }
  }

  pub fn name(&self) -> &str {
    match self {
      Self::Athlete { full_name, .. } => full_name,
      Self::PartnerTeam { name, .. } | Self::GroupTeam { name, .. } => name,
    }
  }

  /// Athletes that must already exist for this subject to be created.
  pub fn member_ids(&self) -> Vec<i64> {
    match self {
      Self::Athlete { .. } => Vec::new(),
      Self::PartnerTeam { primary, secondary, .. } => {
        std::iter::once(*primary).chain(*secondary).collect()
      }
      Self::GroupTeam { roster, .. } => roster.clone(),
    }
  }
}
