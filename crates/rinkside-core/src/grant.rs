//! Roles and access grants: the ternary `(principal, subject, role)` facts
//! that make up the grant ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::subject::SubjectRef;

// ─── Role ────────────────────────────────────────────────────────────────────

/// Authority a principal holds over a subject.
///
/// Variants are declared in ascending authority, so the derived `Ord` picks
/// the most authoritative role with `max()`. `Coach` and `Manager` carry the
/// same authority; `Coach` sorts above `Manager` only so that a tie resolves
/// deterministically.
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
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
  Viewer,
  Guardian,
  Collaborator,
  Manager,
  Coach,
  Owner,
}

impl Role {
  /// Numeric authority level; equal for `Coach` and `Manager`.
  pub fn authority(self) -> u8 {
    match self {
      Self::Viewer => 1,
      Self::Guardian => 2,
      Self::Collaborator => 3,
      Self::Manager | Self::Coach => 4,
      Self::Owner => 5,
    }
  }

  /// Roles that run the subject: may delete records, manage grants and
  /// eject other principals.
  pub fn is_staff_lead(self) -> bool { self.authority() >= Self::Manager.authority() }

  /// `true` if `self` is at least as authoritative as `other`.
  pub fn covers(self, other: Role) -> bool { self.authority() >= other.authority() }
}

// ─── AccessGrant ─────────────────────────────────────────────────────────────

/// A persisted fact that `principal_id` holds `role` on `subject`.
/// At most one row exists per `(principal, subject, role)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGrant {
  pub grant_id:     Uuid,
  pub principal_id: Uuid,
  pub subject:      SubjectRef,
  pub role:         Role,
  pub created_at:   DateTime<Utc>,
}

/// Input to [`crate::store::AccessStore::upsert_grant`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewGrant {
  pub principal_id: Uuid,
  pub subject:      SubjectRef,
  pub role:         Role,
}

/// Result of [`crate::AccessEngine::grant`].
#[derive(Debug, Clone, Serialize)]
pub struct GrantOutcome {
  pub grant:   AccessGrant,
  /// `false` when an equal-or-higher grant already existed.
  pub created: bool,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn max_picks_highest_authority() {
    let roles = [Role::Viewer, Role::Collaborator, Role::Guardian];
    assert_eq!(roles.into_iter().max(), Some(Role::Collaborator));
    assert_eq!([Role::Manager, Role::Coach].into_iter().max(), Some(Role::Coach));
  }

  #[test]
  fn coach_and_manager_share_authority() {
    assert!(Role::Manager.covers(Role::Coach));
    assert!(Role::Coach.covers(Role::Manager));
    assert!(!Role::Collaborator.covers(Role::Manager));
    assert!(Role::Owner.is_staff_lead());
    assert!(!Role::Collaborator.is_staff_lead());
  }

  #[test]
  fn role_wire_names() {
    assert_eq!(Role::Collaborator.to_string(), "COLLABORATOR");
    assert_eq!("GUARDIAN".parse::<Role>().unwrap(), Role::Guardian);
    assert_eq!(serde_json::to_string(&Role::Owner).unwrap(), "\"OWNER\"");
  }
}
