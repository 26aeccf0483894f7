//! Roster index: the set of individual athletes a principal can reach.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
  grant::{AccessGrant, Role},
  subject::{Athlete, Subject, SubjectRef},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RosterMode {
  /// Every subject the principal holds any grant on.
  #[default]
  All,
  /// Only subjects the principal actually works with; viewer grants dropped.
  Operational,
}

impl RosterMode {
  pub fn admits(self, role: Role) -> bool {
    match self {
      Self::All => true,
      Self::Operational => role != Role::Viewer,
    }
  }
}

/// Grants that count for `mode`, as distinct subject refs.
pub fn subjects_for(grants: &[AccessGrant], mode: RosterMode) -> Vec<SubjectRef> {
  grants
    .iter()
    .filter(|g| mode.admits(g.role))
    .map(|g| g.subject)
    .collect::<BTreeSet<_>>()
    .into_iter()
    .collect()
}

/// Union of the members of every subject, plus the principal's own athlete.
pub fn expand(subjects: &[Subject], own: Option<i64>) -> BTreeSet<i64> {
  subjects
    .iter()
    .flat_map(Subject::member_ids)
    .chain(own)
    .collect()
}

/// Active athletes first, then alphabetical.
pub fn sort_roster(athletes: &mut [Athlete]) {
  athletes.sort_by(|a, b| {
    a.archived
      .cmp(&b.archived)
      .then_with(|| a.full_name.cmp(&b.full_name))
      .then_with(|| a.athlete_id.cmp(&b.athlete_id))
  });
}

#[cfg(test)]
mod tests {
  use chrono::{DateTime, Utc};
  use uuid::Uuid;

  use super::*;
  use crate::subject::{GroupTeam, PartnerTeam};

  fn grant(subject: SubjectRef, role: Role) -> AccessGrant {
    AccessGrant {
      grant_id: Uuid::new_v4(),
      principal_id: Uuid::nil(),
      subject,
      role,
      created_at: DateTime::<Utc>::UNIX_EPOCH,
    }
  }

  fn athlete(id: i64, name: &str, archived: bool) -> Athlete {
    Athlete {
      athlete_id: id,
      full_name: name.into(),
      account: None,
      date_of_birth: None,
      archived,
      created_at: DateTime::<Utc>::UNIX_EPOCH,
    }
  }

  #[test]
  fn operational_mode_drops_viewer_grants() {
    let grants = vec![
      grant(SubjectRef::athlete(1), Role::Viewer),
      grant(SubjectRef::athlete(2), Role::Guardian),
      grant(SubjectRef::athlete(2), Role::Collaborator),
    ];
    assert_eq!(subjects_for(&grants, RosterMode::All), vec![
      SubjectRef::athlete(1),
      SubjectRef::athlete(2),
    ]);
    assert_eq!(subjects_for(&grants, RosterMode::Operational), vec![
      SubjectRef::athlete(2)
    ]);
  }

  #[test]
  fn expand_unions_members_and_own_athlete() {
    let at = DateTime::<Utc>::UNIX_EPOCH;
    let subjects = vec![
      Subject::Athlete(athlete(1, "A", false)),
      Subject::PartnerTeam(PartnerTeam {
        team_id: 1,
        name: "P".into(),
        primary: 1,
        secondary: Some(2),
        archived: false,
        created_at: at,
      }),
      Subject::GroupTeam(GroupTeam {
        team_id: 1,
        name: "G".into(),
        roster: vec![2, 3],
        archived: false,
        created_at: at,
      }),
    ];
    let ids: Vec<_> = expand(&subjects, Some(9)).into_iter().collect();
    assert_eq!(ids, vec![1, 2, 3, 9]);
  }

  #[test]
  fn roster_order_is_active_first_then_name() {
    let mut roster = vec![
      athlete(1, "Zoe", false),
      athlete(2, "Abe", true),
      athlete(3, "Mia", false),
    ];
    sort_roster(&mut roster);
    let names: Vec<_> = roster.iter().map(|a| a.full_name.as_str()).collect();
    assert_eq!(names, vec!["Mia", "Zoe", "Abe"]);
  }
}
