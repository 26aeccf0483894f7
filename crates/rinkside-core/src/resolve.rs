//! Role resolution: which single role a principal holds on a subject.
//!
//! Sources are consulted in strict order and the first one that yields a role
//! wins: superuser, identity, direct grants, grants on a team containing the
//! athlete. Within one source the most authoritative role wins. A direct
//! `VIEWER` grant therefore beats a `COACH` grant inherited through a team.

use crate::{grant::Role, principal::Principal, subject::Subject};

/// Role the superuser escape hatch resolves to.
pub const SUPERUSER_ROLE: Role = Role::Coach;

/// Grant roles gathered from the ledger for one `(principal, subject)` pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evidence {
  /// Roles granted on exactly this subject.
  pub direct:    Vec<Role>,
  /// Roles granted on teams the subject (an athlete) belongs to. Ignored for
  /// team subjects.
  pub via_teams: Vec<Role>,
}

/// Roles that need no ledger lookup: the superuser hatch and identity.
pub fn intrinsic_role(principal: &Principal, subject: &Subject) -> Option<Role> {
  if principal.is_superuser {
    return Some(SUPERUSER_ROLE);
  }
  match subject {
    Subject::Athlete(a) if a.account == Some(principal.principal_id) => {
      Some(Role::Owner)
    }
    _ => None,
  }
}

pub fn resolve_role(
  principal: &Principal,
  subject: &Subject,
  evidence: &Evidence,
) -> Option<Role> {
  if let Some(role) = intrinsic_role(principal, subject) {
    return Some(role);
  }
  if let Some(role) = evidence.direct.iter().copied().max() {
    return Some(role);
  }
  match subject {
    Subject::Athlete(_) => evidence.via_teams.iter().copied().max(),
    Subject::PartnerTeam(_) | Subject::GroupTeam(_) => None,
  }
}

#[cfg(test)]
mod tests {
  use chrono::{DateTime, Utc};
  use uuid::Uuid;

  use super::*;
  use crate::{
    principal::PrincipalCategory,
    subject::{Athlete, GroupTeam},
  };

  fn principal(superuser: bool) -> Principal {
    Principal {
      principal_id: Uuid::new_v4(),
      email:        "p@example.com".into(),
      full_name:    "P".into(),
      category:     PrincipalCategory::Coach,
      is_superuser: superuser,
      created_at:   DateTime::<Utc>::UNIX_EPOCH,
    }
  }

  fn athlete(account: Option<Uuid>) -> Subject {
    Subject::Athlete(Athlete {
      athlete_id: 1,
      full_name: "A".into(),
      account,
      date_of_birth: None,
      archived: false,
      created_at: DateTime::<Utc>::UNIX_EPOCH,
    })
  }

  fn group() -> Subject {
    Subject::GroupTeam(GroupTeam {
      team_id:    9,
      name:       "G".into(),
      roster:     vec![1],
      archived:   false,
      created_at: DateTime::<Utc>::UNIX_EPOCH,
    })
  }

  #[test]
  fn superuser_resolves_to_coach() {
    let p = principal(true);
    assert_eq!(resolve_role(&p, &group(), &Evidence::default()), Some(Role::Coach));
  }

  #[test]
  fn identity_beats_any_grant() {
    let p = principal(false);
    let evidence = Evidence {
      direct:    vec![Role::Viewer],
      via_teams: vec![Role::Coach],
    };
    let me = athlete(Some(p.principal_id));
    assert_eq!(resolve_role(&p, &me, &evidence), Some(Role::Owner));
  }

  #[test]
  fn direct_beats_indirect_even_when_lower() {
    let p = principal(false);
    let evidence = Evidence {
      direct:    vec![Role::Viewer],
      via_teams: vec![Role::Coach],
    };
    assert_eq!(resolve_role(&p, &athlete(None), &evidence), Some(Role::Viewer));
  }

  #[test]
  fn highest_within_a_source() {
    let p = principal(false);
    let evidence = Evidence {
      direct:    vec![Role::Guardian, Role::Collaborator],
      via_teams: vec![],
    };
    assert_eq!(resolve_role(&p, &athlete(None), &evidence), Some(Role::Collaborator));

    let evidence = Evidence {
      direct:    vec![],
      via_teams: vec![Role::Viewer, Role::Manager],
    };
    assert_eq!(resolve_role(&p, &athlete(None), &evidence), Some(Role::Manager));
  }

  #[test]
  fn teams_do_not_inherit_from_other_teams() {
    let p = principal(false);
    let evidence = Evidence {
      direct:    vec![],
      via_teams: vec![Role::Coach],
    };
    assert_eq!(resolve_role(&p, &group(), &evidence), None);
  }

  #[test]
  fn nothing_means_no_access() {
    let p = principal(false);
    assert_eq!(resolve_role(&p, &athlete(None), &Evidence::default()), None);
  }
}
