//! The permission gate: resolved role × verb × record kind → allow/deny.

use crate::{
  grant::Role,
  record::{RecordKind, Verb},
};

/// Outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
  Allow(Role),
  Deny,
}

impl Decision {
  pub fn is_allowed(self) -> bool { matches!(self, Self::Allow(_)) }

  pub fn role(self) -> Option<Role> {
    match self {
      Self::Allow(role) => Some(role),
      Self::Deny => None,
    }
  }
}

/// Decide whether `role` may perform `verb` on a record of `kind`.
///
/// Any role reads. Only the owner and the coach/manager tier delete. Staff
/// write everything, except that collaborators cannot originate kinds whose
/// policy forbids it. Guardians write only family-writable kinds; viewers
/// never write.
pub fn is_allowed(role: Option<Role>, verb: Verb, kind: RecordKind) -> bool {
  let Some(role) = role else {
    return false;
  };
  let policy = kind.policy();

  match (verb, role) {
    (Verb::Read, _) => true,

    (Verb::Delete, Role::Owner | Role::Coach | Role::Manager) => true,
    (Verb::Delete, _) => false,

    (Verb::Create | Verb::Update, Role::Owner | Role::Coach | Role::Manager) => {
      true
    }
    (Verb::Create, Role::Collaborator) => policy.collaborator_may_originate,
    (Verb::Update, Role::Collaborator) => true,
    (Verb::Create | Verb::Update, Role::Guardian) => policy.family_writable,
    (Verb::Create | Verb::Update, Role::Viewer) => false,
  }
}

pub fn decide(role: Option<Role>, verb: Verb, kind: RecordKind) -> Decision {
  match role {
    Some(r) if is_allowed(role, verb, kind) => Decision::Allow(r),
    _ => Decision::Deny,
  }
}

#[cfg(test)]
mod tests {
  use strum::IntoEnumIterator;

  use super::*;

  #[test]
  fn no_role_denies_everything() {
    for verb in Verb::iter() {
      for kind in RecordKind::iter() {
        assert!(!is_allowed(None, verb, kind));
      }
    }
  }

  #[test]
  fn read_is_universal() {
    for role in Role::iter() {
      for kind in RecordKind::iter() {
        assert!(is_allowed(Some(role), Verb::Read, kind), "{role} read {kind}");
      }
    }
  }

  #[test]
  fn delete_is_narrow() {
    for kind in RecordKind::iter() {
      assert!(!is_allowed(Some(Role::Collaborator), Verb::Delete, kind));
      assert!(!is_allowed(Some(Role::Guardian), Verb::Delete, kind));
      assert!(!is_allowed(Some(Role::Viewer), Verb::Delete, kind));
      assert!(is_allowed(Some(Role::Owner), Verb::Delete, kind));
      assert!(is_allowed(Some(Role::Coach), Verb::Delete, kind));
      assert!(is_allowed(Some(Role::Manager), Verb::Delete, kind));
    }
  }

  #[test]
  fn family_allowlist_boundary() {
    let g = Some(Role::Guardian);
    assert!(is_allowed(g, Verb::Update, RecordKind::InjuryLog));
    assert!(is_allowed(g, Verb::Create, RecordKind::SessionLog));
    assert!(!is_allowed(g, Verb::Update, RecordKind::YearlyPlan));
    assert!(!is_allowed(g, Verb::Create, RecordKind::TeamTrip));
  }

  #[test]
  fn viewers_never_write_even_on_the_allowlist() {
    for kind in RecordKind::iter() {
      assert!(!is_allowed(Some(Role::Viewer), Verb::Create, kind));
      assert!(!is_allowed(Some(Role::Viewer), Verb::Update, kind));
    }
  }

  #[test]
  fn collaborators_edit_but_do_not_originate_yearly_plans() {
    let c = Some(Role::Collaborator);
    assert!(!is_allowed(c, Verb::Create, RecordKind::YearlyPlan));
    assert!(is_allowed(c, Verb::Update, RecordKind::YearlyPlan));
    assert!(is_allowed(c, Verb::Create, RecordKind::Macrocycle));
    assert!(is_allowed(Some(Role::Coach), Verb::Create, RecordKind::YearlyPlan));
  }

  #[test]
  fn decide_carries_the_role() {
    assert_eq!(
      decide(Some(Role::Manager), Verb::Delete, RecordKind::Goal),
      Decision::Allow(Role::Manager)
    );
    assert_eq!(decide(Some(Role::Viewer), Verb::Update, RecordKind::Goal), Decision::Deny);
    assert_eq!(decide(None, Verb::Read, RecordKind::Goal).role(), None);
  }
}
