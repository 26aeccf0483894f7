//! Grant lifecycle: explicit grants by staff, self-leave and ejection.
//!
//! Invitation acceptance is the other way grants are created; see
//! [`crate::invitation`].

use serde::Serialize;
use uuid::Uuid;

use crate::{
  AccessEngine, Error, Result,
  grant::{AccessGrant, GrantOutcome, NewGrant, Role},
  principal::Principal,
  store::AccessStore,
  subject::SubjectRef,
};

/// How a grant was removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Revocation {
  /// The holder left on their own.
  SelfLeave,
  /// A staff lead on the subject removed someone else.
  OwnerEject,
}

/// Existing grant of `held` that already satisfies a request for `wanted`.
fn covering(held: &[AccessGrant], wanted: Role) -> Option<&AccessGrant> {
  held
    .iter()
    .filter(|g| g.role.covers(wanted))
    .max_by_key(|g| g.role)
}

/// The part of a subject's grant ledger that a holder of `role` may see.
/// Staff leads see every grant; anyone else sees only their own.
fn visible_to(role: Role, viewer: Uuid, ledger: Vec<AccessGrant>) -> Vec<AccessGrant> {
  if role.is_staff_lead() {
    return ledger;
  }
  ledger.into_iter().filter(|g| g.principal_id == viewer).collect()
}

impl<S: AccessStore> AccessEngine<S> {
  /// Grants on `subject` as seen by `requester`. Having no role at all is
  /// `Unauthorized`.
  pub async fn visible_grants(
    &self,
    requester: &Principal,
    subject: SubjectRef,
  ) -> Result<Vec<AccessGrant>> {
    let role = self
      .resolve_role(requester, subject)
      .await?
      .ok_or(Error::Unauthorized)?;
    let ledger = self
      .store()
      .grants_for_subject(subject)
      .await
      .map_err(Error::store)?;
    Ok(visible_to(role, requester.principal_id, ledger))
  }

  /// Record `input` without any authority check. An equal-or-higher grant
  /// already held on the subject makes this a no-op.
  pub async fn record_grant(&self, input: NewGrant) -> Result<GrantOutcome> {
    self.subject(input.subject).await?;
    self.principal(input.principal_id).await?;

    let held = self
      .store()
      .grants_between(input.principal_id, vec![input.subject])
      .await
      .map_err(Error::store)?;
    if let Some(existing) = covering(&held, input.role) {
      return Ok(GrantOutcome { grant: existing.clone(), created: false });
    }

    let (grant, created) = self
      .store()
      .upsert_grant(input)
      .await
      .map_err(Error::store)?;
    Ok(GrantOutcome { grant, created })
  }

  /// Grant `input.role` on `input.subject` to `input.principal_id`.
  ///
  /// The requester must be a staff lead on the subject and may not hand out
  /// more authority than they hold; the superuser is exempt from the ceiling.
  pub async fn grant(
    &self,
    requester: &Principal,
    input: NewGrant,
  ) -> Result<GrantOutcome> {
    let subject = self.subject(input.subject).await?;
    self.principal(input.principal_id).await?;

    let held = self.role_on(requester, &subject).await?;
    let allowed = match held {
      Some(role) if role.is_staff_lead() => {
        requester.is_superuser || role.covers(input.role)
      }
      _ => false,
    };
    if !allowed {
      return Err(Error::Unauthorized);
    }

    self.record_grant(input).await
  }

  /// The holder removes their own grant.
  pub async fn self_revoke(&self, requester: &Principal, grant: &AccessGrant) -> Result<()> {
    if grant.principal_id != requester.principal_id {
      return Err(Error::Unauthorized);
    }
    self.delete_grant(grant.grant_id).await
  }

  /// A staff lead on the grant's subject removes someone's grant.
  pub async fn owner_revoke(&self, requester: &Principal, grant: &AccessGrant) -> Result<()> {
    match self.resolve_role(requester, grant.subject).await? {
      Some(role) if role.is_staff_lead() => self.delete_grant(grant.grant_id).await,
      _ => Err(Error::Unauthorized),
    }
  }

  /// Remove a grant, choosing self-leave or ejection by who is asking.
  pub async fn revoke(&self, requester: &Principal, grant_id: Uuid) -> Result<Revocation> {
    let grant = self
      .store()
      .get_grant(grant_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::GrantNotFound(grant_id))?;

    if grant.principal_id == requester.principal_id {
      self.self_revoke(requester, &grant).await?;
      Ok(Revocation::SelfLeave)
    } else {
      self.owner_revoke(requester, &grant).await?;
      Ok(Revocation::OwnerEject)
    }
  }

  // A concurrent revoke may have deleted the row already; that is success.
  async fn delete_grant(&self, grant_id: Uuid) -> Result<()> {
    self
      .store()
      .delete_grant(grant_id)
      .await
      .map_err(Error::store)?;
    Ok(())
  }
}
