//! Invitations: the only way a new account joins a subject.
//!
//! A staff lead invites an email address with a role on one subject. Accepting
//! the invitation creates the account and either links it to the athlete
//! (athlete invitations) or records the corresponding grant.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::{
  AccessEngine, Error, Result,
  grant::Role,
  guardian::{self, GuardianCheck},
  principal::{NewPrincipal, Principal, PrincipalCategory},
  record::{RecordKind, Verb},
  store::AccessStore,
  subject::{Athlete, SubjectKind, SubjectRef},
};

pub const INVITATION_TTL_DAYS: i64 = 7;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InviteRole {
  /// The invitee becomes the athlete's own account.
  Athlete,
  Coach,
  Manager,
  Collaborator,
  Guardian,
  Viewer,
}

impl InviteRole {
  /// The grant recorded on acceptance; `None` for athlete invitations, which
  /// link the account instead.
  pub fn grant_role(self) -> Option<Role> {
    match self {
      Self::Athlete => None,
      Self::Coach => Some(Role::Coach),
      Self::Manager => Some(Role::Manager),
      Self::Collaborator => Some(Role::Collaborator),
      Self::Guardian => Some(Role::Guardian),
      Self::Viewer => Some(Role::Viewer),
    }
  }

  /// Account category of the principal created on acceptance.
  pub fn category(self) -> PrincipalCategory {
    match self {
      Self::Athlete => PrincipalCategory::Athlete,
      Self::Coach | Self::Manager | Self::Collaborator => PrincipalCategory::Coach,
      Self::Guardian => PrincipalCategory::Guardian,
      Self::Viewer => PrincipalCategory::Observer,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
  pub token:       Uuid,
  pub email:       String,
  pub sender:      Uuid,
  pub role:        InviteRole,
  pub subject:     SubjectRef,
  pub created_at:  DateTime<Utc>,
  pub expires_at:  DateTime<Utc>,
  pub accepted_at: Option<DateTime<Utc>>,
}

impl Invitation {
  pub fn is_open(&self, now: DateTime<Utc>) -> bool {
    self.accepted_at.is_none() && now < self.expires_at
  }
}

/// Input to [`crate::store::AccessStore::add_invitation`].
#[derive(Debug, Clone)]
pub struct NewInvitation {
  pub email:      String,
  pub sender:     Uuid,
  pub role:       InviteRole,
  pub subject:    SubjectRef,
  pub expires_at: DateTime<Utc>,
}

/// What the invitee sees before accepting.
#[derive(Debug, Clone, Serialize)]
pub struct InvitationPreview {
  pub email:        String,
  pub role:         InviteRole,
  pub subject:      SubjectRef,
  pub subject_name: String,
  pub sender_name:  String,
  pub expires_at:   DateTime<Utc>,
}

/// Account details supplied by the invitee.
#[derive(Debug, Clone)]
pub struct Acceptance {
  pub full_name:     String,
  /// argon2 PHC string of the chosen password.
  pub password_hash: String,
}

impl<S: AccessStore> AccessEngine<S> {
  /// Guardian-dependency status of `athlete` as of the engine's today.
  pub async fn guardian_dependency(&self, athlete: &Athlete) -> Result<GuardianCheck> {
    let has_guardian = self
      .store()
      .grants_for_subject(SubjectRef::athlete(athlete.athlete_id))
      .await
      .map_err(Error::store)?
      .iter()
      .any(|g| g.role == Role::Guardian);
    Ok(guardian::check(athlete.date_of_birth, self.today(), has_guardian))
  }

  async fn email_taken(&self, email: &str) -> Result<bool> {
    Ok(
      self
        .store()
        .credentials(email)
        .await
        .map_err(Error::store)?
        .is_some(),
    )
  }

  pub async fn send_invitation(
    &self,
    requester: &Principal,
    email: String,
    role: InviteRole,
    subject: SubjectRef,
  ) -> Result<Invitation> {
    let email = email.trim().to_owned();
    if !email.contains('@') {
      return Err(Error::Invalid(format!("not an email address: {email:?}")));
    }

    let held = self
      .require(requester, RecordKind::SubjectProfile, Verb::Update, subject)
      .await?;
    if !held.is_staff_lead() {
      return Err(Error::Unauthorized);
    }
    if let Some(invited) = role.grant_role()
      && !requester.is_superuser
      && !held.covers(invited)
    {
      return Err(Error::Unauthorized);
    }

    if role == InviteRole::Athlete {
      if subject.kind != SubjectKind::Athlete {
        return Err(Error::Invalid(
          "athlete invitations must target an athlete".into(),
        ));
      }
      let target = self.subject(subject).await?;
      let Some(athlete) = target.as_athlete() else {
        return Err(Error::SubjectNotFound(subject));
      };
      if athlete.account.is_some() {
        return Err(Error::Conflict("athlete already has an account".into()));
      }
      if let check @ GuardianCheck::TooYoung { .. } = self.guardian_dependency(athlete).await?
        && let Some(reason) = check.reason()
      {
        return Err(Error::ComplianceBlocked(reason));
      }
    }

    if self.email_taken(&email).await? {
      return Err(Error::Conflict(format!("{email} is already registered")));
    }

    let expires_at = self.now() + Duration::days(INVITATION_TTL_DAYS);
    self
      .store()
      .add_invitation(NewInvitation {
        email,
        sender: requester.principal_id,
        role,
        subject,
        expires_at,
      })
      .await
      .map_err(Error::store)
  }

  /// Load an invitation that can still be accepted, enforcing the
  /// guardian rule for athlete invitations.
  async fn open_invitation(&self, token: Uuid) -> Result<Invitation> {
    let invitation = self
      .store()
      .get_invitation(token)
      .await
      .map_err(Error::store)?
      .ok_or(Error::InvitationNotFound)?;
    if !invitation.is_open(self.now()) {
      return Err(Error::InvitationClosed);
    }

    if invitation.role == InviteRole::Athlete {
      let subject = self.subject(invitation.subject).await?;
      if let Some(athlete) = subject.as_athlete() {
        if athlete.account.is_some() {
          return Err(Error::Conflict("athlete already has an account".into()));
        }
        if let Some(reason) = self.guardian_dependency(athlete).await?.reason() {
          return Err(Error::ComplianceBlocked(reason));
        }
      }
    }
    Ok(invitation)
  }

  pub async fn preview_invitation(&self, token: Uuid) -> Result<InvitationPreview> {
    let invitation = self.open_invitation(token).await?;
    let subject = self.subject(invitation.subject).await?;
    let sender_name = self
      .store()
      .get_principal(invitation.sender)
      .await
      .map_err(Error::store)?
      .map(|p| p.full_name)
      .unwrap_or_default();

    Ok(InvitationPreview {
      email: invitation.email,
      role: invitation.role,
      subject: invitation.subject,
      subject_name: subject.display_name().to_owned(),
      sender_name,
      expires_at: invitation.expires_at,
    })
  }

  /// Create the invitee's account and redeem the invitation atomically.
  pub async fn accept_invitation(
    &self,
    token: Uuid,
    acceptance: Acceptance,
  ) -> Result<Principal> {
    let invitation = self.open_invitation(token).await?;
    let full_name = acceptance.full_name.trim().to_owned();
    if full_name.is_empty() {
      return Err(Error::Invalid("full name must not be empty".into()));
    }
    if self.email_taken(&invitation.email).await? {
      return Err(Error::Conflict(format!(
        "{} is already registered",
        invitation.email
      )));
    }

    let account = NewPrincipal {
      email: invitation.email.clone(),
      full_name,
      category: invitation.role.category(),
      is_superuser: false,
      password_hash: Some(acceptance.password_hash),
    };
    self
      .store()
      .redeem_invitation(token, account)
      .await
      .map_err(Error::store)?
      .ok_or(Error::InvitationClosed)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn invitations_close_on_expiry_or_acceptance() {
    let created = DateTime::<Utc>::UNIX_EPOCH;
    let mut invitation = Invitation {
      token:       Uuid::nil(),
      email:       "a@b.c".into(),
      sender:      Uuid::nil(),
      role:        InviteRole::Viewer,
      subject:     SubjectRef::athlete(1),
      created_at:  created,
      expires_at:  created + Duration::days(INVITATION_TTL_DAYS),
      accepted_at: None,
    };
    assert!(invitation.is_open(created + Duration::days(6)));
    assert!(!invitation.is_open(created + Duration::days(7)));
    invitation.accepted_at = Some(created);
    assert!(!invitation.is_open(created));
  }

  #[test]
  fn invite_roles_map_to_grants_and_categories() {
    assert_eq!(InviteRole::Athlete.grant_role(), None);
    assert_eq!(InviteRole::Manager.grant_role(), Some(Role::Manager));
    assert_eq!(InviteRole::Collaborator.category(), PrincipalCategory::Coach);
    assert_eq!(InviteRole::Viewer.category(), PrincipalCategory::Observer);
    assert_eq!("guardian".parse::<InviteRole>().unwrap(), InviteRole::Guardian);
  }
}
