//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, dates of birth are `YYYY-MM-DD`, UUIDs are
//! hyphenated lowercase strings and enums use their `strum` names.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rinkside_core::{
  grant::AccessGrant,
  invitation::Invitation,
  principal::{Credentials, Principal},
  subject::{Athlete, GroupTeam, PartnerTeam, Subject, SubjectRef},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── Dates ───────────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn encode_enum<T: Into<&'static str>>(v: T) -> String { v.into().to_owned() }

pub fn decode_enum<T: FromStr>(what: &'static str, s: &str) -> Result<T> {
  s.parse().map_err(|_| {
    Error::Core(rinkside_core::Error::UnknownVariant { what, value: s.to_owned() })
  })
}

pub fn decode_subject_ref(kind: &str, id: i64) -> Result<SubjectRef> {
  Ok(SubjectRef::new(decode_enum("subject kind", kind)?, id))
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const PRINCIPAL_COLUMNS: &str =
  "principal_id, email, full_name, category, is_superuser, password_hash, created_at";

/// Raw values read directly from a `principals` row.
pub struct RawPrincipal {
  pub principal_id:  String,
  pub email:         String,
  pub full_name:     String,
  pub category:      String,
  pub is_superuser:  bool,
  pub password_hash: Option<String>,
  pub created_at:    String,
}

impl RawPrincipal {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      principal_id:  row.get(0)?,
      email:         row.get(1)?,
      full_name:     row.get(2)?,
      category:      row.get(3)?,
      is_superuser:  row.get(4)?,
      password_hash: row.get(5)?,
      created_at:    row.get(6)?,
    })
  }

  pub fn into_credentials(self) -> Result<Credentials> {
    let principal = Principal {
      principal_id: decode_uuid(&self.principal_id)?,
      email:        self.email,
      full_name:    self.full_name,
      category:     decode_enum("principal category", &self.category)?,
      is_superuser: self.is_superuser,
      created_at:   decode_dt(&self.created_at)?,
    };
    Ok(Credentials { principal, password_hash: self.password_hash })
  }

  pub fn into_principal(self) -> Result<Principal> {
    Ok(self.into_credentials()?.principal)
  }
}

pub const ATHLETE_COLUMNS: &str =
  "athlete_id, full_name, account, date_of_birth, archived, created_at";

/// Raw values read directly from an `athletes` row.
pub struct RawAthlete {
  pub athlete_id:    i64,
  pub full_name:     String,
  pub account:       Option<String>,
  pub date_of_birth: Option<String>,
  pub archived:      bool,
  pub created_at:    String,
}

impl RawAthlete {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      athlete_id:    row.get(0)?,
      full_name:     row.get(1)?,
      account:       row.get(2)?,
      date_of_birth: row.get(3)?,
      archived:      row.get(4)?,
      created_at:    row.get(5)?,
    })
  }

  pub fn into_athlete(self) -> Result<Athlete> {
    Ok(Athlete {
      athlete_id:    self.athlete_id,
      full_name:     self.full_name,
      account:       self.account.as_deref().map(decode_uuid).transpose()?,
      date_of_birth: self.date_of_birth.as_deref().map(decode_date).transpose()?,
      archived:      self.archived,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

pub const PARTNER_COLUMNS: &str =
  "team_id, name, primary_id, secondary_id, archived, created_at";

/// Raw values read directly from a `partner_teams` row.
pub struct RawPartnerTeam {
  pub team_id:    i64,
  pub name:       String,
  pub primary:    i64,
  pub secondary:  Option<i64>,
  pub archived:   bool,
  pub created_at: String,
}

impl RawPartnerTeam {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      team_id:    row.get(0)?,
      name:       row.get(1)?,
      primary:    row.get(2)?,
      secondary:  row.get(3)?,
      archived:   row.get(4)?,
      created_at: row.get(5)?,
    })
  }

  pub fn into_team(self) -> Result<PartnerTeam> {
    Ok(PartnerTeam {
      team_id:    self.team_id,
      name:       self.name,
      primary:    self.primary,
      secondary:  self.secondary,
      archived:   self.archived,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values from a `group_teams` row plus its roster.
pub struct RawGroupTeam {
  pub team_id:    i64,
  pub name:       String,
  pub archived:   bool,
  pub created_at: String,
  pub roster:     Vec<i64>,
}

impl RawGroupTeam {
  pub fn into_team(self) -> Result<GroupTeam> {
    Ok(GroupTeam {
      team_id:    self.team_id,
      name:       self.name,
      roster:     self.roster,
      archived:   self.archived,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// A subject row of any kind.
pub enum RawSubject {
  Athlete(RawAthlete),
  PartnerTeam(RawPartnerTeam),
  GroupTeam(RawGroupTeam),
}

impl RawSubject {
  pub fn into_subject(self) -> Result<Subject> {
    Ok(match self {
      Self::Athlete(a) => Subject::Athlete(a.into_athlete()?),
      Self::PartnerTeam(t) => Subject::PartnerTeam(t.into_team()?),
      Self::GroupTeam(t) => Subject::GroupTeam(t.into_team()?),
    })
  }
}

pub const GRANT_COLUMNS: &str =
  "grant_id, principal_id, subject_kind, subject_id, role, created_at";

/// Raw values read directly from an `access_grants` row.
pub struct RawGrant {
  pub grant_id:     String,
  pub principal_id: String,
  pub subject_kind: String,
  pub subject_id:   i64,
  pub role:         String,
  pub created_at:   String,
}

impl RawGrant {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      grant_id:     row.get(0)?,
      principal_id: row.get(1)?,
      subject_kind: row.get(2)?,
      subject_id:   row.get(3)?,
      role:         row.get(4)?,
      created_at:   row.get(5)?,
    })
  }

  pub fn into_grant(self) -> Result<AccessGrant> {
    Ok(AccessGrant {
      grant_id:     decode_uuid(&self.grant_id)?,
      principal_id: decode_uuid(&self.principal_id)?,
      subject:      decode_subject_ref(&self.subject_kind, self.subject_id)?,
      role:         decode_enum("role", &self.role)?,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

pub const INVITATION_COLUMNS: &str = "token, email, sender, role, subject_kind, \
                                      subject_id, created_at, expires_at, accepted_at";

/// Raw values read directly from an `invitations` row.
pub struct RawInvitation {
  pub token:        String,
  pub email:        String,
  pub sender:       String,
  pub role:         String,
  pub subject_kind: String,
  pub subject_id:   i64,
  pub created_at:   String,
  pub expires_at:   String,
  pub accepted_at:  Option<String>,
}

impl RawInvitation {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      token:        row.get(0)?,
      email:        row.get(1)?,
      sender:       row.get(2)?,
      role:         row.get(3)?,
      subject_kind: row.get(4)?,
      subject_id:   row.get(5)?,
      created_at:   row.get(6)?,
      expires_at:   row.get(7)?,
      accepted_at:  row.get(8)?,
    })
  }

  pub fn into_invitation(self) -> Result<Invitation> {
    Ok(Invitation {
      token:       decode_uuid(&self.token)?,
      email:       self.email,
      sender:      decode_uuid(&self.sender)?,
      role:        decode_enum("invitation role", &self.role)?,
      subject:     decode_subject_ref(&self.subject_kind, self.subject_id)?,
      created_at:  decode_dt(&self.created_at)?,
      expires_at:  decode_dt(&self.expires_at)?,
      accepted_at: self.accepted_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}
