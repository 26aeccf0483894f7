//! [`SqliteStore`]: the SQLite implementation of [`AccessStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{OptionalExtension as _, params};
use uuid::Uuid;

use rinkside_core::{
  Error as CoreError,
  grant::{AccessGrant, NewGrant, Role},
  invitation::{Invitation, NewInvitation},
  principal::{Credentials, NewPrincipal, Principal},
  store::AccessStore,
  subject::{Athlete, NewSubject, Subject, SubjectKind, SubjectRef},
};

use crate::{
  Error, Result,
  encode::{
    ATHLETE_COLUMNS, GRANT_COLUMNS, INVITATION_COLUMNS, PARTNER_COLUMNS,
    PRINCIPAL_COLUMNS, RawAthlete, RawGrant, RawGroupTeam, RawInvitation,
    RawPartnerTeam, RawPrincipal, RawSubject, decode_subject_ref, encode_date,
    encode_dt, encode_enum, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Row helpers ─────────────────────────────────────────────────────────────

/// Table and key column holding subjects of `kind`.
fn subject_table(kind: SubjectKind) -> (&'static str, &'static str) {
  match kind {
    SubjectKind::Athlete => ("athletes", "athlete_id"),
    SubjectKind::PartnerTeam => ("partner_teams", "team_id"),
    SubjectKind::GroupTeam => ("group_teams", "team_id"),
  }
}

fn load_subject(
  conn: &rusqlite::Connection,
  subject: SubjectRef,
) -> rusqlite::Result<Option<RawSubject>> {
  let id = subject.id;
  match subject.kind {
    SubjectKind::Athlete => Ok(
      conn
        .query_row(
          &format!("SELECT {ATHLETE_COLUMNS} FROM athletes WHERE athlete_id = ?1"),
          params![id],
          RawAthlete::from_row,
        )
        .optional()?
        .map(RawSubject::Athlete),
    ),
    SubjectKind::PartnerTeam => Ok(
      conn
        .query_row(
          &format!("SELECT {PARTNER_COLUMNS} FROM partner_teams WHERE team_id = ?1"),
          params![id],
          RawPartnerTeam::from_row,
        )
        .optional()?
        .map(RawSubject::PartnerTeam),
    ),
    SubjectKind::GroupTeam => {
      let team = conn
        .query_row(
          "SELECT team_id, name, archived, created_at FROM group_teams WHERE team_id = ?1",
          params![id],
          |row| {
            Ok(RawGroupTeam {
              team_id:    row.get(0)?,
              name:       row.get(1)?,
              archived:   row.get(2)?,
              created_at: row.get(3)?,
              roster:     Vec::new(),
            })
          },
        )
        .optional()?;
      let Some(mut team) = team else {
        return Ok(None);
      };
      let mut stmt = conn.prepare(
        "SELECT athlete_id FROM group_roster WHERE team_id = ?1 ORDER BY athlete_id",
      )?;
      team.roster = stmt
        .query_map(params![id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<i64>>>()?;
      Ok(Some(RawSubject::GroupTeam(team)))
    }
  }
}

/// Outcome of the redemption transaction.
enum Redeemed {
  Done,
  Closed,
  /// The invited athlete was linked to another account in the meantime.
  AccountTaken,
  /// Another acceptance registered the email first.
  EmailTaken,
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(f, _) if f.code == rusqlite::ErrorCode::ConstraintViolation
  )
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Rinkside access store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store: useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Grants matching an optional principal and an optional subject.
  async fn query_grants(
    &self,
    principal: Option<Uuid>,
    subject: Option<SubjectRef>,
  ) -> Result<Vec<AccessGrant>> {
    let principal_str = principal.map(encode_uuid);
    let kind_str = subject.map(|s| encode_enum(s.kind));
    let subject_id = subject.map(|s| s.id);

    let raws: Vec<RawGrant> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {GRANT_COLUMNS} FROM access_grants
           WHERE (:principal IS NULL OR principal_id = :principal)
             AND (:kind IS NULL OR (subject_kind = :kind AND subject_id = :id))
           ORDER BY created_at, grant_id"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::named_params! {
              ":principal": principal_str,
              ":kind": kind_str,
              ":id": subject_id,
            },
            RawGrant::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawGrant::into_grant).collect()
  }
}

// ─── AccessStore impl ────────────────────────────────────────────────────────

impl AccessStore for SqliteStore {
  type Error = Error;

  // ── Principals ────────────────────────────────────────────────────────────

  async fn add_principal(&self, input: NewPrincipal) -> Result<Principal> {
    let principal = Principal {
      principal_id: Uuid::new_v4(),
      email:        input.email.trim().to_owned(),
      full_name:    input.full_name,
      category:     input.category,
      is_superuser: input.is_superuser,
      created_at:   Utc::now(),
    };

    let id_str       = encode_uuid(principal.principal_id);
    let email        = principal.email.clone();
    let full_name    = principal.full_name.clone();
    let category_str = encode_enum(principal.category);
    let superuser    = principal.is_superuser;
    let hash         = input.password_hash;
    let at_str       = encode_dt(principal.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO principals (
             principal_id, email, full_name, category, is_superuser,
             password_hash, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          params![id_str, email, full_name, category_str, superuser, hash, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(principal)
  }

  async fn get_principal(&self, id: Uuid) -> Result<Option<Principal>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawPrincipal> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {PRINCIPAL_COLUMNS} FROM principals WHERE principal_id = ?1"),
              params![id_str],
              RawPrincipal::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawPrincipal::into_principal).transpose()
  }

  async fn credentials<'a>(&'a self, email: &'a str) -> Result<Option<Credentials>> {
    let email = email.trim().to_owned();

    let raw: Option<RawPrincipal> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {PRINCIPAL_COLUMNS} FROM principals WHERE email = ?1"),
              params![email],
              RawPrincipal::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawPrincipal::into_credentials).transpose()
  }

  // ── Subjects ──────────────────────────────────────────────────────────────

  async fn onboard_subject(
    &self,
    input: NewSubject,
    owner: Uuid,
    role: Role,
  ) -> Result<(Subject, AccessGrant)> {
    let kind      = input.kind();
    let grant_id  = Uuid::new_v4();
    let now       = Utc::now();
    let at_str    = encode_dt(now);
    let grant_str = encode_uuid(grant_id);
    let owner_str = encode_uuid(owner);
    let kind_str  = encode_enum(kind);
    let role_str  = encode_enum(role);

    let id: i64 = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let id = match input {
          NewSubject::Athlete { full_name, date_of_birth } => {
            tx.execute(
              "INSERT INTO athletes (full_name, date_of_birth, created_at)
               VALUES (?1, ?2, ?3)",
              params![full_name.trim(), date_of_birth.map(encode_date), at_str],
            )?;
            tx.last_insert_rowid()
          }
          NewSubject::PartnerTeam { name, primary, secondary } => {
            tx.execute(
              "INSERT INTO partner_teams (name, primary_id, secondary_id, created_at)
               VALUES (?1, ?2, ?3, ?4)",
              params![name.trim(), primary, secondary, at_str],
            )?;
            tx.last_insert_rowid()
          }
          NewSubject::GroupTeam { name, roster } => {
            tx.execute(
              "INSERT INTO group_teams (name, created_at) VALUES (?1, ?2)",
              params![name.trim(), at_str],
            )?;
            let id = tx.last_insert_rowid();
            let mut stmt = tx.prepare(
              "INSERT INTO group_roster (team_id, athlete_id) VALUES (?1, ?2)",
            )?;
            for athlete in roster {
              stmt.execute(params![id, athlete])?;
            }
            drop(stmt);
            id
          }
        };
        tx.execute(
          "INSERT INTO access_grants (
             grant_id, principal_id, subject_kind, subject_id, role, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          params![grant_str, owner_str, kind_str, id, role_str, at_str],
        )?;
        tx.commit()?;
        Ok(id)
      })
      .await?;

    let subject_ref = SubjectRef::new(kind, id);
    let subject = self
      .get_subject(subject_ref)
      .await?
      .ok_or(Error::Vanished("subject"))?;
    let grant = AccessGrant {
      grant_id,
      principal_id: owner,
      subject: subject_ref,
      role,
      created_at: now,
    };
    Ok((subject, grant))
  }

  async fn get_subject(&self, subject: SubjectRef) -> Result<Option<Subject>> {
    let raw = self
      .conn
      .call(move |conn| Ok(load_subject(conn, subject)?))
      .await?;
    raw.map(RawSubject::into_subject).transpose()
  }

  async fn teams_containing(&self, athlete_id: i64) -> Result<Vec<SubjectRef>> {
    let rows: Vec<(String, i64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT 'partner_team', team_id FROM partner_teams
             WHERE primary_id = ?1 OR secondary_id = ?1
           UNION ALL
           SELECT 'group_team', team_id FROM group_roster
             WHERE athlete_id = ?1",
        )?;
        let rows = stmt
          .query_map(params![athlete_id], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .iter()
      .map(|(kind, id)| decode_subject_ref(kind, *id))
      .collect()
  }

  async fn athletes(&self, ids: Vec<i64>) -> Result<Vec<Athlete>> {
    if ids.is_empty() {
      return Ok(Vec::new());
    }

    let raws: Vec<RawAthlete> = self
      .conn
      .call(move |conn| {
        let placeholders = vec!["?"; ids.len()].join(", ");
        let mut stmt = conn.prepare(&format!(
          "SELECT {ATHLETE_COLUMNS} FROM athletes WHERE athlete_id IN ({placeholders})"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(ids), RawAthlete::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAthlete::into_athlete).collect()
  }

  async fn athlete_for_account(&self, principal: Uuid) -> Result<Option<Athlete>> {
    let id_str = encode_uuid(principal);

    let raw: Option<RawAthlete> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {ATHLETE_COLUMNS} FROM athletes WHERE account = ?1"),
              params![id_str],
              RawAthlete::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAthlete::into_athlete).transpose()
  }

  async fn set_archived(&self, subject: SubjectRef, archived: bool) -> Result<bool> {
    let (table, key) = subject_table(subject.kind);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          &format!("UPDATE {table} SET archived = ?1 WHERE {key} = ?2"),
          params![archived, subject.id],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }

  async fn set_partners(
    &self,
    team_id: i64,
    primary: i64,
    secondary: Option<i64>,
  ) -> Result<bool> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE partner_teams SET primary_id = ?1, secondary_id = ?2 WHERE team_id = ?3",
          params![primary, secondary, team_id],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }

  async fn set_roster(&self, team_id: i64, roster: Vec<i64>) -> Result<bool> {
    let found = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let exists = tx
          .query_row(
            "SELECT 1 FROM group_teams WHERE team_id = ?1",
            params![team_id],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if !exists {
          return Ok(false);
        }

        tx.execute("DELETE FROM group_roster WHERE team_id = ?1", params![team_id])?;
        let mut stmt = tx.prepare(
          "INSERT INTO group_roster (team_id, athlete_id) VALUES (?1, ?2)",
        )?;
        for athlete in roster {
          stmt.execute(params![team_id, athlete])?;
        }
        drop(stmt);
        tx.commit()?;
        Ok(true)
      })
      .await?;

    Ok(found)
  }

  // ── Grant ledger ──────────────────────────────────────────────────────────

  async fn upsert_grant(&self, input: NewGrant) -> Result<(AccessGrant, bool)> {
    let grant_str     = encode_uuid(Uuid::new_v4());
    let principal_str = encode_uuid(input.principal_id);
    let kind_str      = encode_enum(input.subject.kind);
    let subject_id    = input.subject.id;
    let role_str      = encode_enum(input.role);
    let at_str        = encode_dt(Utc::now());

    let (raw, inserted) = self
      .conn
      .call(move |conn| {
        let inserted = conn.execute(
          "INSERT INTO access_grants (
             grant_id, principal_id, subject_kind, subject_id, role, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
           ON CONFLICT (principal_id, subject_kind, subject_id, role) DO NOTHING",
          params![grant_str, principal_str, kind_str, subject_id, role_str, at_str],
        )?;
        let raw = conn.query_row(
          &format!(
            "SELECT {GRANT_COLUMNS} FROM access_grants
             WHERE principal_id = ?1 AND subject_kind = ?2
               AND subject_id = ?3 AND role = ?4"
          ),
          params![principal_str, kind_str, subject_id, role_str],
          RawGrant::from_row,
        )?;
        Ok((raw, inserted > 0))
      })
      .await?;

    Ok((raw.into_grant()?, inserted))
  }

  async fn get_grant(&self, id: Uuid) -> Result<Option<AccessGrant>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawGrant> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {GRANT_COLUMNS} FROM access_grants WHERE grant_id = ?1"),
              params![id_str],
              RawGrant::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawGrant::into_grant).transpose()
  }

  async fn grants_for_principal(&self, principal: Uuid) -> Result<Vec<AccessGrant>> {
    self
      .query_grants(Some(principal), None)
      .await
  }

  async fn grants_for_subject(&self, subject: SubjectRef) -> Result<Vec<AccessGrant>> {
    self
      .query_grants(None, Some(subject))
      .await
  }

  async fn grants_between(
    &self,
    principal: Uuid,
    subjects: Vec<SubjectRef>,
  ) -> Result<Vec<AccessGrant>> {
    let mut grants = Vec::new();
    for subject in subjects {
      grants.extend(
        self
          .query_grants(Some(principal), Some(subject))
          .await?,
      );
    }
    Ok(grants)
  }

  async fn delete_grant(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM access_grants WHERE grant_id = ?1", params![id_str])?)
      })
      .await?;

    Ok(deleted > 0)
  }

  // ── Invitations ───────────────────────────────────────────────────────────

  async fn add_invitation(&self, input: NewInvitation) -> Result<Invitation> {
    let invitation = Invitation {
      token:       Uuid::new_v4(),
      email:       input.email,
      sender:      input.sender,
      role:        input.role,
      subject:     input.subject,
      created_at:  Utc::now(),
      expires_at:  input.expires_at,
      accepted_at: None,
    };

    let token_str   = encode_uuid(invitation.token);
    let email       = invitation.email.clone();
    let sender_str  = encode_uuid(invitation.sender);
    let role_str    = encode_enum(invitation.role);
    let kind_str    = encode_enum(invitation.subject.kind);
    let subject_id  = invitation.subject.id;
    let created_str = encode_dt(invitation.created_at);
    let expires_str = encode_dt(invitation.expires_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO invitations (
             token, email, sender, role, subject_kind, subject_id,
             created_at, expires_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          params![
            token_str,
            email,
            sender_str,
            role_str,
            kind_str,
            subject_id,
            created_str,
            expires_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(invitation)
  }

  async fn get_invitation(&self, token: Uuid) -> Result<Option<Invitation>> {
    let token_str = encode_uuid(token);

    let raw: Option<RawInvitation> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {INVITATION_COLUMNS} FROM invitations WHERE token = ?1"),
              params![token_str],
              RawInvitation::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawInvitation::into_invitation).transpose()
  }

  async fn redeem_invitation(
    &self,
    token: Uuid,
    account: NewPrincipal,
  ) -> Result<Option<Principal>> {
    let Some(invitation) = self.get_invitation(token).await? else {
      return Ok(None);
    };

    let now = Utc::now();
    let principal = Principal {
      principal_id: Uuid::new_v4(),
      email:        invitation.email.clone(),
      full_name:    account.full_name,
      category:     account.category,
      is_superuser: account.is_superuser,
      created_at:   now,
    };

    let token_str     = encode_uuid(token);
    let principal_str = encode_uuid(principal.principal_id);
    let email         = principal.email.clone();
    let full_name     = principal.full_name.clone();
    let category_str  = encode_enum(principal.category);
    let superuser     = principal.is_superuser;
    let hash          = account.password_hash;
    let at_str        = encode_dt(now);
    let grant_str     = encode_uuid(Uuid::new_v4());
    let role_str      = invitation.role.grant_role().map(encode_enum);
    let kind_str      = encode_enum(invitation.subject.kind);
    let subject_id    = invitation.subject.id;

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        // Claiming the invitation first makes concurrent redemptions lose here.
        let claimed = tx.execute(
          "UPDATE invitations SET accepted_at = ?1
           WHERE token = ?2 AND accepted_at IS NULL",
          params![at_str, token_str],
        )?;
        if claimed == 0 {
          return Ok(Redeemed::Closed);
        }

        let inserted = tx.execute(
          "INSERT INTO principals (
             principal_id, email, full_name, category, is_superuser,
             password_hash, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          params![principal_str, email, full_name, category_str, superuser, hash, at_str],
        );
        match inserted {
          Ok(_) => {}
          Err(e) if is_constraint_violation(&e) => return Ok(Redeemed::EmailTaken),
          Err(e) => return Err(e.into()),
        }

        match role_str {
          None => {
            let linked = tx.execute(
              "UPDATE athletes SET account = ?1
               WHERE athlete_id = ?2 AND account IS NULL",
              params![principal_str, subject_id],
            )?;
            if linked == 0 {
              return Ok(Redeemed::AccountTaken);
            }
          }
          Some(role) => {
            tx.execute(
              "INSERT INTO access_grants (
                 grant_id, principal_id, subject_kind, subject_id, role, created_at
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
               ON CONFLICT (principal_id, subject_kind, subject_id, role) DO NOTHING",
              params![grant_str, principal_str, kind_str, subject_id, role, at_str],
            )?;
          }
        }

        tx.commit()?;
        Ok(Redeemed::Done)
      })
      .await?;

    match outcome {
      Redeemed::Done => Ok(Some(principal)),
      Redeemed::Closed => Ok(None),
      Redeemed::AccountTaken => Err(Error::Core(CoreError::Conflict(format!(
        "athlete {subject_id} already has an account"
      )))),
      Redeemed::EmailTaken => Err(Error::Core(CoreError::Conflict(format!(
        "{} is already registered",
        principal.email
      )))),
    }
  }
}
