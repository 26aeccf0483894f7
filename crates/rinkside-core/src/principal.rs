//! Principals: authenticated accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use uuid::Uuid;

/// Coarse, account-wide category. It never grants access on its own; roles on
/// subjects come from grants and identity.
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
pub enum PrincipalCategory {
  Coach,
  Athlete,
  Guardian,
  Observer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
  pub principal_id: Uuid,
  pub email:        String,
  pub full_name:    String,
  pub category:     PrincipalCategory,
  /// Process-wide escape hatch; not a grant.
  pub is_superuser: bool,
  pub created_at:   DateTime<Utc>,
}

/// Input to [`crate::store::AccessStore::add_principal`].
#[derive(Debug, Clone)]
pub struct NewPrincipal {
  pub email:         String,
  pub full_name:     String,
  pub category:      PrincipalCategory,
  pub is_superuser:  bool,
  /// argon2 PHC string; `None` for accounts that cannot log in yet.
  pub password_hash: Option<String>,
}

/// A principal together with its stored password hash, for authentication
/// only.
#[derive(Debug, Clone)]
pub struct Credentials {
  pub principal:     Principal,
  pub password_hash: Option<String>,
}
