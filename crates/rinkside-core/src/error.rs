//! Error types for `rinkside-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::{record::RecordKind, subject::SubjectRef};

#[derive(Debug, Error)]
pub enum Error {
  #[error("subject not found: {0}")]
  SubjectNotFound(SubjectRef),

  #[error("principal not found: {0}")]
  PrincipalNotFound(Uuid),

  #[error("access grant not found: {0}")]
  GrantNotFound(Uuid),

  #[error("{kind} {id} not found")]
  RecordNotFound { kind: RecordKind, id: i64 },

  #[error("invitation not found")]
  InvitationNotFound,

  #[error("invitation expired or already used")]
  InvitationClosed,

  /// Deliberately carries no detail about who holds which role.
  #[error("no permission")]
  Unauthorized,

  /// A compliance rule refused the operation; the message is user-facing.
  #[error("{0}")]
  ComplianceBlocked(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("invalid request: {0}")]
  Invalid(String),

  #[error("{kind} {id} does not lead to a subject")]
  BrokenOwnerPath { kind: RecordKind, id: i64 },

  #[error("unknown {what}: {value:?}")]
  UnknownVariant { what: &'static str, value: String },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Box a backend error. Used as `.map_err(Error::store)` at the engine
  /// boundary.
  ///
  /// A backend that reports a lost race as a wrapped [`Error::Conflict`]
  /// surfaces as that conflict rather than as an opaque store failure.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(&e);
    while let Some(err) = source {
      if let Some(Self::Conflict(message)) = err.downcast_ref::<Self>() {
        return Self::Conflict(message.clone());
      }
      source = err.source();
    }
    Self::Store(Box::new(e))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Debug, Error)]
  enum Backend {
    #[error("core error: {0}")]
    Core(#[from] Error),
    #[error("disk on fire")]
    Io,
  }

  #[test]
  fn wrapped_conflicts_surface_from_the_store() {
    let lost_race = Backend::Core(Error::Conflict("taken".into()));
    assert!(matches!(Error::store(lost_race), Error::Conflict(m) if m == "taken"));

    assert!(matches!(Error::store(Backend::Io), Error::Store(_)));
    let other = Backend::Core(Error::InvitationClosed);
    assert!(matches!(Error::store(other), Error::Store(_)));
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
