//! Guardian-dependency rule for minor athletes.
//!
//! An athlete under 13 can never hold an account. Between 13 and 17 the
//! athlete's own account may only be activated once at least one guardian
//! holds a `GUARDIAN` grant on them. Adults and athletes without a recorded
//! date of birth have no dependency.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

pub const MINIMUM_ACCOUNT_AGE: u32 = 13;
pub const AGE_OF_MAJORITY: u32 = 18;

/// Completed years between `dob` and `today`; zero if `dob` is in the future.
pub fn age_on(dob: NaiveDate, today: NaiveDate) -> u32 {
  today.years_since(dob).unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GuardianCheck {
  Clear,
  TooYoung { age: u32 },
  NeedsGuardian { age: u32 },
}

impl GuardianCheck {
  pub fn is_satisfied(self) -> bool { matches!(self, Self::Clear) }

  /// Human-readable explanation for the inviting flow; `None` when clear.
  pub fn reason(self) -> Option<String> {
    match self {
      Self::Clear => None,
      Self::TooYoung { age } => Some(format!(
        "Athletes under {MINIMUM_ACCOUNT_AGE} cannot have their own account \
         (age {age}). Invite a parent or guardian instead."
      )),
      Self::NeedsGuardian { age } => Some(format!(
        "As a minor athlete (age {age}), a parent or guardian must accept \
         their invitation and link their account before you can join."
      )),
    }
  }
}

pub fn check(
  date_of_birth: Option<NaiveDate>,
  today: NaiveDate,
  has_guardian: bool,
) -> GuardianCheck {
  let Some(dob) = date_of_birth else {
    return GuardianCheck::Clear;
  };
  match age_on(dob, today) {
    age if age < MINIMUM_ACCOUNT_AGE => GuardianCheck::TooYoung { age },
    age if age < AGE_OF_MAJORITY && !has_guardian => {
      GuardianCheck::NeedsGuardian { age }
    }
    _ => GuardianCheck::Clear,
  }
}

/// The same calendar day `years` years earlier; Feb 29 falls back to Feb 28.
pub fn years_before(today: NaiveDate, years: i32) -> NaiveDate {
  let year = today.year() - years;
  today
    .with_year(year)
    .or_else(|| NaiveDate::from_ymd_opt(year, today.month(), 28))
    .unwrap_or(today)
}
