//! Core types and access logic for Rinkside.
//!
//! This crate is deliberately free of HTTP and database dependencies. It
//! defines the coachable [`subject::Subject`] model, the access grant ledger
//! contract ([`store::AccessStore`]), and the [`engine::AccessEngine`] that
//! turns a principal plus a subject into a role and a role plus a verb into a
//! decision.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod engine;
pub mod error;
pub mod gate;
pub mod grant;
pub mod guardian;
pub mod invitation;
pub mod lifecycle;
pub mod principal;
pub mod record;
pub mod resolve;
pub mod roster;
pub mod store;
pub mod subject;

pub use engine::AccessEngine;
pub use error::{Error, Result};
