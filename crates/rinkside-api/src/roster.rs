//! `GET /roster[?mode=all|operational]`: every athlete the requester reaches.

use axum::{
  Json,
  extract::{Query, State},
};
use rinkside_core::{AccessEngine, roster::RosterMode, store::AccessStore, subject::Athlete};
use serde::Deserialize;

use crate::{auth::Requester, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct RosterParams {
  #[serde(default)]
  pub mode: RosterMode,
}

/// `GET /roster`
pub async fn handler<S: AccessStore + 'static>(
  State(engine): State<AccessEngine<S>>,
  Requester(me): Requester,
  Query(params): Query<RosterParams>,
) -> Result<Json<Vec<Athlete>>, ApiError> {
  Ok(Json(engine.accessible_athletes(&me, params.mode).await?))
}
