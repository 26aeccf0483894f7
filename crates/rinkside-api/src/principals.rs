//! `GET /me`: the authenticated principal.

use axum::Json;
use rinkside_core::principal::Principal;

use crate::auth::Requester;

/// `GET /me`
pub async fn me(Requester(me): Requester) -> Json<Principal> { Json(me) }
