//! Rinkside server wiring: configuration and the top-level router.

use std::path::{Path, PathBuf};

use axum::Router;
use rinkside_core::{AccessEngine, store::AccessStore};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` layered with
/// `RINKSIDE_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
}

/// Load configuration from `path` (optional) and the environment.
pub fn load_config(path: &Path) -> Result<ServerConfig, config::ConfigError> {
  config::Config::builder()
    .set_default("host", "127.0.0.1")?
    .set_default("port", 8080)?
    .set_default("store_path", "~/.local/share/rinkside/rinkside.db")?
    .add_source(config::File::from(path).required(false))
    .add_source(config::Environment::with_prefix("RINKSIDE"))
    .build()?
    .try_deserialize()
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The API router with request tracing applied.
pub fn app<S>(engine: AccessEngine<S>) -> Router
where
  S: AccessStore + 'static,
{
  rinkside_api::api_router(engine).layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use rinkside_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;

  #[test]
  fn missing_config_file_falls_back_to_defaults() {
    let cfg = load_config(Path::new("/nonexistent/rinkside.toml")).unwrap();
    assert_eq!(cfg.port, 8080);
    assert!(cfg.store_path.ends_with("rinkside.db"));
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(expand_tilde(Path::new("~/x.db")), PathBuf::from(home).join("x.db"));
    assert_eq!(expand_tilde(Path::new("/abs/x.db")), PathBuf::from("/abs/x.db"));
  }

  #[tokio::test]
  async fn app_serves_the_api() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let app = app(AccessEngine::new(Arc::new(store)));
    let req = Request::builder().uri("/me").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }
}
