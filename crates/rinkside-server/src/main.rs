//! Rinkside server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, and serves the access API over HTTP.
//!
//! # Bootstrapping
//!
//! Accounts normally join through invitations, so the first coach (and any
//! superuser) is created from the command line:
//!
//! ```text
//! rinkside add-principal --email coach@example.com --name "Head Coach"
//! ```

use std::{io, path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use rinkside_api::auth::hash_password;
use rinkside_core::{
  AccessEngine,
  principal::{NewPrincipal, PrincipalCategory},
  store::AccessStore,
};
use rinkside_server::{ServerConfig, expand_tilde, load_config};
use rinkside_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Rinkside access server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (the default).
  Serve,
  /// Print the argon2 hash for a password entered on stdin and exit.
  HashPassword,
  /// Create a principal; the password is read from stdin.
  AddPrincipal {
    #[arg(long)]
    email:     String,
    #[arg(long)]
    name:      String,
    #[arg(long, default_value = "coach")]
    category:  PrincipalCategory,
    /// Grant the process-wide superuser flag.
    #[arg(long)]
    superuser: bool,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  match cli.command.unwrap_or(Command::Serve) {
    Command::HashPassword => {
      let hash = read_password_hash()?;
      println!("{hash}");
      Ok(())
    }
    Command::AddPrincipal { email, name, category, superuser } => {
      let cfg = load(&cli.config)?;
      let store = open_store(&cfg).await?;
      let password_hash = Some(read_password_hash()?);
      let principal = store
        .add_principal(NewPrincipal {
          email,
          full_name: name,
          category,
          is_superuser: superuser,
          password_hash,
        })
        .await
        .context("failed to create principal")?;
      tracing::info!(
        principal = %principal.principal_id,
        email = %principal.email,
        superuser,
        "created principal"
      );
      println!("{}", principal.principal_id);
      Ok(())
    }
    Command::Serve => serve(load(&cli.config)?).await,
  }
}

async fn serve(cfg: ServerConfig) -> anyhow::Result<()> {
  let store = open_store(&cfg).await?;
  let engine = AccessEngine::new(Arc::new(store));

  let app = rinkside_server::app(engine);
  let address = format!("{}:{}", cfg.host, cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

fn load(path: &std::path::Path) -> anyhow::Result<ServerConfig> {
  load_config(path).with_context(|| format!("failed to load configuration from {path:?}"))
}

async fn open_store(cfg: &ServerConfig) -> anyhow::Result<SqliteStore> {
  let store_path = expand_tilde(&cfg.store_path);
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))
}

/// Read a password from stdin and return its argon2 hash.
fn read_password_hash() -> anyhow::Result<String> {
  use std::io::{BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  let password = line.trim_end_matches(['\n', '\r']);
  if password.is_empty() {
    anyhow::bail!("empty password");
  }
  hash_password(password).map_err(|e| anyhow::anyhow!("argon2 error: {e}"))
}
