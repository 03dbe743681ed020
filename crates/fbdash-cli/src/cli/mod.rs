//! CLI entry and dispatch.
//!
//! Every view-bearing command maps to a path and is resolved through the
//! navigation gate, so protected views are reachable exactly when the
//! session says so.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use fbdash_core::api::ApiClient;
use fbdash_core::config::Config;
use fbdash_core::credentials::TokenStore;
use fbdash_core::nav::{self, DASHBOARD_PATH, Decision, LOGIN_PATH};
use fbdash_core::session::SessionManager;
use tracing::debug;

mod commands;

#[derive(Parser)]
#[command(name = "fbdash")]
#[command(version)]
#[command(about = "Terminal dashboard for the feedback tracker")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Log in to the feedback service
    Login,

    /// Log out (clear the stored session token)
    Logout,

    /// Show the currently authenticated user
    Whoami,

    /// Show the feedback dashboard (default)
    Dashboard,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    init_tracing();

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config = Config::load().context("load config")?;

    // default to the dashboard view
    match cli.command.unwrap_or(Commands::Dashboard) {
        Commands::Login => route(&config, LOGIN_PATH).await,
        Commands::Dashboard => route(&config, DASHBOARD_PATH).await,
        Commands::Logout => commands::auth::logout(&config).await,
        Commands::Whoami => commands::auth::whoami(&config).await,
        Commands::Config { command } => match command {
            ConfigCommands::Path => commands::config::path(),
            ConfigCommands::Init => commands::config::init(),
        },
    }
}

/// Resolves a navigation request through the gate, following redirects.
///
/// The gate is re-evaluated on every hop and only consulted after the
/// session bootstrap has settled.
async fn route(config: &Config, requested: &'static str) -> Result<()> {
    let api = Arc::new(ApiClient::from_config(config));
    let session = SessionManager::new(Arc::clone(&api), TokenStore::new());

    session.start().await;

    let mut path = requested;
    for _ in 0..4 {
        match nav::decide(&session.state(), path) {
            Decision::Hold => {
                // start() has settled; the gate can only hold if something
                // reset the machine, which no command does.
                anyhow::bail!("session is still bootstrapping")
            }
            Decision::Redirect(target) => {
                debug!(from = path, to = target, "gate redirect");
                path = target;
            }
            Decision::Render => {
                let next = render(path, &api, &session).await?;
                match next {
                    Some(target) => path = target,
                    None => return Ok(()),
                }
            }
        }
    }
    anyhow::bail!("navigation did not settle")
}

/// Renders the view behind a path. Returns a follow-up path when the view
/// navigates onward (the login view heads to the dashboard on success).
async fn render(
    path: &'static str,
    api: &Arc<ApiClient>,
    session: &SessionManager,
) -> Result<Option<&'static str>> {
    match path {
        LOGIN_PATH => commands::auth::login_view(session).await,
        DASHBOARD_PATH => commands::dashboard::run(api, session).await,
        other => anyhow::bail!("no view registered for path {other}"),
    }
}
