//! Command implementations
//!
//! Each command resolves the session once, passes its route through the
//! access guard, then does its work. Backend failures surface as notices;
//! the returned error only decides the exit code.

mod agent;
mod auth;
mod portal;

use anyhow::{Context as _, Result};
use helpdesk_common::HelpdeskConfig;
use owo_colors::OwoColorize;

use crate::api_client::ApiClient;
use crate::cli::{AgentCommand, Cli, Commands};
use crate::errors::CommandError;
use crate::logging::{self, LogTarget};
use crate::routes::{self, Route, RouteOutcome};
use crate::session::{self, ClientStateStore, Navigation, ResolvedSession};

/// Everything a command needs, built once from the CLI flags
pub struct AppContext {
    pub config: HelpdeskConfig,
    pub api: ApiClient,
    pub store: ClientStateStore,
    /// Route given with `--route`, if any
    pub route: Option<String>,
}

impl AppContext {
    pub fn new(config: HelpdeskConfig, route: Option<String>) -> Result<Self> {
        let api = ApiClient::new(&config)?;
        let store = ClientStateStore::new(&config.effective_state_dir());
        Ok(Self {
            config,
            api,
            store,
            route,
        })
    }

    /// Route the command runs under; `/` unless `--route` says otherwise
    pub fn route_or(&self, default: Route) -> Route {
        self.route
            .as_deref()
            .map(Route::from_path)
            .unwrap_or(default)
    }

    /// The single identity check for this invocation
    pub async fn resolve_session(&self) -> ResolvedSession {
        session::resolve(&self.api, self.store.clone()).await
    }

    /// Pass `route` through the guard, turning denials into command errors
    pub fn enter(&self, route: Route, session: &ResolvedSession) -> Result<()> {
        match routes::enter(route, &session.context) {
            RouteOutcome::Render(_) => Ok(()),
            RouteOutcome::Forbidden => Err(CommandError::Forbidden.into()),
            RouteOutcome::Navigate(Navigation::External(login_url)) => {
                Err(CommandError::LoginRequired { login_url }.into())
            }
            RouteOutcome::Navigate(Navigation::Route(path)) => {
                anyhow::bail!("Unexpected in-app navigation to {}", path)
            }
        }
    }
}

/// Load configuration, set up logging and run the chosen command
pub async fn run(cli: Cli) -> Result<()> {
    // `open` picks its target after the session check and sets up logging itself
    match &cli.command {
        Commands::Open { .. } => {}
        Commands::Agent(AgentCommand::Workspace) => logging::init(LogTarget::File),
        _ => logging::init(LogTarget::Stderr),
    }

    let config =
        HelpdeskConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let ctx = AppContext::new(config, cli.route)?;

    match cli.command {
        Commands::Whoami => auth::whoami(&ctx).await,
        Commands::Login => auth::login(&ctx).await,
        Commands::Logout => auth::logout(&ctx).await,
        Commands::Open { route } => auth::open(&ctx, route).await,
        Commands::Portal(command) => portal::run(&ctx, command).await,
        Commands::Agent(command) => agent::run(&ctx, command).await,
    }
}

/// Note a post-login redirect the current command will not follow
fn report_redirect(session: &ResolvedSession) {
    if let Some(Navigation::Route(path)) = &session.redirect {
        tracing::info!("Pending redirect to {} consumed", path);
        eprintln!(
            "{} Signed in. Continue with: {}",
            "ℹ".cyan(),
            format!("helpdeskctl open {}", path).bold()
        );
    }
}
