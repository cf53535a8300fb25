//! Session commands and route entry

use anyhow::Result;
use owo_colors::OwoColorize;

use super::{agent, report_redirect, AppContext};
use crate::logging::{self, LogTarget};
use crate::routes::Route;
use crate::session::{Navigation, SessionOutcome};

pub async fn whoami(ctx: &AppContext) -> Result<()> {
    let session = ctx.resolve_session().await;
    report_redirect(&session);

    match (session.context.identity(), session.outcome) {
        (Some(identity), _) => {
            println!("{} ({})", identity.display_name().bold(), identity.role);
        }
        (None, SessionOutcome::Unavailable) => {
            println!("anonymous {}", "(backend unavailable)".dimmed());
        }
        (None, _) => println!("anonymous"),
    }
    Ok(())
}

pub async fn login(ctx: &AppContext) -> Result<()> {
    let session = ctx.resolve_session().await;
    if let Some(identity) = session.context.identity() {
        println!(
            "{} Already signed in as {} ({})",
            "✓".green(),
            identity.display_name().bold(),
            identity.role
        );
        report_redirect(&session);
        return Ok(());
    }

    let return_to = ctx.route_or(Route::Home);
    if let Navigation::External(url) = session.context.login(return_to.path()) {
        println!("Sign in through the backend:");
        println!();
        println!("    {}", url.cyan().underline());
        println!();
        println!(
            "Then put the session cookie in {} (or {}).",
            "session_cookie".bold(),
            "HELPDESK_SESSION_COOKIE".bold()
        );
        println!("You will continue at {} after signing in.", return_to.path().bold());
    }
    Ok(())
}

pub async fn logout(ctx: &AppContext) -> Result<()> {
    let session = ctx.resolve_session().await;
    let name = session
        .context
        .identity()
        .map(|identity| identity.display_name().to_string());

    let mut context = session.context;
    context.logout();

    match name {
        Some(name) => println!("{} Signed out {} locally", "✓".green(), name.bold()),
        None => println!("{} No one was signed in", "ℹ".cyan()),
    }
    if ctx.config.session_cookie.is_some() {
        println!(
            "  {}",
            "Remove session_cookie from your configuration to stay signed out.".dimmed()
        );
    }
    Ok(())
}

/// Enter a route the way the browser app would
///
/// Without an explicit path, a pending post-login redirect wins over
/// `--route`, which wins over `/`.
pub async fn open(ctx: &AppContext, path: Option<String>) -> Result<()> {
    let session = ctx.resolve_session().await;
    let pending = match &session.redirect {
        Some(Navigation::Route(path)) => Some(path.clone()),
        _ => None,
    };
    let target = path
        .or(pending)
        .or_else(|| ctx.route.clone())
        .unwrap_or_else(|| Route::Home.path().to_string());
    let route = Route::from_path(&target);

    logging::init(if route.is_agent_view() {
        LogTarget::File
    } else {
        LogTarget::Stderr
    });
    tracing::debug!("Opening {} (requested {})", route, target);

    ctx.enter(route, &session)?;
    match route {
        Route::AgentWorkspace => agent::workspace(ctx, &session).await,
        Route::Home | Route::PortalHome => {
            print_portal_home(session.context.identity().map(|id| id.display_name()));
            Ok(())
        }
    }
}

fn print_portal_home(name: Option<&str>) {
    println!("{}", "SBSC Support Center".blue().bold());
    println!("{}", "Automated customer support, 24/7".dimmed());
    if let Some(name) = name {
        println!();
        println!("Welcome back, {}", name.bold());
    }
    println!();
    println!(
        "  {}",
        "helpdeskctl portal submit --name .. --email .. --phone .. --subject .. --description .."
            .cyan()
    );
    println!("      Send a new support request");
    println!("  {}", "helpdeskctl portal track <CODE>".cyan());
    println!("      Check the progress of a request");
}
