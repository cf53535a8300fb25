//! `helpdeskctl agent ...` - the live workspace and its scriptable counterparts

use anyhow::{Context, Result};
use helpdesk_common::{Comment, ReplyRequest, Ticket, TicketId, TicketStatus};
use owo_colors::OwoColorize;

use super::{report_redirect, AppContext};
use crate::cli::AgentCommand;
use crate::dashboard::{tui, Dashboard, DashboardOptions};
use crate::display;
use crate::notice::Notice;
use crate::portal::SUMMARY_PENDING;
use crate::progress::Spinner;
use crate::push::PushConfig;
use crate::routes::Route;
use crate::session::ResolvedSession;

pub async fn run(ctx: &AppContext, command: AgentCommand) -> Result<()> {
    let session = ctx.resolve_session().await;
    report_redirect(&session);
    ctx.enter(Route::AgentWorkspace, &session)?;

    match command {
        AgentCommand::Workspace => workspace(ctx, &session).await,
        AgentCommand::Inbox { search } => inbox(ctx, search.as_deref()).await,
        AgentCommand::Show { id } => show(ctx, id).await,
        AgentCommand::Reply { id, text } => reply(ctx, id, &text.join(" ")).await,
    }
}

/// Full-screen dashboard; the caller has already passed the guard
pub(super) async fn workspace(ctx: &AppContext, session: &ResolvedSession) -> Result<()> {
    let options = DashboardOptions {
        push: PushConfig::from_config(&ctx.config),
        highlight: ctx.config.highlight_duration(),
        alert_sound: ctx.config.alert_sound,
    };
    let dashboard = Dashboard::new(
        ctx.api.clone(),
        session.context.identity().cloned(),
        options,
    );
    tui::run(dashboard).await
}

fn terminal_width() -> usize {
    crossterm::terminal::size()
        .map(|(cols, _)| cols as usize)
        .unwrap_or(80)
        .clamp(40, 120)
}

async fn inbox(ctx: &AppContext, search: Option<&str>) -> Result<()> {
    let spinner = Spinner::start("Loading tickets...");
    let result = ctx.api.list_tickets().await;
    spinner.stop();

    let tickets = result.map_err(|e| {
        eprintln!("{}", Notice::from_api_error("Could not load tickets", &e).render_line());
        e
    })?;
    let visible: Vec<&Ticket> = tickets
        .iter()
        .filter(|t| t.matches_query(search.unwrap_or("")))
        .collect();

    if visible.is_empty() {
        println!("{}", "No tickets".dimmed());
        return Ok(());
    }

    for ticket in &visible {
        let badge = if ticket.status == TicketStatus::Open {
            format!(" {}", "New".cyan().bold())
        } else {
            String::new()
        };
        println!(
            "{:>6}  {:<12} {}  {:<10}{}  {}  {}",
            ticket.id.dimmed(),
            ticket.code(),
            display::clock(ticket.created_at.as_deref()).dimmed(),
            display::priority_colored(ticket.priority.as_ref()),
            badge,
            ticket.contact_name().bold(),
            ticket.subject()
        );
    }
    println!();
    println!("{}", format!("{} of {} tickets", visible.len(), tickets.len()).dimmed());
    Ok(())
}

fn print_ticket(ticket: &Ticket, comments: &[Comment]) {
    let width = terminal_width();

    println!("{}", format!("[{}] {}", ticket.code(), ticket.subject()).bold());
    println!(
        "  Priority: {}   Status: {}",
        display::priority_colored(ticket.priority.as_ref()),
        display::status_colored(&ticket.status)
    );
    let mut contact = ticket.contact_name().to_string();
    if let Some(phone) = ticket.guest_phone.as_deref().filter(|p| !p.is_empty()) {
        contact.push_str(&format!(" ({})", phone));
    }
    println!("  Contact:  {}", contact);
    if let Some(customer) = ticket.linked_customer() {
        println!("  Customer: {}", customer);
    }

    if let Some(analysis) = &ticket.ai_analysis {
        println!();
        println!(
            "  {} {}{}",
            "AI".magenta().bold(),
            analysis.sentiment.as_deref().unwrap_or("UNKNOWN").magenta(),
            if analysis.tags.is_empty() {
                String::new()
            } else {
                format!("  [{}]", analysis.tags.join(", ")).dimmed().to_string()
            }
        );
        let summary = analysis
            .summary
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(SUMMARY_PENDING);
        for line in textwrap::wrap(summary, width.saturating_sub(4)) {
            println!("  {}", line);
        }
    }

    println!();
    println!("{}", "─".repeat(width).dimmed());
    if let Some(description) = ticket.description.as_deref().filter(|d| !d.is_empty()) {
        print_message(
            ticket.contact_name(),
            ticket.created_at.as_deref(),
            description,
            false,
            width,
        );
    }
    for comment in comments {
        print_message(
            comment.author_name(),
            comment.created_at.as_deref(),
            &comment.content,
            comment.is_from_staff(),
            width,
        );
    }
}

/// Staff messages sit on the right, customer messages on the left
fn print_message(author: &str, when: Option<&str>, content: &str, staff: bool, width: usize) {
    let bubble = width * 7 / 10;
    let header = format!("{}  {}", author, display::clock(when));
    let rows: Vec<String> = textwrap::wrap(content, bubble)
        .into_iter()
        .map(|row| row.into_owned())
        .collect();

    if staff {
        println!("{:>width$}", header.cyan().bold(), width = width);
        for row in rows {
            println!("{:>width$}", row.cyan(), width = width);
        }
    } else {
        println!("{}", header.bold());
        for row in rows {
            println!("{}", row);
        }
    }
    println!();
}

async fn show(ctx: &AppContext, id: TicketId) -> Result<()> {
    let spinner = Spinner::start("Loading ticket...");
    let result = ctx.api.ticket_with_comments(id).await;
    spinner.stop();

    let (ticket, comments) = result.map_err(|e| {
        eprintln!(
            "{}",
            Notice::from_api_error("Could not load ticket details", &e).render_line()
        );
        e
    })?;
    print_ticket(&ticket, &comments);
    Ok(())
}

async fn reply(ctx: &AppContext, id: TicketId, text: &str) -> Result<()> {
    if text.trim().is_empty() {
        anyhow::bail!("Nothing to send");
    }

    let spinner = Spinner::start("Sending reply...");
    let result = ctx.api.reply(id, &ReplyRequest::public(text)).await;
    spinner.stop();

    result
        .map_err(|e| {
            eprintln!("{}", Notice::from_api_error("Failed to send", &e).render_line());
            e
        })
        .with_context(|| format!("Reply on ticket {} failed", id))?;

    println!("{}", Notice::success("Reply sent").render_line());
    println!();
    show(ctx, id).await
}
