//! `helpdeskctl portal ...`

use anyhow::Result;
use owo_colors::OwoColorize;

use super::{report_redirect, AppContext};
use crate::cli::{PortalCommand, SubmitArgs};
use crate::notice::Notice;
use crate::portal::{self, SubmitError, TicketForm};
use crate::progress::Spinner;
use crate::routes::Route;

pub async fn run(ctx: &AppContext, command: PortalCommand) -> Result<()> {
    // `/` never consults the session; `/portal/home` goes through the guard
    let route = ctx.route_or(Route::Home);
    if route.guard().is_some() {
        let session = ctx.resolve_session().await;
        report_redirect(&session);
        ctx.enter(route, &session)?;
    }

    match command {
        PortalCommand::Submit(args) => submit(ctx, args).await,
        PortalCommand::Track { code } => track(ctx, &code).await,
    }
}

impl From<SubmitArgs> for TicketForm {
    fn from(args: SubmitArgs) -> Self {
        TicketForm {
            guest_name: args.name,
            guest_email: args.email,
            guest_phone: args.phone,
            subject: args.subject,
            description: args.description,
        }
    }
}

async fn submit(ctx: &AppContext, args: SubmitArgs) -> Result<()> {
    let form = TicketForm::from(args);

    let spinner = Spinner::start("Sending your request...");
    let result = portal::submit(&ctx.api, &form).await;
    spinner.stop();

    match result {
        Ok(ticket) => {
            print!("{}", portal::render_receipt(&ticket));
            Ok(())
        }
        Err(SubmitError::Invalid(errors)) => {
            for error in &errors {
                eprintln!("{} {} {}", "✗".red(), error.field.bold(), error.message);
            }
            Err(SubmitError::Invalid(errors).into())
        }
        Err(SubmitError::Api(e)) => {
            eprintln!("{}", Notice::error(portal::SUBMIT_FAILED).render_line());
            Err(e.into())
        }
    }
}

async fn track(ctx: &AppContext, code: &str) -> Result<()> {
    let spinner = Spinner::start("Looking up your request...");
    let result = portal::track(&ctx.api, code).await;
    spinner.stop();

    match result {
        Ok(Some(found)) => {
            print!("{}", portal::render_tracking(&found));
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(e) => {
            eprintln!("{}", Notice::error(portal::TRACK_FAILED).render_line());
            Err(e.into())
        }
    }
}
