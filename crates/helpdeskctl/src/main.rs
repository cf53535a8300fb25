//! helpdeskctl - customer portal and live agent workspace for the SBSC helpdesk
//!
//! Talks to the ticketing backend over REST and a STOMP push feed.

use clap::Parser;
use owo_colors::OwoColorize;

use helpdeskctl::cli::Cli;
use helpdeskctl::commands;
use helpdeskctl::errors::{self, EXIT_SUCCESS};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code = match commands::run(cli).await {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("{} {:#}", "error:".red().bold(), e);
            errors::exit_code(&e)
        }
    };
    std::process::exit(code);
}
