//! Command-line surface

use clap::{Args, Parser, Subcommand};
use helpdesk_common::TicketId;
use std::path::PathBuf;

// Version is embedded at build time
const VERSION: &str = env!("HELPDESK_VERSION");

#[derive(Parser, Debug)]
#[command(name = "helpdeskctl")]
#[command(about = "SBSC Helpdesk - customer portal and live agent workspace", long_about = None)]
#[command(version = VERSION)]
pub struct Cli {
    /// Config file (default: $HELPDESK_CONFIG, then ~/.config/helpdesk/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Route the command runs under, e.g. /portal/home
    #[arg(long, global = true, value_name = "PATH")]
    pub route: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the signed-in identity
    Whoami,

    /// Start the backend login flow
    Login,

    /// Forget the local session and any pending redirect
    Logout,

    /// Open a route: / or /portal/home (portal), /agent/workspace (dashboard)
    Open {
        /// Route path; defaults to the pending post-login redirect, then /
        route: Option<String>,
    },

    /// Customer portal
    #[command(subcommand)]
    Portal(PortalCommand),

    /// Agent dashboard
    #[command(subcommand)]
    Agent(AgentCommand),
}

#[derive(Subcommand, Debug)]
pub enum PortalCommand {
    /// Submit a new support request
    Submit(SubmitArgs),

    /// Track a request by its code
    Track {
        /// Ticket code, e.g. SBSC-1A2B
        code: String,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct SubmitArgs {
    /// Your full name
    #[arg(long)]
    pub name: String,

    /// Contact email
    #[arg(long)]
    pub email: String,

    /// Phone number
    #[arg(long)]
    pub phone: String,

    /// What you need help with
    #[arg(long)]
    pub subject: String,

    /// Details of the problem
    #[arg(long)]
    pub description: String,
}

#[derive(Subcommand, Debug)]
pub enum AgentCommand {
    /// Full-screen live workspace
    Workspace,

    /// List tickets
    Inbox {
        /// Only tickets whose code, subject or contact matches
        #[arg(long)]
        search: Option<String>,
    },

    /// Show a ticket with its conversation
    Show {
        id: TicketId,
    },

    /// Reply to the customer; the ticket moves to IN_PROGRESS
    Reply {
        id: TicketId,

        /// Message text
        #[arg(required = true, num_args = 1.., trailing_var_arg = true)]
        text: Vec<String>,
    },
}
