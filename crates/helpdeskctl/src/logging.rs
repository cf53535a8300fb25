//! Logging for helpdeskctl
//!
//! Plain commands log to stderr. The full-screen workspace owns the terminal,
//! so it logs to a file found through an XDG fallback chain instead.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `helpdeskctl=debug`
pub const LOG_ENV: &str = "HELPDESK_LOG";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    File,
}

/// Discover log file path with fallback chain
///
/// Priority:
/// 1. $HELPDESK_LOG_FILE environment variable (explicit override)
/// 2. $XDG_STATE_HOME/helpdesk/helpdeskctl.log (XDG standard)
/// 3. ~/.local/state/helpdesk/helpdeskctl.log (XDG fallback)
pub fn discover_log_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("HELPDESK_LOG_FILE") {
        return Some(PathBuf::from(path));
    }

    if let Ok(xdg_state) = std::env::var("XDG_STATE_HOME") {
        return Some(PathBuf::from(xdg_state).join("helpdesk/helpdeskctl.log"));
    }

    dirs::home_dir().map(|home| home.join(".local/state/helpdesk/helpdeskctl.log"))
}

impl LogTarget {
    /// Filter used when `HELPDESK_LOG` is unset
    ///
    /// Stderr shares the terminal with command output, so it stays quiet.
    pub fn default_directive(&self) -> &'static str {
        match self {
            LogTarget::Stderr => "warn",
            LogTarget::File => "info",
        }
    }
}

fn filter(target: LogTarget) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(target.default_directive()))
}

/// Install the global subscriber; later calls are no-ops
pub fn init(target: LogTarget) {
    match target {
        LogTarget::Stderr => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter(target))
                .with_writer(std::io::stderr)
                .with_target(false)
                .try_init();
        }
        LogTarget::File => {
            let file = discover_log_path().and_then(|path| {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent).ok()?;
                }
                OpenOptions::new().create(true).append(true).open(path).ok()
            });
            match file {
                Some(file) => {
                    let _ = tracing_subscriber::fmt()
                        .with_env_filter(filter(target))
                        .with_writer(Mutex::new(file))
                        .with_ansi(false)
                        .try_init();
                }
                // Nowhere to write without corrupting the screen
                None => {
                    let _ = tracing_subscriber::fmt()
                        .with_env_filter(filter(target))
                        .with_writer(std::io::sink)
                        .try_init();
                }
            }
        }
    }
}
