//! Formatting shared by the portal, the scriptable agent commands and the TUI

use chrono::{DateTime, Local, NaiveDateTime};
use helpdesk_common::{Priority, TicketStatus};
use owo_colors::OwoColorize;

/// Parse the backend's timestamps: RFC 3339, or a local date-time without offset
fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local).naive_local());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()
}

/// `HH:MM`, or the raw value when it does not parse
pub fn clock(raw: Option<&str>) -> String {
    match raw {
        Some(raw) => parse_timestamp(raw)
            .map(|dt| dt.format("%H:%M").to_string())
            .unwrap_or_else(|| raw.to_string()),
        None => "--:--".to_string(),
    }
}

/// `DD/MM/YYYY HH:MM`, or the raw value when it does not parse
pub fn date_time(raw: Option<&str>) -> String {
    match raw {
        Some(raw) => parse_timestamp(raw)
            .map(|dt| dt.format("%d/%m/%Y %H:%M").to_string())
            .unwrap_or_else(|| raw.to_string()),
        None => "-".to_string(),
    }
}

pub fn priority_label(priority: Option<&Priority>) -> &str {
    priority.map(|p| p.as_str()).unwrap_or("UNRATED")
}

/// Priority with the dashboard's colours: red, yellow, otherwise blue
pub fn priority_colored(priority: Option<&Priority>) -> String {
    let label = priority_label(priority);
    match priority {
        Some(Priority::Critical) => label.red().bold().to_string(),
        Some(Priority::High) => label.yellow().bold().to_string(),
        _ => label.blue().to_string(),
    }
}

pub fn status_colored(status: &TicketStatus) -> String {
    match status {
        TicketStatus::Open => status.as_str().cyan().to_string(),
        TicketStatus::Processing | TicketStatus::InProgress => status.as_str().yellow().to_string(),
        TicketStatus::Done | TicketStatus::Closed => status.as_str().green().to_string(),
        TicketStatus::Other(raw) => raw.dimmed().to_string(),
    }
}
