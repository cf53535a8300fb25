//! Customer portal - submit a request, track it by code
//!
//! Submission validates locally before anything is sent. Tracking maps the
//! ticket status onto the three-step progress indicator.

use helpdesk_common::{ApiError, NewTicket, Ticket, TicketStatus};
use owo_colors::OwoColorize;
use std::fmt::Write as _;

use crate::api_client::ApiClient;
use crate::display;

pub const SUBMIT_FAILED: &str = "Could not submit your request. Please try again.";
pub const TRACK_FAILED: &str = "Ticket code does not exist!";
pub const SUMMARY_PENDING: &str = "Updating...";

/// Progress steps: title and description
pub const STEPS: [(&str, &str); 3] = [
    ("Received", "Your request has been logged"),
    ("Processing", "An agent is reviewing it"),
    ("Completed", "A resolution is available"),
];

/// OPEN→0, PROCESSING→1, DONE→2, anything else→0
pub fn progress_step(status: &TicketStatus) -> usize {
    match status {
        TicketStatus::Open => 0,
        TicketStatus::Processing => 1,
        TicketStatus::Done => 2,
        _ => 0,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

/// Raw form input, before validation
#[derive(Debug, Clone, Default)]
pub struct TicketForm {
    pub guest_name: String,
    pub guest_email: String,
    pub guest_phone: String,
    pub subject: String,
    pub description: String,
}

fn looks_like_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
}

impl TicketForm {
    /// Check every field; all problems are reported at once
    pub fn validate(&self) -> Result<NewTicket, Vec<FieldError>> {
        let mut errors = Vec::new();
        let mut required = |field: &'static str, value: &str, message: &'static str| {
            if value.trim().is_empty() {
                errors.push(FieldError { field, message });
                false
            } else {
                true
            }
        };

        required("guestName", &self.guest_name, "Please enter your full name");
        let has_email = required("guestEmail", &self.guest_email, "Please enter your email");
        required("guestPhone", &self.guest_phone, "Please enter your phone number");
        required("subject", &self.subject, "Please enter a subject");
        required("description", &self.description, "Please describe the problem");

        if has_email && !looks_like_email(self.guest_email.trim()) {
            errors.push(FieldError {
                field: "guestEmail",
                message: "Invalid email address",
            });
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(NewTicket {
            guest_name: self.guest_name.trim().to_string(),
            guest_email: self.guest_email.trim().to_string(),
            guest_phone: self.guest_phone.trim().to_string(),
            subject: self.subject.trim().to_string(),
            description: self.description.trim().to_string(),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("{} field(s) need attention", .0.len())]
    Invalid(Vec<FieldError>),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Validate and post a new ticket; the result carries the tracking code
pub async fn submit(api: &ApiClient, form: &TicketForm) -> Result<Ticket, SubmitError> {
    let ticket = form.validate().map_err(SubmitError::Invalid)?;
    let created = api.create_ticket(&ticket).await?;
    tracing::info!("Ticket {} submitted", created.code());
    Ok(created)
}

/// A tracked ticket and where it stands
#[derive(Debug, Clone, PartialEq)]
pub struct TrackResult {
    pub ticket: Ticket,
    pub step: usize,
}

/// Look a ticket up by code; an empty code does nothing
pub async fn track(api: &ApiClient, code: &str) -> Result<Option<TrackResult>, ApiError> {
    let code = code.trim();
    if code.is_empty() {
        return Ok(None);
    }
    let ticket = api.ticket_by_code(code).await?;
    let step = progress_step(&ticket.status);
    Ok(Some(TrackResult { ticket, step }))
}

/// Receipt shown after a successful submission
pub fn render_receipt(ticket: &Ticket) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", "✓".green(), "Request sent successfully!".bold());
    let _ = writeln!(out, "  Please keep your tracking code:");
    let _ = writeln!(out);
    let _ = writeln!(out, "    {}", ticket.code().cyan().bold());
    out
}

/// Step indicator, e.g. `● Received ── ○ Processing ── ○ Completed`
pub fn render_steps(current: usize) -> String {
    let separator = format!(" {} ", "──".dimmed());
    STEPS
        .iter()
        .enumerate()
        .map(|(i, (title, _))| {
            if i < current {
                format!("{} {}", "✓".green(), title.green())
            } else if i == current {
                format!("{} {}", "●".cyan(), title.cyan().bold())
            } else {
                format!("{} {}", "○".dimmed(), title.dimmed())
            }
        })
        .collect::<Vec<_>>()
        .join(separator.as_str())
}

pub fn render_tracking(result: &TrackResult) -> String {
    let ticket = &result.ticket;
    let mut out = String::new();
    let _ = writeln!(out, "{}", render_steps(result.step));
    if let Some((_, description)) = STEPS.get(result.step) {
        let _ = writeln!(out, "  {}", description.dimmed());
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", "Response details".bold());
    let _ = writeln!(out, "  Ticket code: {}", ticket.code());
    let _ = writeln!(out, "  Status:      {}", display::status_colored(&ticket.status));
    let _ = writeln!(
        out,
        "  Priority:    {}",
        display::priority_colored(ticket.priority.as_ref())
    );
    let _ = writeln!(
        out,
        "  Created:     {}",
        display::date_time(ticket.created_at.as_deref())
    );

    if let Some(analysis) = &ticket.ai_analysis {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", "AI Support Summary".blue().bold());
        let summary = analysis
            .summary
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(SUMMARY_PENDING);
        for line in textwrap::wrap(summary, 72) {
            let _ = writeln!(out, "  {}", line);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> TicketForm {
        TicketForm {
            guest_name: "Nguyen Van A".into(),
            guest_email: "a@example.com".into(),
            guest_phone: "0912000000".into(),
            subject: "Failed transfer".into(),
            description: "Money left my account but never arrived".into(),
        }
    }

    #[test]
    fn test_status_to_step() {
        assert_eq!(progress_step(&TicketStatus::Open), 0);
        assert_eq!(progress_step(&TicketStatus::Processing), 1);
        assert_eq!(progress_step(&TicketStatus::Done), 2);
        assert_eq!(progress_step(&TicketStatus::Closed), 0);
        assert_eq!(progress_step(&TicketStatus::InProgress), 0);
        assert_eq!(progress_step(&TicketStatus::Other("ESCALATED".into())), 0);
    }

    #[test]
    fn test_valid_form_is_trimmed() {
        let mut input = form();
        input.subject = "  Failed transfer ".into();
        let ticket = input.validate().unwrap();
        assert_eq!(ticket.subject, "Failed transfer");
        assert_eq!(ticket.guest_email, "a@example.com");
    }

    #[test]
    fn test_every_blank_field_is_reported() {
        let errors = TicketForm::default().validate().unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec!["guestName", "guestEmail", "guestPhone", "subject", "description"]
        );
    }

    #[test]
    fn test_email_shape() {
        assert!(looks_like_email("a@b.co"));
        assert!(looks_like_email("first.last@mail.example.vn"));
        assert!(!looks_like_email("a@b"));
        assert!(!looks_like_email("@b.com"));
        assert!(!looks_like_email("a@@b.com"));
        assert!(!looks_like_email("a b@c.com"));
        assert!(!looks_like_email("a@b..com"));

        let mut input = form();
        input.guest_email = "not-an-email".into();
        let errors = input.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "guestEmail");
        assert_eq!(errors[0].message, "Invalid email address");
    }

    #[test]
    fn test_summary_placeholder() {
        let ticket: Ticket = serde_json::from_value(serde_json::json!({
            "id": 1,
            "ticketCode": "SBSC-0001",
            "status": "PROCESSING",
            "aiAnalysis": {"sentiment": "NEUTRAL"}
        }))
        .unwrap();
        let rendered = render_tracking(&TrackResult { ticket, step: 1 });
        assert!(rendered.contains(SUMMARY_PENDING));
        assert!(rendered.contains("SBSC-0001"));
    }

    #[test]
    fn test_no_analysis_no_summary_block() {
        let ticket: Ticket =
            serde_json::from_value(serde_json::json!({"id": 1, "ticketCode": "SBSC-0001"})).unwrap();
        let rendered = render_tracking(&TrackResult { ticket, step: 0 });
        assert!(!rendered.contains("AI Support Summary"));
    }
}
