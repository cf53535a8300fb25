//! Push payloads delivered on the admin topics
//!
//! `TicketUpdate` arrives on the updates topic whenever the backend re-triages
//! a ticket; `CriticalAlert` arrives on the alerts topic for high-risk tickets.

use serde::{Deserialize, Serialize};

use crate::models::{AiAnalysis, Priority, TicketId};
use crate::tags::deserialize_tags;

/// Partial ticket state pushed after AI enrichment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketUpdate {
    pub ticket_id: TicketId,

    #[serde(default)]
    pub priority: Option<Priority>,

    #[serde(default)]
    pub sentiment: Option<String>,

    #[serde(default)]
    pub summary: Option<String>,

    #[serde(default, deserialize_with = "deserialize_tags")]
    pub tags: Vec<String>,

    #[serde(default)]
    pub subject: Option<String>,

    #[serde(default)]
    pub created_at: Option<String>,

    #[serde(default)]
    pub ticket_code: Option<String>,
}

impl TicketUpdate {
    /// The analysis block this update carries, replacing any previous one
    pub fn analysis(&self) -> AiAnalysis {
        AiAnalysis {
            sentiment: self.sentiment.clone(),
            summary: self.summary.clone(),
            tags: self.tags.clone(),
        }
    }
}

/// High-severity notification for a single ticket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalAlert {
    #[serde(default)]
    pub ticket_code: Option<String>,

    #[serde(default)]
    pub summary: Option<String>,

    #[serde(default)]
    pub ticket_id: Option<TicketId>,

    #[serde(default)]
    pub priority: Option<Priority>,
}

impl CriticalAlert {
    pub const TITLE: &'static str = "RISK ALERT";

    /// `Ticket <code>: <summary>`
    pub fn describe(&self) -> String {
        format!(
            "Ticket {}: {}",
            self.ticket_code.as_deref().unwrap_or("?"),
            self.summary.as_deref().unwrap_or("(no summary)")
        )
    }
}
