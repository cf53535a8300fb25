//! Ticket, comment and identity models
//!
//! Field names follow the backend's camelCase JSON. Enumerations keep unknown
//! values verbatim in an `Other` variant so a new backend status never breaks
//! decoding of a whole ticket list.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::tags::deserialize_tags;

/// Backend ticket identifier
pub type TicketId = i64;

/// Declares an upper-snake-case string enum with a catch-all variant
macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($variant,)+
            Other(String),
        }

        impl $name {
            pub fn as_str(&self) -> &str {
                match self {
                    $($name::$variant => $wire,)+
                    $name::Other(raw) => raw.as_str(),
                }
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                match raw.as_str() {
                    $($wire => $name::$variant,)+
                    _ => $name::Other(raw),
                }
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                $name::from(raw.to_string())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.as_str().to_string()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_enum!(
    /// Ticket priority as assigned by the backend's AI triage
    Priority {
        Low => "LOW",
        Medium => "MEDIUM",
        High => "HIGH",
        Critical => "CRITICAL",
    }
);

wire_enum!(
    /// Ticket lifecycle status
    TicketStatus {
        Open => "OPEN",
        Processing => "PROCESSING",
        InProgress => "IN_PROGRESS",
        Closed => "CLOSED",
        Done => "DONE",
    }
);

wire_enum!(
    /// Role attached to a signed-in identity or a comment author
    Role {
        Customer => "CUSTOMER",
        InternalAgent => "INTERNAL_AGENT",
        Admin => "ADMIN",
    }
);

impl Default for TicketStatus {
    fn default() -> Self {
        TicketStatus::Open
    }
}

impl Role {
    /// Agents and admins answer tickets; everyone else is the customer side
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::InternalAgent | Role::Admin)
    }
}

/// Role fields arrive either as `"ADMIN"` or as `{"name": "ADMIN"}`
#[derive(Deserialize)]
#[serde(untagged)]
enum RoleRepr {
    Plain(String),
    Named { name: String },
}

impl From<RoleRepr> for Role {
    fn from(repr: RoleRepr) -> Self {
        match repr {
            RoleRepr::Plain(name) | RoleRepr::Named { name } => Role::from(name),
        }
    }
}

fn deserialize_role<'de, D>(deserializer: D) -> Result<Role, D::Error>
where
    D: Deserializer<'de>,
{
    RoleRepr::deserialize(deserializer).map(Role::from)
}

fn deserialize_optional_role<'de, D>(deserializer: D) -> Result<Option<Role>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RoleRepr>::deserialize(deserializer)?.map(Role::from))
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Backend-produced sentiment, summary and tags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAnalysis {
    #[serde(default)]
    pub sentiment: Option<String>,

    #[serde(default)]
    pub summary: Option<String>,

    #[serde(default, deserialize_with = "deserialize_tags")]
    pub tags: Vec<String>,
}

/// Registered customer linked to a ticket
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRef {
    #[serde(default)]
    pub full_name: Option<String>,
}

/// A support ticket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: TicketId,

    /// Human-readable tracking code (e.g. `SBSC-1A2B`)
    #[serde(default)]
    pub ticket_code: Option<String>,

    #[serde(default)]
    pub subject: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub priority: Option<Priority>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub status: TicketStatus,

    #[serde(default)]
    pub guest_name: Option<String>,

    #[serde(default)]
    pub guest_email: Option<String>,

    #[serde(default)]
    pub guest_phone: Option<String>,

    #[serde(default)]
    pub customer: Option<CustomerRef>,

    /// Creation timestamp exactly as the backend sent it
    #[serde(default)]
    pub created_at: Option<String>,

    #[serde(default)]
    pub ai_analysis: Option<AiAnalysis>,

    /// Transient highlight after a live update; client-side only
    #[serde(skip)]
    pub is_new: bool,
}

impl Ticket {
    pub fn code(&self) -> &str {
        self.ticket_code.as_deref().unwrap_or("")
    }

    pub fn subject(&self) -> &str {
        self.subject.as_deref().unwrap_or("")
    }

    /// Contact shown in lists: guest name, then linked customer, then a placeholder
    pub fn contact_name(&self) -> &str {
        self.guest_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .or_else(|| {
                self.customer
                    .as_ref()
                    .and_then(|c| c.full_name.as_deref())
                    .filter(|name| !name.is_empty())
            })
            .unwrap_or("Walk-in guest")
    }

    pub fn linked_customer(&self) -> Option<&str> {
        self.customer.as_ref().and_then(|c| c.full_name.as_deref())
    }

    pub fn summary(&self) -> Option<&str> {
        self.ai_analysis.as_ref().and_then(|a| a.summary.as_deref())
    }

    /// Case-insensitive match against code, subject and contact name
    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        [self.code(), self.subject(), self.contact_name()]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// Author of a comment; absent for anonymous guests
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentAuthor {
    #[serde(default)]
    pub full_name: Option<String>,

    #[serde(default, deserialize_with = "deserialize_optional_role")]
    pub role: Option<Role>,
}

/// One entry in a ticket's conversation history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(default)]
    pub id: Option<i64>,

    #[serde(default)]
    pub ticket_id: Option<TicketId>,

    #[serde(default)]
    pub user: Option<CommentAuthor>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,

    #[serde(default, alias = "internal", deserialize_with = "null_as_default")]
    pub is_internal: bool,

    #[serde(default)]
    pub created_at: Option<String>,
}

impl Comment {
    /// Written by an agent or admin rather than the customer
    pub fn is_from_staff(&self) -> bool {
        self.user
            .as_ref()
            .and_then(|u| u.role.as_ref())
            .map(Role::is_staff)
            .unwrap_or(false)
    }

    pub fn author_name(&self) -> &str {
        self.user
            .as_ref()
            .and_then(|u| u.full_name.as_deref())
            .unwrap_or("Customer")
    }
}

/// The signed-in user as reported by `/api/auth/me`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    #[serde(deserialize_with = "deserialize_role")]
    pub role: Role,

    #[serde(default, alias = "name", alias = "displayName")]
    pub full_name: Option<String>,
}

impl Identity {
    pub fn new(role: Role, full_name: impl Into<String>) -> Self {
        Self {
            role,
            full_name: Some(full_name.into()),
        }
    }

    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or_else(|| self.role.as_str())
    }
}

/// Guest-submitted ticket creation payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTicket {
    pub guest_name: String,
    pub guest_email: String,
    pub guest_phone: String,
    pub subject: String,
    pub description: String,
}

/// Agent reply payload for `/api/agent/tickets/{id}/reply`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyRequest {
    pub content: String,
    pub status: TicketStatus,
    pub is_internal: bool,
}

impl ReplyRequest {
    /// Customer-visible reply; every reply moves the ticket to IN_PROGRESS
    pub fn public(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            status: TicketStatus::InProgress,
            is_internal: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ticket_decodes_backend_shape() {
        let raw = json!({
            "id": 42,
            "ticketCode": "SBSC-0042",
            "subject": "Card charged twice",
            "description": "Two identical charges on my card",
            "priority": "HIGH",
            "status": "PROCESSING",
            "guestName": "Nguyen Van A",
            "guestEmail": "a@example.com",
            "guestPhone": "0912000000",
            "customer": { "fullName": "Nguyen Van A" },
            "createdAt": "2026-03-01T09:15:00",
            "aiAnalysis": { "sentiment": "NEGATIVE", "summary": "Duplicate charge", "tags": "[\"BILLING\"]" }
        });

        let ticket: Ticket = serde_json::from_value(raw).unwrap();
        assert_eq!(ticket.code(), "SBSC-0042");
        assert_eq!(ticket.priority, Some(Priority::High));
        assert_eq!(ticket.status, TicketStatus::Processing);
        assert_eq!(ticket.linked_customer(), Some("Nguyen Van A"));
        assert_eq!(ticket.ai_analysis.unwrap().tags, vec!["BILLING"]);
        assert!(!ticket.is_new);
    }

    #[test]
    fn test_unknown_enum_values_are_kept() {
        let ticket: Ticket =
            serde_json::from_value(json!({"id": 1, "status": "ESCALATED", "priority": "URGENT"}))
                .unwrap();
        assert_eq!(ticket.status, TicketStatus::Other("ESCALATED".to_string()));
        assert_eq!(ticket.status.as_str(), "ESCALATED");
        assert_eq!(ticket.priority.unwrap().to_string(), "URGENT");
    }

    #[test]
    fn test_null_status_defaults_to_open() {
        let ticket: Ticket = serde_json::from_value(json!({"id": 1, "status": null})).unwrap();
        assert_eq!(ticket.status, TicketStatus::Open);
    }

    #[test]
    fn test_is_new_never_serialized() {
        let mut ticket: Ticket = serde_json::from_value(json!({"id": 9})).unwrap();
        ticket.is_new = true;
        let out = serde_json::to_value(&ticket).unwrap();
        assert!(out.get("isNew").is_none());
        assert!(out.get("is_new").is_none());
    }

    #[test]
    fn test_contact_name_fallbacks() {
        let mut ticket: Ticket = serde_json::from_value(json!({"id": 1})).unwrap();
        assert_eq!(ticket.contact_name(), "Walk-in guest");

        ticket.customer = Some(CustomerRef {
            full_name: Some("Tran Thi B".to_string()),
        });
        assert_eq!(ticket.contact_name(), "Tran Thi B");

        ticket.guest_name = Some("Guest C".to_string());
        assert_eq!(ticket.contact_name(), "Guest C");
    }

    #[test]
    fn test_matches_query() {
        let ticket: Ticket = serde_json::from_value(json!({
            "id": 1, "ticketCode": "SBSC-77", "subject": "Login broken", "guestName": "Le Van D"
        }))
        .unwrap();
        assert!(ticket.matches_query("sbsc-77"));
        assert!(ticket.matches_query("LOGIN"));
        assert!(ticket.matches_query("van d"));
        assert!(ticket.matches_query("  "));
        assert!(!ticket.matches_query("refund"));
    }

    #[test]
    fn test_comment_author_role_shapes() {
        let staff: Comment = serde_json::from_value(json!({
            "content": "We are on it",
            "user": { "fullName": "Agent Smith", "role": { "name": "INTERNAL_AGENT" } }
        }))
        .unwrap();
        assert!(staff.is_from_staff());
        assert_eq!(staff.author_name(), "Agent Smith");

        let admin: Comment = serde_json::from_value(json!({
            "content": "Escalated",
            "user": { "fullName": "Root", "role": "ADMIN" }
        }))
        .unwrap();
        assert!(admin.is_from_staff());

        let guest: Comment = serde_json::from_value(json!({"content": "Any news?", "user": null})).unwrap();
        assert!(!guest.is_from_staff());
        assert_eq!(guest.author_name(), "Customer");
    }

    #[test]
    fn test_identity_decoding() {
        let identity: Identity =
            serde_json::from_value(json!({"role": "ADMIN", "fullName": "Admin One"})).unwrap();
        assert_eq!(identity.role, Role::Admin);
        assert_eq!(identity.display_name(), "Admin One");

        let identity: Identity =
            serde_json::from_value(json!({"role": {"name": "CUSTOMER"}, "name": "Cus"})).unwrap();
        assert_eq!(identity.role, Role::Customer);
        assert_eq!(identity.display_name(), "Cus");

        let identity: Identity = serde_json::from_value(json!({"role": "INTERNAL_AGENT"})).unwrap();
        assert_eq!(identity.display_name(), "INTERNAL_AGENT");
    }

    #[test]
    fn test_reply_payload_shape() {
        let body = serde_json::to_value(ReplyRequest::public("Hello")).unwrap();
        assert_eq!(
            body,
            json!({"content": "Hello", "status": "IN_PROGRESS", "isInternal": false})
        );
    }

    #[test]
    fn test_new_ticket_payload_is_camel_case() {
        let body = serde_json::to_value(NewTicket {
            guest_name: "A".into(),
            guest_email: "a@b.co".into(),
            guest_phone: "1".into(),
            subject: "S".into(),
            description: "D".into(),
        })
        .unwrap();
        assert!(body.get("guestName").is_some());
        assert!(body.get("guestEmail").is_some());
        assert!(body.get("guestPhone").is_some());
    }
}
