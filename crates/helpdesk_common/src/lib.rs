//! Helpdesk Common - Shared types for the support desk client
//!
//! Models mirror the JSON the ticketing backend serializes. Everything here is
//! transport-agnostic: the REST client and the push channel both decode into
//! these types.

pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod tags;

pub use config::HelpdeskConfig;
pub use error::ApiError;
pub use events::{CriticalAlert, TicketUpdate};
pub use models::{
    AiAnalysis, Comment, CommentAuthor, CustomerRef, Identity, NewTicket, Priority, ReplyRequest,
    Role, Ticket, TicketId, TicketStatus,
};
