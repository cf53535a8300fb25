//! Agent dashboard - live inbox, ticket detail and replies

pub mod highlight;
pub mod runtime;
pub mod state;
pub mod tui;

pub use runtime::{Dashboard, DashboardOptions, DashboardView, Message};
pub use state::{merge_update, Action, InboxState, InputMode, MergeOutcome};
