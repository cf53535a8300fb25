//! Push channel - live ticket updates and critical alerts from the backend
//!
//! One STOMP connection per mounted dashboard. Events are delivered in the
//! order the broker sent them, over a channel owned by the dashboard runtime.

pub mod channel;
pub mod stomp;

use helpdesk_common::{CriticalAlert, TicketUpdate};

pub use channel::{activate, PushConfig, PushHandle};

/// Broker destinations the dashboard subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Updates,
    Alerts,
}

impl Topic {
    pub const ALL: [Topic; 2] = [Topic::Updates, Topic::Alerts];

    pub fn destination(&self) -> &'static str {
        match self {
            Topic::Updates => "/topic/admin/updates",
            Topic::Alerts => "/topic/admin/alerts",
        }
    }

    pub fn subscription_id(&self) -> &'static str {
        match self {
            Topic::Updates => "sub-0",
            Topic::Alerts => "sub-1",
        }
    }

    /// Match a MESSAGE frame by subscription id, then by destination
    pub fn for_message(subscription: Option<&str>, destination: Option<&str>) -> Option<Topic> {
        Topic::ALL
            .into_iter()
            .find(|t| subscription == Some(t.subscription_id()))
            .or_else(|| {
                Topic::ALL
                    .into_iter()
                    .find(|t| destination == Some(t.destination()))
            })
    }
}

/// What the push channel tells its owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    Connected,
    /// An established connection was lost; a reconnect is scheduled
    Disconnected,
    TicketUpdated(TicketUpdate),
    CriticalAlert(CriticalAlert),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_lookup() {
        assert_eq!(Topic::for_message(Some("sub-0"), None), Some(Topic::Updates));
        assert_eq!(
            Topic::for_message(None, Some("/topic/admin/alerts")),
            Some(Topic::Alerts)
        );
        assert_eq!(
            Topic::for_message(Some("sub-9"), Some("/topic/admin/updates")),
            Some(Topic::Updates)
        );
        assert_eq!(Topic::for_message(Some("sub-9"), Some("/topic/other")), None);
    }
}
