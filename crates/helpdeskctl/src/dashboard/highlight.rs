//! Per-ticket highlight deadlines
//!
//! One deadline per ticket. Re-arming replaces the previous deadline, so an
//! older update can never clear a highlight that a newer update set.

use helpdesk_common::TicketId;
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct HighlightTimers {
    delay: Duration,
    deadlines: HashMap<TicketId, Instant>,
}

impl HighlightTimers {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadlines: HashMap::new(),
        }
    }

    /// Start or restart the timer for `id`
    pub fn arm(&mut self, id: TicketId, now: Instant) {
        self.deadlines.insert(id, now + self.delay);
    }

    pub fn is_armed(&self, id: TicketId) -> bool {
        self.deadlines.contains_key(&id)
    }

    /// Remove and return every ticket whose deadline has passed
    pub fn expire(&mut self, now: Instant) -> Vec<TicketId> {
        let mut expired: Vec<TicketId> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(id, _)| *id)
            .collect();
        expired.sort_unstable();
        for id in &expired {
            self.deadlines.remove(id);
        }
        expired
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().min().copied()
    }
}
