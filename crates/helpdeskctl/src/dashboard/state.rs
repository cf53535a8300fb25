//! Agent workspace state
//!
//! Everything here is synchronous and owned by the runtime loop. Key presses,
//! push events and finished HTTP calls all become calls on `InboxState`;
//! anything that needs I/O is handed back to the loop as an `Action`.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use helpdesk_common::{Comment, CriticalAlert, Identity, Ticket, TicketId, TicketStatus, TicketUpdate};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use super::highlight::HighlightTimers;
use crate::notice::Notice;

/// Subject given to tickets first seen through a push update without one
pub const PLACEHOLDER_SUBJECT: &str = "New ticket";

/// How long a status-line notice stays visible
pub const NOTICE_TTL: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Browse,
    Search,
    Reply,
}

/// Work the runtime has to carry out on behalf of the state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    LoadTickets,
    LoadDetail(TicketId),
    SendReply(TicketId, String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Updated,
    Inserted,
}

/// A critical alert waiting for the agent to dismiss it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertEntry {
    pub alert: CriticalAlert,
    pub received_at: String,
}

/// Merge one update into `tickets`
///
/// Known ids get their priority and analysis replaced and nothing else;
/// unknown ids are synthesized and prepended. Either way the entry ends up
/// highlighted.
pub fn merge_update(
    tickets: &mut Vec<Ticket>,
    update: &TicketUpdate,
    created_fallback: impl FnOnce() -> String,
) -> MergeOutcome {
    if let Some(ticket) = tickets.iter_mut().find(|t| t.id == update.ticket_id) {
        ticket.priority = update.priority.clone();
        ticket.ai_analysis = Some(update.analysis());
        ticket.is_new = true;
        return MergeOutcome::Updated;
    }

    let subject = [update.subject.as_deref(), update.summary.as_deref()]
        .into_iter()
        .flatten()
        .find(|s| !s.is_empty())
        .unwrap_or(PLACEHOLDER_SUBJECT)
        .to_string();

    let ticket = Ticket {
        id: update.ticket_id,
        ticket_code: update.ticket_code.clone(),
        subject: Some(subject),
        description: None,
        priority: update.priority.clone(),
        status: TicketStatus::Open,
        guest_name: None,
        guest_email: None,
        guest_phone: None,
        customer: None,
        created_at: Some(
            update
                .created_at
                .clone()
                .filter(|c| !c.is_empty())
                .unwrap_or_else(created_fallback),
        ),
        ai_analysis: Some(update.analysis()),
        is_new: true,
    };
    tickets.insert(0, ticket);
    MergeOutcome::Inserted
}

fn local_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}

#[derive(Debug)]
pub struct InboxState {
    pub identity: Option<Identity>,
    pub tickets: Vec<Ticket>,
    highlights: HighlightTimers,
    /// Ticket under the list cursor
    pub focus: Option<TicketId>,
    /// Ticket open in the detail panel
    pub selected: Option<TicketId>,
    pub detail: Option<Ticket>,
    pub comments: Vec<Comment>,
    pub draft: String,
    pub filter: String,
    pub mode: InputMode,
    pub connected: bool,
    pub alerts: VecDeque<AlertEntry>,
    notice: Option<(Notice, Instant)>,
    pub loading_tickets: bool,
    pub loading_detail: bool,
    pub sending_reply: bool,
    pub should_quit: bool,
}

impl InboxState {
    pub fn new(identity: Option<Identity>, highlight_delay: Duration) -> Self {
        Self {
            identity,
            tickets: Vec::new(),
            highlights: HighlightTimers::new(highlight_delay),
            focus: None,
            selected: None,
            detail: None,
            comments: Vec::new(),
            draft: String::new(),
            filter: String::new(),
            mode: InputMode::Browse,
            connected: false,
            alerts: VecDeque::new(),
            notice: None,
            loading_tickets: false,
            loading_detail: false,
            sending_reply: false,
            should_quit: false,
        }
    }

    // ---- push events ----

    /// Merge a push update and (re)start that ticket's highlight timer
    pub fn apply_update(&mut self, update: &TicketUpdate, now: Instant) -> MergeOutcome {
        let outcome = merge_update(&mut self.tickets, update, local_timestamp);
        self.highlights.arm(update.ticket_id, now);
        if self.focus.is_none() {
            self.focus = Some(update.ticket_id);
        }
        outcome
    }

    pub fn push_alert(&mut self, alert: CriticalAlert) {
        self.alerts.push_back(AlertEntry {
            alert,
            received_at: chrono::Local::now().format("%H:%M:%S").to_string(),
        });
    }

    /// Dismiss the oldest alert
    pub fn dismiss_alert(&mut self) -> Option<AlertEntry> {
        self.alerts.pop_front()
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    // ---- timers ----

    /// Clear highlights and the notice whose time is up
    pub fn expire(&mut self, now: Instant) {
        for id in self.highlights.expire(now) {
            if let Some(ticket) = self.tickets.iter_mut().find(|t| t.id == id) {
                ticket.is_new = false;
            }
        }
        if matches!(&self.notice, Some((_, until)) if *until <= now) {
            self.notice = None;
        }
    }

    /// When `expire` next has something to do
    pub fn next_deadline(&self) -> Option<Instant> {
        let notice = self.notice.as_ref().map(|(_, until)| *until);
        match (self.highlights.next_deadline(), notice) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn set_notice(&mut self, notice: Notice, now: Instant) {
        self.notice = Some((notice, now + NOTICE_TTL));
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref().map(|(notice, _)| notice)
    }

    // ---- HTTP results ----

    /// Replace the list with a fresh fetch; running highlights survive
    pub fn tickets_loaded(&mut self, mut tickets: Vec<Ticket>) {
        for ticket in &mut tickets {
            ticket.is_new = self.highlights.is_armed(ticket.id);
        }
        self.tickets = tickets;
        self.loading_tickets = false;
        if self.focused_index().is_none() {
            self.focus = self.visible().first().map(|t| t.id);
        }
    }

    /// Detail results for a ticket that is no longer open are dropped
    pub fn detail_loaded(&mut self, id: TicketId, ticket: Ticket, comments: Vec<Comment>) {
        if self.selected != Some(id) {
            return;
        }
        self.detail = Some(ticket);
        self.comments = comments;
        self.loading_detail = false;
    }

    pub fn detail_failed(&mut self, id: TicketId) {
        if self.selected == Some(id) {
            self.loading_detail = false;
        }
    }

    /// A reply went through: clear the draft and reload the conversation
    pub fn reply_sent(&mut self, id: TicketId, now: Instant) -> Option<Action> {
        self.sending_reply = false;
        self.set_notice(Notice::success("Reply sent"), now);
        if self.selected != Some(id) {
            return None;
        }
        self.draft.clear();
        self.loading_detail = true;
        Some(Action::LoadDetail(id))
    }

    // ---- list view ----

    /// Tickets passing the search filter, in list order
    pub fn visible(&self) -> Vec<&Ticket> {
        self.tickets
            .iter()
            .filter(|t| t.matches_query(&self.filter))
            .collect()
    }

    pub fn focused_index(&self) -> Option<usize> {
        let focus = self.focus?;
        self.visible().iter().position(|t| t.id == focus)
    }

    fn move_focus(&mut self, delta: isize) {
        let visible = self.visible();
        if visible.is_empty() {
            self.focus = None;
            return;
        }
        let next = match self.focused_index() {
            Some(index) => index
                .saturating_add_signed(delta)
                .min(visible.len() - 1),
            None => 0,
        };
        self.focus = Some(visible[next].id);
    }

    fn open_focused(&mut self) -> Option<Action> {
        let index = self.focused_index().or_else(|| (!self.visible().is_empty()).then_some(0))?;
        let id = self.visible()[index].id;
        self.focus = Some(id);
        if self.selected != Some(id) {
            self.draft.clear();
            self.comments.clear();
            self.detail = None;
        }
        self.selected = Some(id);
        self.loading_detail = true;
        Some(Action::LoadDetail(id))
    }

    // ---- keyboard ----

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) -> Option<Action> {
        if key.kind != KeyEventKind::Press {
            return None;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return None;
        }

        match self.mode {
            InputMode::Browse => self.browse_key(key),
            InputMode::Search => {
                self.search_key(key);
                None
            }
            InputMode::Reply => self.reply_key(key, now),
        }
    }

    fn browse_key(&mut self, key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Down | KeyCode::Char('j') => self.move_focus(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_focus(-1),
            KeyCode::Home | KeyCode::Char('g') => {
                self.focus = self.visible().first().map(|t| t.id);
            }
            KeyCode::Enter | KeyCode::Right | KeyCode::Char('l') => return self.open_focused(),
            KeyCode::Char('/') => self.mode = InputMode::Search,
            // The reply box only exists once the detail has loaded
            KeyCode::Char('r') if self.detail.is_some() => self.mode = InputMode::Reply,
            KeyCode::Char('d') => {
                self.dismiss_alert();
            }
            KeyCode::Char('R') | KeyCode::F(5) => {
                self.loading_tickets = true;
                return Some(Action::LoadTickets);
            }
            _ => {}
        }
        None
    }

    fn search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.filter.clear();
                self.mode = InputMode::Browse;
            }
            KeyCode::Enter => self.mode = InputMode::Browse,
            KeyCode::Backspace => {
                self.filter.pop();
            }
            KeyCode::Char(c) => self.filter.push(c),
            _ => return,
        }
        if self.focused_index().is_none() {
            self.focus = self.visible().first().map(|t| t.id);
        }
    }

    fn reply_key(&mut self, key: KeyEvent, now: Instant) -> Option<Action> {
        match key.code {
            KeyCode::Esc => self.mode = InputMode::Browse,
            KeyCode::Enter
                if key.modifiers.intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) =>
            {
                self.draft.push('\n');
            }
            KeyCode::Enter => return self.submit_reply(now),
            KeyCode::Backspace => {
                self.draft.pop();
            }
            KeyCode::Char(c) => self.draft.push(c),
            _ => {}
        }
        None
    }

    fn submit_reply(&mut self, now: Instant) -> Option<Action> {
        let id = self.selected?;
        if self.sending_reply {
            return None;
        }
        if self.draft.trim().is_empty() {
            self.set_notice(Notice::info("Nothing to send"), now);
            return None;
        }
        self.sending_reply = true;
        Some(Action::SendReply(id, self.draft.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helpdesk_common::{AiAnalysis, Priority};

    const DELAY: Duration = Duration::from_secs(3);

    fn ticket(id: TicketId, subject: &str) -> Ticket {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "ticketCode": format!("SBSC-{id}"),
            "subject": subject,
            "description": "Card was charged twice",
            "priority": "LOW",
            "status": "OPEN",
            "guestName": "Lan",
            "guestPhone": "0909",
            "createdAt": "2026-10-01T08:30:00",
            "aiAnalysis": {"sentiment": "NEUTRAL", "summary": "old", "tags": ["BILLING"]}
        }))
        .unwrap()
    }

    fn update(id: TicketId) -> TicketUpdate {
        TicketUpdate {
            ticket_id: id,
            priority: Some(Priority::Critical),
            sentiment: Some("ANGRY".into()),
            summary: Some("Customer reports fraud".into()),
            tags: vec!["FRAUD".into(), "SCAM".into()],
            subject: None,
            created_at: None,
            ticket_code: None,
        }
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn state_with(tickets: Vec<Ticket>) -> InboxState {
        let mut state = InboxState::new(None, DELAY);
        state.tickets_loaded(tickets);
        state
    }

    #[test]
    fn test_known_id_replaces_only_priority_and_analysis() {
        let mut tickets = vec![ticket(1, "Refund"), ticket(2, "Login")];
        let before = tickets.clone();

        let outcome = merge_update(&mut tickets, &update(2), || unreachable!());
        assert_eq!(outcome, MergeOutcome::Updated);
        assert_eq!(tickets.len(), 2);
        assert_eq!(tickets[0], before[0]);

        let mut expected = before[1].clone();
        expected.priority = Some(Priority::Critical);
        expected.ai_analysis = Some(AiAnalysis {
            sentiment: Some("ANGRY".into()),
            summary: Some("Customer reports fraud".into()),
            tags: vec!["FRAUD".into(), "SCAM".into()],
        });
        expected.is_new = true;
        assert_eq!(tickets[1], expected);
    }

    #[test]
    fn test_unknown_id_prepends_exactly_one_entry() {
        let mut tickets = vec![ticket(1, "Refund")];
        let outcome = merge_update(&mut tickets, &update(9), || "2026-10-16T10:00:00".into());

        assert_eq!(outcome, MergeOutcome::Inserted);
        assert_eq!(tickets.len(), 2);
        assert_eq!(tickets[0].id, 9);
        assert_eq!(tickets[1].id, 1);
        assert!(tickets[0].is_new);
        assert_eq!(tickets[0].status, TicketStatus::Open);
        assert_eq!(tickets[0].subject(), "Customer reports fraud");
        assert_eq!(tickets[0].created_at.as_deref(), Some("2026-10-16T10:00:00"));
        assert_eq!(tickets[0].ticket_code, None);
    }

    #[test]
    fn test_synthesized_fields_prefer_event_values() {
        let mut tickets = Vec::new();
        let mut event = update(4);
        event.subject = Some("Stolen card".into());
        event.created_at = Some("2026-10-15T09:00:00".into());
        event.ticket_code = Some("SBSC-0004".into());

        merge_update(&mut tickets, &event, || unreachable!());
        assert_eq!(tickets[0].subject(), "Stolen card");
        assert_eq!(tickets[0].created_at.as_deref(), Some("2026-10-15T09:00:00"));
        assert_eq!(tickets[0].code(), "SBSC-0004");
    }

    #[test]
    fn test_placeholder_subject() {
        let mut tickets = Vec::new();
        let mut event = update(5);
        event.summary = Some(String::new());
        merge_update(&mut tickets, &event, local_timestamp);
        assert_eq!(tickets[0].subject(), PLACEHOLDER_SUBJECT);
        assert!(tickets[0].created_at.is_some());
    }

    #[test]
    fn test_highlight_clears_after_delay() {
        let start = Instant::now();
        let mut state = state_with(vec![ticket(1, "Refund")]);

        state.apply_update(&update(1), start);
        assert!(state.tickets[0].is_new);
        assert_eq!(state.next_deadline(), Some(start + DELAY));

        state.expire(start + Duration::from_millis(2500));
        assert!(state.tickets[0].is_new);

        state.expire(start + DELAY);
        assert!(!state.tickets[0].is_new);
        assert_eq!(state.next_deadline(), None);
    }

    #[test]
    fn test_second_update_resets_highlight() {
        let start = Instant::now();
        let mut state = state_with(vec![ticket(1, "Refund")]);

        state.apply_update(&update(1), start);
        state.apply_update(&update(1), start + Duration::from_secs(2));

        // The first update's clear must not erase the second highlight
        state.expire(start + DELAY);
        assert!(state.tickets[0].is_new);

        state.expire(start + Duration::from_secs(5));
        assert!(!state.tickets[0].is_new);
    }

    #[test]
    fn test_apply_update_reports_first_sighting() {
        let start = Instant::now();
        let mut state = state_with(vec![ticket(1, "Refund")]);

        assert_eq!(state.apply_update(&update(9), start), MergeOutcome::Inserted);
        assert_eq!(state.apply_update(&update(9), start), MergeOutcome::Updated);
        assert_eq!(state.apply_update(&update(1), start), MergeOutcome::Updated);
        assert_eq!(state.tickets.len(), 2);
        assert_eq!(state.tickets[0].id, 9);
    }

    #[test]
    fn test_reload_keeps_running_highlight() {
        let start = Instant::now();
        let mut state = state_with(vec![ticket(1, "Refund")]);
        state.apply_update(&update(1), start);

        state.tickets_loaded(vec![ticket(1, "Refund"), ticket(2, "Login")]);
        assert!(state.tickets[0].is_new);
        assert!(!state.tickets[1].is_new);
    }

    #[test]
    fn test_open_and_reply_flow() {
        let now = Instant::now();
        let mut state = state_with(vec![ticket(1, "Refund"), ticket(2, "Login")]);

        assert_eq!(state.handle_key(press(KeyCode::Char('j')), now), None);
        assert_eq!(
            state.handle_key(press(KeyCode::Enter), now),
            Some(Action::LoadDetail(2))
        );
        assert!(state.loading_detail);

        state.detail_loaded(2, ticket(2, "Login"), Vec::new());
        assert!(!state.loading_detail);
        assert_eq!(state.detail.as_ref().map(|t| t.id), Some(2));

        state.handle_key(press(KeyCode::Char('r')), now);
        assert_eq!(state.mode, InputMode::Reply);
        for c in "On it".chars() {
            state.handle_key(press(KeyCode::Char(c)), now);
        }
        assert_eq!(
            state.handle_key(press(KeyCode::Enter), now),
            Some(Action::SendReply(2, "On it".into()))
        );
        // A second Enter while the first reply is in flight sends nothing
        assert_eq!(state.handle_key(press(KeyCode::Enter), now), None);

        assert_eq!(state.reply_sent(2, now), Some(Action::LoadDetail(2)));
        assert!(state.draft.is_empty());
        assert_eq!(state.notice().map(|n| n.title.as_str()), Some("Reply sent"));
    }

    #[test]
    fn test_blank_draft_is_not_sent() {
        let now = Instant::now();
        let mut state = state_with(vec![ticket(1, "Refund")]);
        state.handle_key(press(KeyCode::Enter), now);
        state.detail_loaded(1, ticket(1, "Refund"), Vec::new());
        state.handle_key(press(KeyCode::Char('r')), now);
        state.handle_key(press(KeyCode::Char(' ')), now);

        assert_eq!(state.handle_key(press(KeyCode::Enter), now), None);
        assert!(!state.sending_reply);
    }

    #[test]
    fn test_shift_enter_adds_newline() {
        let now = Instant::now();
        let mut state = state_with(vec![ticket(1, "Refund")]);
        state.handle_key(press(KeyCode::Enter), now);
        state.detail_loaded(1, ticket(1, "Refund"), Vec::new());
        state.handle_key(press(KeyCode::Char('r')), now);
        state.handle_key(press(KeyCode::Char('a')), now);
        state.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT), now);
        state.handle_key(press(KeyCode::Char('b')), now);
        assert_eq!(state.draft, "a\nb");
    }

    #[test]
    fn test_reply_waits_for_detail() {
        let now = Instant::now();
        let mut state = state_with(vec![ticket(1, "Refund")]);
        state.handle_key(press(KeyCode::Enter), now);
        assert_eq!(state.selected, Some(1));

        state.handle_key(press(KeyCode::Char('r')), now);
        assert_eq!(state.mode, InputMode::Browse);
        assert!(state.draft.is_empty());

        state.detail_failed(1);
        state.handle_key(press(KeyCode::Char('r')), now);
        assert_eq!(state.mode, InputMode::Browse);

        state.detail_loaded(1, ticket(1, "Refund"), Vec::new());
        state.handle_key(press(KeyCode::Char('r')), now);
        assert_eq!(state.mode, InputMode::Reply);
    }

    #[test]
    fn test_stale_detail_is_ignored() {
        let now = Instant::now();
        let mut state = state_with(vec![ticket(1, "Refund"), ticket(2, "Login")]);
        state.handle_key(press(KeyCode::Enter), now);
        state.handle_key(press(KeyCode::Down), now);
        state.handle_key(press(KeyCode::Enter), now);

        state.detail_loaded(1, ticket(1, "Refund"), Vec::new());
        assert!(state.detail.is_none());
        assert!(state.loading_detail);
    }

    #[test]
    fn test_search_filters_and_refocuses() {
        let now = Instant::now();
        let mut state = state_with(vec![ticket(1, "Refund"), ticket(2, "Login problem")]);
        assert_eq!(state.focus, Some(1));

        state.handle_key(press(KeyCode::Char('/')), now);
        for c in "login".chars() {
            state.handle_key(press(KeyCode::Char(c)), now);
        }
        assert_eq!(state.visible().len(), 1);
        assert_eq!(state.focus, Some(2));

        state.handle_key(press(KeyCode::Esc), now);
        assert_eq!(state.mode, InputMode::Browse);
        assert_eq!(state.visible().len(), 2);
    }

    #[test]
    fn test_alerts_stay_until_dismissed() {
        let now = Instant::now();
        let mut state = state_with(Vec::new());
        state.push_alert(CriticalAlert {
            ticket_code: Some("SBSC-1".into()),
            summary: Some("Threat".into()),
            ticket_id: None,
            priority: None,
        });

        state.expire(now + Duration::from_secs(3600));
        assert_eq!(state.alerts.len(), 1);

        state.handle_key(press(KeyCode::Char('d')), now);
        assert!(state.alerts.is_empty());
    }

    #[test]
    fn test_notice_expires() {
        let now = Instant::now();
        let mut state = state_with(Vec::new());
        state.set_notice(Notice::error("Could not load tickets"), now);
        assert_eq!(state.next_deadline(), Some(now + NOTICE_TTL));

        state.expire(now + NOTICE_TTL);
        assert!(state.notice().is_none());
    }

    #[test]
    fn test_quit_keys() {
        let now = Instant::now();
        let mut state = state_with(Vec::new());
        state.handle_key(press(KeyCode::Char('q')), now);
        assert!(state.should_quit);

        let mut state = state_with(Vec::new());
        state.mode = InputMode::Reply;
        state.handle_key(press(KeyCode::Char('q')), now);
        assert!(!state.should_quit);
        state.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL), now);
        assert!(state.should_quit);
    }
}
