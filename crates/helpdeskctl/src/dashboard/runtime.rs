//! Dashboard runtime loop
//!
//! The loop is the only owner of `InboxState`. Push events, terminal input and
//! HTTP results all arrive as messages; spawned HTTP calls are not cancelled
//! when the loop exits, their results are simply dropped.

use anyhow::Result;
use crossterm::event::KeyEvent;
use helpdesk_common::{ApiError, Comment, Identity, ReplyRequest, Ticket, TicketId};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::state::{Action, InboxState, MergeOutcome};
use crate::api_client::ApiClient;
use crate::notice::Notice;
use crate::push::{self, PushConfig, PushEvent};

/// Everything the loop reacts to besides push events
#[derive(Debug)]
pub enum Message {
    Key(KeyEvent),
    /// Terminal resized; only a redraw is needed
    Redraw,
    TicketsLoaded(Result<Vec<Ticket>, ApiError>),
    DetailLoaded(TicketId, Result<(Ticket, Vec<Comment>), ApiError>),
    ReplySent(TicketId, Result<(), ApiError>),
}

/// Where the loop's output goes
pub trait DashboardView {
    fn draw(&mut self, state: &InboxState) -> Result<()>;

    /// Audible cue for a critical alert; best effort
    fn alert_cue(&mut self) {}
}

pub struct DashboardOptions {
    pub push: PushConfig,
    pub highlight: Duration,
    pub alert_sound: bool,
}

pub struct Dashboard {
    state: InboxState,
    api: ApiClient,
    options: DashboardOptions,
    tx: mpsc::UnboundedSender<Message>,
    rx: mpsc::UnboundedReceiver<Message>,
}

impl Dashboard {
    pub fn new(api: ApiClient, identity: Option<Identity>, options: DashboardOptions) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            state: InboxState::new(identity, options.highlight),
            api,
            options,
            tx,
            rx,
        }
    }

    /// Sender for input sources such as the terminal reader thread
    pub fn sender(&self) -> mpsc::UnboundedSender<Message> {
        self.tx.clone()
    }

    /// Run until the agent quits; the push channel lives exactly as long
    pub async fn run<V: DashboardView>(mut self, view: &mut V) -> Result<InboxState> {
        let (push_tx, mut push_rx) = mpsc::unbounded_channel();
        let push = push::activate(self.options.push.clone(), push_tx);
        info!("Agent workspace mounted");

        self.state.loading_tickets = true;
        self.perform(Action::LoadTickets);

        let outcome = self.event_loop(view, &mut push_rx).await;

        push.deactivate().await;
        info!("Agent workspace unmounted");
        outcome.map(|()| self.state)
    }

    async fn event_loop<V: DashboardView>(
        &mut self,
        view: &mut V,
        push_rx: &mut mpsc::UnboundedReceiver<PushEvent>,
    ) -> Result<()> {
        let mut push_open = true;
        loop {
            view.draw(&self.state)?;
            if self.state.should_quit {
                return Ok(());
            }

            let deadline = self.state.next_deadline();
            let wake = tokio::time::Instant::from_std(
                deadline.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600)),
            );

            tokio::select! {
                event = push_rx.recv(), if push_open => match event {
                    Some(event) => self.on_push(event, view),
                    None => push_open = false,
                },
                message = self.rx.recv() => match message {
                    Some(message) => self.on_message(message),
                    None => return Ok(()),
                },
                _ = tokio::time::sleep_until(wake), if deadline.is_some() => {}
            }

            self.state.expire(Instant::now());
        }
    }

    fn on_push<V: DashboardView>(&mut self, event: PushEvent, view: &mut V) {
        match event {
            PushEvent::Connected => self.state.set_connected(true),
            PushEvent::Disconnected => self.state.set_connected(false),
            PushEvent::TicketUpdated(update) => {
                match self.state.apply_update(&update, Instant::now()) {
                    MergeOutcome::Inserted => {
                        debug!("Ticket {} first seen via push", update.ticket_id)
                    }
                    MergeOutcome::Updated => debug!("Ticket {} updated", update.ticket_id),
                }
                if self.state.selected == Some(update.ticket_id) {
                    self.perform(Action::LoadDetail(update.ticket_id));
                }
            }
            PushEvent::CriticalAlert(alert) => {
                warn!("{}: {}", helpdesk_common::CriticalAlert::TITLE, alert.describe());
                if self.options.alert_sound {
                    view.alert_cue();
                }
                self.state.push_alert(alert);
            }
        }
    }

    fn on_message(&mut self, message: Message) {
        let now = Instant::now();
        match message {
            Message::Key(key) => {
                if let Some(action) = self.state.handle_key(key, now) {
                    self.perform(action);
                }
            }
            Message::Redraw => {}
            Message::TicketsLoaded(Ok(tickets)) => {
                debug!("Loaded {} tickets", tickets.len());
                self.state.tickets_loaded(tickets);
            }
            Message::TicketsLoaded(Err(e)) => {
                warn!("Failed to load tickets: {}", e);
                self.state.loading_tickets = false;
                self.state
                    .set_notice(Notice::from_api_error("Could not load tickets", &e), now);
            }
            Message::DetailLoaded(id, Ok((ticket, comments))) => {
                self.state.detail_loaded(id, ticket, comments);
            }
            Message::DetailLoaded(id, Err(e)) => {
                warn!("Failed to load ticket {}: {}", id, e);
                self.state.detail_failed(id);
                self.state.set_notice(
                    Notice::from_api_error("Could not load ticket details", &e),
                    now,
                );
            }
            Message::ReplySent(id, Ok(())) => {
                info!("Reply sent on ticket {}", id);
                if let Some(action) = self.state.reply_sent(id, now) {
                    self.perform(action);
                }
            }
            Message::ReplySent(id, Err(e)) => {
                warn!("Reply on ticket {} failed: {}", id, e);
                self.state.sending_reply = false;
                self.state
                    .set_notice(Notice::from_api_error("Failed to send", &e), now);
            }
        }
    }

    /// Spawn the HTTP call behind `action`; the result comes back as a message
    fn perform(&self, action: Action) {
        let api = self.api.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let message = match action {
                Action::LoadTickets => Message::TicketsLoaded(api.list_tickets().await),
                Action::LoadDetail(id) => {
                    Message::DetailLoaded(id, api.ticket_with_comments(id).await)
                }
                Action::SendReply(id, content) => {
                    Message::ReplySent(id, api.reply(id, &ReplyRequest::public(content)).await)
                }
            };
            // The loop may already be gone
            let _ = tx.send(message);
        });
    }
}
