//! Full-screen agent workspace
//!
//! Inbox on the left, ticket detail and conversation on the right, sticky
//! risk alerts on top. Terminal input is read on its own thread and forwarded
//! to the runtime loop.

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use helpdesk_common::{CriticalAlert, Priority, Ticket, TicketStatus};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io::{self, Stdout, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;

use super::runtime::{Dashboard, DashboardView, Message};
use super::state::{InboxState, InputMode};
use crate::display;
use crate::notice::NoticeLevel;

const VERSION: &str = env!("HELPDESK_VERSION");

/// How many alerts are listed before the rest are summarized
const MAX_VISIBLE_ALERTS: usize = 3;

struct TerminalView {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl DashboardView for TerminalView {
    fn draw(&mut self, state: &InboxState) -> Result<()> {
        self.terminal.draw(|f| draw(f, state))?;
        Ok(())
    }

    fn alert_cue(&mut self) {
        let mut stdout = io::stdout();
        let _ = stdout.write_all(b"\x07").and_then(|_| stdout.flush());
    }
}

/// Read terminal events until `stop` is set or the loop hangs up
fn spawn_input_thread(tx: mpsc::UnboundedSender<Message>, stop: Arc<AtomicBool>) {
    thread::spawn(move || {
        while !stop.load(Ordering::Relaxed) && !tx.is_closed() {
            match event::poll(Duration::from_millis(200)) {
                Ok(false) => continue,
                Ok(true) => {}
                Err(e) => {
                    tracing::warn!("Terminal input failed: {}", e);
                    break;
                }
            }
            let message = match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => Message::Key(key),
                Ok(Event::Resize(_, _)) => Message::Redraw,
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!("Terminal input failed: {}", e);
                    break;
                }
            };
            if tx.send(message).is_err() {
                break;
            }
        }
    });
}

/// Take over the terminal and run the dashboard until the agent quits
pub async fn run(dashboard: Dashboard) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut view = TerminalView {
        terminal: Terminal::new(backend)?,
    };

    let stop = Arc::new(AtomicBool::new(false));
    spawn_input_thread(dashboard.sender(), stop.clone());

    let result = dashboard.run(&mut view).await;
    stop.store(true, Ordering::Relaxed);

    // Restore terminal
    disable_raw_mode()?;
    execute!(view.terminal.backend_mut(), LeaveAlternateScreen)?;
    view.terminal.show_cursor()?;

    result.map(|_| ())
}

/// Draw the workspace UI
fn draw(f: &mut Frame, state: &InboxState) {
    let alert_height = match state.alerts.len() {
        0 => 0,
        n => n.min(MAX_VISIBLE_ALERTS + 1) as u16 + 2,
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),            // Header
            Constraint::Length(alert_height), // Alerts
            Constraint::Min(10),              // Main content
            Constraint::Length(3),            // Footer
        ])
        .split(f.size());

    draw_header(f, chunks[0], state);
    if alert_height > 0 {
        draw_alerts(f, chunks[1], state);
    }

    let main_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(chunks[2]);

    draw_inbox(f, main_chunks[0], state);
    draw_ticket_panel(f, main_chunks[1], state);
    draw_footer(f, chunks[3], state);
}

fn priority_color(priority: Option<&Priority>) -> Color {
    match priority {
        Some(Priority::Critical) => Color::Red,
        Some(Priority::High) => Color::Yellow,
        _ => Color::Blue,
    }
}

fn draw_header(f: &mut Frame, area: Rect, state: &InboxState) {
    let (dot, label, color) = if state.connected {
        ("●", "Online", Color::Green)
    } else {
        ("○", "Offline", Color::Red)
    };
    let agent = state
        .identity
        .as_ref()
        .map(|id| format!("{} ({})", id.display_name(), id.role))
        .unwrap_or_else(|| "anonymous".to_string());

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            "  SBSC Helpdesk ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("v{}", VERSION), Style::default().fg(Color::Gray)),
        Span::raw("  │  "),
        Span::raw(agent),
        Span::raw("  │  "),
        Span::styled(format!("{} {}", dot, label), Style::default().fg(color)),
        Span::raw("  │  "),
        Span::styled(
            chrono::Local::now().format("%H:%M:%S").to_string(),
            Style::default().fg(Color::Gray),
        ),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    f.render_widget(header, area);
}

fn alert_line(alert: &CriticalAlert, received_at: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!(" {} ", received_at), Style::default().fg(Color::Gray)),
        Span::styled(
            alert.describe(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
    ])
}

fn draw_alerts(f: &mut Frame, area: Rect, state: &InboxState) {
    let mut lines: Vec<Line> = state
        .alerts
        .iter()
        .take(MAX_VISIBLE_ALERTS)
        .map(|entry| alert_line(&entry.alert, &entry.received_at))
        .collect();
    if state.alerts.len() > MAX_VISIBLE_ALERTS {
        lines.push(Line::from(Span::styled(
            format!(" +{} more", state.alerts.len() - MAX_VISIBLE_ALERTS),
            Style::default().fg(Color::Gray),
        )));
    }

    let alerts = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red))
            .title(format!(" {} ({}) - d to dismiss ", CriticalAlert::TITLE, state.alerts.len())),
    );
    f.render_widget(alerts, area);
}

fn inbox_item<'a>(ticket: &'a Ticket, focused: bool, open: bool) -> ListItem<'a> {
    let mut first = vec![
        Span::styled(
            if open { "▶ " } else { "  " },
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(
            ticket.contact_name(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("  {}", display::clock(ticket.created_at.as_deref())),
            Style::default().fg(Color::Gray),
        ),
    ];
    if ticket.is_new {
        first.push(Span::styled(
            "  ● updated",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ));
    }

    let mut second = vec![
        Span::raw("  "),
        Span::styled(
            format!(" {} ", display::priority_label(ticket.priority.as_ref())),
            Style::default()
                .fg(Color::Black)
                .bg(priority_color(ticket.priority.as_ref())),
        ),
        Span::raw(" "),
    ];
    if ticket.status == TicketStatus::Open {
        second.push(Span::styled(
            " New ",
            Style::default().fg(Color::Black).bg(Color::Cyan),
        ));
        second.push(Span::raw(" "));
    }
    second.push(Span::raw(ticket.subject()));

    let mut style = Style::default();
    if ticket.is_new {
        style = style.fg(Color::LightGreen);
    }
    if focused {
        style = style.bg(Color::DarkGray).add_modifier(Modifier::BOLD);
    }

    ListItem::new(vec![Line::from(first), Line::from(second)]).style(style)
}

fn draw_inbox(f: &mut Frame, area: Rect, state: &InboxState) {
    let visible = state.visible();
    let title = if state.filter.is_empty() {
        format!(" Inbox ({}) ", state.tickets.len())
    } else {
        format!(" Inbox ({}/{}) - \"{}\" ", visible.len(), state.tickets.len(), state.filter)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(title);

    if visible.is_empty() {
        let text = if state.loading_tickets {
            "Loading..."
        } else {
            "No tickets"
        };
        let empty = Paragraph::new(text)
            .style(Style::default().fg(Color::Gray))
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(empty, area);
        return;
    }

    // Keep the focused entry on screen; every entry is two rows
    let rows = (area.height.saturating_sub(2) / 2).max(1) as usize;
    let focused = state.focused_index().unwrap_or(0);
    let skip = (focused + 1).saturating_sub(rows);

    let items: Vec<ListItem> = visible
        .iter()
        .enumerate()
        .skip(skip)
        .map(|(i, ticket)| inbox_item(ticket, i == focused, state.selected == Some(ticket.id)))
        .collect();

    f.render_widget(List::new(items).block(block), area);
}

fn draw_ticket_panel(f: &mut Frame, area: Rect, state: &InboxState) {
    let Some(ticket) = &state.detail else {
        let text = if state.loading_detail {
            "Loading..."
        } else {
            "Select a ticket to view details"
        };
        let empty = Paragraph::new(text)
            .style(Style::default().fg(Color::Gray))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(" Ticket "));
        f.render_widget(empty, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(9), // Detail + AI box
            Constraint::Min(5),    // Conversation
            Constraint::Length(5), // Reply
        ])
        .split(area);

    draw_detail(f, chunks[0], ticket);
    draw_conversation(f, chunks[1], state, ticket);
    draw_reply(f, chunks[2], state);
}

fn draw_detail(f: &mut Frame, area: Rect, ticket: &Ticket) {
    let label = Style::default().fg(Color::Gray);
    let mut contact = ticket.contact_name().to_string();
    if let Some(phone) = ticket.guest_phone.as_deref().filter(|p| !p.is_empty()) {
        contact.push_str(&format!(" ({})", phone));
    }

    let mut lines = vec![
        Line::from(vec![
            Span::styled("Priority: ", label),
            Span::styled(
                display::priority_label(ticket.priority.as_ref()),
                Style::default()
                    .fg(priority_color(ticket.priority.as_ref()))
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled("   Status: ", label),
            Span::raw(ticket.status.as_str()),
        ]),
        Line::from(vec![Span::styled("Contact:  ", label), Span::raw(contact)]),
    ];
    if let Some(customer) = ticket.linked_customer() {
        lines.push(Line::from(vec![
            Span::styled("Customer: ", label),
            Span::raw(customer),
        ]));
    }

    lines.push(Line::from(""));
    match &ticket.ai_analysis {
        Some(analysis) => {
            lines.push(Line::from(vec![
                Span::styled(
                    "AI ",
                    Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    analysis.sentiment.as_deref().unwrap_or("UNKNOWN"),
                    Style::default().fg(Color::Magenta),
                ),
                Span::styled(
                    if analysis.tags.is_empty() {
                        String::new()
                    } else {
                        format!("  [{}]", analysis.tags.join(", "))
                    },
                    label,
                ),
            ]));
            lines.push(Line::from(Span::raw(
                analysis
                    .summary
                    .as_deref()
                    .unwrap_or("Updating...")
                    .to_string(),
            )));
        }
        None => lines.push(Line::from(Span::styled("AI analysis pending", label))),
    }

    let detail = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue))
                .title(format!(" [{}] {} ", ticket.code(), ticket.subject())),
        )
        .wrap(Wrap { trim: true });
    f.render_widget(detail, area);
}

/// One chat bubble: author line plus wrapped content, aligned by side
fn push_message(
    lines: &mut Vec<Line<'static>>,
    author: &str,
    when: Option<&str>,
    content: &str,
    staff: bool,
    width: usize,
) {
    let alignment = if staff {
        Alignment::Right
    } else {
        Alignment::Left
    };
    let color = if staff { Color::Cyan } else { Color::White };

    lines.push(
        Line::from(vec![
            Span::styled(
                author.to_string(),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  {}", display::clock(when)),
                Style::default().fg(Color::Gray),
            ),
        ])
        .alignment(alignment),
    );
    for row in textwrap::wrap(content, width.max(10)) {
        lines.push(
            Line::from(Span::styled(row.into_owned(), Style::default().fg(color)))
                .alignment(alignment),
        );
    }
    lines.push(Line::from(""));
}

fn draw_conversation(f: &mut Frame, area: Rect, state: &InboxState, ticket: &Ticket) {
    let inner_width = area.width.saturating_sub(2) as usize;
    let bubble_width = inner_width * 7 / 10;
    let mut lines = Vec::new();

    if let Some(description) = ticket.description.as_deref().filter(|d| !d.is_empty()) {
        push_message(
            &mut lines,
            ticket.contact_name(),
            ticket.created_at.as_deref(),
            description,
            false,
            bubble_width,
        );
    }
    for comment in &state.comments {
        push_message(
            &mut lines,
            comment.author_name(),
            comment.created_at.as_deref(),
            &comment.content,
            comment.is_from_staff(),
            bubble_width,
        );
    }

    // Stick to the newest message
    let height = area.height.saturating_sub(2) as usize;
    let scroll = lines.len().saturating_sub(height) as u16;

    let conversation = Paragraph::new(lines).scroll((scroll, 0)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue))
            .title(format!(" Conversation ({}) ", state.comments.len())),
    );
    f.render_widget(conversation, area);
}

fn draw_reply(f: &mut Frame, area: Rect, state: &InboxState) {
    let active = state.mode == InputMode::Reply;
    let (text, style) = if state.sending_reply {
        ("Sending...".to_string(), Style::default().fg(Color::Gray))
    } else if state.draft.is_empty() && !active {
        (
            "Press r to reply to the customer".to_string(),
            Style::default().fg(Color::DarkGray),
        )
    } else if active {
        (format!("{}█", state.draft), Style::default())
    } else {
        (state.draft.clone(), Style::default())
    };

    let border = if active { Color::Green } else { Color::Gray };
    let reply = Paragraph::new(text)
        .style(style)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border))
                .title(" Reply "),
        );
    f.render_widget(reply, area);
}

fn key_hint(key: &'static str, label: &'static str) -> [Span<'static>; 2] {
    [
        Span::styled(key, Style::default().fg(Color::Black).bg(Color::Gray)),
        Span::raw(label),
    ]
}

/// Footer: the current notice if any, otherwise key hints for the mode
fn draw_footer(f: &mut Frame, area: Rect, state: &InboxState) {
    let line = if let Some(notice) = state.notice() {
        let color = match notice.level {
            NoticeLevel::Success => Color::Green,
            NoticeLevel::Info => Color::Cyan,
            NoticeLevel::Error => Color::Red,
        };
        Line::from(Span::styled(
            format!(" {}", notice),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ))
    } else {
        match state.mode {
            InputMode::Search => Line::from(vec![
                Span::styled(" Search: ", Style::default().fg(Color::Yellow)),
                Span::raw(format!("{}█", state.filter)),
                Span::styled("   Enter keep  Esc clear", Style::default().fg(Color::Gray)),
            ]),
            InputMode::Reply => Line::from(
                [
                    key_hint(" Enter ", " Send  "),
                    key_hint(" Shift+Enter ", " New line  "),
                    key_hint(" Esc ", " Back  "),
                ]
                .concat(),
            ),
            InputMode::Browse => Line::from(
                [
                    key_hint(" q/Esc ", " Quit  "),
                    key_hint(" ↑↓/jk ", " Move  "),
                    key_hint(" Enter ", " Open  "),
                    key_hint(" r ", " Reply  "),
                    key_hint(" / ", " Search  "),
                    key_hint(" R ", " Reload  "),
                    key_hint(" d ", " Dismiss alert  "),
                ]
                .concat(),
            ),
        }
    };

    let footer = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Gray)),
    );
    f.render_widget(footer, area);
}
