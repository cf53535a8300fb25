//! Mock ticketing backend for integration tests
//!
//! One axum app on an ephemeral port serves the REST endpoints and a STOMP
//! broker on `/ws/websocket`. Tests seed and inspect it through `state`.

#![allow(dead_code)]

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use helpdesk_common::HelpdeskConfig;
use helpdeskctl::push::stomp::{self, Frame, Inbound};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
pub struct Backend {
    /// Identity returned by `/api/auth/me`; `None` answers 401
    pub identity: Option<Value>,
    /// Forced status for `/api/auth/me`
    pub me_status: Option<u16>,
    /// When set, `/api/auth/me` only succeeds with this exact Cookie header
    pub required_cookie: Option<String>,
    pub tickets: Vec<Value>,
    pub comments: HashMap<i64, Vec<Value>>,
    pub replies: Vec<(i64, Value)>,
    pub created: usize,

    /// MESSAGE frames sent once both topics are subscribed
    pub broker_script: Vec<Frame>,
    /// Number of first connections closed right after CONNECTED
    pub drop_connections: usize,
    pub connections: usize,
    /// Every frame the broker received, in order
    pub broker_frames: Vec<Frame>,
}

pub type Shared = Arc<Mutex<Backend>>;

pub struct MockServer {
    pub url: String,
    pub state: Shared,
}

impl MockServer {
    pub async fn start(backend: Backend) -> Self {
        let state = Arc::new(Mutex::new(backend));
        let app = Router::new()
            .route("/api/auth/me", get(me))
            .route("/api/public/tickets", get(list_tickets).post(create_ticket))
            .route("/api/public/tickets/:code", get(ticket_by_code))
            .route("/api/agent/tickets/:id", get(ticket_detail))
            .route("/api/agent/tickets/:id/comments", get(ticket_comments))
            .route("/api/agent/tickets/:id/reply", post(reply))
            .route("/ws/websocket", get(broker))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{}", addr),
            state,
        }
    }

    /// Client configuration pointing at this server, with short timers
    pub fn config(&self, state_dir: &std::path::Path) -> HelpdeskConfig {
        HelpdeskConfig {
            backend_url: self.url.clone(),
            request_timeout_secs: 5,
            reconnect_delay_ms: 100,
            highlight_ms: 300,
            alert_sound: false,
            state_dir: Some(state_dir.to_path_buf()),
            ..HelpdeskConfig::default()
        }
    }

    pub fn broker_commands(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .broker_frames
            .iter()
            .map(|f| f.command.clone())
            .collect()
    }

    /// Poll until `check` holds, failing after two seconds
    pub async fn wait_for(&self, what: &str, check: impl Fn(&Backend) -> bool) {
        for _ in 0..200 {
            if check(&self.state.lock().unwrap()) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("timed out waiting for {}", what);
    }
}

pub fn ticket_json(id: i64, code: &str, subject: &str, status: &str) -> Value {
    json!({
        "id": id,
        "ticketCode": code,
        "subject": subject,
        "description": format!("Details for {}", subject),
        "priority": "MEDIUM",
        "status": status,
        "guestName": "Tran Thi B",
        "guestEmail": "b@example.com",
        "guestPhone": "0987000000",
        "customer": null,
        "createdAt": "2026-10-16T08:15:00",
        "aiAnalysis": {
            "sentiment": "NEUTRAL",
            "summary": "Customer asks about a transfer",
            "tags": "[\"TRANSFER\"]"
        }
    })
}

pub fn update_frame(body: Value) -> Frame {
    Frame::new("MESSAGE")
        .header("subscription", "sub-0")
        .header("destination", "/topic/admin/updates")
        .header("message-id", "msg-update")
        .header("content-type", "application/json")
        .body(body.to_string())
}

pub fn alert_frame(body: Value) -> Frame {
    Frame::new("MESSAGE")
        .header("subscription", "sub-1")
        .header("destination", "/topic/admin/alerts")
        .header("message-id", "msg-alert")
        .header("content-type", "application/json")
        .body(body.to_string())
}

// ---- REST ----

async fn me(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let backend = state.lock().unwrap();
    if let Some(status) = backend.me_status {
        return StatusCode::from_u16(status).unwrap().into_response();
    }
    if let Some(required) = &backend.required_cookie {
        let cookie = headers.get("cookie").and_then(|v| v.to_str().ok());
        if cookie != Some(required.as_str()) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
    }
    match &backend.identity {
        Some(identity) => Json(identity.clone()).into_response(),
        None => StatusCode::UNAUTHORIZED.into_response(),
    }
}

async fn list_tickets(State(state): State<Shared>) -> Json<Value> {
    Json(Value::Array(state.lock().unwrap().tickets.clone()))
}

async fn create_ticket(State(state): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let mut backend = state.lock().unwrap();
    backend.created += 1;
    let id = 100 + backend.created as i64;
    let ticket = json!({
        "id": id,
        "ticketCode": format!("SBSC-{:04}", backend.created),
        "subject": body["subject"],
        "description": body["description"],
        "guestName": body["guestName"],
        "guestEmail": body["guestEmail"],
        "guestPhone": body["guestPhone"],
        "status": "OPEN",
        "priority": null,
        "createdAt": "2026-10-16T09:00:00",
        "aiAnalysis": null
    });
    backend.tickets.insert(0, ticket.clone());
    Json(ticket)
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"status": 404, "message": "Ticket not found"})),
    )
        .into_response()
}

async fn ticket_by_code(State(state): State<Shared>, Path(code): Path<String>) -> Response {
    let backend = state.lock().unwrap();
    match backend.tickets.iter().find(|t| t["ticketCode"] == code.as_str()) {
        Some(ticket) => Json(ticket.clone()).into_response(),
        None => not_found(),
    }
}

async fn ticket_detail(State(state): State<Shared>, Path(id): Path<i64>) -> Response {
    let backend = state.lock().unwrap();
    match backend.tickets.iter().find(|t| t["id"] == id) {
        Some(ticket) => Json(ticket.clone()).into_response(),
        None => not_found(),
    }
}

async fn ticket_comments(State(state): State<Shared>, Path(id): Path<i64>) -> Json<Value> {
    let backend = state.lock().unwrap();
    Json(Value::Array(
        backend.comments.get(&id).cloned().unwrap_or_default(),
    ))
}

async fn reply(
    State(state): State<Shared>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    let mut backend = state.lock().unwrap();
    let Some(ticket) = backend.tickets.iter_mut().find(|t| t["id"] == id) else {
        return not_found();
    };
    ticket["status"] = body["status"].clone();

    let comments = backend.comments.entry(id).or_default();
    let comment = json!({
        "id": comments.len() + 1,
        "ticketId": id,
        "content": body["content"],
        "isInternal": body["isInternal"],
        "createdAt": "2026-10-16T09:30:00",
        "user": {"fullName": "Agent Smith", "role": {"name": "INTERNAL_AGENT"}}
    });
    comments.push(comment.clone());
    backend.replies.push((id, body));
    Json(comment).into_response()
}

// ---- STOMP broker ----

async fn broker(ws: WebSocketUpgrade, State(state): State<Shared>) -> Response {
    ws.on_upgrade(move |socket| serve_socket(socket, state))
}

async fn serve_socket(mut socket: WebSocket, state: Shared) {
    let (script, close_after_connect) = {
        let mut backend = state.lock().unwrap();
        backend.connections += 1;
        (
            backend.broker_script.clone(),
            backend.connections <= backend.drop_connections,
        )
    };

    let mut subscribed = 0;
    while let Some(Ok(message)) = socket.recv().await {
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        let frames: Vec<Frame> = stomp::decode(&text)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|item| match item {
                Inbound::Frame(frame) => Some(frame),
                Inbound::Heartbeat => None,
            })
            .collect();

        for frame in frames {
            state.lock().unwrap().broker_frames.push(frame.clone());
            match frame.command.as_str() {
                "CONNECT" | "STOMP" => {
                    let connected = Frame::new("CONNECTED")
                        .header("version", "1.2")
                        .header("heart-beat", "0,0");
                    if socket.send(Message::Text(connected.encode())).await.is_err() {
                        return;
                    }
                    if close_after_connect {
                        let _ = socket.send(Message::Close(None)).await;
                        return;
                    }
                }
                "SUBSCRIBE" => {
                    subscribed += 1;
                    if subscribed == 2 {
                        for frame in &script {
                            if socket.send(Message::Text(frame.encode())).await.is_err() {
                                return;
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }
}
