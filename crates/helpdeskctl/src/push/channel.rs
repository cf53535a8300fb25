//! Connection loop: connect, subscribe, pump frames, reconnect on drop
//!
//! `activate` spawns the loop and returns a handle. Dropping or deactivating
//! the handle unsubscribes both topics, sends DISCONNECT and closes the socket.

use anyhow::{anyhow, bail, Context, Result};
use futures::{Sink, SinkExt, Stream, StreamExt};
use helpdesk_common::{CriticalAlert, HelpdeskConfig, TicketUpdate};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, timeout, Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::COOKIE;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use super::stomp::{self, Frame, Inbound};
use super::{PushEvent, Topic};

/// Push connection settings
#[derive(Debug, Clone)]
pub struct PushConfig {
    pub url: String,
    /// Heart-beat offer `(outgoing, incoming)` in ms
    pub heartbeat: (u64, u64),
    pub reconnect_delay: Duration,
    pub connect_timeout: Duration,
    pub session_cookie: Option<String>,
}

impl PushConfig {
    pub fn from_config(config: &HelpdeskConfig) -> Self {
        Self {
            url: config.effective_push_url(),
            heartbeat: (config.heartbeat_outgoing_ms, config.heartbeat_incoming_ms),
            reconnect_delay: config.reconnect_delay(),
            connect_timeout: config.request_timeout(),
            session_cookie: config.session_cookie.clone(),
        }
    }
}

/// Owner's handle on a running push channel
pub struct PushHandle {
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl PushHandle {
    /// Tear down and wait briefly for the goodbye frames to go out
    pub async fn deactivate(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            let abort = task.abort_handle();
            if timeout(Duration::from_secs(2), task).await.is_err() {
                tracing::warn!("Push channel did not stop in time, aborting");
                abort.abort();
            }
        }
    }
}

impl Drop for PushHandle {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

/// Start the connection loop; events go to `events` in arrival order
pub fn activate(config: PushConfig, events: mpsc::UnboundedSender<PushEvent>) -> PushHandle {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(run(config, events, shutdown_rx));
    PushHandle {
        shutdown: shutdown_tx,
        task: Some(task),
    }
}

enum SessionEnd {
    Shutdown,
    Dropped(String),
}

async fn run(
    config: PushConfig,
    events: mpsc::UnboundedSender<PushEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        if *shutdown.borrow() {
            break;
        }

        let mut connected = false;
        match run_session(&config, &events, &mut shutdown, &mut connected).await {
            Ok(SessionEnd::Shutdown) => break,
            Ok(SessionEnd::Dropped(reason)) => {
                tracing::warn!("Push connection dropped: {}", reason)
            }
            Err(e) => tracing::warn!("Push connection failed: {:#}", e),
        }

        if connected && events.send(PushEvent::Disconnected).is_err() {
            break;
        }
        if events.is_closed() {
            break;
        }

        tracing::debug!("Reconnecting in {:?}", config.reconnect_delay);
        tokio::select! {
            _ = sleep(config.reconnect_delay) => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    tracing::debug!("Push channel stopped");
}

async fn run_session(
    config: &PushConfig,
    events: &mpsc::UnboundedSender<PushEvent>,
    shutdown: &mut watch::Receiver<bool>,
    connected: &mut bool,
) -> Result<SessionEnd> {
    let mut request = config
        .url
        .as_str()
        .into_client_request()
        .with_context(|| format!("Invalid push URL {}", config.url))?;
    if let Some(cookie) = &config.session_cookie {
        request
            .headers_mut()
            .insert(COOKIE, HeaderValue::from_str(cookie)?);
    }
    let host = request.uri().host().unwrap_or("localhost").to_string();

    tracing::debug!("Connecting to push channel {}", config.url);
    let (ws, _) = timeout(config.connect_timeout, tokio_tungstenite::connect_async(request))
        .await
        .map_err(|_| anyhow!("Connection timeout"))??;
    let (mut sink, mut stream) = ws.split();

    send_frame(&mut sink, &Frame::connect(&host, config.heartbeat)).await?;
    let connected_frame = timeout(config.connect_timeout, await_connected(&mut stream))
        .await
        .map_err(|_| anyhow!("No CONNECTED frame from broker"))??;
    let heartbeat = stomp::negotiate_heartbeat(config.heartbeat, connected_frame.get("heart-beat"));

    *connected = true;
    tracing::info!("Connected to push channel {}", config.url);
    if events.send(PushEvent::Connected).is_err() {
        return teardown(&mut sink).await;
    }

    for topic in Topic::ALL {
        send_frame(
            &mut sink,
            &Frame::subscribe(topic.subscription_id(), topic.destination()),
        )
        .await?;
    }

    let mut last_inbound = Instant::now();
    let idle = Duration::from_secs(3600);
    let outgoing_every = heartbeat.outgoing.unwrap_or(idle);
    let mut outgoing = interval_at(Instant::now() + outgoing_every, outgoing_every);
    outgoing.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let watchdog_every = heartbeat.incoming.unwrap_or(idle);
    let mut watchdog = interval_at(Instant::now() + watchdog_every, watchdog_every);
    let silence_limit = heartbeat.incoming.map(|d| d * 2);

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    return teardown(&mut sink).await;
                }
            }
            inbound = stream.next() => {
                let text = match inbound {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Binary(bytes))) => String::from_utf8_lossy(&bytes).into_owned(),
                    Some(Ok(Message::Close(frame))) => {
                        return Ok(SessionEnd::Dropped(format!("closed by server ({:?})", frame)));
                    }
                    Some(Ok(_)) => {
                        last_inbound = Instant::now();
                        continue;
                    }
                    Some(Err(e)) => return Err(e.into()),
                    None => return Ok(SessionEnd::Dropped("stream ended".to_string())),
                };
                last_inbound = Instant::now();

                match handle_text(&text, events) {
                    Flow::Continue => {}
                    Flow::BrokerError(message) => return Ok(SessionEnd::Dropped(message)),
                    Flow::OwnerGone => return teardown(&mut sink).await,
                }
            }
            _ = outgoing.tick(), if heartbeat.outgoing.is_some() => {
                sink.send(Message::Text("\n".to_string())).await?;
            }
            _ = watchdog.tick(), if silence_limit.is_some() => {
                if let Some(limit) = silence_limit {
                    if last_inbound.elapsed() > limit {
                        return Ok(SessionEnd::Dropped("heart-beat timeout".to_string()));
                    }
                }
            }
        }
    }
}

enum Flow {
    Continue,
    BrokerError(String),
    OwnerGone,
}

fn handle_text(text: &str, events: &mpsc::UnboundedSender<PushEvent>) -> Flow {
    let inbound = match stomp::decode(text) {
        Ok(inbound) => inbound,
        Err(e) => {
            tracing::warn!("Dropping undecodable push message: {}", e);
            return Flow::Continue;
        }
    };

    for item in inbound {
        let Inbound::Frame(frame) = item else {
            continue;
        };
        match frame.command.as_str() {
            "MESSAGE" => {
                if let Some(event) = message_event(&frame) {
                    if events.send(event).is_err() {
                        return Flow::OwnerGone;
                    }
                }
            }
            "ERROR" => {
                let message = frame.get("message").unwrap_or("unknown error").to_string();
                tracing::error!("STOMP error: {}", message);
                return Flow::BrokerError(message);
            }
            "RECEIPT" => {}
            other => tracing::debug!("Ignoring {} frame", other),
        }
    }
    Flow::Continue
}

/// Decode a MESSAGE frame into the matching event; bad bodies are dropped
pub(crate) fn message_event(frame: &Frame) -> Option<PushEvent> {
    let topic = Topic::for_message(frame.get("subscription"), frame.get("destination"));
    let event = match topic {
        Some(Topic::Updates) => serde_json::from_str::<TicketUpdate>(&frame.body)
            .map(PushEvent::TicketUpdated),
        Some(Topic::Alerts) => serde_json::from_str::<CriticalAlert>(&frame.body)
            .map(PushEvent::CriticalAlert),
        None => {
            tracing::debug!(
                "Message for unknown destination {:?}",
                frame.get("destination")
            );
            return None;
        }
    };

    match event {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::warn!("Dropping malformed push payload: {}", e);
            None
        }
    }
}

async fn await_connected<S>(stream: &mut S) -> Result<Frame>
where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
{
    while let Some(message) = stream.next().await {
        let text = match message? {
            Message::Text(text) => text,
            Message::Binary(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Message::Close(frame) => bail!("Broker closed the socket ({:?})", frame),
            _ => continue,
        };
        for item in stomp::decode(&text)? {
            let Inbound::Frame(frame) = item else {
                continue;
            };
            match frame.command.as_str() {
                "CONNECTED" => return Ok(frame),
                "ERROR" => bail!(
                    "Broker refused connection: {}",
                    frame.get("message").unwrap_or("unknown error")
                ),
                _ => {}
            }
        }
    }
    bail!("Socket closed before CONNECTED")
}

async fn send_frame<S>(sink: &mut S, frame: &Frame) -> Result<()>
where
    S: Sink<Message, Error = WsError> + Unpin,
{
    sink.send(Message::Text(frame.encode())).await?;
    Ok(())
}

/// Release both subscriptions and the connection; errors are irrelevant now
async fn teardown<S>(sink: &mut S) -> Result<SessionEnd>
where
    S: Sink<Message, Error = WsError> + Unpin,
{
    for topic in Topic::ALL {
        let _ = send_frame(sink, &Frame::unsubscribe(topic.subscription_id())).await;
    }
    let _ = send_frame(sink, &Frame::disconnect()).await;
    let _ = sink.close().await;
    tracing::info!("Push channel disconnected");
    Ok(SessionEnd::Shutdown)
}
