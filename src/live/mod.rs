//! Live update channel: a supervised, endlessly reconnecting subscription to
//! the "new record" topic.
//!
//! The loop never decodes records itself. It reports connection state changes
//! and forwards raw message bodies to the event loop, which owns the store.
//! A dropped connection is retried after a fixed delay (no backoff), and the
//! loop only ends once the event receiver is gone.

pub mod stomp;
pub mod ws;

use crate::events::AppEvent;
use async_trait::async_trait;
use color_eyre::eyre::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time;

pub const NEW_RECORD_TOPIC: &str = "/topic/new-test-run";
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ChannelState {
    pub fn label(self) -> &'static str {
        match self {
            ChannelState::Disconnected => "offline",
            ChannelState::Connecting => "connecting",
            ChannelState::Connected => "live",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Connecting,
    /// Handshake done and subscription open.
    Connected,
    Disconnected {
        reason: String,
    },
    /// Raw body of one pushed message.
    Message(String),
}

#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn PushSession>>;
}

#[async_trait]
pub trait PushSession: Send {
    async fn subscribe(&mut self, topic: &str) -> Result<()>;
    /// `None` once the server has closed the connection.
    async fn next_message(&mut self) -> Option<Result<String>>;
    async fn close(&mut self) {}
}

pub struct LiveChannel {
    transport: Arc<dyn PushTransport>,
    tx: mpsc::UnboundedSender<AppEvent>,
    reconnect_delay: Duration,
}

enum SessionOutcome {
    Dropped(String),
    ChannelClosed,
}

impl LiveChannel {
    pub fn new(
        transport: Arc<dyn PushTransport>,
        tx: mpsc::UnboundedSender<AppEvent>,
        reconnect_delay: Duration,
    ) -> Self {
        Self {
            transport,
            tx,
            reconnect_delay,
        }
    }

    pub async fn run(self) {
        loop {
            match self.session_once().await {
                SessionOutcome::Dropped(reason) => {
                    tracing::warn!(%reason, "push channel dropped");
                    if !self.emit(ChannelEvent::Disconnected { reason }) {
                        return;
                    }
                }
                SessionOutcome::ChannelClosed => return,
            }
            tokio::select! {
                () = time::sleep(self.reconnect_delay) => {},
                () = self.tx.closed() => return,
            }
        }
    }

    /// One connect / subscribe / forward cycle.
    async fn session_once(&self) -> SessionOutcome {
        if !self.emit(ChannelEvent::Connecting) {
            return SessionOutcome::ChannelClosed;
        }
        let mut session = match self.transport.connect().await {
            Ok(session) => session,
            Err(e) => return SessionOutcome::Dropped(format!("{e}")),
        };
        if let Err(e) = session.subscribe(NEW_RECORD_TOPIC).await {
            session.close().await;
            return SessionOutcome::Dropped(format!("{e}"));
        }
        tracing::info!(topic = NEW_RECORD_TOPIC, "push channel connected");
        if !self.emit(ChannelEvent::Connected) {
            session.close().await;
            return SessionOutcome::ChannelClosed;
        }

        loop {
            let next = tokio::select! {
                next = session.next_message() => next,
                () = self.tx.closed() => {
                    session.close().await;
                    return SessionOutcome::ChannelClosed;
                }
            };
            match next {
                Some(Ok(body)) => {
                    if !self.emit(ChannelEvent::Message(body)) {
                        session.close().await;
                        return SessionOutcome::ChannelClosed;
                    }
                }
                Some(Err(e)) => {
                    session.close().await;
                    return SessionOutcome::Dropped(format!("{e}"));
                }
                None => return SessionOutcome::Dropped("connection closed by server".to_string()),
            }
        }
    }

    fn emit(&self, event: ChannelEvent) -> bool {
        self.tx.send(AppEvent::Channel(event)).is_ok()
    }
}
