//! STOMP over a raw WebSocket, the transport the reporting service exposes at
//! `/ws/websocket`.

use super::stomp::{self, Frame};
use super::{PushSession, PushTransport};
use async_trait::async_trait;
use color_eyre::eyre::{eyre, Result};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct StompTransport {
    endpoint: Url,
    host: String,
    handshake_timeout: Duration,
}

impl StompTransport {
    /// Derives the push endpoint from the HTTP base URL of the service.
    pub fn from_server(server: &Url) -> Result<Self> {
        let scheme = match server.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => return Err(eyre!("Unsupported scheme for push channel: {other}")),
        };
        let mut endpoint = server.clone();
        endpoint
            .set_scheme(scheme)
            .map_err(|()| eyre!("Cannot derive WebSocket URL from {server}"))?;
        endpoint
            .path_segments_mut()
            .map_err(|()| eyre!("{server} cannot be a base URL"))?
            .pop_if_empty()
            .extend(["ws", "websocket"]);
        endpoint.set_query(None);
        let host = server.host_str().unwrap_or("localhost").to_string();
        Ok(Self {
            endpoint,
            host,
            handshake_timeout: HANDSHAKE_TIMEOUT,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn handshake(&self) -> Result<Socket> {
        let (mut socket, _) = connect_async(self.endpoint.as_str())
            .await
            .map_err(|e| eyre!("WebSocket connect to {} failed: {e}", self.endpoint))?;
        socket
            .send(Message::Text(Frame::connect(&self.host).encode()))
            .await
            .map_err(|e| eyre!("Failed to send STOMP CONNECT: {e}"))?;
        loop {
            match read_frame(&mut socket).await? {
                Some(frame) if frame.command == "CONNECTED" => return Ok(socket),
                Some(frame) if frame.command == "ERROR" => {
                    return Err(eyre!(
                        "STOMP handshake rejected: {}",
                        frame.get("message").unwrap_or("no reason given")
                    ));
                }
                Some(frame) => {
                    tracing::debug!(command = %frame.command, "ignoring frame before CONNECTED");
                }
                None => return Err(eyre!("Connection closed during STOMP handshake")),
            }
        }
    }
}

#[async_trait]
impl PushTransport for StompTransport {
    async fn connect(&self) -> Result<Box<dyn PushSession>> {
        tracing::debug!(endpoint = %self.endpoint, "connecting push channel");
        let socket = time::timeout(self.handshake_timeout, self.handshake())
            .await
            .map_err(|_| {
                eyre!(
                    "Push channel handshake timed out after {}s",
                    self.handshake_timeout.as_secs()
                )
            })??;
        Ok(Box::new(StompSession {
            socket,
            next_subscription: 0,
        }))
    }
}

pub struct StompSession {
    socket: Socket,
    next_subscription: u32,
}

#[async_trait]
impl PushSession for StompSession {
    async fn subscribe(&mut self, topic: &str) -> Result<()> {
        let id = format!("sub-{}", self.next_subscription);
        self.next_subscription += 1;
        self.socket
            .send(Message::Text(Frame::subscribe(&id, topic).encode()))
            .await
            .map_err(|e| eyre!("Failed to subscribe to {topic}: {e}"))
    }

    async fn next_message(&mut self) -> Option<Result<String>> {
        loop {
            match read_frame(&mut self.socket).await {
                Ok(Some(frame)) if frame.command == "MESSAGE" => return Some(Ok(frame.body)),
                Ok(Some(frame)) if frame.command == "ERROR" => {
                    return Some(Err(eyre!(
                        "Server error: {}",
                        frame.get("message").unwrap_or("unknown")
                    )));
                }
                Ok(Some(_)) => {}
                Ok(None) => return None,
                Err(e) => return Some(Err(e)),
            }
        }
    }

    async fn close(&mut self) {
        let _ = self
            .socket
            .send(Message::Text(Frame::disconnect().encode()))
            .await;
        let _ = self.socket.close(None).await;
    }
}

/// Next STOMP frame from the socket, skipping heart-beats and control
/// messages. `Ok(None)` means the peer closed the connection.
async fn read_frame(socket: &mut Socket) -> Result<Option<Frame>> {
    loop {
        let text = match socket.next().await {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Binary(bytes))) => String::from_utf8(bytes)
                .map_err(|e| eyre!("Non UTF-8 STOMP frame: {e}"))?,
            Some(Ok(Message::Close(_))) | None => return Ok(None),
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(eyre!("WebSocket error: {e}")),
        };
        if let Some(frame) = stomp::decode(&text)? {
            return Ok(Some(frame));
        }
    }
}
