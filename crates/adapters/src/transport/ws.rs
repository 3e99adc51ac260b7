// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket transport.

use async_trait::async_trait;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::{Transport, TransportError, TransportEvent, TransportMode};
use tf_wire::{AgentMessage, ServerMessage};

type Sink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

struct Link {
    sink: Sink,
    reader: JoinHandle<()>,
}

/// Persistent WebSocket link. Assignments are pushed by the server.
pub struct WsTransport {
    url: String,
    link: tokio::sync::Mutex<Option<Link>>,
}

impl WsTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), link: tokio::sync::Mutex::new(None) }
    }

    async fn drop_link(link: Option<Link>) {
        if let Some(mut link) = link {
            link.reader.abort();
            let frame = CloseFrame { code: CloseCode::Normal, reason: "".into() };
            let _ = link.sink.send(Message::Close(Some(frame))).await;
        }
    }
}

fn encode(message: &AgentMessage) -> Result<Message, TransportError> {
    let text = serde_json::to_string(message).map_err(|e| TransportError::Send(e.to_string()))?;
    Ok(Message::Text(text.into()))
}

/// Forward inbound frames until the socket ends.
async fn read_loop(
    mut read: futures_util::stream::SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>,
    events: mpsc::Sender<TransportEvent>,
) {
    let clean = loop {
        match read.next().await {
            Some(Ok(Message::Text(text))) => match ServerMessage::parse(text.as_str()) {
                Ok(msg) => {
                    if events.send(TransportEvent::Message(msg)).await.is_err() {
                        return;
                    }
                }
                Err(e) => tracing::warn!(error = %e, "ws: ignoring server message"),
            },
            Some(Ok(Message::Close(frame))) => {
                tracing::info!(?frame, "ws: received close frame");
                break frame.map(|f| f.code == CloseCode::Normal).unwrap_or(false);
            }
            Some(Err(e)) => {
                tracing::warn!(error = %e, "ws: read error");
                break false;
            }
            None => {
                tracing::info!("ws: stream ended");
                break false;
            }
            // Ping/Pong/Binary
            _ => {}
        }
    };
    let _ = events.send(TransportEvent::Closed { clean }).await;
}

#[async_trait]
impl Transport for WsTransport {
    fn mode(&self) -> TransportMode {
        TransportMode::Persistent
    }

    async fn connect(
        &self,
        register: &AgentMessage,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<(), TransportError> {
        let mut guard = self.link.lock().await;
        Self::drop_link(guard.take()).await;

        let (stream, _) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        let (mut sink, read) = stream.split();
        sink.send(encode(register)?).await.map_err(|e| TransportError::Send(e.to_string()))?;

        let reader = tokio::spawn(read_loop(read, events));
        *guard = Some(Link { sink, reader });
        tracing::info!(url = %self.url, "ws: connected");
        Ok(())
    }

    async fn send(&self, message: &AgentMessage) -> Result<(), TransportError> {
        let mut guard = self.link.lock().await;
        let link = guard.as_mut().ok_or(TransportError::NotConnected)?;
        link.sink.send(encode(message)?).await.map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn close(&self) {
        let link = self.link.lock().await.take();
        Self::drop_link(link).await;
    }
}
