//! WebSocket [`Transport`] over `tokio-tungstenite`.
//!
//! `connect` spawns a single connection task. The task reports
//! [`TransportEvent`]s on the channel given at construction and owns the
//! socket; `send` hands frames to it through an unbounded writer channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use topolive_core::{Transport, TransportError, TransportEvent};

type Writer = mpsc::UnboundedSender<Value>;

pub struct WsTransport {
    url: String,
    events: mpsc::UnboundedSender<TransportEvent>,
    /// Set while a connection attempt is in flight or the socket is open.
    active: Arc<AtomicBool>,
    writer: Arc<Mutex<Option<Writer>>>,
}

impl WsTransport {
    pub fn new(url: impl Into<String>, events: mpsc::UnboundedSender<TransportEvent>) -> Self {
        Self {
            url: url.into(),
            events,
            active: Arc::new(AtomicBool::new(false)),
            writer: Arc::new(Mutex::new(None)),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl Transport for WsTransport {
    fn connect(&self) {
        if self.active.swap(true, Ordering::AcqRel) {
            tracing::debug!(url = %self.url, "connect already in progress");
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::error!("websocket connect requires a tokio runtime");
            self.active.store(false, Ordering::Release);
            return;
        };
        let _ = runtime.spawn(connection_loop(
            self.url.clone(),
            self.events.clone(),
            Arc::clone(&self.active),
            Arc::clone(&self.writer),
        ));
    }

    fn send(&self, frame: Value) -> Result<(), TransportError> {
        let writer = self.writer.lock();
        let Some(tx) = writer.as_ref() else {
            return Err(TransportError::NotConnected);
        };
        tx.send(frame).map_err(|_| TransportError::Closed)
    }
}

async fn connection_loop(
    url: String,
    events: mpsc::UnboundedSender<TransportEvent>,
    active: Arc<AtomicBool>,
    writer: Arc<Mutex<Option<Writer>>>,
) {
    tracing::debug!(%url, "connecting websocket");
    let ws = match connect_async(url.as_str()).await {
        Ok((ws, _)) => ws,
        Err(e) => {
            tracing::warn!(%url, error = %e, "websocket connect failed");
            active.store(false, Ordering::Release);
            let _ = events.send(TransportEvent::Error(e.to_string()));
            return;
        }
    };

    let (mut ws_tx, mut ws_rx) = ws.split();
    let (frame_tx, mut frame_rx) = mpsc::unbounded_channel::<Value>();
    *writer.lock() = Some(frame_tx);
    let _ = events.send(TransportEvent::Connected);

    loop {
        tokio::select! {
            frame = frame_rx.recv() => {
                let Some(frame) = frame else { break };
                if let Err(e) = ws_tx.send(Message::Text(frame.to_string().into())).await {
                    let _ = events.send(TransportEvent::Error(e.to_string()));
                    break;
                }
            }
            msg = ws_rx.next() => match msg {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<Value>(&text) {
                    Ok(value) => {
                        let _ = events.send(TransportEvent::Message(value));
                    }
                    Err(e) => tracing::debug!(error = %e, "dropping non-JSON frame"),
                },
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    let _ = events.send(TransportEvent::Error(e.to_string()));
                    break;
                }
            }
        }
    }

    *writer.lock() = None;
    active.store(false, Ordering::Release);
    tracing::debug!(%url, "websocket closed");
    let _ = events.send(TransportEvent::Disconnected);
}
