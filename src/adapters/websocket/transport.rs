//! WebSocket implementation of the [`Transport`] port.
//!
//! Each successful `connect` spawns a pump task that owns the socket:
//! 1. Frames queued on the link's sender are written as text messages
//! 2. Text and binary messages are forwarded as [`TransportEvent::Message`]
//! 3. Protocol pings are answered in place
//! 4. The first close, error or end of stream is reported once, then the task exits
//!
//! Dropping the link closes its sender; the pump then sends a close frame
//! and exits.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace};

use crate::ports::{Transport, TransportError, TransportEvent, TransportLink};

/// Opens real WebSocket connections with `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn connect(&self, url: &str) -> Result<TransportLink, TransportError> {
        let (socket, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| TransportError::connect_failed(url, e))?;

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        tokio::spawn(pump(socket, url.to_string(), outbound_rx, events_tx));

        Ok(TransportLink::new(outbound_tx, events_rx))
    }
}

async fn pump<S>(
    socket: S,
    url: String,
    mut outbound: mpsc::UnboundedReceiver<Vec<u8>>,
    events: mpsc::UnboundedSender<TransportEvent>,
) where
    S: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
        + futures::Sink<Message, Error = tokio_tungstenite::tungstenite::Error>
        + Unpin,
{
    let (mut write, mut read) = socket.split();

    let terminal = loop {
        tokio::select! {
            frame = outbound.recv() => match frame {
                Some(frame) => {
                    let text = String::from_utf8_lossy(&frame).into_owned();
                    if let Err(e) = write.send(Message::Text(text.into())).await {
                        break TransportEvent::Error(e.to_string());
                    }
                }
                None => {
                    debug!(url = %url, "link dropped, closing WebSocket");
                    let _ = write.send(Message::Close(None)).await;
                    return;
                }
            },
            message = read.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    trace!(url = %url, bytes = text.len(), "text frame received");
                    let _ = events.send(TransportEvent::Message(text.as_str().as_bytes().to_vec()));
                }
                Some(Ok(Message::Binary(data))) => {
                    let _ = events.send(TransportEvent::Message(data.to_vec()));
                }
                Some(Ok(Message::Ping(data))) => {
                    let _ = write.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(frame))) => {
                    break TransportEvent::Closed(frame.map(|f| u16::from(f.code)));
                }
                Some(Ok(_)) => {} // Pong, raw frames
                Some(Err(e)) => break TransportEvent::Error(e.to_string()),
                None => break TransportEvent::Closed(None),
            },
        }
    };

    debug!(url = %url, event = ?terminal, "WebSocket connection ended");
    let _ = events.send(terminal);
}
