//! WebSocket client transport (tokio-tungstenite)

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info};

use super::{Connector, Transport, TransportEvent};
use crate::{ConsoleError, Result};

type ClientStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens live WebSocket connections
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait::async_trait]
impl Connector for WsConnector {
    async fn open(&self, address: &str) -> Result<Box<dyn Transport>> {
        debug!(url = address, "Opening WebSocket");
        let (stream, response) = connect_async(address).await.map_err(|e| {
            ConsoleError::connection_failed_with_source(e.to_string(), Box::new(e))
        })?;
        info!(url = address, status = %response.status(), "WebSocket handshake complete");
        Ok(Box::new(WsTransport { stream, closed: false }))
    }
}

/// One open WebSocket connection
pub struct WsTransport {
    stream: ClientStream,
    closed: bool,
}

#[async_trait::async_trait]
impl Transport for WsTransport {
    async fn send(&mut self, text: String) -> Result<()> {
        self.stream.send(Message::text(text)).await?;
        Ok(())
    }

    async fn recv(&mut self) -> TransportEvent {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return TransportEvent::Message(text.to_string()),
                Some(Ok(Message::Binary(bytes))) => {
                    return TransportEvent::Message(String::from_utf8_lossy(&bytes).into_owned());
                }
                // tungstenite answers pings itself
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => continue,
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "Close frame received");
                    return TransportEvent::Closed;
                }
                Some(Err(e)) => return TransportEvent::Error(e.to_string()),
                None => return TransportEvent::Closed,
            }
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.stream.close(None).await {
            debug!(error = %e, "WebSocket close did not complete cleanly");
        }
    }
}
