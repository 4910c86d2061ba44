//! Text-frame transport under a relay connection.
//!
//! A [`Connector`] opens one duplex channel and hands back its two halves.
//! The connection owns the sink from a single writer task and the stream
//! from a single reader task, so neither half needs to be shareable.

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};
use url::Url;

use crate::error::{ClientError, Result};

/// Outbound half of a transport.
#[async_trait]
pub trait TransportSink: Send {
    async fn send(&mut self, text: String) -> Result<()>;

    /// Close the transport politely. Errors here are not reported further.
    async fn close(&mut self) -> Result<()>;
}

/// Inbound half of a transport.
#[async_trait]
pub trait TransportStream: Send {
    /// The next text frame. `None` once the remote side has closed cleanly.
    async fn next(&mut self) -> Option<Result<String>>;
}

pub type TransportHalves = (Box<dyn TransportSink>, Box<dyn TransportStream>);

/// Opens transports to relay URLs.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &Url) -> Result<TransportHalves>;
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket transport (`ws://` and `wss://`).
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, url: &Url) -> Result<TransportHalves> {
        let (ws_stream, response) = connect_async(url.as_str())
            .await
            .map_err(|e| ClientError::Transport(format!("failed to connect to {url}: {e}")))?;
        debug!(relay = %url, status = %response.status(), "websocket handshake complete");

        let (writer, reader) = ws_stream.split();
        Ok((
            Box::new(WebSocketSink { writer }),
            Box::new(WebSocketReader { reader }),
        ))
    }
}

struct WebSocketSink {
    writer: SplitSink<WsStream, Message>,
}

#[async_trait]
impl TransportSink for WebSocketSink {
    async fn send(&mut self, text: String) -> Result<()> {
        self.writer
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| ClientError::Transport(format!("failed to send message: {e}")))
    }

    async fn close(&mut self) -> Result<()> {
        self.writer
            .close()
            .await
            .map_err(|e| ClientError::Transport(format!("failed to close websocket: {e}")))
    }
}

struct WebSocketReader {
    reader: SplitStream<WsStream>,
}

#[async_trait]
impl TransportStream for WebSocketReader {
    async fn next(&mut self) -> Option<Result<String>> {
        loop {
            match self.reader.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.to_string())),
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "relay closed websocket");
                    return None;
                }
                Ok(_) => trace!("ignoring non-text websocket frame"),
                Err(e) => {
                    return Some(Err(ClientError::Transport(format!("websocket error: {e}"))));
                }
            }
        }
    }
}
