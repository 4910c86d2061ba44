//! In-memory relay for driving a connection frame by frame.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use nostrain::{Event, EventTemplate, finish_event};
use nostrain_client::{
    ClientError, Connector, RelayConfig, RelayConnection, Result, TransportHalves, TransportSink,
    TransportStream,
};
use serde_json::Value;
use tokio::sync::mpsc;
use url::Url;

pub const SECRET: [u8; 32] = [0x11; 32];
pub const RELAY_URL: &str = "wss://relay.test";

/// Hands out one pre-built transport.
pub struct MemoryConnector {
    halves: Mutex<Option<TransportHalves>>,
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, _url: &Url) -> Result<TransportHalves> {
        self.halves
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| ClientError::Transport("transport already used".to_string()))
    }
}

/// Refuses every connection attempt.
pub struct RefusingConnector;

#[async_trait]
impl Connector for RefusingConnector {
    async fn connect(&self, url: &Url) -> Result<TransportHalves> {
        Err(ClientError::Transport(format!("connection refused by {url}")))
    }
}

struct MemorySink(mpsc::UnboundedSender<String>);

#[async_trait]
impl TransportSink for MemorySink {
    async fn send(&mut self, text: String) -> Result<()> {
        self.0
            .send(text)
            .map_err(|_| ClientError::Transport("relay went away".to_string()))
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

struct MemoryStream(mpsc::UnboundedReceiver<Result<String>>);

#[async_trait]
impl TransportStream for MemoryStream {
    async fn next(&mut self) -> Option<Result<String>> {
        self.0.recv().await
    }
}

/// The relay's side of the in-memory transport.
pub struct MemoryRelay {
    from_client: mpsc::UnboundedReceiver<String>,
    to_client: Option<mpsc::UnboundedSender<Result<String>>>,
}

impl MemoryRelay {
    pub fn send(&self, frame: Value) {
        self.send_raw(&frame.to_string());
    }

    pub fn send_raw(&self, text: &str) {
        if let Some(to_client) = &self.to_client {
            to_client.send(Ok(text.to_string())).unwrap();
        }
    }

    /// Make the client's next read fail.
    pub fn fail(&self, message: &str) {
        if let Some(to_client) = &self.to_client {
            to_client
                .send(Err(ClientError::Transport(message.to_string())))
                .unwrap();
        }
    }

    /// Close the relay side cleanly.
    pub fn hang_up(&mut self) {
        self.to_client = None;
    }

    /// The next frame the client sent.
    pub async fn recv(&mut self) -> Value {
        let text = tokio::time::timeout(Duration::from_secs(30), self.from_client.recv())
            .await
            .expect("timed out waiting for a client frame")
            .expect("client transport closed");
        serde_json::from_str(&text).unwrap()
    }

    /// Every remaining frame, once the client has closed its side.
    pub async fn drain(&mut self) -> Vec<Value> {
        let mut frames = Vec::new();
        while let Some(text) = self.from_client.recv().await {
            frames.push(serde_json::from_str(&text).unwrap());
        }
        frames
    }
}

pub fn memory_transport() -> (Arc<MemoryConnector>, MemoryRelay) {
    let (client_tx, from_client) = mpsc::unbounded_channel();
    let (to_client, client_rx) = mpsc::unbounded_channel();
    let halves: TransportHalves = (
        Box::new(MemorySink(client_tx)),
        Box::new(MemoryStream(client_rx)),
    );
    let connector = Arc::new(MemoryConnector {
        halves: Mutex::new(Some(halves)),
    });
    let relay = MemoryRelay {
        from_client,
        to_client: Some(to_client),
    };
    (connector, relay)
}

pub async fn connected_with(config: RelayConfig) -> (RelayConnection, MemoryRelay) {
    let (connector, relay) = memory_transport();
    let connection = RelayConnection::with_connector(RELAY_URL, config, connector).unwrap();
    connection.connect().await.unwrap();
    (connection, relay)
}

pub async fn connected() -> (RelayConnection, MemoryRelay) {
    connected_with(RelayConfig::default()).await
}

pub fn signed_event(kind: u16, content: &str, created_at: u64) -> Event {
    let template = EventTemplate {
        created_at,
        kind,
        tags: vec![],
        content: content.to_string(),
    };
    finish_event(&template, &SECRET).unwrap()
}

pub fn signed_note(content: &str, created_at: u64) -> Event {
    signed_event(1, content, created_at)
}
