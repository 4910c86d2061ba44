//! Nostr relay client.
//!
//! A [`RelayConnection`] talks to one relay over a pluggable transport
//! (WebSocket by default):
//! - subscriptions with event, end-of-stored-events, error and timeout
//!   callbacks
//! - one-shot `list` and `get` queries
//! - publications that settle exactly once on the relay's `OK`
//! - NIP-42 authentication

pub mod config;
pub mod error;
mod listeners;
pub mod message;
pub mod publication;
pub mod relay;
pub mod subscription;
pub mod transport;

pub use config::{ConfigError, RelayConfig};
pub use error::{ClientError, Result};
pub use listeners::Handler;
pub use message::{ClientMessage, RelayMessage, parse_relay_message};
pub use publication::{Publication, PublicationState, PublishConfirmation};
pub use relay::{ConnectionState, RelayConnection};
pub use subscription::{SubscribeOptions, Subscription, SubscriptionState};
pub use transport::{Connector, TransportHalves, TransportSink, TransportStream, WebSocketConnector};
