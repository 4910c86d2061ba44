//! Client error types.

use nostrain::{CodecError, ValidationError};
use thiserror::Error;

use crate::config::ConfigError;

/// Client error type.
///
/// Errors are cloneable so one failure can be reported to every pending
/// subscription and publication on a connection.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("closed by relay: {0}")]
    Closed(String),

    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("timeout error: {0}")]
    Timeout(String),

    #[error("not connected")]
    NotConnected,

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ClientError {
    /// Misuse of the connection state machine: operating on a connection that
    /// is not connected, or reusing an id that is still pending.
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, Self::NotConnected | Self::Protocol(_))
    }

    /// Errors after which an operation will receive nothing more.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::ConnectionClosed | Self::Closed(_)
        )
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<url::ParseError> for ClientError {
    fn from(error: url::ParseError) -> Self {
        Self::InvalidUrl(error.to_string())
    }
}

/// Client result type.
pub type Result<T> = std::result::Result<T, ClientError>;
