//! Wire frames exchanged with a relay.
//!
//! Every frame is a JSON array whose first element names the frame kind.
//! Client frames: `EVENT`, `REQ`, `CLOSE`, `AUTH`.
//! Relay frames: `EVENT`, `OK`, `EOSE`, `CLOSED`, `NOTICE`, `AUTH`.

use nostrain::{Event, Filter, validate_event_value};
use serde_json::{Value, json};

use crate::error::{ClientError, Result};

/// Frames sent from client to relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// `["EVENT", <event>]`
    Event(Event),
    /// `["REQ", <subscription id>, <filter>...]`
    Req {
        subscription_id: String,
        filters: Vec<Filter>,
    },
    /// `["CLOSE", <subscription id>]`
    Close(String),
    /// `["AUTH", <signed kind-22242 event>]`
    Auth(Event),
}

impl ClientMessage {
    pub fn to_value(&self) -> Result<Value> {
        Ok(match self {
            Self::Event(event) => json!(["EVENT", event]),
            Self::Req {
                subscription_id,
                filters,
            } => {
                let mut frame = Vec::with_capacity(filters.len() + 2);
                frame.push(json!("REQ"));
                frame.push(json!(subscription_id));
                for filter in filters {
                    frame.push(serde_json::to_value(filter)?);
                }
                Value::Array(frame)
            }
            Self::Close(subscription_id) => json!(["CLOSE", subscription_id]),
            Self::Auth(event) => json!(["AUTH", event]),
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_value()?)?)
    }
}

/// Frames sent from relay to client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayMessage {
    /// Subscription id and a stored or live event.
    Event(String, Event),
    /// Event id, accepted flag and human-readable message.
    Ok(String, bool, String),
    /// End of stored events for a subscription.
    Eose(String),
    /// Subscription id and the reason the relay ended it.
    Closed(String, String),
    Notice(String),
    /// Authentication challenge.
    Auth(String),
}

/// Which pending operation a frame belongs to, known even when the rest of
/// the frame fails to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Correlation {
    Subscription(String),
    Publication(String),
}

/// Best-effort correlation id of a decoded frame.
pub(crate) fn correlation(value: &Value) -> Option<Correlation> {
    let array = value.as_array()?;
    let kind = array.first()?.as_str()?;
    let id = array.get(1)?.as_str()?.to_string();
    match kind {
        "EVENT" | "EOSE" | "CLOSED" => Some(Correlation::Subscription(id)),
        "OK" => Some(Correlation::Publication(id)),
        _ => None,
    }
}

pub fn parse_relay_message(text: &str) -> Result<Option<RelayMessage>> {
    let value: Value = serde_json::from_str(text)
        .map_err(|error| ClientError::InvalidFrame(format!("invalid JSON relay message: {error}")))?;
    parse_relay_value(&value)
}

/// Decode an already-parsed frame. Unknown frame kinds and empty arrays yield
/// `None`; known kinds with missing or mistyped fields are errors.
pub fn parse_relay_value(value: &Value) -> Result<Option<RelayMessage>> {
    let array = value
        .as_array()
        .ok_or_else(|| invalid("expected JSON array relay message"))?;
    if array.is_empty() {
        return Ok(None);
    }

    let kind = array[0]
        .as_str()
        .ok_or_else(|| invalid("missing relay message kind"))?;

    match kind {
        "EVENT" => {
            if array.len() < 3 {
                return Err(invalid("invalid EVENT message"));
            }
            let subscription_id = string_field(&array[1], "invalid EVENT subscription id")?;
            validate_event_value(&array[2])
                .map_err(|error| invalid(format!("invalid EVENT payload: {error}")))?;
            let event: Event = serde_json::from_value(array[2].clone())
                .map_err(|error| invalid(format!("invalid EVENT payload: {error}")))?;
            Ok(Some(RelayMessage::Event(subscription_id, event)))
        }
        "OK" => {
            if array.len() < 4 {
                return Err(invalid("invalid OK message"));
            }
            let event_id = string_field(&array[1], "invalid OK event id")?;
            let accepted = array[2]
                .as_bool()
                .ok_or_else(|| invalid("invalid OK accepted flag"))?;
            let message = string_field(&array[3], "invalid OK message text")?;
            Ok(Some(RelayMessage::Ok(event_id, accepted, message)))
        }
        "EOSE" => {
            if array.len() < 2 {
                return Err(invalid("invalid EOSE message"));
            }
            let subscription_id = string_field(&array[1], "invalid EOSE subscription id")?;
            Ok(Some(RelayMessage::Eose(subscription_id)))
        }
        "CLOSED" => {
            if array.len() < 2 {
                return Err(invalid("invalid CLOSED message"));
            }
            let subscription_id = string_field(&array[1], "invalid CLOSED subscription id")?;
            // The reason is optional in practice.
            let message = match array.get(2) {
                None => String::new(),
                Some(value) => string_field(value, "invalid CLOSED message text")?,
            };
            Ok(Some(RelayMessage::Closed(subscription_id, message)))
        }
        "NOTICE" => {
            if array.len() < 2 {
                return Err(invalid("invalid NOTICE message"));
            }
            let message = string_field(&array[1], "invalid NOTICE message text")?;
            Ok(Some(RelayMessage::Notice(message)))
        }
        "AUTH" => {
            if array.len() < 2 {
                return Err(invalid("invalid AUTH message"));
            }
            let challenge = string_field(&array[1], "invalid AUTH challenge")?;
            Ok(Some(RelayMessage::Auth(challenge)))
        }
        _ => Ok(None),
    }
}

fn string_field(value: &Value, error: &str) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| invalid(error))
}

fn invalid(message: impl Into<String>) -> ClientError {
    ClientError::InvalidFrame(message.into())
}
