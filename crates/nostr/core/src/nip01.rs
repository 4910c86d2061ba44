//! NIP-01: Basic protocol flow description.
//!
//! This module implements the core Nostr event structure and operations:
//! - Event structure (id, pubkey, created_at, kind, tags, content, sig)
//! - Canonical serialization for hashing
//! - Event signing with BIP-340 Schnorr signatures
//! - Event verification
//! - Structural validation of typed and untyped (wire JSON) events
//! - Kind classification (regular, replaceable, ephemeral, addressable)

use bitcoin::key::Secp256k1;
use bitcoin::secp256k1::{Keypair, Message, SecretKey, XOnlyPublicKey, schnorr};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::keys::{is_lower_hex, parse_hex32};
use crate::tag_parsing::is_tag;

/// Malformed event, key or filter fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("event must be a JSON object")]
    NotAnObject,

    #[error("kind must be an integer between 0 and 65535")]
    InvalidKind,

    #[error("content must be a string")]
    InvalidContent,

    #[error("created_at must be a non-negative integer")]
    InvalidCreatedAt,

    #[error("pubkey must be 64 lowercase hex characters, got {0:?}")]
    InvalidPubkey(String),

    #[error("tags must be an array of arrays")]
    InvalidTags,

    #[error("tag {tag} element {index} is not a string")]
    NonScalarTagElement { tag: usize, index: usize },

    #[error("invalid secret key: {0}")]
    InvalidSecretKey(String),

    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A signed Nostr event.
///
/// The id and signature cover every other field. Changing any field produces
/// an event that no longer verifies; build a new [`EventTemplate`] and call
/// [`finish_event`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// 32-bytes lowercase hex-encoded sha256 of the serialized event data
    pub id: String,
    /// 32-bytes lowercase hex-encoded public key of the event creator
    pub pubkey: String,
    /// Unix timestamp in seconds
    pub created_at: u64,
    /// Event kind (integer between 0 and 65535)
    pub kind: u16,
    /// Array of arrays of strings (tags)
    pub tags: Vec<Vec<String>>,
    /// Arbitrary string content
    pub content: String,
    /// 64-bytes lowercase hex signature
    pub sig: String,
}

/// An unsigned event (template plus author).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedEvent {
    pub pubkey: String,
    pub created_at: u64,
    pub kind: u16,
    pub tags: Vec<Vec<String>>,
    pub content: String,
}

/// A template for creating events. The pubkey is derived from the signing key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTemplate {
    pub created_at: u64,
    pub kind: u16,
    pub tags: Vec<Vec<String>>,
    pub content: String,
}

/// Event kind classification according to NIP-01.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindClassification {
    /// Events expected to be stored by relays
    Regular,
    /// Only latest event per pubkey+kind is stored
    Replaceable,
    /// Not expected to be stored by relays
    Ephemeral,
    /// Only latest event per pubkey+kind+d-tag is stored
    Addressable,
    Unknown,
}

pub const KIND_METADATA: u16 = 0;
pub const KIND_SHORT_TEXT_NOTE: u16 = 1;
pub const KIND_RECOMMEND_RELAY: u16 = 2;
pub const KIND_CONTACTS: u16 = 3;
pub const KIND_ENCRYPTED_DIRECT_MESSAGE: u16 = 4;
pub const KIND_EVENT_DELETION: u16 = 5;
pub const KIND_REACTION: u16 = 7;
pub const KIND_CHANNEL_CREATION: u16 = 40;
pub const KIND_CHANNEL_METADATA: u16 = 41;
pub const KIND_CHANNEL_MESSAGE: u16 = 42;
pub const KIND_CHANNEL_HIDE_MESSAGE: u16 = 43;
pub const KIND_CHANNEL_MUTE_USER: u16 = 44;
pub const KIND_REPORT: u16 = 1984;
pub const KIND_ZAP_REQUEST: u16 = 9734;
pub const KIND_ZAP: u16 = 9735;
pub const KIND_RELAY_LIST: u16 = 10002;
pub const KIND_CLIENT_AUTH: u16 = 22242;
pub const KIND_ARTICLE: u16 = 30023;

/// Kind used by [`blank_event`]; not assigned by any NIP.
pub const KIND_BLANK: u16 = 255;

impl EventTemplate {
    /// Attach an author, producing the unsigned form that gets hashed.
    pub fn with_pubkey(&self, pubkey: impl Into<String>) -> UnsignedEvent {
        UnsignedEvent {
            pubkey: pubkey.into(),
            created_at: self.created_at,
            kind: self.kind,
            tags: self.tags.clone(),
            content: self.content.clone(),
        }
    }
}

impl UnsignedEvent {
    /// Validate untyped JSON against the event shape rules and convert it.
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        validate_event_value(value)?;
        serde_json::from_value(value.clone())
            .map_err(|e| ValidationError::Serialization(e.to_string()))
    }
}

impl Event {
    /// The unsigned portion of this event.
    pub fn unsigned(&self) -> UnsignedEvent {
        UnsignedEvent {
            pubkey: self.pubkey.clone(),
            created_at: self.created_at,
            kind: self.kind,
            tags: self.tags.clone(),
            content: self.content.clone(),
        }
    }

    /// Recompute the id and check the signature. Never fails, only answers.
    pub fn verify(&self) -> bool {
        verify_event(self)
    }

    /// Values of every tag named `name` (second element), in tag order.
    pub fn tag_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.tags
            .iter()
            .filter(move |tag| is_tag(tag, name))
            .filter_map(|tag| tag.get(1).map(String::as_str))
    }
}

/// An empty template: kind 255, no tags, empty content, created_at 0.
pub fn blank_event() -> EventTemplate {
    EventTemplate {
        created_at: 0,
        kind: KIND_BLANK,
        tags: Vec::new(),
        content: String::new(),
    }
}

/// Serialize an unsigned event for hashing.
///
/// Format: `[0, pubkey, created_at, kind, tags, content]` with no whitespace.
pub fn serialize_event(event: &UnsignedEvent) -> Result<String, ValidationError> {
    validate_unsigned_event(event)?;

    serde_json::to_string(&(
        0,
        &event.pubkey,
        event.created_at,
        event.kind,
        &event.tags,
        &event.content,
    ))
    .map_err(|e| ValidationError::Serialization(e.to_string()))
}

/// Get the event hash (id) from an unsigned event.
pub fn get_event_hash(event: &UnsignedEvent) -> Result<String, ValidationError> {
    Ok(hex::encode(event_hash_bytes(event)?))
}

fn event_hash_bytes(event: &UnsignedEvent) -> Result<[u8; 32], ValidationError> {
    let serialized = serialize_event(event)?;
    Ok(Sha256::digest(serialized.as_bytes()).into())
}

/// Validate the fields of a typed unsigned event.
///
/// Kind, content, created_at and tag shapes are guaranteed by the types; only
/// the pubkey format is left to check.
pub fn validate_unsigned_event(event: &UnsignedEvent) -> Result<(), ValidationError> {
    if !is_lower_hex(&event.pubkey, 64) {
        return Err(ValidationError::InvalidPubkey(event.pubkey.clone()));
    }
    Ok(())
}

/// Validate untyped JSON (for example an event received from the wire).
pub fn validate_event_value(value: &Value) -> Result<(), ValidationError> {
    let object = value.as_object().ok_or(ValidationError::NotAnObject)?;

    let kind_ok = object
        .get("kind")
        .and_then(Value::as_u64)
        .is_some_and(|kind| u16::try_from(kind).is_ok());
    if !kind_ok {
        return Err(ValidationError::InvalidKind);
    }

    if !object.get("content").is_some_and(Value::is_string) {
        return Err(ValidationError::InvalidContent);
    }

    if !object.get("created_at").is_some_and(Value::is_u64) {
        return Err(ValidationError::InvalidCreatedAt);
    }

    match object.get("pubkey") {
        Some(Value::String(pubkey)) if is_lower_hex(pubkey, 64) => {}
        Some(Value::String(pubkey)) => return Err(ValidationError::InvalidPubkey(pubkey.clone())),
        Some(other) => return Err(ValidationError::InvalidPubkey(other.to_string())),
        None => return Err(ValidationError::InvalidPubkey(String::new())),
    }

    let tags = object
        .get("tags")
        .and_then(Value::as_array)
        .ok_or(ValidationError::InvalidTags)?;
    for (tag_index, tag) in tags.iter().enumerate() {
        let elements = tag.as_array().ok_or(ValidationError::InvalidTags)?;
        if let Some(index) = elements.iter().position(|element| !element.is_string()) {
            return Err(ValidationError::NonScalarTagElement {
                tag: tag_index,
                index,
            });
        }
    }

    Ok(())
}

/// Sign the id of an unsigned event, returning the 128-hex signature.
///
/// Uses BIP-340 without auxiliary randomness, so the same key and event always
/// produce the same signature.
pub fn sign_event(event: &UnsignedEvent, secret_key: &[u8; 32]) -> Result<String, ValidationError> {
    let hash = event_hash_bytes(event)?;
    let secp = Secp256k1::signing_only();
    let sk = SecretKey::from_slice(secret_key)
        .map_err(|e| ValidationError::InvalidSecretKey(e.to_string()))?;
    let keypair = Keypair::from_secret_key(&secp, &sk);
    let message = Message::from_digest(hash);
    let sig = secp.sign_schnorr_no_aux_rand(&message, &keypair);
    Ok(hex::encode(sig.serialize()))
}

/// Sign an event template with a secret key, producing a complete signed event.
pub fn finish_event(template: &EventTemplate, secret_key: &[u8; 32]) -> Result<Event, ValidationError> {
    let pubkey = crate::keys::get_public_key_hex(secret_key)?;
    let unsigned = template.with_pubkey(pubkey);
    let id = get_event_hash(&unsigned)?;
    let sig = sign_event(&unsigned, secret_key)?;

    Ok(Event {
        id,
        pubkey: unsigned.pubkey,
        created_at: unsigned.created_at,
        kind: unsigned.kind,
        tags: unsigned.tags,
        content: unsigned.content,
        sig,
    })
}

/// Check the structural shape of id, pubkey and sig (not the signature itself).
pub fn validate_event(event: &Event) -> bool {
    is_lower_hex(&event.id, 64) && is_lower_hex(&event.pubkey, 64) && is_lower_hex(&event.sig, 128)
}

/// Verify an event's id and signature.
///
/// Returns `false` for any mismatch, including an id that does not match the
/// event's own fields.
pub fn verify_event(event: &Event) -> bool {
    if !validate_event(event) {
        return false;
    }

    let Ok(computed_id) = get_event_hash(&event.unsigned()) else {
        return false;
    };
    if computed_id != event.id {
        return false;
    }

    let Ok(id_bytes) = parse_hex32(&event.id) else {
        return false;
    };
    let Ok(sig_bytes) = hex::decode(&event.sig) else {
        return false;
    };
    let Ok(sig) = schnorr::Signature::from_slice(&sig_bytes) else {
        return false;
    };
    let Ok(pubkey_bytes) = parse_hex32(&event.pubkey) else {
        return false;
    };
    let Ok(pubkey) = XOnlyPublicKey::from_slice(&pubkey_bytes) else {
        return false;
    };

    let secp = Secp256k1::verification_only();
    secp.verify_schnorr(&sig, &Message::from_digest(id_bytes), &pubkey)
        .is_ok()
}

/// Classify an event kind according to NIP-01 rules.
pub fn classify_kind(kind: u16) -> KindClassification {
    let k = u32::from(kind);

    if (1000..10000).contains(&k) || (4..45).contains(&k) || k == 1 || k == 2 {
        return KindClassification::Regular;
    }

    if (10000..20000).contains(&k) || k == 0 || k == 3 {
        return KindClassification::Replaceable;
    }

    if (20000..30000).contains(&k) {
        return KindClassification::Ephemeral;
    }

    if (30000..40000).contains(&k) {
        return KindClassification::Addressable;
    }

    KindClassification::Unknown
}

pub fn is_regular_kind(kind: u16) -> bool {
    matches!(classify_kind(kind), KindClassification::Regular)
}

pub fn is_replaceable_kind(kind: u16) -> bool {
    matches!(classify_kind(kind), KindClassification::Replaceable)
}

pub fn is_ephemeral_kind(kind: u16) -> bool {
    matches!(classify_kind(kind), KindClassification::Ephemeral)
}

pub fn is_addressable_kind(kind: u16) -> bool {
    matches!(classify_kind(kind), KindClassification::Addressable)
}

/// Sort events newest first, breaking ties by id.
pub fn sort_events(events: &mut [Event]) {
    events.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
}
