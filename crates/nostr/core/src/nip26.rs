//! NIP-26: delegated event signing.
//!
//! A delegator signs `nostr:delegation:<delegatee>:<conditions>`; the
//! delegatee attaches `["delegation", <delegator>, <conditions>, <sig>]` to
//! events it publishes on the delegator's behalf.

use bitcoin::key::Secp256k1;
use bitcoin::secp256k1::{Keypair, Message, SecretKey, XOnlyPublicKey, schnorr};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::keys::{get_public_key_hex, parse_hex32};
use crate::nip01::{Event, ValidationError};
use crate::tag_parsing::{is_tag, tag_field};

#[derive(Debug, Error)]
pub enum DelegationError {
    #[error("refusing to create a delegation without any conditions")]
    NoConditions,

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// What the delegatee may publish.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DelegationParameters {
    /// Delegatee public key.
    pub pubkey: String,
    pub kind: Option<u16>,
    /// Valid only for events created before this time.
    pub until: Option<u64>,
    /// Valid only for events created after this time.
    pub since: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delegation {
    pub from: String,
    pub to: String,
    pub cond: String,
    pub sig: String,
}

impl Delegation {
    /// The `delegation` tag a delegatee attaches to its events.
    pub fn to_tag(&self) -> Vec<String> {
        vec![
            "delegation".to_string(),
            self.from.clone(),
            self.cond.clone(),
            self.sig.clone(),
        ]
    }
}

pub fn create_delegation(
    secret_key: &[u8; 32],
    parameters: &DelegationParameters,
) -> Result<Delegation, DelegationError> {
    let mut conditions = Vec::new();
    if let Some(kind) = parameters.kind {
        conditions.push(format!("kind={kind}"));
    }
    if let Some(until) = parameters.until {
        conditions.push(format!("created_at<{until}"));
    }
    if let Some(since) = parameters.since {
        conditions.push(format!("created_at>{since}"));
    }
    if conditions.is_empty() {
        return Err(DelegationError::NoConditions);
    }
    let cond = conditions.join("&");

    let secp = Secp256k1::signing_only();
    let sk = SecretKey::from_slice(secret_key)
        .map_err(|e| ValidationError::InvalidSecretKey(e.to_string()))?;
    let keypair = Keypair::from_secret_key(&secp, &sk);
    let message = Message::from_digest(sighash(&parameters.pubkey, &cond));
    let sig = secp.sign_schnorr_no_aux_rand(&message, &keypair);

    Ok(Delegation {
        from: get_public_key_hex(secret_key)?,
        to: parameters.pubkey.clone(),
        cond,
        sig: hex::encode(sig.serialize()),
    })
}

/// The delegator of `event`, if it carries a delegation tag whose conditions
/// hold for the event and whose signature verifies.
pub fn get_delegator(event: &Event) -> Option<String> {
    let tag = event
        .tags
        .iter()
        .find(|tag| is_tag(tag, "delegation") && tag.len() >= 4)?;
    let pubkey = tag_field(tag, 1)?;
    let cond = tag_field(tag, 2)?;
    let sig = tag_field(tag, 3)?;

    if !cond.split('&').all(|condition| condition_holds(condition, event)) {
        return None;
    }

    let pubkey_bytes = parse_hex32(pubkey).ok()?;
    let xonly = XOnlyPublicKey::from_slice(&pubkey_bytes).ok()?;
    let sig = schnorr::Signature::from_slice(&hex::decode(sig).ok()?).ok()?;
    let message = Message::from_digest(sighash(&event.pubkey, cond));
    Secp256k1::verification_only()
        .verify_schnorr(&sig, &message, &xonly)
        .ok()?;

    Some(pubkey.to_string())
}

fn condition_holds(condition: &str, event: &Event) -> bool {
    let Some(at) = condition.find(['=', '<', '>']) else {
        return false;
    };
    let (key, rest) = condition.split_at(at);
    let (operator, value) = rest.split_at(1);
    let Ok(value) = value.parse::<u64>() else {
        return false;
    };

    match (key, operator) {
        ("kind", "=") => u64::from(event.kind) == value,
        ("created_at", "<") => event.created_at < value,
        ("created_at", ">") => event.created_at > value,
        _ => false,
    }
}

fn sighash(delegatee: &str, cond: &str) -> [u8; 32] {
    Sha256::digest(format!("nostr:delegation:{delegatee}:{cond}").as_bytes()).into()
}
