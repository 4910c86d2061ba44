//! Secret and public key handling.

use bitcoin::key::Secp256k1;
use bitcoin::secp256k1::SecretKey;
use rand::RngCore;

use crate::nip01::ValidationError;
use crate::nip19::{self, CodecError};

/// Generate a random, valid 32-byte secret key.
pub fn generate_secret_key() -> [u8; 32] {
    let mut rng = rand::rng();
    loop {
        let mut key = [0u8; 32];
        rng.fill_bytes(&mut key);
        if SecretKey::from_slice(&key).is_ok() {
            return key;
        }
    }
}

/// Get the x-only public key (32 bytes) for a secret key.
pub fn get_public_key(secret_key: &[u8; 32]) -> Result<[u8; 32], ValidationError> {
    let secp = Secp256k1::signing_only();
    let sk = SecretKey::from_slice(secret_key)
        .map_err(|e| ValidationError::InvalidSecretKey(e.to_string()))?;
    let (xonly, _parity) = sk.x_only_public_key(&secp);
    Ok(xonly.serialize())
}

pub fn get_public_key_hex(secret_key: &[u8; 32]) -> Result<String, ValidationError> {
    Ok(hex::encode(get_public_key(secret_key)?))
}

/// Parse a 64-character hex secret key.
pub fn secret_key_from_hex(value: &str) -> Result<[u8; 32], ValidationError> {
    let key = parse_hex32(value)?;
    SecretKey::from_slice(&key).map_err(|e| ValidationError::InvalidSecretKey(e.to_string()))?;
    Ok(key)
}

pub(crate) fn parse_hex32(value: &str) -> Result<[u8; 32], ValidationError> {
    let bytes = hex::decode(value).map_err(|e| ValidationError::InvalidHex(e.to_string()))?;
    <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| {
        ValidationError::InvalidHex(format!("expected 32 bytes, got {}", bytes.len()))
    })
}

/// `^[a-f0-9]{len}$`
pub(crate) fn is_lower_hex(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

#[derive(Clone)]
pub struct Keypair {
    pub private_key: [u8; 32],
    pub public_key: [u8; 32],
}

impl Keypair {
    pub fn generate() -> Self {
        loop {
            if let Ok(keypair) = Self::from_secret_key(&generate_secret_key()) {
                return keypair;
            }
        }
    }

    pub fn from_secret_key(secret_key: &[u8; 32]) -> Result<Self, ValidationError> {
        Ok(Self {
            private_key: *secret_key,
            public_key: get_public_key(secret_key)?,
        })
    }

    pub fn npub(&self) -> Result<String, CodecError> {
        nip19::npub_encode(&self.public_key_hex())
    }

    pub fn nsec(&self) -> Result<String, CodecError> {
        nip19::nsec_encode(&self.private_key_hex())
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key)
    }

    pub fn private_key_hex(&self) -> String {
        hex::encode(self.private_key)
    }
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keypair")
            .field("public_key", &self.public_key_hex())
            .finish_non_exhaustive()
    }
}
